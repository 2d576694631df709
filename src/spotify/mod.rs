use rspotify::{
    model::{FullTrack, PlayableItem, PlaylistId},
    prelude::{BaseClient, Id, OAuthClient},
    scopes, AuthCodeSpotify, ClientError, Credentials, OAuth,
};

use crate::{
    error::SyncError,
    session::{PlaylistRef, SourceSession},
    track::Track,
};

const PLAYLIST_URL: &str = "https://open.spotify.com/playlist/";

impl From<ClientError> for SyncError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::InvalidToken => SyncError::AuthFailure(err.to_string()),
            ClientError::Http(_) | ClientError::Io(_) => SyncError::Transient(err.to_string()),
            _ => SyncError::Other(anyhow::anyhow!("spotify: {}", err)),
        }
    }
}

/// Accepts a bare id, a `spotify:playlist:` URI or an open.spotify.com link.
pub fn playlist_id(input: &str) -> Result<PlaylistId<'static>, SyncError> {
    let input = input.trim();
    let id = match input.strip_prefix(PLAYLIST_URL) {
        Some(rest) => rest.split(|c| c == '?' || c == '/').next().unwrap_or(rest),
        None => input,
    };
    PlaylistId::from_id_or_uri(id)
        .map(|id| id.into_static())
        .map_err(|_| SyncError::NotFound(format!("spotify playlist {input:?}")))
}

fn to_track(track: &FullTrack) -> Track {
    Track {
        title: track.name.clone(),
        artists: track
            .artists
            .iter()
            .map(|a| a.name.trim().to_string())
            .collect(),
        album: track.album.name.clone(),
        duration: track.duration.num_seconds().max(0) as u32,
        isrc: track.external_ids.get("isrc").cloned(),
    }
}

/// Spotify as the read-only source, authorized through the authorization
/// code flow. The client is blocking, so every call runs on the blocking
/// pool.
pub struct SpotifySession {
    client: AuthCodeSpotify,
}

impl SpotifySession {
    /// Authorizes against Spotify, reusing a cached token when one exists
    /// and prompting for the redirect URL otherwise.
    pub async fn connect(
        client_id: &str,
        client_secret: &str,
        redirect_uri: String,
    ) -> Result<Self, SyncError> {
        let creds = Credentials::new(client_id, client_secret);
        let oauth = OAuth {
            redirect_uri,
            scopes: scopes!("playlist-read-private", "user-library-read"),
            ..Default::default()
        };

        let mut spotify = AuthCodeSpotify::new(creds, oauth);
        spotify.config.token_cached = true;

        let session = Self { client: spotify };
        session
            .blocking(|spotify| {
                let url = spotify.get_authorize_url(false)?;
                spotify.prompt_for_token(&url)?;
                Ok(())
            })
            .await?;
        Ok(session)
    }

    async fn blocking<T, F>(&self, call: F) -> Result<T, SyncError>
    where
        T: Send + 'static,
        F: FnOnce(&AuthCodeSpotify) -> Result<T, SyncError> + Send + 'static,
    {
        let client = self.client.clone();
        tokio::task::spawn_blocking(move || call(&client))
            .await
            .map_err(|err| SyncError::Other(err.into()))?
    }
}

#[async_trait::async_trait]
impl SourceSession for SpotifySession {
    /// Playlists the current user owns; followed playlists are left out.
    async fn list_playlists(&self) -> Result<Vec<PlaylistRef>, SyncError> {
        self.blocking(|spotify| {
            let me = spotify.current_user()?;
            let mut owned = Vec::new();
            for playlist in spotify.current_user_playlists() {
                let playlist = playlist?;
                if playlist.owner.id == me.id {
                    owned.push(PlaylistRef {
                        id: playlist.id.id().to_string(),
                        name: playlist.name,
                    });
                }
            }
            log::info!("Found {} owned Spotify playlists", owned.len());
            Ok(owned)
        })
        .await
    }

    async fn playlist(&self, id: &str) -> Result<PlaylistRef, SyncError> {
        let id = playlist_id(id)?;
        self.blocking(move |spotify| {
            let playlist = spotify.playlist(id, None, None)?;
            Ok(PlaylistRef {
                id: playlist.id.id().to_string(),
                name: playlist.name,
            })
        })
        .await
    }

    async fn get_playlist_tracks(&self, playlist: &PlaylistRef) -> Result<Vec<Track>, SyncError> {
        let id = playlist_id(&playlist.id)?;
        let name = playlist.name.clone();
        self.blocking(move |spotify| {
            let mut tracks = Vec::new();
            let mut skipped = 0;
            for item in spotify.playlist_items(id, None, None) {
                match item?.track {
                    Some(PlayableItem::Track(track)) => tracks.push(to_track(&track)),
                    _ => skipped += 1,
                }
            }
            if skipped > 0 {
                log::debug!("{}: skipped {} episodes or unavailable items", name, skipped);
            }
            Ok(tracks)
        })
        .await
    }

    async fn get_favorite_tracks(&self) -> Result<Vec<Track>, SyncError> {
        self.blocking(|spotify| {
            let mut tracks = Vec::new();
            for saved in spotify.current_user_saved_tracks(None) {
                tracks.push(to_track(&saved?.track));
            }
            log::info!("Found {} saved Spotify tracks", tracks.len());
            Ok(tracks)
        })
        .await
    }
}
