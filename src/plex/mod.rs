use std::collections::BTreeSet;

use client::Plex;
use models::metadata::Metadata;

use crate::{
    error::SyncError,
    session::{DestinationSession, PlaylistRef},
    track::{DestinationTrack, Track, TrackId},
};

pub mod client;
pub mod models;

/// Rating Plex shows as five stars; tracks carrying it count as favorites.
const FAVORITE_RATING: i32 = 10;
const CLEAR_RATING: i32 = -1;

/// A Plex music library as sync destination. Track ids are rating keys.
pub struct PlexSession {
    plex: Plex,
    machine_identifier: String,
    provider_identifier: String,
    section: String,
}

fn to_destination_track(meta: Metadata) -> DestinationTrack {
    let mut artists: Vec<String> = Vec::new();
    for artist in [meta.original_title, meta.grandparent_title]
        .into_iter()
        .flatten()
    {
        let artist = artist.trim().to_string();
        if !artist.is_empty() && !artists.contains(&artist) {
            artists.push(artist);
        }
    }

    DestinationTrack {
        id: TrackId::new(meta.rating_key),
        track: Track {
            title: meta.title,
            artists,
            album: meta.parent_title.unwrap_or_default(),
            duration: meta.duration.map_or(0, |ms| (ms / 1000) as u32),
            isrc: None,
        },
    }
}

/// Keeps errors the retry layer or the caller must see as they are, and
/// turns the rest into a mutation failure.
fn mutation_error(context: &str, err: SyncError) -> SyncError {
    match err {
        SyncError::AuthFailure(_) | SyncError::RateLimited { .. } | SyncError::Transient(_) => err,
        other => SyncError::MutationFailure(format!("{context}: {other}")),
    }
}

/// Once part of a compound mutation has landed, a retry would repeat it.
fn partial_mutation_error(context: &str, err: SyncError) -> SyncError {
    match err {
        SyncError::AuthFailure(_) => err,
        other => SyncError::MutationFailure(format!("{context}: {other}")),
    }
}

/// Index, in the list before the move, of the item the moved entry ends up
/// behind. `None` means the top of the playlist.
fn move_anchor(from: usize, to: usize) -> Option<usize> {
    if to == 0 {
        None
    } else if to - 1 < from {
        Some(to - 1)
    } else {
        Some(to)
    }
}

fn item_id(items: &[Metadata], position: usize) -> Result<i64, SyncError> {
    items
        .get(position)
        .and_then(|item| item.playlist_item_id)
        .ok_or_else(|| SyncError::MutationFailure(format!("no playlist item at position {position}")))
}

impl PlexSession {
    /// Looks up the server identity and its music section.
    pub async fn connect(plex: Plex) -> Result<Self, SyncError> {
        let providers = plex.get_providers().await?.media_container;
        let (provider_identifier, section) = providers
            .music_section()
            .ok_or_else(|| SyncError::NotFound("music library on the Plex server".to_string()))?;
        log::info!(
            "Using Plex server {:?}, music section {}",
            providers.friendly_name,
            section
        );

        Ok(Self {
            plex,
            machine_identifier: providers.machine_identifier,
            provider_identifier,
            section,
        })
    }

    fn item_uri(&self, rating_key: &str) -> String {
        format!(
            "server://{}/{}/library/metadata/{}",
            self.machine_identifier, self.provider_identifier, rating_key
        )
    }

    /// Plex rejects a regular playlist without items, so creation carries
    /// the seed track whenever there is one.
    fn creation_uri(&self, seed: Option<&TrackId>) -> String {
        match seed {
            Some(track) => self.item_uri(track.as_str()),
            None => format!(
                "server://{}/{}/library/metadata",
                self.machine_identifier, self.provider_identifier
            ),
        }
    }

    /// Collects every entry of a paginated listing.
    async fn all_pages(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<Metadata>, SyncError> {
        let mut items = Vec::new();
        let mut offset = 0;
        let mut total = 1;
        while offset < total {
            let page = self.plex.get_page(path, query, offset).await?.media_container;
            let fetched = page.metadata.unwrap_or_default();
            if fetched.is_empty() {
                break;
            }
            total = page.total_size.unwrap_or(offset + page.size);
            offset += fetched.len() as i32;
            items.extend(fetched);
        }
        Ok(items)
    }

    async fn playlist_items(&self, playlist: &PlaylistRef) -> Result<Vec<Metadata>, SyncError> {
        self.all_pages(&format!("playlists/{}/items", playlist.id), &[])
            .await
    }
}

#[async_trait::async_trait]
impl DestinationSession for PlexSession {
    async fn check_login(&self) -> Result<bool, SyncError> {
        match self.plex.get_sections().await {
            Ok(()) => Ok(true),
            Err(SyncError::AuthFailure(reason)) => {
                log::warn!("Plex login failed: {}", reason);
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    async fn list_playlists(&self) -> Result<Vec<PlaylistRef>, SyncError> {
        let playlists = self.plex.get_playlists().await?.media_container;
        Ok(playlists
            .metadata
            .unwrap_or_default()
            .into_iter()
            .filter(|p| p.smart != Some(true))
            .map(|p| PlaylistRef {
                id: p.rating_key,
                name: p.title,
            })
            .collect())
    }

    async fn search_track(&self, query: &str) -> Result<Vec<DestinationTrack>, SyncError> {
        let results = self
            .plex
            .search_tracks(&self.section, query)
            .await?
            .media_container;
        Ok(results
            .tracks()
            .into_iter()
            .map(to_destination_track)
            .collect())
    }

    async fn find_track_by_isrc(&self, _isrc: &str) -> Result<Option<DestinationTrack>, SyncError> {
        // Plex does not index ISRCs.
        Ok(None)
    }

    async fn create_playlist(
        &self,
        name: &str,
        seed: Option<&TrackId>,
    ) -> Result<PlaylistRef, SyncError> {
        let uri = self.creation_uri(seed);
        let created = self
            .plex
            .create_playlist(name, &uri)
            .await
            .map_err(|err| mutation_error("create playlist", err))?;
        created
            .media_container
            .metadata
            .and_then(|m| m.into_iter().next())
            .map(|p| PlaylistRef {
                id: p.rating_key,
                name: p.title,
            })
            .ok_or_else(|| {
                SyncError::MutationFailure(format!("Plex returned no playlist for {name:?}"))
            })
    }

    async fn get_playlist_tracks(&self, playlist: &PlaylistRef) -> Result<Vec<TrackId>, SyncError> {
        Ok(self
            .playlist_items(playlist)
            .await?
            .into_iter()
            .map(|item| TrackId::new(item.rating_key))
            .collect())
    }

    async fn insert_track(
        &self,
        playlist: &PlaylistRef,
        track: &TrackId,
        position: usize,
    ) -> Result<(), SyncError> {
        let before = self.playlist_items(playlist).await?;
        if position > before.len() {
            return Err(SyncError::MutationFailure(format!(
                "position {position} out of range"
            )));
        }
        self.plex
            .add_to_playlist(&playlist.id, &self.item_uri(track.as_str()))
            .await
            .map_err(|err| mutation_error("add to playlist", err))?;
        if position == before.len() {
            return Ok(());
        }

        // Plex appends; the new entry is last and gets moved into place.
        let context = "position inserted track";
        let after = self
            .playlist_items(playlist)
            .await
            .map_err(|err| partial_mutation_error(context, err))?;
        let added = item_id(&after, after.len().saturating_sub(1))
            .map_err(|err| partial_mutation_error(context, err))?;
        let anchor = match position {
            0 => None,
            p => Some(item_id(&before, p - 1)?),
        };
        self.plex
            .move_playlist_item(&playlist.id, added, anchor)
            .await
            .map_err(|err| partial_mutation_error(context, err))
    }

    async fn remove_track(&self, playlist: &PlaylistRef, position: usize) -> Result<(), SyncError> {
        let items = self.playlist_items(playlist).await?;
        let id = item_id(&items, position)?;
        self.plex
            .delete_playlist_item(&playlist.id, id)
            .await
            .map_err(|err| mutation_error("remove from playlist", err))
    }

    async fn move_track(
        &self,
        playlist: &PlaylistRef,
        from: usize,
        to: usize,
    ) -> Result<(), SyncError> {
        let items = self.playlist_items(playlist).await?;
        if to >= items.len() {
            return Err(SyncError::MutationFailure(format!(
                "position {to} out of range"
            )));
        }
        let id = item_id(&items, from)?;
        let anchor = match move_anchor(from, to) {
            Some(index) => Some(item_id(&items, index)?),
            None => None,
        };
        self.plex
            .move_playlist_item(&playlist.id, id, anchor)
            .await
            .map_err(|err| mutation_error("move playlist item", err))
    }

    async fn get_favorite_track_ids(&self) -> Result<BTreeSet<TrackId>, SyncError> {
        let rated = self
            .all_pages(
                &format!("library/sections/{}/all", self.section),
                &[
                    ("type", "10".to_string()),
                    ("userRating>>", (FAVORITE_RATING - 1).to_string()),
                ],
            )
            .await?;
        Ok(rated
            .into_iter()
            .filter(|m| m.user_rating.map_or(false, |r| r >= FAVORITE_RATING as f32))
            .map(|m| TrackId::new(m.rating_key))
            .collect())
    }

    async fn add_favorite(&self, track: &TrackId) -> Result<(), SyncError> {
        self.plex
            .rate(track.as_str(), FAVORITE_RATING)
            .await
            .map_err(|err| mutation_error("rate track", err))
    }

    async fn remove_favorite(&self, track: &TrackId) -> Result<(), SyncError> {
        self.plex
            .rate(track.as_str(), CLEAR_RATING)
            .await
            .map_err(|err| mutation_error("clear rating", err))
    }
}
