use std::time::Duration;

use reqwest::{header::RETRY_AFTER, RequestBuilder, Response, StatusCode};

use crate::error::SyncError;

use super::models::{
    hubs::HubMediaContainer, metadata::MetadataMediaContainer, providers::ProviderMediaContainer,
    MediaContainerWrapper,
};

pub const PAGE_SIZE: i32 = 50;
pub const SEARCH_LIMIT: i32 = 20;

/// Thin wrapper over the Plex Media Server HTTP API.
pub struct Plex {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

/// Maps a non-success HTTP status onto the sync error taxonomy.
pub fn status_error(status: StatusCode, retry_after: Option<Duration>, path: &str) -> SyncError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SyncError::AuthFailure(format!("Plex rejected the token ({status})"))
        }
        StatusCode::NOT_FOUND => SyncError::NotFound(path.to_string()),
        StatusCode::TOO_MANY_REQUESTS => SyncError::RateLimited { retry_after },
        s if s.is_server_error() => SyncError::Transient(format!("{path} returned {s}")),
        s => SyncError::Other(anyhow::anyhow!("{path} returned {s}")),
    }
}

fn search_params(section: &str, query: &str) -> Vec<(&'static str, String)> {
    vec![
        ("query", query.to_string()),
        ("sectionId", section.to_string()),
        ("limit", SEARCH_LIMIT.to_string()),
    ]
}

impl Plex {
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            base_url,
            token,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Response, SyncError> {
        let response = request
            .header("X-Plex-Token", &self.token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        Err(status_error(status, retry_after, path))
    }

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Response, SyncError> {
        self.send(self.client.get(self.url(path)).query(query), path)
            .await
    }

    pub async fn post(&self, path: &str, query: &[(&str, String)]) -> Result<Response, SyncError> {
        self.send(self.client.post(self.url(path)).query(query), path)
            .await
    }

    pub async fn put(&self, path: &str, query: &[(&str, String)]) -> Result<Response, SyncError> {
        self.send(self.client.put(self.url(path)).query(query), path)
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<Response, SyncError> {
        self.send(self.client.delete(self.url(path)), path).await
    }

    async fn get_metadata(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<MediaContainerWrapper<MetadataMediaContainer>, SyncError> {
        Ok(self.get(path, query).await?.json().await?)
    }

    /// Fetches one page of a paginated metadata listing.
    pub async fn get_page(
        &self,
        path: &str,
        query: &[(&str, String)],
        offset: i32,
    ) -> Result<MediaContainerWrapper<MetadataMediaContainer>, SyncError> {
        let mut query = query.to_vec();
        query.push(("X-Plex-Container-Start", offset.to_string()));
        query.push(("X-Plex-Container-Size", PAGE_SIZE.to_string()));
        self.get_metadata(path, &query).await
    }

    pub async fn get_providers(
        &self,
    ) -> Result<MediaContainerWrapper<ProviderMediaContainer>, SyncError> {
        Ok(self.get("media/providers", &[]).await?.json().await?)
    }

    pub async fn get_sections(&self) -> Result<(), SyncError> {
        self.get("library/sections", &[]).await?;
        Ok(())
    }

    pub async fn get_playlists(
        &self,
    ) -> Result<MediaContainerWrapper<MetadataMediaContainer>, SyncError> {
        self.get_metadata("playlists", &[("playlistType", "audio".to_string())])
            .await
    }

    /// Hub search matches the query against artist, album and title
    /// together, so "artist title" queries find the track.
    pub async fn search_tracks(
        &self,
        section: &str,
        query: &str,
    ) -> Result<MediaContainerWrapper<HubMediaContainer>, SyncError> {
        Ok(self
            .get("hubs/search", &search_params(section, query))
            .await?
            .json()
            .await?)
    }

    pub async fn create_playlist(
        &self,
        name: &str,
        uri: &str,
    ) -> Result<MediaContainerWrapper<MetadataMediaContainer>, SyncError> {
        let response = self
            .post(
                "playlists",
                &[
                    ("type", "audio".to_string()),
                    ("smart", "0".to_string()),
                    ("uri", uri.to_string()),
                    ("title", name.to_string()),
                ],
            )
            .await?;
        Ok(response.json().await?)
    }

    /// Appends the item behind `uri` to the end of the playlist.
    pub async fn add_to_playlist(&self, playlist_key: &str, uri: &str) -> Result<(), SyncError> {
        self.put(
            &format!("playlists/{}/items", playlist_key),
            &[("uri", uri.to_string())],
        )
        .await?;
        Ok(())
    }

    /// Moves a playlist entry right behind `after`, or to the top.
    pub async fn move_playlist_item(
        &self,
        playlist_key: &str,
        item_id: i64,
        after: Option<i64>,
    ) -> Result<(), SyncError> {
        let query: Vec<(&str, String)> = after
            .map(|after| ("after", after.to_string()))
            .into_iter()
            .collect();
        self.put(
            &format!("playlists/{}/items/{}/move", playlist_key, item_id),
            &query,
        )
        .await?;
        Ok(())
    }

    pub async fn delete_playlist_item(
        &self,
        playlist_key: &str,
        item_id: i64,
    ) -> Result<(), SyncError> {
        self.delete(&format!("playlists/{}/items/{}", playlist_key, item_id))
            .await?;
        Ok(())
    }

    /// Sets a user rating from 0 to 10; -1 clears it.
    pub async fn rate(&self, rating_key: &str, rating: i32) -> Result<(), SyncError> {
        self.put(
            ":/rate",
            &[
                ("key", rating_key.to_string()),
                ("identifier", "com.plexapp.plugins.library".to_string()),
                ("rating", rating.to_string()),
            ],
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_onto_the_taxonomy() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, None, "playlists"),
            SyncError::AuthFailure(_)
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, None, "playlists/9"),
            SyncError::NotFound(path) if path == "playlists/9"
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, Some(Duration::from_secs(3)), "x"),
            SyncError::RateLimited { retry_after: Some(d) } if d == Duration::from_secs(3)
        ));
        assert!(status_error(StatusCode::BAD_GATEWAY, None, "x").is_retryable());
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, None, "x"),
            SyncError::Other(_)
        ));
    }

    #[test]
    fn searches_hubs_within_the_music_section() {
        let params = search_params("7", "Radiohead Paranoid Android");
        assert_eq!(
            params,
            vec![
                ("query", "Radiohead Paranoid Android".to_string()),
                ("sectionId", "7".to_string()),
                ("limit", SEARCH_LIMIT.to_string()),
            ]
        );
    }
}
