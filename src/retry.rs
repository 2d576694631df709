use std::{collections::BTreeSet, future::Future, num::NonZeroU32, time::Duration};

use backon::{ExponentialBuilder, Retryable};
use governor::{clock::DefaultClock, state::InMemoryState, state::direct::NotKeyed, Quota, RateLimiter};

use crate::{
    config::SyncConfig,
    error::SyncError,
    session::{DestinationSession, PlaylistRef},
    track::{DestinationTrack, TrackId},
};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Wraps a destination session so every call waits on a shared rate limiter
/// and is retried with exponential backoff on rate limits and transient
/// failures.
pub struct Governed<S> {
    inner: S,
    rate_limiter: DirectRateLimiter,
    backoff: ExponentialBuilder,
}

impl<S: DestinationSession> Governed<S> {
    pub fn new(inner: S, config: &SyncConfig) -> Self {
        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        log::debug!(
            "Rate limiter configured: {} requests per second, {} attempts per call",
            per_second,
            config.max_attempts
        );
        Self {
            inner,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
            backoff: ExponentialBuilder::default()
                .with_min_delay(config.min_delay())
                .with_max_times(config.max_attempts.saturating_sub(1))
                .with_jitter(),
        }
    }

    #[cfg(test)]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn call<T, F, Fut>(&self, what: &str, mut request: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, SyncError>> + Send,
        T: Send,
    {
        let rate_limiter = &self.rate_limiter;
        (move || {
            let pending = request();
            async move {
                rate_limiter.until_ready().await;
                match pending.await {
                    Err(SyncError::RateLimited {
                        retry_after: Some(wait),
                    }) => {
                        log::debug!("Server asked to wait {:?}", wait);
                        tokio::time::sleep(wait).await;
                        Err(SyncError::RateLimited {
                            retry_after: Some(wait),
                        })
                    }
                    other => other,
                }
            }
        })
        .retry(self.backoff.clone())
        .when(SyncError::is_retryable)
        .notify(|err: &SyncError, delay: Duration| {
            log::warn!("{} failed ({}), retrying in {:?}", what, err, delay);
        })
        .await
    }
}

#[async_trait::async_trait]
impl<S: DestinationSession> DestinationSession for Governed<S> {
    async fn check_login(&self) -> Result<bool, SyncError> {
        self.call("check_login", || self.inner.check_login()).await
    }

    async fn list_playlists(&self) -> Result<Vec<PlaylistRef>, SyncError> {
        self.call("list_playlists", || self.inner.list_playlists())
            .await
    }

    async fn search_track(&self, query: &str) -> Result<Vec<DestinationTrack>, SyncError> {
        self.call("search_track", || self.inner.search_track(query))
            .await
    }

    async fn find_track_by_isrc(&self, isrc: &str) -> Result<Option<DestinationTrack>, SyncError> {
        self.call("find_track_by_isrc", || self.inner.find_track_by_isrc(isrc))
            .await
    }

    async fn create_playlist(
        &self,
        name: &str,
        seed: Option<&TrackId>,
    ) -> Result<PlaylistRef, SyncError> {
        self.call("create_playlist", || self.inner.create_playlist(name, seed))
            .await
    }

    async fn get_playlist_tracks(&self, playlist: &PlaylistRef) -> Result<Vec<TrackId>, SyncError> {
        self.call("get_playlist_tracks", || {
            self.inner.get_playlist_tracks(playlist)
        })
        .await
    }

    async fn insert_track(
        &self,
        playlist: &PlaylistRef,
        track: &TrackId,
        position: usize,
    ) -> Result<(), SyncError> {
        self.call("insert_track", || {
            self.inner.insert_track(playlist, track, position)
        })
        .await
    }

    async fn remove_track(&self, playlist: &PlaylistRef, position: usize) -> Result<(), SyncError> {
        self.call("remove_track", || self.inner.remove_track(playlist, position))
            .await
    }

    async fn move_track(&self, playlist: &PlaylistRef, from: usize, to: usize) -> Result<(), SyncError> {
        self.call("move_track", || self.inner.move_track(playlist, from, to))
            .await
    }

    async fn get_favorite_track_ids(&self) -> Result<BTreeSet<TrackId>, SyncError> {
        self.call("get_favorite_track_ids", || {
            self.inner.get_favorite_track_ids()
        })
        .await
    }

    async fn add_favorite(&self, track: &TrackId) -> Result<(), SyncError> {
        self.call("add_favorite", || self.inner.add_favorite(track))
            .await
    }

    async fn remove_favorite(&self, track: &TrackId) -> Result<(), SyncError> {
        self.call("remove_favorite", || self.inner.remove_favorite(track))
            .await
    }
}
