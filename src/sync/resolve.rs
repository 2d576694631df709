use std::collections::HashMap;

use futures::{stream, StreamExt};
use tokio::sync::Mutex;

use crate::{
    error::SyncError,
    matcher::{normalize::normalize, TrackMatcher},
    session::DestinationSession,
    track::{MatchCandidate, Track, TrackId},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Isrc(String),
    Metadata {
        title: String,
        artists: Vec<String>,
        album: String,
        duration: u32,
    },
}

impl CacheKey {
    fn of(track: &Track) -> Self {
        match track.isrc.as_deref().map(str::trim) {
            Some(isrc) if !isrc.is_empty() => Self::Isrc(isrc.to_uppercase()),
            _ => Self::Metadata {
                title: normalize(&track.title),
                artists: track.artists.iter().map(|a| normalize(a)).collect(),
                album: normalize(&track.album),
                duration: track.duration,
            },
        }
    }
}

/// Resolutions already made during this run, including definite misses.
/// Lives only as long as the process.
#[derive(Default)]
pub struct MatchCache {
    entries: Mutex<HashMap<CacheKey, Option<MatchCandidate>>>,
}

impl MatchCache {
    async fn get(&self, track: &Track) -> Option<Option<MatchCandidate>> {
        self.entries.lock().await.get(&CacheKey::of(track)).cloned()
    }

    async fn insert(&self, track: &Track, resolution: Option<MatchCandidate>) {
        self.entries
            .lock()
            .await
            .insert(CacheKey::of(track), resolution);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[derive(Debug)]
enum Resolution {
    Matched(MatchCandidate),
    Unmatched,
    Failed(String),
}

/// Destination IDs for a list of source tracks, in source order, with
/// unmatched tracks dropped.
#[derive(Debug, Default)]
pub struct Resolved {
    pub ids: Vec<TrackId>,
    pub matched: usize,
    /// Includes lookups that failed after retries.
    pub unmatched: usize,
    pub errors: Vec<String>,
}

async fn resolve_one(
    matcher: &TrackMatcher,
    cache: &MatchCache,
    destination: &dyn DestinationSession,
    track: &Track,
) -> Result<Resolution, SyncError> {
    if let Some(cached) = cache.get(track).await {
        return Ok(cached.map_or(Resolution::Unmatched, Resolution::Matched));
    }
    match matcher.resolve(track, destination).await {
        Ok(found) => {
            cache.insert(track, found.clone()).await;
            Ok(found.map_or(Resolution::Unmatched, Resolution::Matched))
        }
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            log::warn!("Lookup for {} failed: {}", track, err);
            Ok(Resolution::Failed(format!("lookup for {} failed: {}", track, err)))
        }
    }
}

/// Resolves `tracks` with at most `concurrency` lookups in flight.
pub async fn resolve_tracks(
    matcher: &TrackMatcher,
    cache: &MatchCache,
    destination: &dyn DestinationSession,
    tracks: &[Track],
    concurrency: usize,
) -> Result<Resolved, SyncError> {
    let resolutions: Vec<Result<Resolution, SyncError>> = stream::iter(tracks)
        .map(|track| resolve_one(matcher, cache, destination, track))
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut resolved = Resolved::default();
    for (track, resolution) in tracks.iter().zip(resolutions) {
        match resolution? {
            Resolution::Matched(candidate) => {
                log::debug!(
                    "Matched {} => {} ({:?}, {:.2})",
                    track,
                    candidate.track.track,
                    candidate.method,
                    candidate.confidence
                );
                resolved.matched += 1;
                resolved.ids.push(candidate.track.id);
            }
            Resolution::Unmatched => {
                log::info!("No match found for {}", track);
                resolved.unmatched += 1;
            }
            Resolution::Failed(message) => {
                resolved.unmatched += 1;
                resolved.errors.push(message);
            }
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::MatchConfig,
        test_utils::{destination_track, track, FakeDestination},
    };

    fn catalog() -> FakeDestination {
        FakeDestination::with_catalog(vec![
            destination_track("1", "One", "Band", 180),
            destination_track("2", "Two", "Band", 200),
            destination_track("3", "Three", "Band", 220),
        ])
    }

    #[tokio::test]
    async fn keeps_source_order_and_drops_unmatched() {
        let destination = catalog();
        let matcher = TrackMatcher::new(MatchConfig::default());
        let cache = MatchCache::default();
        let tracks = vec![
            track("Three", "Band", 220),
            track("Missing", "Nobody", 100),
            track("One", "Band", 180),
            track("Two", "Band", 200),
        ];

        let resolved = resolve_tracks(&matcher, &cache, &destination, &tracks, 3)
            .await
            .unwrap();
        assert_eq!(
            resolved.ids,
            vec![TrackId::new("3"), TrackId::new("1"), TrackId::new("2")]
        );
        assert_eq!(resolved.matched, 3);
        assert_eq!(resolved.unmatched, 1);
        assert!(resolved.errors.is_empty());
    }

    #[tokio::test]
    async fn repeated_tracks_are_looked_up_once() {
        let destination = catalog();
        let matcher = TrackMatcher::new(MatchConfig::default());
        let cache = MatchCache::default();
        let tracks = vec![track("One", "Band", 180), track("Missing", "Nobody", 100)];

        resolve_tracks(&matcher, &cache, &destination, &tracks, 1).await.unwrap();
        resolve_tracks(&matcher, &cache, &destination, &tracks, 1).await.unwrap();

        assert_eq!(destination.search_calls(), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn failed_lookups_degrade_to_unmatched_and_are_not_cached() {
        let destination = catalog();
        destination.fail_next_searches(1, || SyncError::Transient("timeout".into()));
        let matcher = TrackMatcher::new(MatchConfig::default());
        let cache = MatchCache::default();
        let tracks = vec![track("One", "Band", 180)];

        let resolved = resolve_tracks(&matcher, &cache, &destination, &tracks, 1)
            .await
            .unwrap();
        assert_eq!(resolved.unmatched, 1);
        assert_eq!(resolved.errors.len(), 1);
        assert_eq!(cache.len().await, 0);

        let resolved = resolve_tracks(&matcher, &cache, &destination, &tracks, 1)
            .await
            .unwrap();
        assert_eq!(resolved.ids, vec![TrackId::new("1")]);
    }

    #[tokio::test]
    async fn auth_failure_aborts_resolution() {
        let destination = catalog();
        destination.fail_next_searches(1, || SyncError::AuthFailure("expired".into()));
        let matcher = TrackMatcher::new(MatchConfig::default());
        let result = resolve_tracks(
            &matcher,
            &MatchCache::default(),
            &destination,
            &[track("One", "Band", 180)],
            1,
        )
        .await;
        assert!(matches!(result, Err(SyncError::AuthFailure(_))));
    }
}
