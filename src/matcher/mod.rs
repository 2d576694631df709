pub mod normalize;
pub mod score;

use crate::{
    config::MatchConfig,
    error::SyncError,
    session::DestinationSession,
    track::{DestinationTrack, MatchCandidate, MatchMethod, Track},
};

/// Scores closer than this are treated as a tie.
const TIE_EPSILON: f64 = 1e-9;

/// Resolves a source track to at most one destination track.
///
/// Lookups go straight to the session it is handed; retrying is the
/// caller's business, which keeps the matcher deterministic against fakes.
pub struct TrackMatcher {
    config: MatchConfig,
}

impl TrackMatcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    /// `Ok(None)` is the normal "no match" outcome; `Err` only surfaces
    /// session failures.
    pub async fn resolve(
        &self,
        track: &Track,
        destination: &dyn DestinationSession,
    ) -> Result<Option<MatchCandidate>, SyncError> {
        if !track.has_usable_metadata() {
            log::debug!("Skipping track without usable metadata: {:?}", track);
            return Ok(None);
        }

        if let Some(isrc) = track.isrc.as_deref().map(str::trim).filter(|i| !i.is_empty()) {
            match destination.find_track_by_isrc(isrc).await {
                Ok(Some(found)) => {
                    return Ok(Some(MatchCandidate {
                        track: found,
                        confidence: 1.0,
                        method: MatchMethod::Isrc,
                    }))
                }
                Ok(None) | Err(SyncError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }

        let query = search_query(track);
        let results = match destination.search_track(&query).await {
            Ok(results) => results,
            Err(SyncError::NotFound(_)) => Vec::new(),
            Err(err) => return Err(err),
        };
        Ok(self.best_candidate(track, results))
    }

    /// Picks the highest scoring result above the acceptance threshold.
    /// Ties go to the candidate whose album also matches, then to the
    /// earlier search result.
    pub fn best_candidate(
        &self,
        source: &Track,
        results: Vec<DestinationTrack>,
    ) -> Option<MatchCandidate> {
        let mut best: Option<(f64, bool, DestinationTrack)> = None;

        for result in results {
            let Some(confidence) = score::score(source, &result.track, &self.config) else {
                continue;
            };
            if confidence < self.config.min_confidence {
                continue;
            }
            let album = score::album_matches(source, &result.track);
            let better = match &best {
                None => true,
                Some((best_confidence, best_album, _)) => {
                    confidence > best_confidence + TIE_EPSILON
                        || ((confidence - best_confidence).abs() <= TIE_EPSILON
                            && album
                            && !best_album)
                }
            };
            if better {
                best = Some((confidence, album, result));
            }
        }

        best.map(|(confidence, _, track)| MatchCandidate {
            track,
            confidence,
            method: MatchMethod::Fuzzy,
        })
    }
}

/// Primary artist followed by the simplified title.
pub fn search_query(track: &Track) -> String {
    let title = normalize::simplify(&track.title);
    let title = if title.is_empty() {
        normalize::normalize(&track.title)
    } else {
        title
    };
    match track.primary_artist() {
        Some(artist) => format!("{} {}", normalize::normalize(artist), title),
        None => title,
    }
}
