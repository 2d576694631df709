//! Mirrors source playlists and saved tracks onto the destination.
//!
//! Both flows resolve every source track through the [`TrackMatcher`]
//! (concurrently, through a run-wide cache) and then apply the smallest set
//! of mutations one at a time. Re-running against an unchanged source
//! applies nothing.

pub mod favorites;
pub mod plan;
pub mod playlist;
pub mod resolve;

use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::{
    config::SyncConfig, error::SyncError, matcher::TrackMatcher, session::DestinationSession,
    track::Track,
};

use resolve::{MatchCache, Resolved};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub name: String,
    pub matched: usize,
    pub unmatched: usize,
    pub operations_applied: usize,
    pub errors: Vec<String>,
    pub cancelled: bool,
}

impl SyncReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn record(&mut self, resolved: &Resolved) {
        self.matched += resolved.matched;
        self.unmatched += resolved.unmatched;
        self.errors.extend(resolved.errors.iter().cloned());
    }

    /// Records a non-fatal failure, or hands a fatal one back.
    fn fail(&mut self, context: &str, err: SyncError) -> Result<(), SyncError> {
        if err.is_fatal() {
            return Err(err);
        }
        log::warn!("{}: {}: {}", self.name, context, err);
        self.errors.push(format!("{context}: {err}"));
        Ok(())
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} matched, {} unmatched, {} operations applied, {} errors",
            self.name,
            self.matched,
            self.unmatched,
            self.operations_applied,
            self.errors.len()
        )?;
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

/// Holds everything shared by all syncs of one run.
pub struct Synchronizer {
    matcher: TrackMatcher,
    cache: MatchCache,
    config: SyncConfig,
    cancel: CancellationToken,
}

impl Synchronizer {
    pub fn new(matcher: TrackMatcher, config: SyncConfig, cancel: CancellationToken) -> Self {
        Self {
            matcher,
            cache: MatchCache::default(),
            config,
            cancel,
        }
    }

    pub fn cache(&self) -> &MatchCache {
        &self.cache
    }

    async fn resolve(
        &self,
        tracks: &[Track],
        destination: &dyn DestinationSession,
    ) -> Result<Resolved, SyncError> {
        resolve::resolve_tracks(
            &self.matcher,
            &self.cache,
            destination,
            tracks,
            self.config.lookup_concurrency,
        )
        .await
    }

    fn cancelled(&self, report: &mut SyncReport) -> bool {
        if self.cancel.is_cancelled() {
            report.cancelled = true;
            return true;
        }
        false
    }
}
