use std::collections::{BTreeSet, HashSet};

use crate::{
    error::SyncError,
    session::{DestinationSession, SourceSession},
    track::TrackId,
};

use super::{SyncReport, Synchronizer};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct FavoritesDelta {
    /// Oldest source favorite first, without duplicates.
    pub to_add: Vec<TrackId>,
    pub to_remove: Vec<TrackId>,
}

impl FavoritesDelta {
    /// `desired` is in source order, most recently saved first.
    pub fn compute(
        desired: &[TrackId],
        current: &BTreeSet<TrackId>,
        allow_removals: bool,
    ) -> Self {
        let mut seen = HashSet::new();
        let to_add = desired
            .iter()
            .rev()
            .filter(|id| !current.contains(*id) && seen.insert(*id))
            .cloned()
            .collect();

        let to_remove = if allow_removals {
            let wanted: HashSet<&TrackId> = desired.iter().collect();
            current
                .iter()
                .filter(|id| !wanted.contains(id))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        Self { to_add, to_remove }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

impl Synchronizer {
    /// Makes the destination's liked tracks match the source's saved tracks.
    ///
    /// Removals are withheld whenever a source favorite could not be
    /// matched, since its destination counterpart can't be told apart from
    /// a favorite the user dropped.
    pub async fn sync_favorites(
        &self,
        source: &dyn SourceSession,
        destination: &dyn DestinationSession,
    ) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::new("Favorites");
        if self.cancelled(&mut report) {
            return Ok(report);
        }

        let tracks = match source.get_favorite_tracks().await {
            Ok(tracks) => tracks,
            Err(err) => {
                report.fail("could not read source favorites", err)?;
                return Ok(report);
            }
        };
        let resolved = self.resolve(&tracks, destination).await?;
        report.record(&resolved);

        let current = match destination.get_favorite_track_ids().await {
            Ok(current) => current,
            Err(err) => {
                report.fail("could not read destination favorites", err)?;
                return Ok(report);
            }
        };

        let allow_removals = self.config.remove_favorites && resolved.unmatched == 0;
        if self.config.remove_favorites && !allow_removals {
            log::info!(
                "Keeping existing favorites: {} source favorites could not be matched",
                resolved.unmatched
            );
        }
        let delta = FavoritesDelta::compute(&resolved.ids, &current, allow_removals);
        log::info!(
            "Favorites: {} to add, {} to remove",
            delta.to_add.len(),
            delta.to_remove.len()
        );

        for id in &delta.to_add {
            if self.cancelled(&mut report) {
                return Ok(report);
            }
            match destination.add_favorite(id).await {
                Ok(()) => report.operations_applied += 1,
                Err(err) => report.fail(&format!("add favorite {id}"), err)?,
            }
        }
        for id in &delta.to_remove {
            if self.cancelled(&mut report) {
                return Ok(report);
            }
            match destination.remove_favorite(id).await {
                Ok(()) => report.operations_applied += 1,
                Err(err) => report.fail(&format!("remove favorite {id}"), err)?,
            }
        }
        Ok(report)
    }
}
