use crate::{
    error::SyncError,
    session::{DestinationSession, PlaylistRef, SourcePlaylist},
    track::TrackId,
};

use super::{
    plan::{SyncOp, SyncPlan},
    SyncReport, Synchronizer,
};

/// First playlist whose name matches `name`, ignoring case.
pub fn find_playlist<'a>(name: &str, existing: &'a [PlaylistRef]) -> Option<&'a PlaylistRef> {
    let wanted = name.trim().to_lowercase();
    existing
        .iter()
        .find(|p| p.name.trim().to_lowercase() == wanted)
}

/// Reuses the destination playlist called `name`, creating it when missing.
/// A new playlist is seeded with `first`, the first track it should hold.
pub async fn resolve_playlist(
    name: &str,
    first: Option<&TrackId>,
    destination: &dyn DestinationSession,
) -> Result<PlaylistRef, SyncError> {
    let existing = destination.list_playlists().await?;
    if let Some(found) = find_playlist(name, &existing) {
        log::debug!("Reusing playlist {:?} ({})", found.name, found.id);
        return Ok(found.clone());
    }
    log::info!("Creating playlist {:?}", name);
    destination.create_playlist(name, first).await
}

impl Synchronizer {
    /// Makes the destination playlist named after `playlist` hold exactly
    /// its matched tracks, in source order.
    ///
    /// Only an authentication failure is returned as an error; anything
    /// else is recorded in the report.
    pub async fn sync_playlist(
        &self,
        playlist: &SourcePlaylist,
        destination: &dyn DestinationSession,
    ) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::new(&playlist.name);
        if self.cancelled(&mut report) {
            return Ok(report);
        }

        let resolved = self.resolve(&playlist.tracks, destination).await?;
        report.record(&resolved);

        let target = match resolve_playlist(&playlist.name, resolved.ids.first(), destination).await
        {
            Ok(target) => target,
            Err(err) => {
                report.fail("could not resolve destination playlist", err)?;
                return Ok(report);
            }
        };
        let current = match destination.get_playlist_tracks(&target).await {
            Ok(current) => current,
            Err(err) => {
                report.fail("could not read destination playlist", err)?;
                return Ok(report);
            }
        };

        let plan = SyncPlan::diff(&current, &resolved.ids);
        let (removals, moves, inserts) = plan.counts();
        log::info!(
            "{}: {} removals, {} moves, {} insertions",
            playlist.name,
            removals,
            moves,
            inserts
        );

        self.apply_plan(&target, &plan, destination, &mut report)
            .await?;
        Ok(report)
    }

    /// Applies `plan` strictly in order. A failed operation is recorded and
    /// the rest are still attempted.
    async fn apply_plan(
        &self,
        target: &PlaylistRef,
        plan: &SyncPlan,
        destination: &dyn DestinationSession,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        for op in plan.ops() {
            if self.cancelled(report) {
                log::warn!("{}: cancelled with operations pending", report.name);
                break;
            }
            log::debug!("{}: {:?}", report.name, op);
            let result = match op {
                SyncOp::Insert { track, position } => {
                    destination.insert_track(target, track, *position).await
                }
                SyncOp::Remove { position } => destination.remove_track(target, *position).await,
                SyncOp::Move { from, to } => destination.move_track(target, *from, *to).await,
            };
            match result {
                Ok(()) => report.operations_applied += 1,
                Err(err) => report.fail(&format!("{op:?}"), err)?,
            }
        }
        Ok(())
    }
}
