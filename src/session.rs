use std::collections::BTreeSet;

use crate::{
    error::SyncError,
    track::{DestinationTrack, Track, TrackId},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistRef {
    pub id: String,
    pub name: String,
}

/// A source playlist as handed to the synchronizer. `name` is the name the
/// destination playlist is resolved by.
#[derive(Debug, Clone)]
pub struct SourcePlaylist {
    pub name: String,
    pub tracks: Vec<Track>,
}

/// Read-only view of the authoritative service.
#[async_trait::async_trait]
pub trait SourceSession: Send + Sync {
    async fn list_playlists(&self) -> Result<Vec<PlaylistRef>, SyncError>;

    /// Looks a single playlist up by id or URI.
    async fn playlist(&self, id: &str) -> Result<PlaylistRef, SyncError>;

    async fn get_playlist_tracks(&self, playlist: &PlaylistRef) -> Result<Vec<Track>, SyncError>;

    /// Saved tracks, most recently saved first.
    async fn get_favorite_tracks(&self) -> Result<Vec<Track>, SyncError>;
}

/// The mutable target service. Positions are 0-based indices into the
/// playlist's current ordered contents.
#[async_trait::async_trait]
pub trait DestinationSession: Send + Sync {
    async fn check_login(&self) -> Result<bool, SyncError>;

    async fn list_playlists(&self) -> Result<Vec<PlaylistRef>, SyncError>;

    async fn search_track(&self, query: &str) -> Result<Vec<DestinationTrack>, SyncError>;

    async fn find_track_by_isrc(&self, isrc: &str) -> Result<Option<DestinationTrack>, SyncError>;

    /// Creates an empty playlist, or one holding just `seed` for
    /// destinations that can't create empty playlists.
    async fn create_playlist(
        &self,
        name: &str,
        seed: Option<&TrackId>,
    ) -> Result<PlaylistRef, SyncError>;

    async fn get_playlist_tracks(&self, playlist: &PlaylistRef) -> Result<Vec<TrackId>, SyncError>;

    async fn insert_track(
        &self,
        playlist: &PlaylistRef,
        track: &TrackId,
        position: usize,
    ) -> Result<(), SyncError>;

    async fn remove_track(&self, playlist: &PlaylistRef, position: usize) -> Result<(), SyncError>;

    /// Removes the item at `from` and re-inserts it at `to` of the shortened
    /// list. Destinations without a native move fall back to remove + insert.
    ///
    /// Once the removal has landed the call must not be repeated, so a
    /// failed re-insert is reported as a [`SyncError::MutationFailure`].
    async fn move_track(
        &self,
        playlist: &PlaylistRef,
        from: usize,
        to: usize,
    ) -> Result<(), SyncError> {
        let current = self.get_playlist_tracks(playlist).await?;
        let track = current
            .get(from)
            .cloned()
            .ok_or_else(|| SyncError::MutationFailure(format!("no item at position {from}")))?;
        self.remove_track(playlist, from).await?;
        match self.insert_track(playlist, &track, to).await {
            Err(SyncError::AuthFailure(reason)) => Err(SyncError::AuthFailure(reason)),
            Err(err) => Err(SyncError::MutationFailure(format!(
                "{track} removed from {from} but not re-inserted at {to}: {err}"
            ))),
            Ok(()) => Ok(()),
        }
    }

    async fn get_favorite_track_ids(&self) -> Result<BTreeSet<TrackId>, SyncError>;

    async fn add_favorite(&self, track: &TrackId) -> Result<(), SyncError>;

    async fn remove_favorite(&self, track: &TrackId) -> Result<(), SyncError>;
}
