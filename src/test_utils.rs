//! In-memory sessions for tests.

use std::{
    collections::{BTreeSet, VecDeque},
    sync::Mutex,
};

use tokio_util::sync::CancellationToken;

use crate::{
    error::SyncError,
    matcher::normalize::normalize,
    session::{DestinationSession, PlaylistRef, SourceSession},
    track::{DestinationTrack, Track, TrackId},
};

pub fn track(title: &str, artist: &str, duration: u32) -> Track {
    Track {
        title: title.to_string(),
        artists: if artist.is_empty() {
            Vec::new()
        } else {
            vec![artist.to_string()]
        },
        album: String::new(),
        duration,
        isrc: None,
    }
}

pub fn destination_track(id: &str, title: &str, artist: &str, duration: u32) -> DestinationTrack {
    DestinationTrack {
        id: TrackId::new(id),
        track: track(title, artist, duration),
    }
}

#[derive(Default)]
struct DestinationState {
    catalog: Vec<DestinationTrack>,
    playlists: Vec<(PlaylistRef, Vec<TrackId>)>,
    favorites: BTreeSet<TrackId>,
    search_calls: usize,
    search_failures: VecDeque<SyncError>,
    mutation_failures: usize,
    fail_creation: bool,
    created: usize,
    mutation_log: Vec<String>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl DestinationState {
    fn mutate(&mut self, entry: String) -> Result<(), SyncError> {
        if self.mutation_failures > 0 {
            self.mutation_failures -= 1;
            return Err(SyncError::MutationFailure(format!("{entry} rejected")));
        }
        self.mutation_log.push(entry);
        if let Some((count, cancel)) = &self.cancel_after {
            if self.mutation_log.len() >= *count {
                cancel.cancel();
            }
        }
        Ok(())
    }

    fn items(&mut self, playlist: &PlaylistRef) -> Result<&mut Vec<TrackId>, SyncError> {
        self.playlists
            .iter_mut()
            .find(|(p, _)| p.id == playlist.id)
            .map(|(_, items)| items)
            .ok_or_else(|| SyncError::NotFound(playlist.id.clone()))
    }
}

fn out_of_range(position: usize) -> SyncError {
    SyncError::MutationFailure(format!("position {position} out of range"))
}

#[derive(Default)]
pub struct FakeDestination {
    state: Mutex<DestinationState>,
}

impl FakeDestination {
    pub fn with_catalog(catalog: Vec<DestinationTrack>) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().catalog = catalog;
        fake
    }

    pub fn add_playlist(&self, name: &str, items: Vec<TrackId>) {
        let mut state = self.state.lock().unwrap();
        let id = format!("pl-{}", state.playlists.len());
        state.playlists.push((
            PlaylistRef {
                id,
                name: name.to_string(),
            },
            items,
        ));
    }

    pub fn playlist(&self, name: &str) -> Option<Vec<TrackId>> {
        let state = self.state.lock().unwrap();
        state
            .playlists
            .iter()
            .find(|(p, _)| p.name == name)
            .map(|(_, items)| items.clone())
    }

    pub fn set_favorites(&self, favorites: BTreeSet<TrackId>) {
        self.state.lock().unwrap().favorites = favorites;
    }

    pub fn favorites(&self) -> BTreeSet<TrackId> {
        self.state.lock().unwrap().favorites.clone()
    }

    pub fn fail_next_searches(&self, count: usize, error: impl Fn() -> SyncError) {
        let mut state = self.state.lock().unwrap();
        for _ in 0..count {
            state.search_failures.push_back(error());
        }
    }

    pub fn fail_next_mutations(&self, count: usize) {
        self.state.lock().unwrap().mutation_failures = count;
    }

    /// Cancels `cancel` once `count` mutations have been applied, the way
    /// an interrupt lands in the middle of a run.
    pub fn cancel_after_mutations(&self, count: usize, cancel: CancellationToken) {
        self.state.lock().unwrap().cancel_after = Some((count, cancel));
    }

    pub fn fail_playlist_creation(&self) {
        self.state.lock().unwrap().fail_creation = true;
    }

    pub fn search_calls(&self) -> usize {
        self.state.lock().unwrap().search_calls
    }

    pub fn created_playlists(&self) -> usize {
        self.state.lock().unwrap().created
    }

    pub fn mutation_log(&self) -> Vec<String> {
        self.state.lock().unwrap().mutation_log.clone()
    }
}

#[async_trait::async_trait]
impl DestinationSession for FakeDestination {
    async fn check_login(&self) -> Result<bool, SyncError> {
        Ok(true)
    }

    async fn list_playlists(&self) -> Result<Vec<PlaylistRef>, SyncError> {
        let state = self.state.lock().unwrap();
        Ok(state.playlists.iter().map(|(p, _)| p.clone()).collect())
    }

    async fn search_track(&self, query: &str) -> Result<Vec<DestinationTrack>, SyncError> {
        let mut state = self.state.lock().unwrap();
        state.search_calls += 1;
        if let Some(err) = state.search_failures.pop_front() {
            return Err(err);
        }
        let words: Vec<String> = normalize(query).split(' ').map(str::to_string).collect();
        Ok(state
            .catalog
            .iter()
            .filter(|entry| {
                let haystack = normalize(&format!(
                    "{} {}",
                    entry.track.artists.join(" "),
                    entry.track.title
                ));
                haystack.split(' ').any(|w| words.iter().any(|q| q == w))
            })
            .cloned()
            .collect())
    }

    async fn find_track_by_isrc(&self, isrc: &str) -> Result<Option<DestinationTrack>, SyncError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .catalog
            .iter()
            .find(|entry| entry.track.isrc.as_deref() == Some(isrc))
            .cloned())
    }

    async fn create_playlist(
        &self,
        name: &str,
        seed: Option<&TrackId>,
    ) -> Result<PlaylistRef, SyncError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_creation {
            return Err(SyncError::MutationFailure("playlist creation rejected".into()));
        }
        state.created += 1;
        let playlist = PlaylistRef {
            id: format!("pl-{}", state.playlists.len()),
            name: name.to_string(),
        };
        state
            .playlists
            .push((playlist.clone(), seed.into_iter().cloned().collect()));
        Ok(playlist)
    }

    async fn get_playlist_tracks(&self, playlist: &PlaylistRef) -> Result<Vec<TrackId>, SyncError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.items(playlist)?.clone())
    }

    async fn insert_track(
        &self,
        playlist: &PlaylistRef,
        track: &TrackId,
        position: usize,
    ) -> Result<(), SyncError> {
        let mut state = self.state.lock().unwrap();
        if position > state.items(playlist)?.len() {
            return Err(out_of_range(position));
        }
        state.mutate(format!("insert {track}@{position}"))?;
        state.items(playlist)?.insert(position, track.clone());
        Ok(())
    }

    async fn remove_track(&self, playlist: &PlaylistRef, position: usize) -> Result<(), SyncError> {
        let mut state = self.state.lock().unwrap();
        if position >= state.items(playlist)?.len() {
            return Err(out_of_range(position));
        }
        state.mutate(format!("remove @{position}"))?;
        state.items(playlist)?.remove(position);
        Ok(())
    }

    async fn move_track(&self, playlist: &PlaylistRef, from: usize, to: usize) -> Result<(), SyncError> {
        let mut state = self.state.lock().unwrap();
        let len = state.items(playlist)?.len();
        if from >= len || to >= len {
            return Err(out_of_range(from.max(to)));
        }
        state.mutate(format!("move {from}->{to}"))?;
        let items = state.items(playlist)?;
        let item = items.remove(from);
        items.insert(to, item);
        Ok(())
    }

    async fn get_favorite_track_ids(&self) -> Result<BTreeSet<TrackId>, SyncError> {
        Ok(self.favorites())
    }

    async fn add_favorite(&self, track: &TrackId) -> Result<(), SyncError> {
        let mut state = self.state.lock().unwrap();
        state.mutate(format!("favorite {track}"))?;
        state.favorites.insert(track.clone());
        Ok(())
    }

    async fn remove_favorite(&self, track: &TrackId) -> Result<(), SyncError> {
        let mut state = self.state.lock().unwrap();
        state.mutate(format!("unfavorite {track}"))?;
        state.favorites.remove(track);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSource {
    playlists: Vec<(PlaylistRef, Vec<Track>)>,
    favorites: Vec<Track>,
}

impl FakeSource {
    pub fn with_favorites(favorites: Vec<Track>) -> Self {
        Self {
            favorites,
            ..Self::default()
        }
    }

    pub fn with_playlist(mut self, id: &str, name: &str, tracks: Vec<Track>) -> Self {
        self.playlists.push((
            PlaylistRef {
                id: id.to_string(),
                name: name.to_string(),
            },
            tracks,
        ));
        self
    }
}

#[async_trait::async_trait]
impl SourceSession for FakeSource {
    async fn list_playlists(&self) -> Result<Vec<PlaylistRef>, SyncError> {
        Ok(self.playlists.iter().map(|(p, _)| p.clone()).collect())
    }

    async fn playlist(&self, id: &str) -> Result<PlaylistRef, SyncError> {
        self.playlists
            .iter()
            .map(|(p, _)| p)
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(id.to_string()))
    }

    async fn get_playlist_tracks(&self, playlist: &PlaylistRef) -> Result<Vec<Track>, SyncError> {
        self.playlists
            .iter()
            .find(|(p, _)| p.id == playlist.id)
            .map(|(_, tracks)| tracks.clone())
            .ok_or_else(|| SyncError::NotFound(playlist.id.clone()))
    }

    async fn get_favorite_tracks(&self) -> Result<Vec<Track>, SyncError> {
        Ok(self.favorites.clone())
    }
}
