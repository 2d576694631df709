use crate::config::{Config, PlaylistMapping};

/// Which playlists a run synchronizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistSelection {
    None,
    /// A single playlist given on the command line.
    Uri(String),
    Configured(Vec<PlaylistMapping>),
    /// Every playlist the source user owns.
    AllOwned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub playlists: PlaylistSelection,
    pub favorites: bool,
}

/// Maps the command line and config onto the syncs to run.
///
/// `sync_favorites` is `Some(true)` for `--sync-favorites`, `Some(false)`
/// for `--no-sync-favorites` and `None` when neither was passed.
pub fn decide(uri: Option<&str>, sync_favorites: Option<bool>, config: &Config) -> RunPlan {
    let by_default = sync_favorites.unwrap_or(config.sync_favorites_default);
    match (uri, sync_favorites) {
        (Some(uri), _) => RunPlan {
            playlists: PlaylistSelection::Uri(uri.to_string()),
            favorites: sync_favorites == Some(true),
        },
        (None, Some(true)) => RunPlan {
            playlists: PlaylistSelection::None,
            favorites: true,
        },
        (None, _) if !config.sync_playlists.is_empty() => RunPlan {
            playlists: PlaylistSelection::Configured(config.sync_playlists.clone()),
            favorites: by_default,
        },
        (None, _) => RunPlan {
            playlists: PlaylistSelection::AllOwned,
            favorites: by_default,
        },
    }
}
