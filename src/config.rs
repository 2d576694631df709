use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync_favorites_default: bool,
    pub spotify: SpotifyConfig,
    pub plex: PlexConfig,
    pub sync_playlists: Vec<PlaylistMapping>,
    pub matching: MatchConfig,
    pub sync: SyncConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync_favorites_default: true,
            spotify: SpotifyConfig::default(),
            plex: PlexConfig::default(),
            sync_playlists: Vec::new(),
            matching: MatchConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: "http://localhost:8888/callback".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlexConfig {
    pub url: Option<String>,
    pub token: Option<String>,
}

/// One `[[sync_playlists]]` entry. Without `plex_name` the Spotify playlist
/// name is used.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaylistMapping {
    pub spotify_id: String,
    pub plex_name: Option<String>,
}

/// Scoring policy for fuzzy matches.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub min_confidence: f64,
    pub title_weight: f64,
    pub artist_weight: f64,
    pub duration_weight: f64,
    pub strong_duration_secs: u32,
    pub max_duration_secs: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            title_weight: 0.5,
            artist_weight: 0.3,
            duration_weight: 0.2,
            strong_duration_secs: 2,
            max_duration_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub lookup_concurrency: usize,
    pub playlist_concurrency: usize,
    pub requests_per_second: u32,
    pub max_attempts: usize,
    pub min_delay_ms: u64,
    pub remove_favorites: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            lookup_concurrency: 8,
            playlist_concurrency: 2,
            requests_per_second: 10,
            max_attempts: 3,
            min_delay_ms: 500,
            remove_favorites: true,
        }
    }
}

impl SyncConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&contents)
            .context(format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Loads `path` if it exists, then applies environment overrides.
    pub fn load(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            log::warn!(
                "Config file {} not found, falling back to environment variables",
                path.display()
            );
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(id) = var("SPOTIFY_CLIENT_ID") {
            self.spotify.client_id = Some(id);
        }
        let secret = var("SPOTIFY_SECRET_TOKEN").or_else(|| var("SPOTIFY_CLIENT_SECRET"));
        if let Some(secret) = secret {
            self.spotify.client_secret = Some(secret);
        }
        if let Some(uri) = var("SPOTIFY_REDIRECT_URI") {
            self.spotify.redirect_uri = uri;
        }
        if let Some(url) = var("PLEX_URL") {
            self.plex.url = Some(url);
        }
        if let Some(token) = var("PLEX_TOKEN") {
            self.plex.token = Some(token);
        }
    }

    pub fn spotify_credentials(&self) -> Result<(String, String)> {
        let id = self
            .spotify
            .client_id
            .clone()
            .context("SPOTIFY_CLIENT_ID not set")?;
        let secret = self
            .spotify
            .client_secret
            .clone()
            .context("SPOTIFY_SECRET_TOKEN (or SPOTIFY_CLIENT_SECRET) not set")?;
        Ok((id, secret))
    }

    pub fn plex_credentials(&self) -> Result<(String, String)> {
        let url = self.plex.url.clone().context("PLEX_URL not set")?;
        let token = self.plex.token.clone().context("PLEX_TOKEN not set")?;
        Ok((url.trim_end_matches('/').to_string(), token))
    }
}
