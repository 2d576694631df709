mod config;
mod error;
mod matcher;
mod plex;
mod retry;
mod selection;
mod session;
mod spotify;
mod sync;
#[cfg(test)]
mod test_utils;
mod track;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use futures::{stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    error::SyncError,
    matcher::TrackMatcher,
    plex::{client::Plex, PlexSession},
    retry::Governed,
    selection::{PlaylistSelection, RunPlan},
    session::{DestinationSession, PlaylistRef, SourcePlaylist, SourceSession},
    spotify::SpotifySession,
    sync::{SyncReport, Synchronizer},
};

/// Mirror Spotify playlists and saved tracks into a Plex music library
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Sync only this Spotify playlist (id, URI or link)
    #[arg(short, long)]
    uri: Option<String>,

    /// Sync saved tracks to Plex favorites
    #[arg(long, overrides_with = "no_sync_favorites")]
    sync_favorites: bool,

    /// Don't sync saved tracks
    #[arg(long, overrides_with = "sync_favorites")]
    no_sync_favorites: bool,
}

impl Args {
    fn favorites_flag(&self) -> Option<bool> {
        match (self.sync_favorites, self.no_sync_favorites) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// A source playlist and the destination name it syncs into.
type Target = (PlaylistRef, String);

/// Looks up the playlists `selection` names. Playlists that can't be
/// found become failed reports instead of stopping the run.
async fn targets(
    selection: &PlaylistSelection,
    source: &dyn SourceSession,
) -> Result<(Vec<Target>, Vec<SyncReport>), SyncError> {
    let wanted: Vec<(String, Option<String>)> = match selection {
        PlaylistSelection::None => Vec::new(),
        PlaylistSelection::Uri(uri) => vec![(uri.clone(), None)],
        PlaylistSelection::Configured(mappings) => mappings
            .iter()
            .map(|m| (m.spotify_id.clone(), m.plex_name.clone()))
            .collect(),
        PlaylistSelection::AllOwned => {
            let owned = source.list_playlists().await?;
            return Ok((
                owned
                    .into_iter()
                    .map(|p| {
                        let name = p.name.clone();
                        (p, name)
                    })
                    .collect(),
                Vec::new(),
            ));
        }
    };

    let mut found = Vec::new();
    let mut failed = Vec::new();
    for (id, rename) in wanted {
        match source.playlist(&id).await {
            Ok(playlist) => {
                let name = rename.unwrap_or_else(|| playlist.name.clone());
                found.push((playlist, name));
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                log::warn!("Skipping playlist {}: {}", id, err);
                let mut report = SyncReport::new(id);
                report.errors.push(err.to_string());
                failed.push(report);
            }
        }
    }
    Ok((found, failed))
}

async fn sync_target(
    synchronizer: &Synchronizer,
    source: &dyn SourceSession,
    destination: &dyn DestinationSession,
    (playlist, name): Target,
) -> Result<SyncReport, SyncError> {
    let tracks = match source.get_playlist_tracks(&playlist).await {
        Ok(tracks) => tracks,
        Err(err) if err.is_fatal() => return Err(err),
        Err(err) => {
            log::warn!("Could not read {}: {}", playlist.name, err);
            let mut report = SyncReport::new(name);
            report.errors.push(err.to_string());
            return Ok(report);
        }
    };
    log::info!("Syncing {} ({} tracks)", name, tracks.len());
    synchronizer
        .sync_playlist(&SourcePlaylist { name, tracks }, destination)
        .await
}

/// Runs every sync `plan` asks for. Playlists run concurrently, favorites
/// after them.
async fn run(
    plan: &RunPlan,
    synchronizer: &Synchronizer,
    source: &dyn SourceSession,
    destination: &dyn DestinationSession,
    playlist_concurrency: usize,
) -> Result<Vec<SyncReport>, SyncError> {
    let (found, mut reports) = targets(&plan.playlists, source).await?;

    let results: Vec<Result<SyncReport, SyncError>> = stream::iter(found)
        .map(|target| sync_target(synchronizer, source, destination, target))
        .buffer_unordered(playlist_concurrency.max(1))
        .collect()
        .await;
    for result in results {
        reports.push(result?);
    }

    if plan.favorites {
        reports.push(synchronizer.sync_favorites(source, destination).await?);
    }
    Ok(reports)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::load(&args.config)?;
    let plan = selection::decide(args.uri.as_deref(), args.favorites_flag(), &config);
    log::debug!("Run plan: {:?}", plan);

    let (plex_url, plex_token) = config.plex_credentials()?;
    let plex = PlexSession::connect(Plex::new(plex_url, plex_token))
        .await
        .context("could not connect to Plex")?;
    let destination = Governed::new(plex, &config.sync);
    if !destination.check_login().await? {
        anyhow::bail!("Plex rejected the configured token");
    }

    let (client_id, client_secret) = config.spotify_credentials()?;
    let source = SpotifySession::connect(
        &client_id,
        &client_secret,
        config.spotify.redirect_uri.clone(),
    )
    .await
    .context("could not authorize with Spotify")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, stopping after the current operation");
            on_interrupt.cancel();
        }
    });

    let synchronizer = Synchronizer::new(
        TrackMatcher::new(config.matching.clone()),
        config.sync.clone(),
        cancel,
    );
    let reports = run(
        &plan,
        &synchronizer,
        &source,
        &destination,
        config.sync.playlist_concurrency,
    )
    .await?;

    log::info!(
        "{} distinct tracks looked up",
        synchronizer.cache().len().await
    );
    for report in &reports {
        println!("{}", report);
    }
    Ok(())
}
