//! Native playback monitor (`skipwarden watch`).
//!
//! Drives the skip engine against a Jellyfin playback session, without a
//! browser: the session API stands in for the page and the video element.

pub mod driver;
pub mod fetch;
pub mod remote;

pub use driver::{Feedback, Watcher};
pub use fetch::{SegmentClient, SegmentSource};
pub use remote::{JellyfinPlayer, Player, SessionInfo};

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use sw_core::config::Config;
use sw_engine::FilePreferences;

/// Build the runtime from config and run it until `cancel` fires.
pub async fn run(config: Config, cancel: CancellationToken) -> Result<()> {
    let jellyfin = config
        .primary_jellyfin()
        .context("no enabled Jellyfin server configured under \"jellyfins\"")?;

    let player = Arc::new(JellyfinPlayer::new(jellyfin)?);
    let source = Arc::new(SegmentClient::new(&config.monitor)?);
    let prefs = Arc::new(FilePreferences::new(
        &config.monitor.preferences_path,
        config.engine.preference_key.clone(),
    ));

    tracing::info!(
        jellyfin = %jellyfin.name,
        server = %config.monitor.server_url,
        preferences = %config.monitor.preferences_path.display(),
        "Starting playback monitor"
    );

    Watcher::new(&config.engine, config.monitor.clone(), player, source, prefs)
        .run(cancel)
        .await
}
