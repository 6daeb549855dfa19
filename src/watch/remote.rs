//! Jellyfin session API: the native runtime's view of the player.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use sw_core::config::JellyfinConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One entry of `GET /Sessions`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SessionInfo {
    pub id: String,
    pub device_name: Option<String>,
    pub user_name: Option<String>,
    pub now_playing_item: Option<NowPlaying>,
    pub play_state: Option<PlayState>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NowPlaying {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "Type")]
    pub kind: Option<String>,
    pub media_type: Option<String>,
}

impl NowPlaying {
    pub fn is_video(&self) -> bool {
        if let Some(ref media) = self.media_type {
            return media.eq_ignore_ascii_case("video");
        }
        self.kind
            .as_deref()
            .map(|k| k.parse::<sw_core::ItemKind>().map_or(false, |k| k.is_video()))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PlayState {
    pub position_ticks: Option<i64>,
    pub is_paused: bool,
}

impl SessionInfo {
    /// The now-playing entry, if it is a video.
    pub fn playing_video(&self) -> Option<&NowPlaying> {
        self.now_playing_item.as_ref().filter(|n| n.is_video())
    }

    pub fn position_secs(&self) -> Option<f64> {
        self.play_state
            .as_ref()
            .and_then(|p| p.position_ticks)
            .map(sw_core::ticks_to_seconds)
    }

    pub fn is_paused(&self) -> bool {
        self.play_state.as_ref().is_some_and(|p| p.is_paused)
    }
}

/// The remote player the runtime controls.
#[async_trait]
pub trait Player: Send + Sync {
    async fn sessions(&self) -> Result<Vec<SessionInfo>>;
    async fn seek(&self, session_id: &str, position: f64) -> Result<()>;
    async fn show_notice(&self, session_id: &str, text: &str, duration: Duration) -> Result<()>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct MessageCommand<'a> {
    header: &'a str,
    text: &'a str,
    timeout_ms: u64,
}

/// [`Player`] backed by a Jellyfin server's session endpoints.
#[derive(Clone)]
pub struct JellyfinPlayer {
    http: Client,
    base: String,
    api_key: String,
}

impl JellyfinPlayer {
    pub fn new(config: &JellyfinConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building Jellyfin HTTP client")?;
        Ok(Self {
            http,
            base: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }
}

#[async_trait]
impl Player for JellyfinPlayer {
    async fn sessions(&self) -> Result<Vec<SessionInfo>> {
        let resp = self
            .http
            .get(self.url("/Sessions"))
            .header("X-Emby-Token", &self.api_key)
            .send()
            .await
            .context("requesting sessions")?;
        if !resp.status().is_success() {
            bail!("Jellyfin returned {} for /Sessions", resp.status());
        }
        resp.json().await.context("decoding sessions")
    }

    async fn seek(&self, session_id: &str, position: f64) -> Result<()> {
        let ticks = sw_core::seconds_to_ticks(position);
        let resp = self
            .http
            .post(self.url(&format!("/Sessions/{session_id}/Playing/Seek")))
            .query(&[("seekPositionTicks", ticks)])
            .header("X-Emby-Token", &self.api_key)
            .send()
            .await
            .context("sending seek command")?;
        if !resp.status().is_success() {
            bail!("Jellyfin rejected seek with {}", resp.status());
        }
        Ok(())
    }

    async fn show_notice(&self, session_id: &str, text: &str, duration: Duration) -> Result<()> {
        let body = MessageCommand {
            header: "Skipwarden",
            text,
            timeout_ms: duration.as_millis() as u64,
        };
        let resp = self
            .http
            .post(self.url(&format!("/Sessions/{session_id}/Message")))
            .header("X-Emby-Token", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("sending message command")?;
        if !resp.status().is_success() {
            bail!("Jellyfin rejected message with {}", resp.status());
        }
        Ok(())
    }
}
