//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for the server, auth, host connections, the skip engine, the
//! served client script and the native monitor. Every section defaults
//! sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub jellyfins: Vec<JellyfinConfig>,
    pub engine: EngineConfig,
    pub client: ClientConfig,
    pub monitor: MonitorConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Load configuration strictly: a missing or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// The first enabled Jellyfin connection, if any.
    pub fn primary_jellyfin(&self) -> Option<&JellyfinConfig> {
        self.jellyfins.iter().find(|j| j.enabled)
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.auth.enabled && self.auth.api_key.as_deref().map_or(true, str::is_empty) {
            warnings.push(
                "auth is enabled but api_key is not set; elevated routes will reject every request"
                    .into(),
            );
        }

        for (i, jf) in self.jellyfins.iter().enumerate() {
            if jf.url.is_empty() {
                warnings.push(format!("jellyfins[{i}].url is empty"));
            }
            if jf.api_key.is_empty() {
                warnings.push(format!("jellyfins[{i}].api_key is empty"));
            }
            if !jf.refresh_path.contains("{item_id}") {
                warnings.push(format!(
                    "jellyfins[{i}].refresh_path has no {{item_id}} placeholder"
                ));
            }
        }

        let e = &self.engine;
        if e.skip_buffer_secs < 0.0 || !e.skip_buffer_secs.is_finite() {
            warnings.push("engine.skip_buffer_secs must be a non-negative number".into());
        }
        if !(500..=10_000).contains(&e.cooldown_ms) {
            warnings.push(format!(
                "engine.cooldown_ms {} is outside the recommended 500..=10000 range",
                e.cooldown_ms
            ));
        }
        if e.address_poll_ms == 0 || e.scan_interval_ms == 0 {
            warnings.push("engine poll intervals must be greater than zero".into());
        }

        if let Some(ref path) = self.client.script_path {
            if !path.exists() {
                warnings.push(format!(
                    "client.script_path {} does not exist; the embedded script will be served",
                    path.display()
                ));
            }
        }

        if self.monitor.poll_ms == 0 {
            warnings.push("monitor.poll_ms must be greater than zero".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// Externally visible base URL, used when building the script tag.
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            db_path: PathBuf::from("./data/skipwarden.db"),
            public_url: None,
        }
    }
}

/// Authentication settings for elevated (write/admin) routes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
}

/// Configuration for a Jellyfin server connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JellyfinConfig {
    pub name: String,
    pub url: String,
    pub api_key: String,
    #[serde(default)]
    pub enabled: bool,
    /// Path template for the per-item refresh call; `{item_id}` is replaced.
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
}

fn default_refresh_path() -> String {
    "/Items/{item_id}/Refresh?metadataRefreshMode=Default&imageRefreshMode=None\
     &replaceAllMetadata=false&replaceAllImages=false"
        .into()
}

impl JellyfinConfig {
    /// Build the refresh URL for one item.
    pub fn refresh_url(&self, item_id: &str) -> String {
        format!(
            "{}{}",
            self.url.trim_end_matches('/'),
            self.refresh_path.replace("{item_id}", item_id)
        )
    }
}

/// Skip-engine tunables, shared by the native monitor and the served script.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds past a segment's end the seek lands on.
    pub skip_buffer_secs: f64,
    /// How long position checks stay suppressed after a skip.
    pub cooldown_ms: u64,
    /// How long the skip notice stays visible.
    pub notice_ms: u64,
    /// Announce each skip with a notice.
    pub show_notice: bool,
    pub address_poll_ms: u64,
    pub scan_interval_ms: u64,
    pub default_reason: String,
    pub preference_key: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            skip_buffer_secs: 0.5,
            cooldown_ms: 1500,
            notice_ms: 3000,
            show_notice: true,
            address_poll_ms: 1000,
            scan_interval_ms: 2000,
            default_reason: crate::DEFAULT_REASON.into(),
            preference_key: "skipwarden.enabled".into(),
        }
    }
}

impl EngineConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn notice_duration(&self) -> Duration {
        Duration::from_millis(self.notice_ms)
    }
}

/// Served client script settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Serve this file instead of the embedded script.
    pub script_path: Option<PathBuf>,
}

/// Native playback monitor (`skipwarden watch`) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Base URL of the skipwarden server segments are fetched from.
    pub server_url: String,
    /// Sent as `X-Emby-Token` to the skipwarden server when set.
    pub api_key: Option<String>,
    pub poll_ms: u64,
    /// Only follow sessions on this device.
    pub device_name: Option<String>,
    /// A position jump larger than this between polls counts as a user seek.
    pub seek_jump_secs: f64,
    pub preferences_path: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".into(),
            api_key: None,
            poll_ms: 500,
            device_name: None,
            seek_jump_secs: 3.0,
            preferences_path: PathBuf::from("./data/preferences.json"),
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}
