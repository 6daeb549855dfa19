//! Loading an item's segments from the skipwarden server.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use sw_core::config::MonitorConfig;
use sw_core::ItemId;
use sw_engine::SkipRange;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait SegmentSource: Send + Sync {
    async fn segments(&self, item: ItemId) -> Result<Vec<SkipRange>>;
}

/// Calls `GET /segments/{itemId}`.
#[derive(Clone)]
pub struct SegmentClient {
    http: Client,
    base: String,
    api_key: Option<String>,
}

impl SegmentClient {
    pub fn new(config: &MonitorConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .context("building segment HTTP client")?;
        Ok(Self {
            http,
            base: config.server_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl SegmentSource for SegmentClient {
    async fn segments(&self, item: ItemId) -> Result<Vec<SkipRange>> {
        let mut req = self.http.get(format!("{}/segments/{item}", self.base));
        if let Some(ref key) = self.api_key {
            req = req.header("X-Emby-Token", key);
        }
        let resp = req.send().await.context("requesting segments")?;
        if !resp.status().is_success() {
            bail!("segment server returned {}", resp.status());
        }
        resp.json().await.context("decoding segments")
    }
}
