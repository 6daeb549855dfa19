//! Asking the media host to re-read an item's segments.
//!
//! After every store mutation the host's cached segment view for the item is
//! stale. Refresh calls are awaited by the mutating request but never fail
//! it: errors are logged and swallowed.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use sw_core::config::JellyfinConfig;
use sw_core::ItemId;

/// HTTP timeout for refresh requests.
const REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait HostRefresher: Send + Sync {
    async fn refresh_item(&self, item_id: ItemId);
}

/// Used when no host is configured.
#[derive(Debug, Default)]
pub struct NoopRefresher;

#[async_trait]
impl HostRefresher for NoopRefresher {
    async fn refresh_item(&self, item_id: ItemId) {
        tracing::debug!(item = %item_id, "No media host configured; skipping refresh");
    }
}

/// Refreshes the item on every enabled Jellyfin server.
///
/// Holds a shared [`reqwest::Client`] so connection pools are reused across
/// calls.
pub struct JellyfinRefresher {
    client: Client,
    hosts: Vec<JellyfinConfig>,
}

impl JellyfinRefresher {
    pub fn new(hosts: Vec<JellyfinConfig>) -> Self {
        let client = Client::builder()
            .timeout(REFRESH_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build refresh HTTP client: {e}");
                Client::new()
            });

        Self {
            client,
            hosts: hosts.into_iter().filter(|h| h.enabled).collect(),
        }
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    async fn refresh_on(&self, host: &JellyfinConfig, item_id: ItemId) {
        let url = host.refresh_url(&item_id.simple());

        tracing::debug!(jellyfin = %host.name, item = %item_id, "Requesting segment refresh");

        match self
            .client
            .post(&url)
            .header("X-Emby-Token", &host.api_key)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(
                    jellyfin = %host.name,
                    item = %item_id,
                    "Media host refreshed item segments"
                );
            }
            Ok(resp) if resp.status() == reqwest::StatusCode::NOT_FOUND => {
                tracing::warn!(
                    jellyfin = %host.name,
                    item = %item_id,
                    "Item not found on media host; segments will apply once it is added"
                );
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                tracing::warn!(
                    jellyfin = %host.name,
                    status = %status,
                    body = %body,
                    "Media host refresh returned non-success status"
                );
            }
            Err(e) => {
                tracing::error!(
                    jellyfin = %host.name,
                    error = %e,
                    "Failed to contact media host for refresh"
                );
            }
        }
    }
}

#[async_trait]
impl HostRefresher for JellyfinRefresher {
    async fn refresh_item(&self, item_id: ItemId) {
        for host in &self.hosts {
            self.refresh_on(host, item_id).await;
        }
    }
}
