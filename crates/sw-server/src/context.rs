//! Application context shared by all route handlers via Axum state.

use std::sync::Arc;

use sw_core::config::Config;
use sw_db::pool::DbPool;

use crate::provider::SegmentProvider;
use crate::refresh::{HostRefresher, JellyfinRefresher, NoopRefresher};
use crate::script::ClientScript;

/// Cheap to clone: every field is an `Arc` or a pool handle.
#[derive(Clone)]
pub struct AppContext {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub provider: Arc<SegmentProvider>,
    pub client_script: Arc<ClientScript>,
}

impl AppContext {
    /// Build the context, choosing the Jellyfin refresher when at least one
    /// enabled host is configured.
    pub fn new(config: Config, db: DbPool) -> Self {
        let refresher: Arc<dyn HostRefresher> = if config.primary_jellyfin().is_some() {
            let jellyfin = JellyfinRefresher::new(config.jellyfins.clone());
            tracing::info!(hosts = jellyfin.host_count(), "Host refresh enabled");
            Arc::new(jellyfin)
        } else {
            tracing::info!("No Jellyfin host configured; segment changes will not be pushed");
            Arc::new(NoopRefresher)
        };
        Self::with_refresher(config, db, refresher)
    }

    /// Build the context around an explicit refresher.
    pub fn with_refresher(config: Config, db: DbPool, refresher: Arc<dyn HostRefresher>) -> Self {
        let client_script = Arc::new(ClientScript::load(&config.client));
        Self {
            provider: Arc::new(SegmentProvider::new(db.clone(), refresher)),
            db,
            config: Arc::new(config),
            client_script,
        }
    }
}
