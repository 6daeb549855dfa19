//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory DB, a recording host
//! refresher and a full [`AppContext`]. The [`TestHarness::with_server`]
//! constructors start Axum on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use sw_core::config::Config;
use sw_core::ItemId;
use sw_db::pool::{init_memory_pool, DbPool};
use sw_server::context::AppContext;
use sw_server::refresh::HostRefresher;
use sw_server::router::build_router;

pub const API_KEY: &str = "test-admin-key";

/// Host refresher that remembers every item it was asked to refresh.
#[derive(Default)]
pub struct RecordingRefresher {
    calls: Mutex<Vec<ItemId>>,
}

impl RecordingRefresher {
    pub fn calls(&self) -> Vec<ItemId> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl HostRefresher for RecordingRefresher {
    async fn refresh_item(&self, item_id: ItemId) {
        self.calls.lock().push(item_id);
    }
}

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory database.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub refresher: Arc<RecordingRefresher>,
}

impl TestHarness {
    /// Create a new harness with default configuration and in-memory DB.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new harness with a custom configuration and in-memory DB.
    pub fn with_config(config: Config) -> Self {
        let db = init_memory_pool().expect("failed to create in-memory pool");
        let refresher = Arc::new(RecordingRefresher::default());
        let ctx = AppContext::with_refresher(config, db.clone(), refresher.clone());
        Self { ctx, db, refresher }
    }

    /// Config with auth enabled under [`API_KEY`].
    pub fn auth_config() -> Config {
        let mut config = Config::default();
        config.auth.enabled = true;
        config.auth.api_key = Some(API_KEY.into());
        config
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::with_server_config(Config::default()).await
    }

    /// Start an Axum server with custom config on a random port.
    pub async fn with_server_config(config: Config) -> (Self, SocketAddr) {
        let harness = Self::with_config(config);
        let app = build_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> sw_db::pool::PooledConnection {
        sw_db::pool::get_conn(&self.db).expect("failed to get db connection")
    }

    /// Insert a segment directly, bypassing the HTTP layer.
    pub fn add_segment(&self, item: &str, start: f64, end: f64, reason: Option<&str>) -> i64 {
        let item: ItemId = item.parse().expect("valid item id");
        sw_db::queries::segments::add_segment(&self.conn(), item, start, end, reason)
            .expect("insert segment")
            .id
            .get()
    }
}
