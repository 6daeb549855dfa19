//! Segment provider adapter.
//!
//! Publishes stored segments in the media host's native segment format so
//! the host's own player offers to skip them, and tells the host when an
//! item's segments change.

use std::sync::Arc;

use serde::Serialize;

use sw_core::{ItemId, ItemKind};
use sw_db::pool::DbPool;

use crate::refresh::HostRefresher;

/// Host segment category the ranges are published under. The host has no
/// dedicated "restricted" type, so the commercial-break type is reused.
pub const SEGMENT_CATEGORY: &str = "Commercial";

/// A segment in the host's format.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct HostSegment {
    pub item_id: String,
    pub start_ticks: i64,
    pub end_ticks: i64,
    pub category: String,
}

pub struct SegmentProvider {
    db: DbPool,
    refresher: Arc<dyn HostRefresher>,
}

impl SegmentProvider {
    /// Name the provider registers under on the host.
    pub const NAME: &'static str = "Skipwarden";

    pub fn new(db: DbPool, refresher: Arc<dyn HostRefresher>) -> Self {
        Self { db, refresher }
    }

    /// Only movies and episodes carry skip segments.
    pub fn supports(kind: ItemKind) -> bool {
        kind.supports_segments()
    }

    /// Stored segments for `item_id` as host segments, in start order.
    ///
    /// Never fails: a store error yields an empty list so the host's
    /// playback is unaffected.
    pub fn get_segments(&self, item_id: ItemId) -> Vec<HostSegment> {
        let segments = sw_db::pool::get_conn(&self.db)
            .and_then(|conn| sw_db::queries::segments::list_by_item(&conn, item_id));

        match segments {
            Ok(segments) => segments
                .iter()
                .map(|s| HostSegment {
                    item_id: item_id.simple(),
                    start_ticks: sw_core::seconds_to_ticks(s.start),
                    end_ticks: sw_core::seconds_to_ticks(s.end),
                    category: SEGMENT_CATEGORY.to_string(),
                })
                .collect(),
            Err(e) => {
                tracing::error!(item = %item_id, error = %e, "Failed to read segments for host");
                Vec::new()
            }
        }
    }

    /// Ask the host to re-run its segment providers for `item_id`.
    pub async fn notify_changed(&self, item_id: ItemId) {
        self.refresher.refresh_item(item_id).await;
    }
}
