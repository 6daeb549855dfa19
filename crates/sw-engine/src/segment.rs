//! Skip ranges as the engine receives them from the segment server.

use serde::{Deserialize, Serialize};
use sw_core::{ItemId, SegmentId};

/// One skip range of the active item.
///
/// Field names follow the server's PascalCase wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SkipRange {
    pub id: SegmentId,
    pub item_id: ItemId,
    pub start: f64,
    pub end: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SkipRange {
    /// Whether `position` falls inside `[start, end)`.
    pub fn contains(&self, position: f64) -> bool {
        position >= self.start && position < self.end
    }

    fn is_well_formed(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start < self.end
    }
}

/// Drop malformed ranges and order the rest by start time.
///
/// The sort is stable, so ranges with equal starts keep the server's
/// (insertion) order. Returns how many ranges were dropped.
pub fn prepare(ranges: &mut Vec<SkipRange>) -> usize {
    let before = ranges.len();
    ranges.retain(SkipRange::is_well_formed);
    ranges.sort_by(|a, b| a.start.total_cmp(&b.start));
    before - ranges.len()
}

/// The first range, in ascending start order, containing `position`.
pub fn find_match(ranges: &[SkipRange], position: f64) -> Option<&SkipRange> {
    ranges.iter().find(|r| r.contains(position))
}
