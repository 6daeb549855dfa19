//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`.

use sw_core::{ItemId, SegmentId};
use uuid::Uuid;

/// Parse a UUID-based ID from a text column.
fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(T::from(uuid))
}

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// A stored skip range for one media item.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub id: SegmentId,
    pub item_id: ItemId,
    pub start: f64,
    pub end: f64,
    pub reason: Option<String>,
    pub created_at: String,
}

impl Segment {
    /// Column list matching [`Segment::from_row`].
    pub const COLUMNS: &'static str = "id, item_id, start_secs, end_secs, reason, created_at";

    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: SegmentId::from(row.get::<_, i64>(0)?),
            item_id: parse_id(row, 1)?,
            start: row.get(2)?,
            end: row.get(3)?,
            reason: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}
