//! Segment store operations.
//!
//! Segments are immutable once written: there is add, read and delete, no
//! update. Readers always see segments ordered by start time, ties broken
//! by insertion order.

use std::collections::BTreeMap;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use sw_core::{Error, ItemId, Result, SegmentId};

use crate::models::Segment;

/// Persist a new segment and return it with its assigned id.
///
/// Rejects non-finite or inverted bounds and over-long reasons; a blank
/// reason is stored as absent.
pub fn add_segment(
    conn: &Connection,
    item_id: ItemId,
    start: f64,
    end: f64,
    reason: Option<&str>,
) -> Result<Segment> {
    sw_core::validate_bounds(start, end)?;
    let reason = sw_core::normalize_reason(reason)?;
    let created_at = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO segments (item_id, start_secs, end_secs, reason, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![item_id.to_string(), start, end, reason, created_at],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Segment {
        id: SegmentId::from(conn.last_insert_rowid()),
        item_id,
        start,
        end,
        reason,
        created_at,
    })
}

/// Get a segment by id.
pub fn get_segment(conn: &Connection, id: SegmentId) -> Result<Option<Segment>> {
    conn.query_row(
        &format!("SELECT {} FROM segments WHERE id = ?1", Segment::COLUMNS),
        [id.get()],
        Segment::from_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// All segments for one item, ascending by start then id. Empty if none.
pub fn list_by_item(conn: &Connection, item_id: ItemId) -> Result<Vec<Segment>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM segments WHERE item_id = ?1 ORDER BY start_secs, id",
            Segment::COLUMNS
        ))
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([item_id.to_string()], Segment::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Every stored segment grouped by item, each group ordered like
/// [`list_by_item`].
pub fn list_all(conn: &Connection) -> Result<BTreeMap<ItemId, Vec<Segment>>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM segments ORDER BY item_id, start_secs, id",
            Segment::COLUMNS
        ))
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], Segment::from_row)
        .map_err(|e| Error::database(e.to_string()))?;

    let mut grouped: BTreeMap<ItemId, Vec<Segment>> = BTreeMap::new();
    for row in rows {
        let segment = row.map_err(|e| Error::database(e.to_string()))?;
        grouped.entry(segment.item_id).or_default().push(segment);
    }
    Ok(grouped)
}

/// Delete a segment, returning the removed record, or `None` if the id was
/// unknown.
pub fn delete_segment(conn: &Connection, id: SegmentId) -> Result<Option<Segment>> {
    conn.query_row(
        &format!(
            "DELETE FROM segments WHERE id = ?1 RETURNING {}",
            Segment::COLUMNS
        ),
        [id.get()],
        Segment::from_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Number of stored segments.
pub fn count_segments(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM segments", [], |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))
}
