//! Segment domain rules and host media types.
//!
//! Shared by the store (write-time validation), the provider adapter (tick
//! conversion, supported kinds) and the native monitor (which host items play
//! as video).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Host time units per second (100 ns ticks).
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Longest accepted segment reason, in characters.
pub const MAX_REASON_LEN: usize = 500;

/// Label shown when a segment carries no reason.
pub const DEFAULT_REASON: &str = "Restricted Content";

/// Convert seconds to host ticks, truncating toward zero.
pub fn seconds_to_ticks(seconds: f64) -> i64 {
    (seconds * TICKS_PER_SECOND as f64) as i64
}

/// Convert host ticks to seconds.
pub fn ticks_to_seconds(ticks: i64) -> f64 {
    ticks as f64 / TICKS_PER_SECOND as f64
}

/// Check the bounds of a new segment.
///
/// `start` must be finite and non-negative, `end` finite and strictly greater.
pub fn validate_bounds(start: f64, end: f64) -> Result<()> {
    if !start.is_finite() || !end.is_finite() {
        return Err(Error::Validation("Start and End must be finite numbers".into()));
    }
    if start < 0.0 {
        return Err(Error::Validation("Start must not be negative".into()));
    }
    if start >= end {
        return Err(Error::Validation("Start must be less than End".into()));
    }
    Ok(())
}

/// Trim a reason, drop it when blank, reject it when too long.
pub fn normalize_reason(reason: Option<&str>) -> Result<Option<String>> {
    let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };
    if reason.chars().count() > MAX_REASON_LEN {
        return Err(Error::Validation(format!(
            "Reason must be at most {MAX_REASON_LEN} characters"
        )));
    }
    Ok(Some(reason.to_string()))
}

// ---------------------------------------------------------------------------
// ItemKind
// ---------------------------------------------------------------------------

/// Host item types, as reported in the host's `Type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Movie,
    Episode,
    Series,
    Season,
    MusicVideo,
    Video,
    Audio,
    Folder,
    Other,
}

impl ItemKind {
    /// Whether skip segments are published to the host for this kind.
    pub fn supports_segments(self) -> bool {
        matches!(self, Self::Movie | Self::Episode)
    }

    /// Whether the host plays this kind in a video element.
    pub fn is_video(self) -> bool {
        matches!(
            self,
            Self::Movie | Self::Episode | Self::MusicVideo | Self::Video
        )
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Movie => "Movie",
            Self::Episode => "Episode",
            Self::Series => "Series",
            Self::Season => "Season",
            Self::MusicVideo => "MusicVideo",
            Self::Video => "Video",
            Self::Audio => "Audio",
            Self::Folder => "Folder",
            Self::Other => "Other",
        };
        f.write_str(s)
    }
}

impl FromStr for ItemKind {
    type Err = std::convert::Infallible;

    /// Case-insensitive; unknown host types map to [`ItemKind::Other`].
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "movie" => Self::Movie,
            "episode" => Self::Episode,
            "series" => Self::Series,
            "season" => Self::Season,
            "musicvideo" => Self::MusicVideo,
            "video" => Self::Video,
            "audio" => Self::Audio,
            "folder" | "collectionfolder" => Self::Folder,
            _ => Self::Other,
        })
    }
}
