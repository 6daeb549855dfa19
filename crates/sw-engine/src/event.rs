//! Engine inputs and outputs.

use std::fmt;
use std::time::Duration;

use sw_core::ItemId;

use crate::segment::SkipRange;

/// Opaque handle to a playback element owned by the host.
///
/// The engine never holds the element itself; hosts mint a fresh handle
/// whenever a new element appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VideoId(pub u64);

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "video#{}", self.0)
    }
}

/// Timers the engine asks its host to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Ends the post-skip suppression window.
    Cooldown,
    /// Hides the skip notice.
    Notice,
}

/// Signals raised by the attached playback element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VideoSignal {
    Play,
    LoadedData,
    TimeUpdate(f64),
    Seeked(f64),
}

/// Inputs to [`crate::Session::handle`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    VideoAttached(VideoId),
    VideoDetached(VideoId),
    /// Regular playback-time signal.
    PositionUpdate { position: f64 },
    /// A seek completed, either the engine's own or the viewer's.
    Seeked { position: f64 },
    ItemChanged(ItemId),
    SegmentsLoaded {
        item: ItemId,
        segments: Vec<SkipRange>,
    },
    SegmentsFailed { item: ItemId, error: String },
    ToggleEnabled,
    /// The cooldown timer fired; `position` is the player position now.
    SkipCooldownElapsed { generation: u64, position: f64 },
    NoticeElapsed { generation: u64 },
}

/// Work the host must carry out, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    BindListeners(VideoId),
    UnbindListeners(VideoId),
    FetchSegments(ItemId),
    Seek { to: f64 },
    ShowNotice { text: String },
    DismissNotice,
    /// Run a timer and report back with the same generation.
    StartTimer {
        timer: TimerKind,
        generation: u64,
        after: Duration,
    },
    CancelTimer(TimerKind),
    PersistEnabled(bool),
    UpdateIndicator(Indicator),
}

/// State of the on-screen enable toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indicator {
    pub enabled: bool,
    /// Segments loaded for the active item.
    pub loaded: usize,
}

impl Indicator {
    pub fn label(&self) -> String {
        match (self.enabled, self.loaded) {
            (false, _) => "OFF".to_string(),
            (true, 0) => "ON".to_string(),
            (true, n) => format!("ON ({n})"),
        }
    }
}
