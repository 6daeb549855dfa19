//! sw-engine: the playback monitor and skip engine.
//!
//! The engine is host-agnostic and performs no I/O. Hosts feed it
//! [`Event`]s (and page observations through [`Monitor`]) and carry out the
//! [`Effect`]s it returns: seeking the player, showing the skip notice,
//! fetching segments, running timers. The browser script and the native
//! `watch` runtime are two such hosts.
//!
//! - [`session`]: the per-viewing-session state machine
//! - [`detect`]: ordered active-item detectors
//! - [`sniff`]: item ids observed in outgoing requests
//! - [`attach`]: video element tracking
//! - [`monitor`]: composition of the above behind one host-facing API
//! - [`prefs`]: the persisted enabled flag

pub mod attach;
pub mod detect;
pub mod event;
pub mod monitor;
pub mod prefs;
pub mod segment;
pub mod session;
pub mod sniff;

pub use detect::{DetectError, Detection, DetectorChain, Page};
pub use event::{Effect, Event, Indicator, TimerKind, VideoId, VideoSignal};
pub use monitor::Monitor;
pub use prefs::{FilePreferences, MemoryPreferences, PreferenceStore};
pub use segment::SkipRange;
pub use session::{Phase, Session};
pub use sniff::{RequestObserver, RequestSniffer};
