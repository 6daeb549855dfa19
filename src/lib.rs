//! Skipwarden: operator-defined skip ranges enforced during playback.
//!
//! The binary wraps the workspace crates; this library exposes the native
//! playback monitor for integration testing.

pub mod watch;
