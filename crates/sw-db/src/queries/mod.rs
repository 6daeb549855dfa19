//! Database query modules.

pub mod segments;
