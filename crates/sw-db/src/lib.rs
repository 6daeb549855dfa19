//! sw-db: segment persistence layer.
//!
//! This crate provides SQLite-backed storage with connection pooling,
//! embedded migrations, the segment model, and the segment query module.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
