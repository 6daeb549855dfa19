//! Route handlers for the HTTP API.

pub mod client;
pub mod health;
pub mod provider;
pub mod segments;
