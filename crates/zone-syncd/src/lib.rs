//! Zone sync daemon internals
//!
//! Configuration loading and the admin HTTP API, shared by the `zone-syncd`
//! binary and its integration tests.

pub mod api;
pub mod config;
