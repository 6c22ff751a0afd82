//! Periodic discovery and reconciliation
//!
//! This module provides:
//! - Validated sync configuration
//! - The scheduler running one cycle at a time, on a timer or on demand

mod config;
mod scheduler;


pub use config::{
    ConfigError, SyncConfig, DEFAULT_HUB_NAMESPACE, DEFAULT_SYNC_INTERVAL, MIN_SYNC_INTERVAL,
};
pub use scheduler::{CycleError, SyncError, SyncScheduler, SyncSchedulerBuilder, SyncStatus};
