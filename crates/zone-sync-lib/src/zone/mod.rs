//! Zone translation, storage and reconciliation
//!
//! This module provides:
//! - The [`ZoneStore`] seam over zone persistence
//! - An in-memory store with optional JSON file persistence
//! - Translation of discovered clusters into desired zones
//! - The reconciler diffing desired zones against stored ones

mod reconciler;
mod store;
mod translator;

pub use reconciler::{
    ReconcileOutcome, ReconcilePolicy, ZoneReconciler, GRACE_PERIOD,
    SIGNIFICANT_CAPACITY_CHANGE_PERCENT, STALE_SYNC_AFTER,
};
pub use store::InMemoryZoneStore;
pub use translator::{
    compute_quota, derive_zone_id, effective_quota_percent, TranslateError, TranslatorConfig,
    ZoneTranslator, DEFAULT_QUOTA_PERCENT,
};

use crate::models::Zone;
use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a zone store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("zone '{0}' not found")]
    NotFound(String),

    #[error("zone '{0}' already exists")]
    AlreadyExists(String),

    #[error("zone store persistence failed: {0}")]
    Persistence(String),

    #[error("zone store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence layer for zones
#[async_trait]
pub trait ZoneStore: Send + Sync {
    async fn list_zones(&self) -> Result<Vec<Zone>, StoreError>;

    async fn create_zone(&self, zone: Zone) -> Result<(), StoreError>;

    async fn update_zone(&self, zone: Zone) -> Result<(), StoreError>;

    async fn delete_zone(&self, id: &str) -> Result<(), StoreError>;

    /// Number of live workloads allocated against the zone
    async fn count_workloads_in_zone(&self, id: &str) -> Result<u64, StoreError>;
}
