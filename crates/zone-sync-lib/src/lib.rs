//! Cluster discovery and zone reconciliation engine
//!
//! This crate provides:
//! - Parsing of Kubernetes resource quantities into whole cores and GB
//! - Discovery and normalization of managed clusters from the hub registry
//! - Translation of clusters into zones and reconciliation against a store
//! - The scheduler running sync cycles, plus health and metrics

pub mod clock;
pub mod health;
pub mod hub;
pub mod labels;
pub mod models;
pub mod observability;
pub mod quantity;
pub mod sync;
pub mod zone;

pub use clock::{Clock, ManualClock, SystemClock};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{StructuredLogger, SyncMetrics};
