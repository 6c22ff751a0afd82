//! Core data models for cluster discovery and zone reconciliation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status condition reported on a managed cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterCondition {
    pub condition_type: String,
    pub status: String,
}

/// Self-reported key/value fact about a managed cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterClaim {
    pub name: String,
    pub value: String,
}

/// Scheduling-repellent marker on a managed cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterTaint {
    pub key: String,
    pub value: String,
    pub effect: String,
}

/// Snapshot of a managed cluster as reported by the hub registry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagedClusterRecord {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub conditions: Vec<ClusterCondition>,
    pub claims: Vec<ClusterClaim>,
    /// Raw capacity quantities keyed by resource name (`cpu`, `memory`, ...)
    pub capacity: BTreeMap<String, String>,
    pub hub_accepts_client: bool,
    pub taints: Vec<ClusterTaint>,
    /// API server URLs the cluster registered with
    pub client_urls: Vec<String>,
    pub kubernetes_version: Option<String>,
}

/// Overall classification of a discovered cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClusterStatus {
    Available,
    Unavailable,
    PendingAcceptance,
    Joining,
    Maintenance,
    Unknown,
}

impl std::fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterStatus::Available => write!(f, "available"),
            ClusterStatus::Unavailable => write!(f, "unavailable"),
            ClusterStatus::PendingAcceptance => write!(f, "pending-acceptance"),
            ClusterStatus::Joining => write!(f, "joining"),
            ClusterStatus::Maintenance => write!(f, "maintenance"),
            ClusterStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Canonical view of a discovered cluster, recomputed every cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub name: String,
    pub display_name: String,
    pub api_endpoint: String,
    pub status: ClusterStatus,
    pub kubernetes_version: String,
    pub region: String,
    pub provider: String,
    pub node_count: i64,
    pub cpu_cores: i64,
    pub memory_gb: i64,
    pub storage_gb: i64,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    /// Claims not mapped onto a dedicated field
    pub claims: BTreeMap<String, String>,
    pub available: bool,
    pub accepted: bool,
    pub last_seen: DateTime<Utc>,
}

/// Allocation status of a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneStatus {
    Available,
    Unavailable,
    Maintenance,
}

impl std::fmt::Display for ZoneStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoneStatus::Available => write!(f, "Available"),
            ZoneStatus::Unavailable => write!(f, "Unavailable"),
            ZoneStatus::Maintenance => write!(f, "Maintenance"),
        }
    }
}

/// CPU/memory/storage triple in cores and GB
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    pub cpu_cores: i64,
    pub memory_gb: i64,
    pub storage_gb: i64,
}

impl Resources {
    pub fn new(cpu_cores: i64, memory_gb: i64, storage_gb: i64) -> Self {
        Self {
            cpu_cores,
            memory_gb,
            storage_gb,
        }
    }
}

/// Locally persisted, allocatable representation of one discovered cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    /// Join key back to the managed cluster
    pub cluster_name: String,
    pub status: ZoneStatus,
    pub region: String,
    pub cloud_provider: String,
    pub api_endpoint: String,
    pub node_count: i64,
    pub capacity: Resources,
    pub quota: Resources,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub last_sync: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Zone {
    /// Whether this zone carries the engine's management marker
    pub fn is_managed(&self) -> bool {
        crate::labels::is_managed(&self.labels)
    }
}

/// Outcome of one discovery-and-reconcile cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub clusters_found: usize,
    pub zones_created: usize,
    pub zones_updated: usize,
    pub zones_deleted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub duration_ms: u64,
}

impl SyncResult {
    /// A failed cycle that aborted before reconciliation finished
    pub fn failed(timestamp: DateTime<Utc>, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            timestamp,
            success: false,
            clusters_found: 0,
            zones_created: 0,
            zones_updated: 0,
            zones_deleted: 0,
            error_message: Some(error.into()),
            duration_ms,
        }
    }
}
