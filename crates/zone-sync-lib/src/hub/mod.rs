//! Managed cluster discovery from the hub registry
//!
//! This module provides:
//! - The [`HubRegistrySource`] seam over the remote registry
//! - A Kubernetes-backed source reading `ManagedCluster` documents
//! - Normalization of raw records into [`ClusterInfo`](crate::models::ClusterInfo)
//! - The discovery client that filters and normalizes a full listing

mod discovery;
mod kube_source;
mod normalizer;

pub use discovery::{DiscoveryFilter, HubDiscoveryClient};
pub use kube_source::{record_from_object, KubeHubSource};
pub use normalizer::{normalize, NormalizeError};

use crate::models::ManagedClusterRecord;
use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a hub registry source
#[derive(Debug, Error)]
pub enum HubError {
    /// The managed cluster API is not served by the hub
    #[error("managed cluster API is not installed on the hub: {0}")]
    NotInstalled(String),

    /// The hub could not be reached at all
    #[error("hub is unreachable: {0}")]
    Unreachable(String),

    #[error("managed cluster '{0}' not found")]
    NotFound(String),

    #[error("hub request failed: {0}")]
    Request(String),

    #[error("malformed managed cluster document: {0}")]
    Decode(String),
}

impl HubError {
    /// Whether the hub itself is missing or unreachable, as opposed to a
    /// failure of an individual request
    pub fn is_unavailable(&self) -> bool {
        matches!(self, HubError::NotInstalled(_) | HubError::Unreachable(_))
    }
}

/// Remote registry of managed clusters
#[async_trait]
pub trait HubRegistrySource: Send + Sync {
    /// List every managed cluster known to the hub
    async fn list_managed_clusters(&self) -> Result<Vec<ManagedClusterRecord>, HubError>;

    /// Fetch a single managed cluster by name
    async fn get_managed_cluster(&self, name: &str) -> Result<ManagedClusterRecord, HubError>;
}
