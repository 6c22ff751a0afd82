//! Hub discovery client
//!
//! Lists managed clusters from a [`HubRegistrySource`], drops excluded or
//! unlabelled clusters, and normalizes the rest. A record that fails to
//! normalize is logged and omitted; only a failed listing fails discovery.

use super::{normalize, HubError, HubRegistrySource};
use crate::clock::Clock;
use crate::models::{ClusterInfo, ManagedClusterRecord};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which managed clusters are eligible for discovery
#[derive(Debug, Clone, Default)]
pub struct DiscoveryFilter {
    /// Cluster names never discovered (exact match)
    pub excluded_clusters: HashSet<String>,
    /// Labels every discovered cluster must carry with exactly these values
    pub required_labels: BTreeMap<String, String>,
}

impl DiscoveryFilter {
    pub fn new(
        excluded_clusters: impl IntoIterator<Item = String>,
        required_labels: BTreeMap<String, String>,
    ) -> Self {
        Self {
            excluded_clusters: excluded_clusters.into_iter().collect(),
            required_labels,
        }
    }

    /// Whether a raw record passes both the deny-list and the label requirements
    pub fn admits(&self, record: &ManagedClusterRecord) -> bool {
        if self.excluded_clusters.contains(&record.name) {
            debug!(cluster = %record.name, "Cluster excluded by configuration");
            return false;
        }

        let missing = self
            .required_labels
            .iter()
            .find(|(key, value)| record.labels.get(*key) != Some(*value));

        if let Some((key, _)) = missing {
            debug!(cluster = %record.name, label = %key, "Cluster lacks required label");
            return false;
        }

        true
    }
}

/// Discovers managed clusters from the hub
pub struct HubDiscoveryClient {
    source: Arc<dyn HubRegistrySource>,
    filter: DiscoveryFilter,
    clock: Arc<dyn Clock>,
}

impl HubDiscoveryClient {
    pub fn new(
        source: Arc<dyn HubRegistrySource>,
        filter: DiscoveryFilter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            filter,
            clock,
        }
    }

    pub fn filter(&self) -> &DiscoveryFilter {
        &self.filter
    }

    /// List, filter and normalize every managed cluster
    pub async fn discover(&self) -> Result<Vec<ClusterInfo>, HubError> {
        let records = self.source.list_managed_clusters().await.map_err(|e| {
            if e.is_unavailable() {
                warn!(error = %e, "Hub registry unavailable, check that the hub is installed and reachable");
            }
            e
        })?;

        let listed = records.len();
        let now = self.clock.now();
        let mut clusters = Vec::with_capacity(listed);

        for record in records.iter().filter(|r| self.filter.admits(r)) {
            match normalize(record, now) {
                Ok(info) => clusters.push(info),
                Err(e) => {
                    warn!(cluster = %record.name, error = %e, "Skipping managed cluster that failed to normalize");
                }
            }
        }

        info!(
            listed = listed,
            discovered = clusters.len(),
            "Managed cluster discovery complete"
        );

        Ok(clusters)
    }

    /// Fetch and normalize a single cluster; `None` when it is filtered out
    /// or cannot be normalized
    pub async fn discover_cluster(&self, name: &str) -> Result<Option<ClusterInfo>, HubError> {
        let record = self.source.get_managed_cluster(name).await?;

        if !self.filter.admits(&record) {
            return Ok(None);
        }

        match normalize(&record, self.clock.now()) {
            Ok(info) => Ok(Some(info)),
            Err(e) => {
                warn!(cluster = %name, error = %e, "Managed cluster failed to normalize");
                Ok(None)
            }
        }
    }
}
