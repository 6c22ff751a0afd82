//! Sync configuration

use crate::hub::DiscoveryFilter;
use crate::zone::{ReconcilePolicy, TranslatorConfig, DEFAULT_QUOTA_PERCENT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Shortest interval accepted while sync is enabled
pub const MIN_SYNC_INTERVAL: Duration = Duration::from_secs(60);

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub const DEFAULT_HUB_NAMESPACE: &str = "open-cluster-management";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("sync interval of {0}s is below the {min}s minimum", min = MIN_SYNC_INTERVAL.as_secs())]
    IntervalTooShort(u64),

    #[error("default quota percentage {0} is outside 0-100")]
    QuotaPercentOutOfRange(i64),

    #[error("hub namespace must not be empty")]
    EmptyHubNamespace,
}

/// Runtime configuration of the sync engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub hub_namespace: String,
    pub auto_create_zones: bool,
    /// Prepended to zone ids and names; empty for none
    pub zone_prefix: String,
    pub default_quota_percent: i64,
    pub excluded_clusters: Vec<String>,
    pub required_labels: BTreeMap<String, String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: DEFAULT_SYNC_INTERVAL.as_secs(),
            hub_namespace: DEFAULT_HUB_NAMESPACE.to_string(),
            auto_create_zones: true,
            zone_prefix: String::new(),
            default_quota_percent: DEFAULT_QUOTA_PERCENT,
            excluded_clusters: Vec::new(),
            required_labels: BTreeMap::new(),
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.interval() < MIN_SYNC_INTERVAL {
            return Err(ConfigError::IntervalTooShort(self.interval_secs));
        }
        if !(0..=100).contains(&self.default_quota_percent) {
            return Err(ConfigError::QuotaPercentOutOfRange(self.default_quota_percent));
        }
        if self.hub_namespace.trim().is_empty() {
            return Err(ConfigError::EmptyHubNamespace);
        }
        Ok(())
    }

    pub fn discovery_filter(&self) -> DiscoveryFilter {
        DiscoveryFilter::new(self.excluded_clusters.iter().cloned(), self.required_labels.clone())
    }

    pub fn translator_config(&self) -> TranslatorConfig {
        TranslatorConfig {
            zone_prefix: self.zone_prefix.clone(),
            quota_percent: self.default_quota_percent,
        }
    }

    pub fn reconcile_policy(&self) -> ReconcilePolicy {
        ReconcilePolicy {
            auto_create: self.auto_create_zones,
            quota_percent: self.default_quota_percent,
        }
    }
}
