//! Translation of discovered clusters into desired zones

use crate::labels::{self, HUB_DOMAIN};
use crate::models::{ClusterInfo, ClusterStatus, Resources, Zone, ZoneStatus};
use std::collections::BTreeMap;
use thiserror::Error;

/// Quota percentage used when the configured one is outside [1, 100]
pub const DEFAULT_QUOTA_PERCENT: i64 = 80;

/// Cluster label keys copied onto zones verbatim
const INTERESTING_LABELS: &[&str] = &["environment", "region", "provider"];

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("cluster name '{0}' yields an empty zone id")]
    EmptyZoneId(String),
}

#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    /// Prepended (with a `-`) to zone ids and names; empty for none
    pub zone_prefix: String,
    pub quota_percent: i64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            zone_prefix: String::new(),
            quota_percent: DEFAULT_QUOTA_PERCENT,
        }
    }
}

/// The configured percentage when it lies in [1, 100], otherwise the default
pub fn effective_quota_percent(percent: i64) -> i64 {
    if (1..=100).contains(&percent) {
        percent
    } else {
        DEFAULT_QUOTA_PERCENT
    }
}

/// `floor(capacity * percent / 100)`; non-positive capacity has no quota
pub fn compute_quota(capacity: i64, percent: i64) -> i64 {
    if capacity <= 0 {
        return 0;
    }
    let percent = effective_quota_percent(percent);
    (i128::from(capacity) * i128::from(percent) / 100) as i64
}

fn quota_for(capacity: Resources, percent: i64) -> Resources {
    Resources::new(
        compute_quota(capacity.cpu_cores, percent),
        compute_quota(capacity.memory_gb, percent),
        compute_quota(capacity.storage_gb, percent),
    )
}

fn id_segment(value: &str) -> String {
    value.trim().to_lowercase().replace(['_', ' '], "-")
}

/// Zone id for a cluster: lowercase, `_`/space replaced by `-`, optionally
/// prefixed
pub fn derive_zone_id(cluster_name: &str, prefix: &str) -> String {
    let base = id_segment(cluster_name);
    let prefix = id_segment(prefix);
    if prefix.is_empty() || base.is_empty() {
        base
    } else {
        format!("{}-{}", prefix, base)
    }
}

fn zone_status(status: ClusterStatus) -> ZoneStatus {
    match status {
        ClusterStatus::Available => ZoneStatus::Available,
        ClusterStatus::Maintenance => ZoneStatus::Maintenance,
        ClusterStatus::Unavailable
        | ClusterStatus::PendingAcceptance
        | ClusterStatus::Joining
        | ClusterStatus::Unknown => ZoneStatus::Unavailable,
    }
}

fn is_interesting_label(key: &str) -> bool {
    key.contains(HUB_DOMAIN) || key.starts_with("cluster.") || INTERESTING_LABELS.contains(&key)
}

/// Converts [`ClusterInfo`] into the zone the engine wants persisted
#[derive(Debug, Clone, Default)]
pub struct ZoneTranslator {
    config: TranslatorConfig,
}

impl ZoneTranslator {
    pub fn new(config: TranslatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    pub fn to_zone(&self, cluster: &ClusterInfo) -> Result<Zone, TranslateError> {
        let id = derive_zone_id(&cluster.name, &self.config.zone_prefix);
        if id.is_empty() {
            return Err(TranslateError::EmptyZoneId(cluster.name.clone()));
        }

        let prefix = self.config.zone_prefix.trim();
        let name = if prefix.is_empty() {
            cluster.name.clone()
        } else {
            format!("{}-{}", prefix, cluster.name)
        };

        let capacity = Resources::new(cluster.cpu_cores, cluster.memory_gb, cluster.storage_gb);

        Ok(Zone {
            id,
            name,
            cluster_name: cluster.name.clone(),
            status: zone_status(cluster.status),
            region: cluster.region.clone(),
            cloud_provider: cluster.provider.clone(),
            api_endpoint: cluster.api_endpoint.clone(),
            node_count: cluster.node_count,
            capacity,
            quota: quota_for(capacity, self.config.quota_percent),
            labels: zone_labels(cluster),
            annotations: zone_annotations(cluster),
            last_sync: cluster.last_seen,
            created_at: cluster.last_seen,
            updated_at: cluster.last_seen,
        })
    }
}

fn zone_labels(cluster: &ClusterInfo) -> BTreeMap<String, String> {
    let mut zone_labels: BTreeMap<String, String> = cluster
        .labels
        .iter()
        .filter(|(key, _)| is_interesting_label(key))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    zone_labels.insert(
        labels::MANAGED_BY_LABEL.to_string(),
        labels::MANAGED_BY_VALUE.to_string(),
    );
    zone_labels.insert(
        labels::SYNC_SOURCE_LABEL.to_string(),
        labels::SYNC_SOURCE_VALUE.to_string(),
    );
    zone_labels.insert(labels::CLUSTER_NAME_LABEL.to_string(), cluster.name.clone());
    zone_labels.insert(labels::PROVIDER_LABEL.to_string(), cluster.provider.clone());
    zone_labels.insert(labels::REGION_LABEL.to_string(), cluster.region.clone());

    zone_labels
}

fn zone_annotations(cluster: &ClusterInfo) -> BTreeMap<String, String> {
    let mut annotations = BTreeMap::new();

    annotations.insert(
        labels::DESCRIPTION_ANNOTATION.to_string(),
        format!(
            "Zone for managed cluster {} (API endpoint: {}, Kubernetes: {}, discovered: {})",
            cluster.name,
            cluster.api_endpoint,
            cluster.kubernetes_version,
            cluster.last_seen.to_rfc3339()
        ),
    );

    for (claim, value) in &cluster.claims {
        annotations.insert(
            format!("{}{}", labels::CLAIM_ANNOTATION_PREFIX, claim.replace('.', "-")),
            value.clone(),
        );
    }

    for (key, value) in &cluster.annotations {
        if key.contains(HUB_DOMAIN) {
            annotations.insert(key.clone(), value.clone());
        }
    }

    annotations
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn cluster(name: &str) -> ClusterInfo {
        ClusterInfo {
            name: name.to_string(),
            display_name: name.to_string(),
            api_endpoint: "https://api.example.com:6443".to_string(),
            status: ClusterStatus::Available,
            kubernetes_version: "v1.28.3".to_string(),
            region: "us-east-1".to_string(),
            provider: "aws".to_string(),
            node_count: 3,
            cpu_cores: 12,
            memory_gb: 48,
            storage_gb: 300,
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            claims: BTreeMap::new(),
            available: true,
            accepted: true,
            last_seen: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_zone_id_derivation() {
        assert_eq!(derive_zone_id("Prod_East 1", ""), "prod-east-1");
        assert_eq!(derive_zone_id("prod-east", "Edge"), "edge-prod-east");
        assert_eq!(derive_zone_id("  ", "edge"), "");
    }

    #[test]
    fn test_quota_rounds_down() {
        assert_eq!(compute_quota(12, 80), 9);
        assert_eq!(compute_quota(48, 80), 38);
        assert_eq!(compute_quota(300, 80), 240);
        assert_eq!(compute_quota(7, 100), 7);
        assert_eq!(compute_quota(7, 1), 0);
    }

    #[test]
    fn test_quota_zero_capacity() {
        for percent in [1, 50, 80, 100] {
            assert_eq!(compute_quota(0, percent), 0);
            assert_eq!(compute_quota(-5, percent), 0);
        }
    }

    #[test]
    fn test_quota_out_of_range_percent_falls_back() {
        assert_eq!(compute_quota(100, 0), 80);
        assert_eq!(compute_quota(100, 101), 80);
        assert_eq!(compute_quota(100, -20), 80);
        assert_eq!(effective_quota_percent(55), 55);
    }

    #[test]
    fn test_quota_matches_floor_formula() {
        for capacity in [0i64, 1, 3, 17, 99, 1000, 12345] {
            for percent in 1..=100 {
                assert_eq!(compute_quota(capacity, percent), capacity * percent / 100);
            }
        }
    }

    #[test]
    fn test_to_zone_prod_east() {
        let zone = ZoneTranslator::default().to_zone(&cluster("prod-east")).unwrap();

        assert_eq!(zone.id, "prod-east");
        assert_eq!(zone.name, "prod-east");
        assert_eq!(zone.cluster_name, "prod-east");
        assert_eq!(zone.status, ZoneStatus::Available);
        assert_eq!(zone.capacity, Resources::new(12, 48, 300));
        assert_eq!(zone.quota, Resources::new(9, 38, 240));
        assert!(zone.is_managed());
        assert_eq!(zone.created_at, zone.last_sync);
    }

    #[test]
    fn test_prefix_applies_to_id_and_name() {
        let translator = ZoneTranslator::new(TranslatorConfig {
            zone_prefix: "Edge".to_string(),
            quota_percent: 80,
        });
        let zone = translator.to_zone(&cluster("Prod_East")).unwrap();
        assert_eq!(zone.id, "edge-prod-east");
        assert_eq!(zone.name, "Edge-Prod_East");
    }

    #[test]
    fn test_empty_id_is_error() {
        let result = ZoneTranslator::default().to_zone(&cluster(" "));
        assert!(matches!(result, Err(TranslateError::EmptyZoneId(_))));
    }

    #[test]
    fn test_status_mapping() {
        let translator = ZoneTranslator::default();
        let expected = [
            (ClusterStatus::Available, ZoneStatus::Available),
            (ClusterStatus::Maintenance, ZoneStatus::Maintenance),
            (ClusterStatus::Unavailable, ZoneStatus::Unavailable),
            (ClusterStatus::PendingAcceptance, ZoneStatus::Unavailable),
            (ClusterStatus::Joining, ZoneStatus::Unavailable),
            (ClusterStatus::Unknown, ZoneStatus::Unavailable),
        ];

        for (cluster_status, zone_status) in expected {
            let mut info = cluster("east");
            info.status = cluster_status;
            assert_eq!(translator.to_zone(&info).unwrap().status, zone_status);
        }
    }

    #[test]
    fn test_labels_filtered_and_markers_set() {
        let mut info = cluster("east");
        info.labels.insert("environment".to_string(), "prod".to_string());
        info.labels
            .insert("cluster.open-cluster-management.io/clusterset".to_string(), "default".to_string());
        info.labels.insert("cluster.tier".to_string(), "gold".to_string());
        info.labels.insert("team".to_string(), "infra".to_string());

        let zone = ZoneTranslator::default().to_zone(&info).unwrap();
        assert_eq!(zone.labels["environment"], "prod");
        assert_eq!(zone.labels["cluster.tier"], "gold");
        assert!(zone
            .labels
            .contains_key("cluster.open-cluster-management.io/clusterset"));
        assert!(!zone.labels.contains_key("team"));
        assert_eq!(zone.labels[labels::MANAGED_BY_LABEL], labels::MANAGED_BY_VALUE);
        assert_eq!(zone.labels[labels::SYNC_SOURCE_LABEL], labels::SYNC_SOURCE_VALUE);
        assert_eq!(zone.labels[labels::CLUSTER_NAME_LABEL], "east");
        assert_eq!(zone.labels[labels::PROVIDER_LABEL], "aws");
        assert_eq!(zone.labels[labels::REGION_LABEL], "us-east-1");
    }

    #[test]
    fn test_annotations_from_description_and_claims() {
        let mut info = cluster("east");
        info.claims.insert("id.k8s.io".to_string(), "abc".to_string());
        info.annotations
            .insert("open-cluster-management.io/owner".to_string(), "platform".to_string());
        info.annotations.insert("note".to_string(), "ignored".to_string());

        let zone = ZoneTranslator::default().to_zone(&info).unwrap();
        let description = &zone.annotations[labels::DESCRIPTION_ANNOTATION];
        assert!(description.contains("east"));
        assert!(description.contains("https://api.example.com:6443"));
        assert!(description.contains("v1.28.3"));
        assert!(description.contains("2024-06-01T12:00:00"));
        assert_eq!(zone.annotations["zone-sync.io/claim-id-k8s-io"], "abc");
        assert_eq!(zone.annotations["open-cluster-management.io/owner"], "platform");
        assert!(!zone.annotations.contains_key("note"));
    }

    #[test]
    fn test_translation_is_deterministic() {
        let translator = ZoneTranslator::default();
        let info = cluster("east");
        assert_eq!(translator.to_zone(&info).unwrap(), translator.to_zone(&info).unwrap());
    }
}
