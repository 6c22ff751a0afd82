//! Normalization of raw managed cluster records
//!
//! Maps a [`ManagedClusterRecord`] onto a canonical [`ClusterInfo`]:
//! status classification, capacity extraction with per-node estimation,
//! provider/region resolution and claim bookkeeping.

use crate::labels::{self, claims, conditions, taints};
use crate::models::{ClusterInfo, ClusterStatus, ManagedClusterRecord};
use crate::quantity::{parse_cpu_cores, parse_memory_gb, parse_storage_gb};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

/// Per-node capacity assumed when a cluster reports none
pub const ESTIMATED_CPU_PER_NODE: i64 = 4;
pub const ESTIMATED_MEMORY_GB_PER_NODE: i64 = 16;
pub const ESTIMATED_STORAGE_GB_PER_NODE: i64 = 100;

pub const UNKNOWN_PROVIDER: &str = "unknown";

const GCP_MACHINE_PREFIXES: &[&str] = &[
    "n1-", "n2-", "n2d-", "n4-", "e2-", "c2-", "c2d-", "c3-", "c3d-", "c4-", "m1-", "m2-", "m3-",
    "t2a-", "t2d-", "a2-", "a3-", "g2-", "custom-",
];
const GCP_MACHINE_CLASSES: &[&str] = &["-standard-", "-highmem-", "-highcpu-"];

/// Failure to normalize a single record
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("managed cluster record has no name")]
    MissingName,
}

/// Normalize one managed cluster record observed at `now`
pub fn normalize(
    record: &ManagedClusterRecord,
    now: DateTime<Utc>,
) -> Result<ClusterInfo, NormalizeError> {
    let name = record.name.trim();
    if name.is_empty() {
        return Err(NormalizeError::MissingName);
    }

    let mut info = ClusterInfo {
        name: name.to_string(),
        display_name: name.to_string(),
        api_endpoint: record.client_urls.first().cloned().unwrap_or_default(),
        status: classify_status(record),
        kubernetes_version: record.kubernetes_version.clone().unwrap_or_default(),
        region: String::new(),
        provider: String::new(),
        node_count: 0,
        cpu_cores: 0,
        memory_gb: 0,
        storage_gb: 0,
        labels: record.labels.clone(),
        annotations: record.annotations.clone(),
        claims: BTreeMap::new(),
        available: condition_status(record, conditions::AVAILABLE)
            == Some(conditions::STATUS_TRUE),
        accepted: record.hub_accepts_client,
        last_seen: now,
    };

    apply_claims(&mut info, record);
    apply_reported_capacity(&mut info, &record.capacity);
    apply_label_fallbacks(&mut info);

    // Clamp before estimating so a negative report is estimated, not zeroed
    info.node_count = info.node_count.max(0);
    info.cpu_cores = info.cpu_cores.max(0);
    info.memory_gb = info.memory_gb.max(0);
    info.storage_gb = info.storage_gb.max(0);
    estimate_capacity(&mut info);

    if info.provider.is_empty() {
        info.provider = infer_provider(&info.labels, &info.annotations);
    }

    if let Some(display) = info
        .labels
        .get(labels::DISPLAY_NAME_LABEL)
        .filter(|v| !v.trim().is_empty())
    {
        info.display_name = display.clone();
    }

    Ok(info)
}

/// Classify the overall status of a record
pub fn classify_status(record: &ManagedClusterRecord) -> ClusterStatus {
    if !record.hub_accepts_client {
        return ClusterStatus::PendingAcceptance;
    }

    match condition_status(record, conditions::AVAILABLE) {
        Some(conditions::STATUS_TRUE) => ClusterStatus::Available,
        Some(conditions::STATUS_FALSE) => ClusterStatus::Unavailable,
        _ => {
            if condition_status(record, conditions::JOINED) != Some(conditions::STATUS_TRUE) {
                ClusterStatus::Joining
            } else if record.taints.iter().any(|t| t.effect == taints::NO_SELECT) {
                ClusterStatus::Maintenance
            } else {
                ClusterStatus::Unknown
            }
        }
    }
}

fn condition_status<'a>(record: &'a ManagedClusterRecord, condition_type: &str) -> Option<&'a str> {
    record
        .conditions
        .iter()
        .find(|c| c.condition_type == condition_type)
        .map(|c| c.status.as_str())
}

fn apply_claims(info: &mut ClusterInfo, record: &ManagedClusterRecord) {
    for claim in &record.claims {
        let value = claim.value.trim();
        match claim.name.as_str() {
            claims::PLATFORM => info.provider = canonical_provider(value),
            claims::REGION => info.region = value.to_string(),
            claims::KUBE_VERSION => {
                if info.kubernetes_version.is_empty() {
                    info.kubernetes_version = value.to_string();
                }
            }
            claims::NODE_COUNT => info.node_count = parse_cpu_cores(value),
            claims::CPU => info.cpu_cores = parse_cpu_cores(value),
            claims::MEMORY => info.memory_gb = parse_memory_gb(value),
            claims::STORAGE => info.storage_gb = parse_storage_gb(value),
            _ => {
                info.claims.insert(claim.name.clone(), claim.value.clone());
            }
        }
    }
}

/// Fill capacity still missing after claims from the status capacity map
fn apply_reported_capacity(info: &mut ClusterInfo, capacity: &BTreeMap<String, String>) {
    if info.cpu_cores == 0 {
        if let Some(cpu) = capacity.get("cpu") {
            info.cpu_cores = parse_cpu_cores(cpu);
        }
    }
    if info.memory_gb == 0 {
        if let Some(memory) = capacity.get("memory") {
            info.memory_gb = parse_memory_gb(memory);
        }
    }
    if info.storage_gb == 0 {
        if let Some(storage) = capacity
            .get("ephemeral-storage")
            .or_else(|| capacity.get("storage"))
        {
            info.storage_gb = parse_storage_gb(storage);
        }
    }
}

fn apply_label_fallbacks(info: &mut ClusterInfo) {
    if info.provider.is_empty() {
        if let Some(value) = first_label(&info.labels, labels::PROVIDER_FALLBACK_LABELS) {
            info.provider = canonical_provider(value);
        }
    }
    if info.region.is_empty() {
        if let Some(value) = first_label(&info.labels, labels::REGION_FALLBACK_LABELS) {
            info.region = value.to_string();
        }
    }
}

fn first_label<'a>(labels: &'a BTreeMap<String, String>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| labels.get(*key))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
}

/// Fill zero capacity fields from the node count; non-zero fields are kept
pub fn estimate_capacity(info: &mut ClusterInfo) {
    if info.cpu_cores > 0 && info.memory_gb > 0 && info.storage_gb > 0 {
        return;
    }

    if info.node_count == 0 {
        info.node_count = 1;
    }

    let nodes = info.node_count;
    if info.cpu_cores == 0 {
        info.cpu_cores = nodes.saturating_mul(ESTIMATED_CPU_PER_NODE);
    }
    if info.memory_gb == 0 {
        info.memory_gb = nodes.saturating_mul(ESTIMATED_MEMORY_GB_PER_NODE);
    }
    if info.storage_gb == 0 {
        info.storage_gb = nodes.saturating_mul(ESTIMATED_STORAGE_GB_PER_NODE);
    }
}

/// Map vendor spellings onto `aws`/`azure`/`gcp`; placeholders become empty
pub fn canonical_provider(value: &str) -> String {
    let lower = value.trim().to_ascii_lowercase();
    match lower.as_str() {
        "aws" | "amazon" | "eks" => "aws".to_string(),
        "azure" | "microsoft" | "aks" => "azure".to_string(),
        "gcp" | "google" | "gke" | "gce" => "gcp".to_string(),
        "" | "other" | UNKNOWN_PROVIDER => String::new(),
        _ => lower,
    }
}

/// Guess the provider from instance types, then from any label or annotation
/// mentioning a provider
pub fn infer_provider(
    cluster_labels: &BTreeMap<String, String>,
    cluster_annotations: &BTreeMap<String, String>,
) -> String {
    for key in labels::INSTANCE_TYPE_LABELS {
        if let Some(provider) = cluster_labels
            .get(*key)
            .and_then(|t| provider_from_instance_type(t))
        {
            return provider.to_string();
        }
    }

    for (key, value) in cluster_labels.iter().chain(cluster_annotations.iter()) {
        let haystack = format!("{}={}", key, value).to_ascii_lowercase();
        for needle in ["aws", "azure", "gcp"] {
            if haystack.contains(needle) {
                return needle.to_string();
            }
        }
    }

    UNKNOWN_PROVIDER.to_string()
}

fn provider_from_instance_type(instance_type: &str) -> Option<&'static str> {
    let lower = instance_type.trim().to_ascii_lowercase();
    if lower.is_empty() {
        return None;
    }

    if lower.starts_with("standard_") {
        return Some("azure");
    }

    if GCP_MACHINE_PREFIXES.iter().any(|p| lower.starts_with(p))
        || GCP_MACHINE_CLASSES.iter().any(|c| lower.contains(c))
    {
        return Some("gcp");
    }

    // AWS names look like `m5.xlarge`, `t3a.micro`, `c6gn.16xlarge`
    if let Some((family, size)) = lower.split_once('.') {
        let family_ok = (2..=8).contains(&family.len())
            && family.starts_with(|c: char| c.is_ascii_alphabetic())
            && family.chars().all(|c| c.is_ascii_alphanumeric())
            && family.chars().any(|c| c.is_ascii_digit());
        let size_ok = !size.is_empty() && size.chars().all(|c| c.is_ascii_alphanumeric());
        if family_ok && size_ok {
            return Some("aws");
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClusterClaim, ClusterCondition, ClusterTaint};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn condition(condition_type: &str, status: &str) -> ClusterCondition {
        ClusterCondition {
            condition_type: condition_type.to_string(),
            status: status.to_string(),
        }
    }

    fn claim(name: &str, value: &str) -> ClusterClaim {
        ClusterClaim {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    fn accepted_record(name: &str) -> ManagedClusterRecord {
        ManagedClusterRecord {
            name: name.to_string(),
            hub_accepts_client: true,
            conditions: vec![
                condition(conditions::JOINED, "True"),
                condition(conditions::AVAILABLE, "True"),
            ],
            client_urls: vec![format!("https://api.{}.example.com:6443", name)],
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_name_is_rejected() {
        let record = ManagedClusterRecord::default();
        assert!(matches!(
            normalize(&record, now()),
            Err(NormalizeError::MissingName)
        ));
    }

    #[test]
    fn test_status_pending_acceptance_wins() {
        let mut record = accepted_record("east");
        record.hub_accepts_client = false;
        assert_eq!(classify_status(&record), ClusterStatus::PendingAcceptance);
    }

    #[test]
    fn test_status_available_and_unavailable() {
        let record = accepted_record("east");
        assert_eq!(classify_status(&record), ClusterStatus::Available);

        let mut record = accepted_record("east");
        record.conditions = vec![
            condition(conditions::JOINED, "True"),
            condition(conditions::AVAILABLE, "False"),
        ];
        assert_eq!(classify_status(&record), ClusterStatus::Unavailable);
    }

    #[test]
    fn test_status_joining_when_not_joined() {
        let mut record = accepted_record("east");
        record.conditions = vec![condition(conditions::AVAILABLE, "Unknown")];
        assert_eq!(classify_status(&record), ClusterStatus::Joining);
    }

    #[test]
    fn test_status_maintenance_and_unknown() {
        let mut record = accepted_record("east");
        record.conditions = vec![condition(conditions::JOINED, "True")];
        assert_eq!(classify_status(&record), ClusterStatus::Unknown);

        record.taints.push(ClusterTaint {
            key: "maintenance".to_string(),
            value: "planned".to_string(),
            effect: taints::NO_SELECT.to_string(),
        });
        assert_eq!(classify_status(&record), ClusterStatus::Maintenance);
    }

    #[test]
    fn test_available_flag_requires_true_sentinel() {
        let mut record = accepted_record("east");
        record.conditions = vec![condition(conditions::AVAILABLE, "true")];
        let info = normalize(&record, now()).unwrap();
        assert!(!info.available);
        assert!(info.accepted);
    }

    #[test]
    fn test_claims_populate_fields_and_keep_unknown() {
        let mut record = accepted_record("east");
        record.claims = vec![
            claim(claims::PLATFORM, "AWS"),
            claim(claims::REGION, "us-east-1"),
            claim(claims::KUBE_VERSION, "v1.28.3"),
            claim(claims::NODE_COUNT, "3"),
            claim(claims::CPU, "12"),
            claim(claims::MEMORY, "48Gi"),
            claim(claims::STORAGE, "300Gi"),
            claim("id.k8s.io", "c0ffee"),
        ];

        let info = normalize(&record, now()).unwrap();
        assert_eq!(info.provider, "aws");
        assert_eq!(info.region, "us-east-1");
        assert_eq!(info.kubernetes_version, "v1.28.3");
        assert_eq!(info.node_count, 3);
        assert_eq!(info.cpu_cores, 12);
        assert_eq!(info.memory_gb, 48);
        assert_eq!(info.storage_gb, 300);
        assert_eq!(info.claims.len(), 1);
        assert_eq!(info.claims["id.k8s.io"], "c0ffee");
        assert_eq!(info.api_endpoint, "https://api.east.example.com:6443");
        assert_eq!(info.last_seen, now());
    }

    #[test]
    fn test_reported_capacity_fills_missing_claims() {
        let mut record = accepted_record("east");
        record.claims = vec![claim(claims::CPU, "8")];
        record.capacity.insert("cpu".to_string(), "64".to_string());
        record.capacity.insert("memory".to_string(), "32Gi".to_string());
        record
            .capacity
            .insert("ephemeral-storage".to_string(), "200Gi".to_string());

        let info = normalize(&record, now()).unwrap();
        assert_eq!(info.cpu_cores, 8);
        assert_eq!(info.memory_gb, 32);
        assert_eq!(info.storage_gb, 200);
    }

    #[test]
    fn test_estimation_does_not_overwrite_cpu() {
        let mut record = accepted_record("east");
        record.claims = vec![claim(claims::NODE_COUNT, "2"), claim(claims::CPU, "6")];

        let info = normalize(&record, now()).unwrap();
        assert_eq!(info.cpu_cores, 6);
        assert_eq!(info.memory_gb, 2 * ESTIMATED_MEMORY_GB_PER_NODE);
        assert_eq!(info.storage_gb, 2 * ESTIMATED_STORAGE_GB_PER_NODE);
    }

    #[test]
    fn test_estimation_defaults_to_one_node() {
        let info = normalize(&accepted_record("east"), now()).unwrap();
        assert_eq!(info.node_count, 1);
        assert_eq!(info.cpu_cores, ESTIMATED_CPU_PER_NODE);
        assert_eq!(info.memory_gb, ESTIMATED_MEMORY_GB_PER_NODE);
        assert_eq!(info.storage_gb, ESTIMATED_STORAGE_GB_PER_NODE);
    }

    #[test]
    fn test_label_fallbacks_for_provider_and_region() {
        let mut record = accepted_record("east");
        record.labels.insert("cloud".to_string(), "Amazon".to_string());
        record
            .labels
            .insert("region".to_string(), "eu-west-1".to_string());

        let info = normalize(&record, now()).unwrap();
        assert_eq!(info.provider, "aws");
        assert_eq!(info.region, "eu-west-1");
    }

    #[test]
    fn test_placeholder_platform_claim_falls_through_to_inference() {
        let mut record = accepted_record("east");
        record.claims = vec![claim(claims::PLATFORM, "Other")];
        record.labels.insert(
            "node.kubernetes.io/instance-type".to_string(),
            "Standard_D4s_v3".to_string(),
        );

        let info = normalize(&record, now()).unwrap();
        assert_eq!(info.provider, "azure");
    }

    #[test]
    fn test_provider_from_instance_types() {
        assert_eq!(provider_from_instance_type("m5.xlarge"), Some("aws"));
        assert_eq!(provider_from_instance_type("t3a.micro"), Some("aws"));
        assert_eq!(provider_from_instance_type("Standard_D2s_v3"), Some("azure"));
        assert_eq!(provider_from_instance_type("n1-standard-4"), Some("gcp"));
        assert_eq!(provider_from_instance_type("e2-medium"), Some("gcp"));
        assert_eq!(provider_from_instance_type("bare-metal"), None);
        assert_eq!(provider_from_instance_type("large.box"), None);
    }

    #[test]
    fn test_infer_provider_substring_scan() {
        let mut labels = BTreeMap::new();
        let mut annotations = BTreeMap::new();
        assert_eq!(infer_provider(&labels, &annotations), UNKNOWN_PROVIDER);

        annotations.insert(
            "console.example.com/link".to_string(),
            "https://console.gcp.example.com".to_string(),
        );
        assert_eq!(infer_provider(&labels, &annotations), "gcp");

        labels.insert(
            "beta.kubernetes.io/instance-type".to_string(),
            "c5.2xlarge".to_string(),
        );
        assert_eq!(infer_provider(&labels, &annotations), "aws");
    }

    #[test]
    fn test_display_name_label_override() {
        let mut record = accepted_record("east");
        let info = normalize(&record, now()).unwrap();
        assert_eq!(info.display_name, "east");

        record.labels.insert(
            labels::DISPLAY_NAME_LABEL.to_string(),
            "US East Production".to_string(),
        );
        let info = normalize(&record, now()).unwrap();
        assert_eq!(info.display_name, "US East Production");
        assert_eq!(info.name, "east");
    }

    #[test]
    fn test_labels_and_annotations_copied_verbatim() {
        let mut record = accepted_record("east");
        record.labels.insert("team".to_string(), "infra".to_string());
        record
            .annotations
            .insert("note".to_string(), "Primary".to_string());

        let info = normalize(&record, now()).unwrap();
        assert_eq!(info.labels, record.labels);
        assert_eq!(info.annotations, record.annotations);
    }
}
