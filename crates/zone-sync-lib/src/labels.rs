//! Well-known label, annotation, claim and condition keys

use std::collections::BTreeMap;

/// Domain used by the hub for its own labels, annotations and claims
pub const HUB_DOMAIN: &str = "open-cluster-management.io";

/// Management marker carried by every zone this engine owns
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "zone-sync";

pub const SYNC_SOURCE_LABEL: &str = "zone-sync.io/source";
pub const SYNC_SOURCE_VALUE: &str = "hub";

pub const CLUSTER_NAME_LABEL: &str = "zone-sync.io/cluster-name";
pub const PROVIDER_LABEL: &str = "zone-sync.io/provider";
pub const REGION_LABEL: &str = "zone-sync.io/region";

pub const DESCRIPTION_ANNOTATION: &str = "zone-sync.io/description";
pub const CLAIM_ANNOTATION_PREFIX: &str = "zone-sync.io/claim-";

/// Label overriding the display name of a managed cluster
pub const DISPLAY_NAME_LABEL: &str = "cluster.open-cluster-management.io/display-name";

/// Labels consulted when claims carry no provider or region
pub const PROVIDER_FALLBACK_LABELS: &[&str] = &["cloud", "provider", "cloud-provider"];
pub const REGION_FALLBACK_LABELS: &[&str] = &["region", "topology.kubernetes.io/region"];

/// Node labels carrying the cloud instance type
pub const INSTANCE_TYPE_LABELS: &[&str] = &[
    "node.kubernetes.io/instance-type",
    "beta.kubernetes.io/instance-type",
];

pub mod conditions {
    pub const AVAILABLE: &str = "ManagedClusterConditionAvailable";
    pub const JOINED: &str = "ManagedClusterJoined";
    pub const STATUS_TRUE: &str = "True";
    pub const STATUS_FALSE: &str = "False";
}

pub mod taints {
    /// Effect that keeps a cluster out of placement decisions
    pub const NO_SELECT: &str = "NoSelect";
}

pub mod claims {
    pub const PLATFORM: &str = "platform.open-cluster-management.io";
    pub const REGION: &str = "region.open-cluster-management.io";
    pub const KUBE_VERSION: &str = "kubeversion.open-cluster-management.io";
    pub const NODE_COUNT: &str = "nodes.capacity.open-cluster-management.io";
    pub const CPU: &str = "cpu.capacity.open-cluster-management.io";
    pub const MEMORY: &str = "memory.capacity.open-cluster-management.io";
    pub const STORAGE: &str = "storage.capacity.open-cluster-management.io";
}

/// Whether a label set carries the engine's management marker
pub fn is_managed(labels: &BTreeMap<String, String>) -> bool {
    labels
        .get(MANAGED_BY_LABEL)
        .is_some_and(|v| v == MANAGED_BY_VALUE)
}
