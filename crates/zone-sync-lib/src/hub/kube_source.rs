//! Kubernetes-backed hub registry source
//!
//! Reads `cluster.open-cluster-management.io/v1` `ManagedCluster` objects as
//! untyped [`DynamicObject`]s and decodes the parts the engine needs.

use super::{HubError, HubRegistrySource};
use crate::models::{ClusterClaim, ClusterCondition, ClusterTaint, ManagedClusterRecord};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, DynamicObject, ListParams};
use kube::discovery::ApiResource;
use kube::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

const GROUP: &str = "cluster.open-cluster-management.io";
const VERSION: &str = "v1";
const KIND: &str = "ManagedCluster";
const PLURAL: &str = "managedclusters";

fn managed_cluster_resource() -> ApiResource {
    ApiResource {
        group: GROUP.to_string(),
        version: VERSION.to_string(),
        api_version: format!("{}/{}", GROUP, VERSION),
        kind: KIND.to_string(),
        plural: PLURAL.to_string(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ManagedClusterSpec {
    hub_accepts_client: bool,
    managed_cluster_client_configs: Vec<ClientConfig>,
    taints: Vec<TaintSpec>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClientConfig {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TaintSpec {
    key: String,
    value: String,
    effect: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ManagedClusterStatus {
    conditions: Vec<ConditionSpec>,
    capacity: BTreeMap<String, serde_json::Value>,
    version: VersionSpec,
    cluster_claims: Vec<ClaimSpec>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConditionSpec {
    #[serde(rename = "type")]
    condition_type: String,
    status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VersionSpec {
    kubernetes: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClaimSpec {
    name: String,
    value: String,
}

/// Decode a `ManagedCluster` document into a record
pub fn record_from_object(obj: &DynamicObject) -> Result<ManagedClusterRecord, HubError> {
    let name = obj.metadata.name.clone().unwrap_or_default();

    let spec: ManagedClusterSpec = decode_section(obj, "spec", &name)?;
    let status: ManagedClusterStatus = decode_section(obj, "status", &name)?;

    let capacity = status
        .capacity
        .into_iter()
        .map(|(resource, quantity)| {
            let quantity = match quantity {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (resource, quantity)
        })
        .collect();

    Ok(ManagedClusterRecord {
        name,
        labels: obj.metadata.labels.clone().unwrap_or_default(),
        annotations: obj.metadata.annotations.clone().unwrap_or_default(),
        conditions: status
            .conditions
            .into_iter()
            .map(|c| ClusterCondition {
                condition_type: c.condition_type,
                status: c.status,
            })
            .collect(),
        claims: status
            .cluster_claims
            .into_iter()
            .map(|c| ClusterClaim {
                name: c.name,
                value: c.value,
            })
            .collect(),
        capacity,
        hub_accepts_client: spec.hub_accepts_client,
        taints: spec
            .taints
            .into_iter()
            .map(|t| ClusterTaint {
                key: t.key,
                value: t.value,
                effect: t.effect,
            })
            .collect(),
        client_urls: spec
            .managed_cluster_client_configs
            .into_iter()
            .map(|c| c.url)
            .filter(|url| !url.is_empty())
            .collect(),
        kubernetes_version: Some(status.version.kubernetes).filter(|v| !v.is_empty()),
    })
}

fn decode_section<T>(obj: &DynamicObject, section: &str, name: &str) -> Result<T, HubError>
where
    T: Default + serde::de::DeserializeOwned,
{
    match obj.data.get(section) {
        None | Some(serde_json::Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| HubError::Decode(format!("{} of '{}': {}", section, name, e))),
    }
}

/// Hub registry source backed by the hub cluster's Kubernetes API
pub struct KubeHubSource {
    client: Client,
    hub_namespace: String,
}

impl KubeHubSource {
    pub fn new(client: Client, hub_namespace: impl Into<String>) -> Self {
        Self {
            client,
            hub_namespace: hub_namespace.into(),
        }
    }

    /// Connect using the in-cluster or kubeconfig defaults
    pub async fn try_default(hub_namespace: impl Into<String>) -> Result<Self, HubError> {
        let client = Client::try_default()
            .await
            .map_err(|e| HubError::Unreachable(format!("failed to build hub client: {}", e)))?;
        Ok(Self::new(client, hub_namespace))
    }

    pub fn hub_namespace(&self) -> &str {
        &self.hub_namespace
    }

    /// Verify that the hub namespace exists, for actionable startup diagnostics
    pub async fn check_installed(&self) -> Result<(), HubError> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        match namespaces.get(&self.hub_namespace).await {
            Ok(_) => {
                info!(namespace = %self.hub_namespace, "Hub namespace present");
                Ok(())
            }
            Err(kube::Error::Api(ae)) if ae.code == 404 => Err(HubError::NotInstalled(format!(
                "hub namespace '{}' does not exist",
                self.hub_namespace
            ))),
            Err(e) => Err(classify_kube_error(e)),
        }
    }

    fn api(&self) -> Api<DynamicObject> {
        Api::all_with(self.client.clone(), &managed_cluster_resource())
    }
}

/// Map transport failures to `Unreachable`, everything else to `Request`
fn classify_kube_error(err: kube::Error) -> HubError {
    match err {
        kube::Error::HyperError(e) => HubError::Unreachable(e.to_string()),
        kube::Error::Service(e) => HubError::Unreachable(e.to_string()),
        kube::Error::Api(ae) => HubError::Request(format!("{} ({})", ae.message, ae.code)),
        other => HubError::Request(other.to_string()),
    }
}

#[async_trait]
impl HubRegistrySource for KubeHubSource {
    async fn list_managed_clusters(&self) -> Result<Vec<ManagedClusterRecord>, HubError> {
        let list = match self.api().list(&ListParams::default()).await {
            Ok(list) => list,
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                return Err(HubError::NotInstalled(format!(
                    "{}.{} is not served by the hub",
                    PLURAL, GROUP
                )));
            }
            Err(e) => return Err(classify_kube_error(e)),
        };

        let mut records = Vec::with_capacity(list.items.len());
        for obj in &list.items {
            match record_from_object(obj) {
                Ok(record) => records.push(record),
                Err(e) => warn!(error = %e, "Skipping undecodable managed cluster"),
            }
        }

        debug!(count = records.len(), "Listed managed clusters");
        Ok(records)
    }

    async fn get_managed_cluster(&self, name: &str) -> Result<ManagedClusterRecord, HubError> {
        match self.api().get(name).await {
            Ok(obj) => record_from_object(&obj),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Err(HubError::NotFound(name.to_string())),
            Err(e) => Err(classify_kube_error(e)),
        }
    }
}
