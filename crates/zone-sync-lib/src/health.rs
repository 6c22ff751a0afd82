//! Component health for the sync daemon
//!
//! Each cycle reports the outcome of discovery and reconciliation here. A
//! component keeps the error of its last failed cycle and a run of
//! consecutive failures, which back the liveness and readiness probes of the
//! admin API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Failing but the daemon keeps serving the last known zones
    Degraded,
    Unhealthy,
}

/// Component names for health tracking
pub mod components {
    pub const DISCOVERY: &str = "discovery";
    pub const RECONCILER: &str = "reconciler";
    pub const SCHEDULER: &str = "scheduler";

    pub const ALL: &[&str] = &[DISCOVERY, RECONCILER, SCHEDULER];
}

/// Consecutive discovery failures after which the daemon stops reporting ready
pub const DISCOVERY_FAILURES_BEFORE_UNREADY: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Failed cycles since the last success
    pub consecutive_failures: u32,
    /// Error of the most recent failed cycle, kept after recovery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error_at: Option<DateTime<Utc>>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn new() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: None,
            consecutive_failures: 0,
            last_error: None,
            last_error_at: None,
            last_check_timestamp: Utc::now().timestamp(),
        }
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status across components; healthy when none are registered
    pub fn compute_status(components: &BTreeMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Health registry shared by the scheduler and the admin API
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<BTreeMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every sync engine component as healthy
    pub async fn register_all(&self) {
        let mut map = self.components.write().await;
        for name in components::ALL {
            map.insert(name.to_string(), ComponentHealth::new());
        }
    }

    pub async fn component(&self, name: &str) -> Option<ComponentHealth> {
        self.components.read().await.get(name).cloned()
    }

    /// A cycle step succeeded: healthy again and the failure run resets
    pub async fn record_success(&self, name: &str) {
        self.with_component(name, |c| {
            c.status = ComponentStatus::Healthy;
            c.message = None;
            c.consecutive_failures = 0;
        })
        .await;
    }

    /// A cycle step failed with the given severity
    pub async fn record_failure(
        &self,
        name: &str,
        status: ComponentStatus,
        error: impl Into<String>,
    ) {
        let error = error.into();
        self.with_component(name, |c| {
            c.status = status;
            c.message = Some(error.clone());
            c.consecutive_failures = c.consecutive_failures.saturating_add(1);
            c.last_error = Some(error);
            c.last_error_at = Some(Utc::now());
        })
        .await;
    }

    /// Status change that is not a cycle outcome, e.g. the scheduler stopping
    pub async fn set_status(&self, name: &str, status: ComponentStatus, message: Option<String>) {
        self.with_component(name, |c| {
            c.status = status;
            c.message = message;
        })
        .await;
    }

    async fn with_component(&self, name: &str, apply: impl FnOnce(&mut ComponentHealth)) {
        let mut map = self.components.write().await;
        let component = map
            .entry(name.to_string())
            .or_insert_with(ComponentHealth::new);
        apply(component);
        component.last_check_timestamp = Utc::now().timestamp();
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    /// Ready once started, unless a component is unhealthy or the hub has
    /// been failing for several cycles in a row
    pub async fn readiness(&self) -> ReadinessResponse {
        let not_ready = |reason: String| ReadinessResponse {
            ready: false,
            reason: Some(reason),
        };

        if !*self.ready.read().await {
            return not_ready("Zone sync not yet initialized".to_string());
        }

        let health = self.health().await;
        if let Some((name, _)) = health
            .components
            .iter()
            .find(|(_, c)| c.status == ComponentStatus::Unhealthy)
        {
            return not_ready(format!("Component {} unhealthy", name));
        }

        if let Some(discovery) = health.components.get(components::DISCOVERY) {
            if discovery.consecutive_failures >= DISCOVERY_FAILURES_BEFORE_UNREADY {
                return not_ready(format!(
                    "Discovery failed {} cycles in a row",
                    discovery.consecutive_failures
                ));
            }
        }

        ReadinessResponse {
            ready: true,
            reason: None,
        }
    }
}
