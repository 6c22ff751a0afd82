//! Zone reconciler
//!
//! Diffs the desired zones produced from discovery against the zones already
//! in the store and applies creates, significant updates and retirements.
//! Only engine-managed zones are ever touched. Individual store failures are
//! logged and counted; the remaining zones are still processed.

use super::{compute_quota, ZoneStore};
use crate::clock::Clock;
use crate::models::{Resources, Zone, ZoneStatus};
use crate::observability::StructuredLogger;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How long a retired zone stays `Unavailable` before it is deleted
pub const GRACE_PERIOD: Duration = Duration::from_secs(72 * 60 * 60);

/// Age of `last_sync` after which an unchanged zone is rewritten anyway
pub const STALE_SYNC_AFTER: Duration = Duration::from_secs(24 * 60 * 60);

/// Relative capacity change (percent of the stored value) that warrants a write
pub const SIGNIFICANT_CAPACITY_CHANGE_PERCENT: i64 = 10;

#[derive(Debug, Clone)]
pub struct ReconcilePolicy {
    /// Create zones for newly discovered clusters
    pub auto_create: bool,
    /// Quota percentage applied on update; `<= 0` keeps the stored quota
    pub quota_percent: i64,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            auto_create: true,
            quota_percent: super::DEFAULT_QUOTA_PERCENT,
        }
    }
}

/// Counts of the actions applied by one reconcile pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Zones kept because workloads still reference them
    pub preserved: usize,
    /// Per-zone store errors that were logged and skipped
    pub failures: usize,
}

impl ReconcileOutcome {
    pub fn changes(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

pub struct ZoneReconciler {
    store: Arc<dyn ZoneStore>,
    clock: Arc<dyn Clock>,
    policy: ReconcilePolicy,
    logger: StructuredLogger,
}

impl ZoneReconciler {
    pub fn new(store: Arc<dyn ZoneStore>, clock: Arc<dyn Clock>, policy: ReconcilePolicy) -> Self {
        Self {
            store,
            clock,
            policy,
            logger: StructuredLogger::default(),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn policy(&self) -> &ReconcilePolicy {
        &self.policy
    }

    pub fn set_policy(&mut self, policy: ReconcilePolicy) {
        self.policy = policy;
    }

    /// Apply `desired` against `existing`, writing through the store
    pub async fn reconcile(&self, desired: Vec<Zone>, existing: Vec<Zone>) -> ReconcileOutcome {
        let now = self.clock.now();
        let mut outcome = ReconcileOutcome::default();

        let desired = index_by_cluster(desired, "desired");
        let mut existing = index_by_cluster(
            existing.into_iter().filter(Zone::is_managed).collect(),
            "existing",
        );

        let mut cluster_names: Vec<&String> = desired.keys().collect();
        cluster_names.sort();

        for cluster_name in cluster_names {
            let wanted = &desired[cluster_name];
            match existing.remove(cluster_name) {
                None => self.create(wanted, &mut outcome).await,
                Some(current) => self.update(wanted, current, now, &mut outcome).await,
            }
        }

        let mut orphans: Vec<Zone> = existing.into_values().collect();
        orphans.sort_by(|a, b| a.id.cmp(&b.id));
        for zone in orphans {
            self.retire(zone, now, &mut outcome).await;
        }

        info!(
            created = outcome.created,
            updated = outcome.updated,
            deleted = outcome.deleted,
            preserved = outcome.preserved,
            failures = outcome.failures,
            "Zone reconciliation complete"
        );

        outcome
    }

    async fn create(&self, wanted: &Zone, outcome: &mut ReconcileOutcome) {
        if !self.policy.auto_create {
            info!(cluster = %wanted.cluster_name, "Auto-create disabled, skipping new cluster");
            return;
        }

        match self.store.create_zone(wanted.clone()).await {
            Ok(()) => {
                self.logger.log_zone_created(wanted);
                outcome.created += 1;
            }
            Err(e) => {
                error!(zone_id = %wanted.id, error = %e, "Failed to create zone");
                outcome.failures += 1;
            }
        }
    }

    async fn update(
        &self,
        wanted: &Zone,
        current: Zone,
        now: DateTime<Utc>,
        outcome: &mut ReconcileOutcome,
    ) {
        if !needs_update(wanted, &current, now) {
            debug!(zone_id = %current.id, "Zone up to date");
            return;
        }

        let merged = self.merge(wanted, current, now);
        match self.store.update_zone(merged.clone()).await {
            Ok(()) => {
                self.logger.log_zone_updated(&merged);
                outcome.updated += 1;
            }
            Err(e) => {
                error!(zone_id = %merged.id, error = %e, "Failed to update zone");
                outcome.failures += 1;
            }
        }
    }

    fn merge(&self, wanted: &Zone, current: Zone, now: DateTime<Utc>) -> Zone {
        let mut labels = current.labels;
        labels.extend(wanted.labels.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut annotations = current.annotations;
        annotations.extend(wanted.annotations.iter().map(|(k, v)| (k.clone(), v.clone())));

        let quota = if self.policy.quota_percent <= 0 {
            current.quota
        } else {
            let percent = self.policy.quota_percent;
            Resources::new(
                compute_quota(wanted.capacity.cpu_cores, percent),
                compute_quota(wanted.capacity.memory_gb, percent),
                compute_quota(wanted.capacity.storage_gb, percent),
            )
        };

        Zone {
            id: current.id,
            name: wanted.name.clone(),
            cluster_name: wanted.cluster_name.clone(),
            status: wanted.status,
            region: wanted.region.clone(),
            cloud_provider: wanted.cloud_provider.clone(),
            api_endpoint: wanted.api_endpoint.clone(),
            node_count: wanted.node_count,
            capacity: wanted.capacity,
            quota,
            labels,
            annotations,
            last_sync: now,
            created_at: current.created_at,
            updated_at: now,
        }
    }

    async fn retire(&self, mut zone: Zone, now: DateTime<Utc>, outcome: &mut ReconcileOutcome) {
        let workloads = match self.store.count_workloads_in_zone(&zone.id).await {
            Ok(count) => count,
            Err(e) => {
                warn!(zone_id = %zone.id, error = %e, "Failed to count workloads, skipping zone this cycle");
                outcome.failures += 1;
                return;
            }
        };

        if workloads > 0 {
            self.logger.log_zone_preserved(&zone, workloads);
            outcome.preserved += 1;
            return;
        }

        if zone.status == ZoneStatus::Unavailable {
            if !elapsed_more_than(now, zone.updated_at, GRACE_PERIOD) {
                debug!(zone_id = %zone.id, "Retired zone within grace period");
                return;
            }

            match self.store.delete_zone(&zone.id).await {
                Ok(()) => {
                    self.logger.log_zone_deleted(&zone);
                    outcome.deleted += 1;
                }
                Err(e) => {
                    error!(zone_id = %zone.id, error = %e, "Failed to delete zone");
                    outcome.failures += 1;
                }
            }
            return;
        }

        zone.status = ZoneStatus::Unavailable;
        zone.updated_at = now;
        match self.store.update_zone(zone.clone()).await {
            Ok(()) => {
                self.logger.log_zone_retired(&zone);
                outcome.updated += 1;
            }
            Err(e) => {
                error!(zone_id = %zone.id, error = %e, "Failed to mark zone unavailable");
                outcome.failures += 1;
            }
        }
    }
}

fn index_by_cluster(zones: Vec<Zone>, side: &str) -> HashMap<String, Zone> {
    let mut index = HashMap::with_capacity(zones.len());
    for zone in zones {
        if let Some(previous) = index.insert(zone.cluster_name.clone(), zone) {
            warn!(
                cluster = %previous.cluster_name,
                replaced_zone = %previous.id,
                side = side,
                "Duplicate cluster name, keeping the last zone"
            );
        }
    }
    index
}

fn elapsed_more_than(now: DateTime<Utc>, since: DateTime<Utc>, limit: Duration) -> bool {
    now.signed_duration_since(since)
        .to_std()
        .map(|elapsed| elapsed > limit)
        .unwrap_or(false)
}

fn significant_change(desired: i64, existing: i64) -> bool {
    if existing <= 0 {
        return false;
    }
    let delta = i128::from(desired) - i128::from(existing);
    delta.abs() * 100 > i128::from(existing) * i128::from(SIGNIFICANT_CAPACITY_CHANGE_PERCENT)
}

fn needs_update(desired: &Zone, existing: &Zone, now: DateTime<Utc>) -> bool {
    desired.status != existing.status
        || desired.api_endpoint != existing.api_endpoint
        || significant_change(desired.capacity.cpu_cores, existing.capacity.cpu_cores)
        || significant_change(desired.capacity.memory_gb, existing.capacity.memory_gb)
        || significant_change(desired.capacity.storage_gb, existing.capacity.storage_gb)
        || elapsed_more_than(now, existing.last_sync, STALE_SYNC_AFTER)
}
