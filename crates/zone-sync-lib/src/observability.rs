//! Observability infrastructure for the zone sync engine
//!
//! Provides:
//! - Prometheus metrics (cycle latency, cycle results, discovered clusters, zone actions)
//! - Structured event logging with tracing

use crate::models::{SyncResult, Zone};
use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, Histogram, IntCounterVec,
    IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for cycle durations (in seconds)
const CYCLE_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<SyncMetricsInner> = OnceLock::new();

struct SyncMetricsInner {
    cycle_duration_seconds: Histogram,
    cycles_total: IntCounterVec,
    clusters_discovered: IntGauge,
    zone_actions_total: IntCounterVec,
    last_success_timestamp_seconds: IntGauge,
}

impl SyncMetricsInner {
    fn new() -> Self {
        Self {
            cycle_duration_seconds: register_histogram!(
                "zone_sync_cycle_duration_seconds",
                "Time spent running one discovery and reconciliation cycle",
                CYCLE_BUCKETS.to_vec()
            )
            .expect("Failed to register cycle_duration_seconds"),

            cycles_total: register_int_counter_vec!(
                "zone_sync_cycles_total",
                "Number of sync cycles by result",
                &["result"]
            )
            .expect("Failed to register cycles_total"),

            clusters_discovered: register_int_gauge!(
                "zone_sync_clusters_discovered",
                "Managed clusters discovered in the last successful cycle"
            )
            .expect("Failed to register clusters_discovered"),

            zone_actions_total: register_int_counter_vec!(
                "zone_sync_zone_actions_total",
                "Zone writes applied by the reconciler",
                &["action"]
            )
            .expect("Failed to register zone_actions_total"),

            last_success_timestamp_seconds: register_int_gauge!(
                "zone_sync_last_success_timestamp_seconds",
                "Unix time of the last successful sync cycle"
            )
            .expect("Failed to register last_success_timestamp_seconds"),
        }
    }
}

/// Sync metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct SyncMetrics {
    _private: (),
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(SyncMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &SyncMetricsInner {
        GLOBAL_METRICS.get_or_init(SyncMetricsInner::new)
    }

    /// Record everything a finished cycle reports
    pub fn record_cycle(&self, result: &SyncResult) {
        let inner = self.inner();
        inner
            .cycle_duration_seconds
            .observe(result.duration_ms as f64 / 1000.0);

        if result.success {
            inner.cycles_total.with_label_values(&["success"]).inc();
            inner.clusters_discovered.set(result.clusters_found as i64);
            inner
                .last_success_timestamp_seconds
                .set(result.timestamp.timestamp());
            self.add_zone_actions("created", result.zones_created);
            self.add_zone_actions("updated", result.zones_updated);
            self.add_zone_actions("deleted", result.zones_deleted);
        } else {
            inner.cycles_total.with_label_values(&["failure"]).inc();
        }
    }

    /// Count a cycle that was skipped because another one was in flight
    pub fn inc_skipped_cycle(&self) {
        self.inner().cycles_total.with_label_values(&["skipped"]).inc();
    }

    #[cfg(test)]
    pub(crate) fn cycle_count(&self, result: &str) -> u64 {
        self.inner().cycles_total.with_label_values(&[result]).get()
    }

    fn add_zone_actions(&self, action: &str, count: usize) {
        if count > 0 {
            self.inner()
                .zone_actions_total
                .with_label_values(&[action])
                .inc_by(count as u64);
        }
    }
}

/// Structured logger for engine events
///
/// Every line carries an `event` tag and the instance name so sync activity
/// can be filtered out of aggregated JSON logs.
#[derive(Clone, Debug)]
pub struct StructuredLogger {
    instance: String,
}

impl Default for StructuredLogger {
    fn default() -> Self {
        Self::new("zone-sync")
    }
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn log_zone_created(&self, zone: &Zone) {
        info!(
            event = "zone_created",
            instance = %self.instance,
            zone_id = %zone.id,
            cluster = %zone.cluster_name,
            status = %zone.status,
            cpu_cores = zone.capacity.cpu_cores,
            memory_gb = zone.capacity.memory_gb,
            storage_gb = zone.capacity.storage_gb,
            "Zone created for discovered cluster"
        );
    }

    pub fn log_zone_updated(&self, zone: &Zone) {
        info!(
            event = "zone_updated",
            instance = %self.instance,
            zone_id = %zone.id,
            cluster = %zone.cluster_name,
            status = %zone.status,
            "Zone updated from discovery"
        );
    }

    pub fn log_zone_retired(&self, zone: &Zone) {
        warn!(
            event = "zone_retired",
            instance = %self.instance,
            zone_id = %zone.id,
            cluster = %zone.cluster_name,
            "Cluster no longer discovered, zone marked unavailable"
        );
    }

    pub fn log_zone_deleted(&self, zone: &Zone) {
        warn!(
            event = "zone_deleted",
            instance = %self.instance,
            zone_id = %zone.id,
            cluster = %zone.cluster_name,
            "Retired zone deleted after grace period"
        );
    }

    pub fn log_zone_preserved(&self, zone: &Zone, workloads: u64) {
        info!(
            event = "zone_preserved",
            instance = %self.instance,
            zone_id = %zone.id,
            cluster = %zone.cluster_name,
            workloads = workloads,
            "Cluster no longer discovered but zone has live workloads"
        );
    }

    /// Log the outcome of a sync cycle
    pub fn log_sync_result(&self, result: &SyncResult) {
        if result.success {
            info!(
                event = "sync_completed",
                instance = %self.instance,
                clusters_found = result.clusters_found,
                zones_created = result.zones_created,
                zones_updated = result.zones_updated,
                zones_deleted = result.zones_deleted,
                duration_ms = result.duration_ms,
                "Zone sync cycle completed"
            );
        } else {
            warn!(
                event = "sync_failed",
                instance = %self.instance,
                error = result.error_message.as_deref().unwrap_or("unknown"),
                duration_ms = result.duration_ms,
                "Zone sync cycle failed"
            );
        }
    }

    pub fn log_startup(&self, version: &str, hub_namespace: &str, interval_secs: u64) {
        info!(
            event = "sync_started",
            instance = %self.instance,
            version = %version,
            hub_namespace = %hub_namespace,
            interval_secs = interval_secs,
            "Zone sync started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "sync_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Zone sync shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_sync_metrics_record_cycles() {
        let metrics = SyncMetrics::new();

        let ok = SyncResult {
            timestamp: Utc::now(),
            success: true,
            clusters_found: 3,
            zones_created: 2,
            zones_updated: 1,
            zones_deleted: 0,
            error_message: None,
            duration_ms: 120,
        };
        metrics.record_cycle(&ok);
        metrics.record_cycle(&SyncResult::failed(Utc::now(), "hub unreachable", 5));
        metrics.inc_skipped_cycle();

        let families = prometheus::gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "zone_sync_cycles_total"));
    }

    #[test]
    fn test_structured_logger_instance() {
        let logger = StructuredLogger::new("zone-sync-0");
        assert_eq!(logger.instance(), "zone-sync-0");
        assert_eq!(StructuredLogger::default().instance(), "zone-sync");
    }
}
