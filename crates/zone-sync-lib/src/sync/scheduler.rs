//! Sync scheduler
//!
//! Runs discovery, translation and reconciliation as one cycle, either on a
//! timer or on demand. A non-blocking guard keeps at most one cycle in
//! flight: a timer tick that finds one running is skipped and a manual
//! request gets [`SyncError::CycleInProgress`].

use super::config::{ConfigError, SyncConfig, MIN_SYNC_INTERVAL};
use crate::clock::{Clock, SystemClock};
use crate::health::{components, ComponentStatus, HealthRegistry};
use crate::hub::{HubDiscoveryClient, HubError, HubRegistrySource};
use crate::models::SyncResult;
use crate::observability::{StructuredLogger, SyncMetrics};
use crate::zone::{
    ReconcileOutcome, StoreError, TranslateError, ZoneReconciler, ZoneStore, ZoneTranslator,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{broadcast, oneshot, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync scheduler is already running")]
    AlreadyRunning,

    #[error("a sync cycle is already in progress")]
    CycleInProgress,

    #[error("invalid sync configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Failures that abort a whole cycle
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("cluster discovery failed: {0}")]
    Discovery(#[from] HubError),

    #[error("failed to list existing zones: {0}")]
    ListZones(#[source] StoreError),

    #[error("failed to translate cluster: {0}")]
    Translate(#[from] TranslateError),
}

/// Snapshot of the scheduler for status surfaces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub enabled: bool,
    pub running: bool,
    pub interval_secs: u64,
    pub last_result: Option<SyncResult>,
}

struct CycleSummary {
    clusters_found: usize,
    outcome: ReconcileOutcome,
}

struct RunningLoop {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

struct SchedulerInner {
    source: Arc<dyn HubRegistrySource>,
    store: Arc<dyn ZoneStore>,
    clock: Arc<dyn Clock>,
    config: RwLock<SyncConfig>,
    interval_tx: watch::Sender<Duration>,
    cycle_guard: Mutex<()>,
    last_result: RwLock<Option<SyncResult>>,
    running: Mutex<Option<RunningLoop>>,
    health: Option<HealthRegistry>,
    metrics: SyncMetrics,
    logger: StructuredLogger,
}

/// Drives periodic zone synchronization
///
/// Cheap to clone; clones share the same loop and state.
#[derive(Clone)]
pub struct SyncScheduler {
    inner: Arc<SchedulerInner>,
}

impl SyncScheduler {
    /// Run one cycle immediately, then start the timer loop
    ///
    /// The loop exits on [`stop`](Self::stop) or when `shutdown` fires. With
    /// sync disabled this returns without spawning anything.
    pub async fn start(&self, shutdown: broadcast::Receiver<()>) -> Result<(), SyncError> {
        if self.is_running().await {
            return Err(SyncError::AlreadyRunning);
        }

        let config = self.inner.config.read().await.clone();
        config.validate()?;

        if !config.enabled {
            info!("Zone sync disabled, scheduler not started");
            return Ok(());
        }

        info!(
            interval_secs = config.interval_secs,
            hub_namespace = %config.hub_namespace,
            "Starting zone sync scheduler"
        );

        match self.inner.run_cycle().await {
            Ok(result) if !result.success => {
                warn!("Initial sync cycle failed, will retry on the next tick");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Initial sync cycle skipped"),
        }

        // Another start may have won while the initial cycle ran unlocked
        let mut running = self.inner.running.lock().await;
        if is_active(&running) {
            return Err(SyncError::AlreadyRunning);
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(run_loop(
            self.inner.clone(),
            self.inner.interval_tx.subscribe(),
            stop_rx,
            shutdown,
        ));
        *running = Some(RunningLoop { stop_tx, handle });

        if let Some(health) = &self.inner.health {
            health.record_success(components::SCHEDULER).await;
        }

        Ok(())
    }

    /// Stop the timer loop; a no-op when it is not running
    pub async fn stop(&self) {
        let Some(running) = self.inner.running.lock().await.take() else {
            return;
        };

        let _ = running.stop_tx.send(());
        if let Err(e) = running.handle.await {
            warn!(error = %e, "Sync loop task ended abnormally");
        }

        if let Some(health) = &self.inner.health {
            health
                .set_status(
                    components::SCHEDULER,
                    ComponentStatus::Degraded,
                    Some("scheduler stopped".to_string()),
                )
                .await;
        }
        info!("Zone sync scheduler stopped");
    }

    /// Run one cycle now
    pub async fn perform_sync(&self) -> Result<SyncResult, SyncError> {
        self.inner.run_cycle().await
    }

    /// Validate and swap the configuration used by subsequent cycles
    pub async fn update_config(&self, config: SyncConfig) -> Result<(), SyncError> {
        config.validate()?;

        let interval = config.interval();
        let enabled = config.enabled;
        *self.inner.config.write().await = config;

        // A disabled config may carry any interval; the timer keeps its period
        if interval >= MIN_SYNC_INTERVAL {
            self.inner.interval_tx.send_if_modified(|current| {
                if *current != interval {
                    *current = interval;
                    true
                } else {
                    false
                }
            });
        }

        info!(
            enabled = enabled,
            interval_secs = interval.as_secs(),
            "Sync configuration updated"
        );
        Ok(())
    }

    pub async fn config(&self) -> SyncConfig {
        self.inner.config.read().await.clone()
    }

    pub async fn status(&self) -> SyncStatus {
        let config = self.inner.config.read().await;
        SyncStatus {
            enabled: config.enabled,
            running: self.is_running().await,
            interval_secs: config.interval_secs,
            last_result: self.inner.last_result.read().await.clone(),
        }
    }

    pub async fn last_result(&self) -> Option<SyncResult> {
        self.inner.last_result.read().await.clone()
    }

    async fn is_running(&self) -> bool {
        is_active(&*self.inner.running.lock().await)
    }
}

fn is_active(running: &Option<RunningLoop>) -> bool {
    running.as_ref().is_some_and(|r| !r.handle.is_finished())
}

async fn run_loop(
    inner: Arc<SchedulerInner>,
    mut interval_rx: watch::Receiver<Duration>,
    mut stop_rx: oneshot::Receiver<()>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut period = *interval_rx.borrow();
    let mut ticker = ticker_for(period);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                inner.tick().await;
            }
            changed = interval_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                period = *interval_rx.borrow_and_update();
                ticker = ticker_for(period);
                info!(interval_secs = period.as_secs(), "Sync interval changed, timer rebuilt");
            }
            _ = &mut stop_rx => {
                debug!("Sync loop stop requested");
                break;
            }
            _ = shutdown.recv() => {
                info!("Shutting down zone sync loop");
                break;
            }
        }
    }
}

/// Ticker whose first tick is one full period away
fn ticker_for(period: Duration) -> tokio::time::Interval {
    let period = period.max(MIN_SYNC_INTERVAL);
    let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

impl SchedulerInner {
    async fn tick(&self) {
        if !self.config.read().await.enabled {
            debug!("Zone sync disabled, skipping tick");
            return;
        }

        match self.run_cycle().await {
            Ok(_) => {}
            Err(SyncError::CycleInProgress) => {
                self.metrics.inc_skipped_cycle();
                debug!("Previous sync cycle still running, skipping tick");
            }
            Err(e) => warn!(error = %e, "Sync tick failed"),
        }
    }

    async fn run_cycle(&self) -> Result<SyncResult, SyncError> {
        let Ok(_guard) = self.cycle_guard.try_lock() else {
            return Err(SyncError::CycleInProgress);
        };

        let config = self.config.read().await.clone();
        let timestamp = self.clock.now();
        let started = Instant::now();

        let cycle = self.execute(&config).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let result = match &cycle {
            Ok(summary) => SyncResult {
                timestamp,
                success: true,
                clusters_found: summary.clusters_found,
                zones_created: summary.outcome.created,
                zones_updated: summary.outcome.updated,
                zones_deleted: summary.outcome.deleted,
                error_message: None,
                duration_ms,
            },
            Err(e) => SyncResult::failed(timestamp, e.to_string(), duration_ms),
        };

        self.metrics.record_cycle(&result);
        self.logger.log_sync_result(&result);
        self.report_health(&cycle).await;
        *self.last_result.write().await = Some(result.clone());

        Ok(result)
    }

    async fn execute(&self, config: &SyncConfig) -> Result<CycleSummary, CycleError> {
        let discovery = HubDiscoveryClient::new(
            self.source.clone(),
            config.discovery_filter(),
            self.clock.clone(),
        );
        let clusters = discovery.discover().await?;

        let translator = ZoneTranslator::new(config.translator_config());
        let desired = clusters
            .iter()
            .map(|cluster| translator.to_zone(cluster))
            .collect::<Result<Vec<_>, _>>()?;

        let existing = self.store.list_zones().await.map_err(CycleError::ListZones)?;

        let reconciler = ZoneReconciler::new(
            self.store.clone(),
            self.clock.clone(),
            config.reconcile_policy(),
        )
        .with_logger(self.logger.clone());
        let outcome = reconciler.reconcile(desired, existing).await;

        Ok(CycleSummary {
            clusters_found: clusters.len(),
            outcome,
        })
    }

    async fn report_health(&self, cycle: &Result<CycleSummary, CycleError>) {
        let Some(health) = &self.health else {
            return;
        };

        match cycle {
            Ok(summary) => {
                health.record_success(components::DISCOVERY).await;
                if summary.outcome.failures > 0 {
                    health
                        .record_failure(
                            components::RECONCILER,
                            ComponentStatus::Degraded,
                            format!("{} zone operations failed", summary.outcome.failures),
                        )
                        .await;
                } else {
                    health.record_success(components::RECONCILER).await;
                }
            }
            Err(CycleError::Discovery(e)) => {
                health
                    .record_failure(
                        components::DISCOVERY,
                        ComponentStatus::Degraded,
                        e.to_string(),
                    )
                    .await;
            }
            Err(e @ CycleError::ListZones(_)) => {
                health.record_success(components::DISCOVERY).await;
                health
                    .record_failure(
                        components::RECONCILER,
                        ComponentStatus::Unhealthy,
                        e.to_string(),
                    )
                    .await;
            }
            Err(e @ CycleError::Translate(_)) => {
                health.record_success(components::DISCOVERY).await;
                health
                    .record_failure(
                        components::RECONCILER,
                        ComponentStatus::Degraded,
                        e.to_string(),
                    )
                    .await;
            }
        }
    }
}

/// Builder for the sync scheduler
pub struct SyncSchedulerBuilder {
    source: Option<Arc<dyn HubRegistrySource>>,
    store: Option<Arc<dyn ZoneStore>>,
    clock: Arc<dyn Clock>,
    config: SyncConfig,
    health: Option<HealthRegistry>,
    logger: StructuredLogger,
}

impl SyncSchedulerBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            store: None,
            clock: Arc::new(SystemClock),
            config: SyncConfig::default(),
            health: None,
            logger: StructuredLogger::default(),
        }
    }

    /// Set the hub registry source
    pub fn source(mut self, source: Arc<dyn HubRegistrySource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the zone store
    pub fn store(mut self, store: Arc<dyn ZoneStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Report cycle outcomes to a health registry
    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn build(self) -> Result<SyncScheduler> {
        let source = self
            .source
            .ok_or_else(|| anyhow::anyhow!("Hub registry source is required"))?;
        let store = self
            .store
            .ok_or_else(|| anyhow::anyhow!("Zone store is required"))?;
        self.config.validate()?;

        let (interval_tx, _) = watch::channel(self.config.interval());

        Ok(SyncScheduler {
            inner: Arc::new(SchedulerInner {
                source,
                store,
                clock: self.clock,
                config: RwLock::new(self.config),
                interval_tx,
                cycle_guard: Mutex::new(()),
                last_result: RwLock::new(None),
                running: Mutex::new(None),
                health: self.health,
                metrics: SyncMetrics::new(),
                logger: self.logger,
            }),
        })
    }
}

impl Default for SyncSchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
