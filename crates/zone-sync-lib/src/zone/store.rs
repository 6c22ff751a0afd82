//! In-memory zone store with optional JSON persistence
//!
//! Zones and per-zone workload counts live in concurrent maps. When a
//! persistence path is configured every mutation rewrites the snapshot file
//! atomically (temp file + rename), so a crash leaves either the previous or
//! the new snapshot on disk. A mutation whose snapshot cannot be written is
//! rolled back in memory before the error is returned.

use super::{StoreError, ZoneStore};
use crate::models::Zone;
use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// On-disk layout of the store
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreSnapshot {
    zones: Vec<Zone>,
    #[serde(default)]
    workloads: BTreeMap<String, u64>,
}

/// Zone store backed by concurrent maps
pub struct InMemoryZoneStore {
    /// Map of zone id -> zone
    zones: DashMap<String, Zone>,
    /// Map of zone id -> live workload count
    workloads: DashMap<String, u64>,
    persistence_path: Option<PathBuf>,
    /// Serializes mutations together with their snapshot writes
    write_lock: Mutex<()>,
}

impl Default for InMemoryZoneStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryZoneStore {
    /// Create an empty, non-persistent store
    pub fn new() -> Self {
        Self {
            zones: DashMap::new(),
            workloads: DashMap::new(),
            persistence_path: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Create a store persisted at `path`, loading an existing snapshot
    pub fn with_persistence(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut store = Self::new();

        if path.exists() {
            let snapshot = load_snapshot(&path)?;
            for zone in snapshot.zones {
                store.zones.insert(zone.id.clone(), zone);
            }
            for (id, count) in snapshot.workloads {
                store.workloads.insert(id, count);
            }
            info!(path = %path.display(), zones = store.zones.len(), "Loaded zone store from disk");
        }

        store.persistence_path = Some(path);
        Ok(store)
    }

    /// Record the number of workloads allocated against a zone
    pub async fn set_workload_count(&self, id: &str, count: u64) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let previous = self.workloads.insert(id.to_string(), count);
        self.flush().await.inspect_err(|_| match previous {
            Some(count) => {
                self.workloads.insert(id.to_string(), count);
            }
            None => {
                self.workloads.remove(id);
            }
        })
    }

    /// Get a zone by id
    pub fn get(&self, id: &str) -> Option<Zone> {
        self.zones.get(id).map(|z| z.clone())
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Write the snapshot; callers hold `write_lock`
    async fn flush(&self) -> Result<(), StoreError> {
        let Some(path) = self.persistence_path.as_ref() else {
            return Ok(());
        };

        let mut zones: Vec<Zone> = self.zones.iter().map(|z| z.value().clone()).collect();
        zones.sort_by(|a, b| a.id.cmp(&b.id));
        let workloads = self
            .workloads
            .iter()
            .map(|w| (w.key().clone(), *w.value()))
            .collect();

        let snapshot = StoreSnapshot { zones, workloads };
        let json = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| StoreError::Persistence(format!("failed to serialize zones: {}", e)))?;

        save_atomically(path, &json)
            .await
            .map_err(|e| StoreError::Persistence(format!("{:#}", e)))?;

        debug!(path = %path.display(), zones = snapshot.zones.len(), "Zone store flushed to disk");
        Ok(())
    }
}

fn load_snapshot(path: &Path) -> Result<StoreSnapshot> {
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read zone store {:?}", path))?;
    serde_json::from_slice(&data).with_context(|| format!("Failed to parse zone store {:?}", path))
}

async fn save_atomically(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }

    let temp_path = path.with_extension("tmp");
    tokio::fs::write(&temp_path, data)
        .await
        .with_context(|| format!("Failed to write temp file {:?}", temp_path))?;
    tokio::fs::rename(&temp_path, path)
        .await
        .with_context(|| format!("Failed to rename {:?} to {:?}", temp_path, path))?;

    Ok(())
}

#[async_trait]
impl ZoneStore for InMemoryZoneStore {
    async fn list_zones(&self) -> Result<Vec<Zone>, StoreError> {
        let mut zones: Vec<Zone> = self.zones.iter().map(|z| z.value().clone()).collect();
        zones.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(zones)
    }

    async fn create_zone(&self, zone: Zone) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let id = zone.id.clone();
        match self.zones.entry(id.clone()) {
            Entry::Occupied(_) => return Err(StoreError::AlreadyExists(id)),
            Entry::Vacant(slot) => {
                slot.insert(zone);
            }
        }

        self.flush().await.inspect_err(|_| {
            self.zones.remove(&id);
        })
    }

    async fn update_zone(&self, zone: Zone) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let id = zone.id.clone();
        let previous = {
            let Some(mut existing) = self.zones.get_mut(&id) else {
                return Err(StoreError::NotFound(id));
            };
            std::mem::replace(&mut *existing, zone)
        };

        self.flush().await.inspect_err(|_| {
            self.zones.insert(id, previous);
        })
    }

    async fn delete_zone(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let Some((_, zone)) = self.zones.remove(id) else {
            return Err(StoreError::NotFound(id.to_string()));
        };
        let workloads = self.workloads.remove(id);

        self.flush().await.inspect_err(|_| {
            self.zones.insert(id.to_string(), zone);
            if let Some((key, count)) = workloads {
                self.workloads.insert(key, count);
            }
        })
    }

    async fn count_workloads_in_zone(&self, id: &str) -> Result<u64, StoreError> {
        Ok(self.workloads.get(id).map(|c| *c).unwrap_or(0))
    }
}
