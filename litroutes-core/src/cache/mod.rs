//! Process-wide store of built graphs, one per service area.
//!
//! At most one build runs per bounding box; callers arriving during a build
//! wait for its result instead of starting another. Different boxes build
//! concurrently. Failed builds are not cached, so the next call retries.

mod persist;

use std::{
    sync::{
        Arc, Condvar, Mutex, PoisonError, RwLock,
        atomic::{AtomicUsize, Ordering},
    },
    time::Instant,
};

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use log::{debug, info, warn};
use serde::Serialize;

pub use persist::{GraphSnapshot, PersistedGraph, SCHEMA_VERSION, SnapshotStore, fingerprint};

use crate::{
    Error, SafetyGraph,
    model::{BBox, BBoxKey},
};

/// Produces the graph of a bounding box
pub trait GraphProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the inputs cannot be fetched or assembled.
    fn build(&self, bbox: &BBox) -> Result<SafetyGraph, Error>;

    /// Identity of the inputs `build` would use for `bbox`.
    ///
    /// A persisted graph is reused only while this value is unchanged.
    fn fingerprint(&self, bbox: &BBox) -> String {
        fingerprint(&[&SCHEMA_VERSION.to_string(), bbox.key().as_str()])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphOrigin {
    Built,
    Restored,
}

impl GraphOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            GraphOrigin::Built => "built",
            GraphOrigin::Restored => "restored",
        }
    }
}

/// A completed graph with its build metadata
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub graph: Arc<SafetyGraph>,
    pub built_at: DateTime<Utc>,
    pub origin: GraphOrigin,
}

/// Point-in-time view of one cache slot
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub bbox_key: String,
    pub building: bool,
    pub built_at: Option<DateTime<Utc>>,
    pub origin: Option<GraphOrigin>,
    pub nodes: usize,
    pub edges: usize,
    pub degraded: bool,
}

type BuildResult = Result<CacheEntry, Error>;

/// Rendezvous between the building caller and the waiting ones
struct PendingBuild {
    result: Mutex<Option<BuildResult>>,
    ready: Condvar,
}

impl PendingBuild {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    fn wait(&self) -> BuildResult {
        let mut result = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(result) = result.as_ref() {
                return result.clone();
            }
            result = self
                .ready
                .wait(result)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn publish(&self, outcome: BuildResult) {
        *self.result.lock().unwrap_or_else(PoisonError::into_inner) = Some(outcome);
        self.ready.notify_all();
    }
}

enum Slot {
    Ready(CacheEntry),
    Building(Arc<PendingBuild>),
}

/// Completes a build slot, also when the build panics
struct BuildGuard<'a> {
    cache: &'a GraphCache,
    key: BBoxKey,
    pending: Arc<PendingBuild>,
    finished: bool,
}

impl BuildGuard<'_> {
    fn finish(mut self, outcome: BuildResult) {
        self.finished = true;
        {
            let mut slots = self.cache.write_slots();
            match &outcome {
                Ok(entry) => {
                    slots.insert(self.key.clone(), Slot::Ready(entry.clone()));
                }
                Err(_) => {
                    slots.remove(&self.key);
                }
            }
        }
        self.pending.publish(outcome);
    }
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!("Graph build for {} aborted", self.key);
        self.cache.write_slots().remove(&self.key);
        self.pending
            .publish(Err(Error::UnrecoverableError("graph build panicked")));
    }
}

/// Graph cache service; share it behind an `Arc`
pub struct GraphCache {
    provider: Arc<dyn GraphProvider>,
    store: Option<SnapshotStore>,
    slots: RwLock<HashMap<BBoxKey, Slot>>,
    builds: AtomicUsize,
}

impl GraphCache {
    pub fn new(provider: Arc<dyn GraphProvider>) -> Self {
        Self {
            provider,
            store: None,
            slots: RwLock::new(HashMap::new()),
            builds: AtomicUsize::new(0),
        }
    }

    /// Persist built graphs to `store` and restore them on a cold start
    #[must_use]
    pub fn with_store(mut self, store: SnapshotStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn store(&self) -> Option<&SnapshotStore> {
        self.store.as_ref()
    }

    /// Number of provider builds started so far (restores not included)
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    fn read_slots(&self) -> std::sync::RwLockReadGuard<'_, HashMap<BBoxKey, Slot>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slots(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<BBoxKey, Slot>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Graph of `bbox`, built (or restored) on first use.
    ///
    /// # Errors
    ///
    /// Returns the build error; every caller waiting on that build gets the same one.
    pub fn get_or_build(&self, bbox: &BBox) -> Result<CacheEntry, Error> {
        let key = bbox.key();

        let waiting = match self.read_slots().get(&key) {
            Some(Slot::Ready(entry)) => return Ok(entry.clone()),
            Some(Slot::Building(pending)) => Some(Arc::clone(pending)),
            None => None,
        };
        if let Some(pending) = waiting {
            debug!("Waiting for in-flight build of {key}");
            return pending.wait();
        }

        let pending = {
            let mut slots = self.write_slots();
            match slots.get(&key) {
                Some(Slot::Ready(entry)) => return Ok(entry.clone()),
                Some(Slot::Building(pending)) => {
                    let pending = Arc::clone(pending);
                    drop(slots);
                    debug!("Waiting for in-flight build of {key}");
                    return pending.wait();
                }
                None => {
                    let pending = Arc::new(PendingBuild::new());
                    slots.insert(key.clone(), Slot::Building(Arc::clone(&pending)));
                    pending
                }
            }
        };

        let guard = BuildGuard {
            cache: self,
            key: key.clone(),
            pending,
            finished: false,
        };
        let outcome = self.restore_or_build(bbox, &key);
        guard.finish(outcome.clone());
        outcome
    }

    fn restore_or_build(&self, bbox: &BBox, key: &BBoxKey) -> BuildResult {
        let fingerprint = self.provider.fingerprint(bbox);

        if let Some(store) = &self.store {
            match store.load(key, &fingerprint) {
                Ok(Some((graph, built_at))) => {
                    info!("Restored graph for {key} built at {built_at}");
                    return Ok(CacheEntry {
                        graph: Arc::new(graph),
                        built_at,
                        origin: GraphOrigin::Restored,
                    });
                }
                Ok(None) => {}
                Err(e) => warn!("Ignoring unreadable graph snapshot for {key}: {e}"),
            }
        }

        self.builds.fetch_add(1, Ordering::SeqCst);
        let started = Instant::now();
        info!("Building graph for {key}");
        let graph = self.provider.build(bbox).inspect_err(|e| {
            warn!("Graph build for {key} failed: {e}");
        })?;
        let built_at = Utc::now();
        info!("Graph for {key} built in {:.1?}", started.elapsed());

        if let Some(store) = &self.store {
            if graph.is_degraded() {
                info!("Not persisting degraded graph for {key}");
            } else if let Err(e) = store.save(key, &fingerprint, &graph, built_at) {
                warn!("Failed to persist graph for {key}: {e}");
            }
        }

        Ok(CacheEntry {
            graph: Arc::new(graph),
            built_at,
            origin: GraphOrigin::Built,
        })
    }

    /// Completed graph of `bbox`, without building
    pub fn get(&self, bbox: &BBox) -> Option<CacheEntry> {
        match self.read_slots().get(&bbox.key()) {
            Some(Slot::Ready(entry)) => Some(entry.clone()),
            _ => None,
        }
    }

    pub fn is_building(&self, bbox: &BBox) -> bool {
        matches!(self.read_slots().get(&bbox.key()), Some(Slot::Building(_)))
    }

    /// Drop the completed graph of `bbox` and its persisted snapshot.
    ///
    /// An in-flight build is left alone. Returns whether a graph was dropped.
    pub fn invalidate(&self, bbox: &BBox) -> bool {
        let key = bbox.key();
        let removed = {
            let mut slots = self.write_slots();
            match slots.get(&key) {
                Some(Slot::Ready(_)) => slots.remove(&key).is_some(),
                _ => false,
            }
        };
        if let Some(store) = &self.store
            && let Err(e) = store.remove(&key)
        {
            warn!("Failed to remove persisted graph for {key}: {e}");
        }
        if removed {
            info!("Invalidated graph for {key}");
        }
        removed
    }

    /// Drop every completed graph from memory; persisted snapshots stay
    pub fn clear(&self) {
        self.write_slots()
            .retain(|_, slot| matches!(slot, Slot::Building(_)));
    }

    pub fn status(&self) -> Vec<CacheStatus> {
        let mut status: Vec<CacheStatus> = self
            .read_slots()
            .iter()
            .map(|(key, slot)| match slot {
                Slot::Ready(entry) => CacheStatus {
                    bbox_key: key.to_string(),
                    building: false,
                    built_at: Some(entry.built_at),
                    origin: Some(entry.origin),
                    nodes: entry.graph.node_count(),
                    edges: entry.graph.edge_count(),
                    degraded: entry.graph.is_degraded(),
                },
                Slot::Building(_) => CacheStatus {
                    bbox_key: key.to_string(),
                    building: true,
                    built_at: None,
                    origin: None,
                    nodes: 0,
                    edges: 0,
                    degraded: false,
                },
            })
            .collect();
        status.sort_by(|a, b| a.bbox_key.cmp(&b.bbox_key));
        status
    }
}
