use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::types::{Decision, DependencyKey, DependencyRecord, Observation};

/// Owns the set of dependencies under monitoring and their current decision.
///
/// One record per [`DependencyKey`]. Every access goes through a single
/// mutex, and no lock is held across network I/O.
#[derive(Default)]
pub struct ApprovalTracker {
    records: Mutex<HashMap<DependencyKey, DependencyRecord>>,
}

impl ApprovalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a dependency. Returns `false` if the key is already
    /// tracked; the caller must then only [`refresh`](Self::refresh) it.
    pub async fn register(&self, obs: &Observation) -> bool {
        let mut records = self.records.lock().await;
        let key = obs.key();
        if records.contains_key(&key) {
            return false;
        }
        records.insert(key, DependencyRecord::from_observation(obs));
        true
    }

    /// Update version and source path of an already-tracked dependency.
    pub async fn refresh(&self, obs: &Observation) -> bool {
        let mut records = self.records.lock().await;
        match records.get_mut(&obs.key()) {
            Some(rec) => {
                rec.version = obs.version.clone();
                rec.source_path = obs.path.clone();
                true
            }
            None => false,
        }
    }

    pub async fn release(&self, key: &DependencyKey) -> Option<DependencyRecord> {
        self.records.lock().await.remove(key)
    }

    pub async fn current(&self, key: &DependencyKey) -> Option<Decision> {
        self.records
            .lock()
            .await
            .get(key)
            .map(|rec| rec.decision.clone())
    }

    pub async fn record(&self, key: &DependencyKey) -> Option<DependencyRecord> {
        self.records.lock().await.get(key).cloned()
    }

    /// Store a newly classified decision.
    ///
    /// Returns `Some(true)` when the caller must announce it (the first
    /// decision for the record, or any change from the previous one),
    /// `Some(false)` for a repeat, and `None` if the key is no longer tracked.
    pub async fn apply(&self, key: &DependencyKey, decision: &Decision) -> Option<bool> {
        let mut records = self.records.lock().await;
        let rec = records.get_mut(key)?;
        let changed = !rec.announced || rec.decision != *decision;
        rec.decision = decision.clone();
        rec.announced = true;
        Some(changed)
    }

    pub async fn keys(&self) -> Vec<DependencyKey> {
        let mut keys: Vec<_> = self.records.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    pub(crate) async fn clear(&self) {
        self.records.lock().await.clear();
    }
}
