//! In-memory key/record store with sorted sets.

use async_trait::async_trait;
use conn_types::{KvStore, StorageError};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

type SetIndex = HashMap<String, BTreeSet<String>>;

/// In-memory implementation of KvStore.
/// Records and sets live in separate maps, so the same key may name both a record and a set.
pub struct InMemoryKvStore {
    /// key -> value.
    records: Arc<RwLock<HashMap<String, String>>>,
    /// set_key -> members. Empty sets are dropped.
    sets: Arc<RwLock<SetIndex>>,
    /// Number of mutating calls that changed stored state.
    writes: AtomicU64,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            sets: Arc::new(RwLock::new(HashMap::new())),
            writes: AtomicU64::new(0),
        }
    }

    /// Count of effective writes (set, remove of a present key, membership changes).
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of stored records.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }

    fn bump(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<String, StorageError> {
        let guard = self.records.read().await;
        guard
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.records.write().await;
        guard.insert(key.to_string(), value.to_string());
        self.bump();
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self.records.write().await;
        if guard.remove(key).is_some() {
            self.bump();
        }
        Ok(())
    }

    async fn add_to_set(&self, set_key: &str, member: &str) -> Result<(), StorageError> {
        let mut guard = self.sets.write().await;
        if guard
            .entry(set_key.to_string())
            .or_default()
            .insert(member.to_string())
        {
            self.bump();
        }
        Ok(())
    }

    async fn remove_from_set(&self, set_key: &str, member: &str) -> Result<(), StorageError> {
        let mut guard = self.sets.write().await;
        if let Some(set) = guard.get_mut(set_key) {
            if set.remove(member) {
                self.bump();
            }
            if set.is_empty() {
                guard.remove(set_key);
            }
        }
        Ok(())
    }

    async fn members_of(&self, set_key: &str) -> Result<Vec<String>, StorageError> {
        let guard = self.sets.read().await;
        Ok(guard
            .get(set_key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }
}
