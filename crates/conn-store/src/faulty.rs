//! Fault-injecting store for tests: wraps [`InMemoryKvStore`] and fails selected operations.

use crate::InMemoryKvStore;
use async_trait::async_trait;
use conn_types::{KvStore, StorageError};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

/// Store operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    Set,
    Remove,
    AddToSet,
    RemoveFromSet,
    MembersOf,
}

/// Store whose selected operations return `StorageError::Other`; all others reach the inner store.
pub struct FaultyKvStore {
    inner: InMemoryKvStore,
    failing: Mutex<HashSet<StoreOp>>,
}

impl FaultyKvStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryKvStore::new(),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Make `op` fail until [`FaultyKvStore::heal`] is called.
    pub fn fail(&self, op: StoreOp) {
        self.failing().insert(op);
    }

    pub fn heal(&self, op: StoreOp) {
        self.failing().remove(&op);
    }

    /// The wrapped store, for inspecting state behind the faults.
    pub fn inner(&self) -> &InMemoryKvStore {
        &self.inner
    }

    /// The fault set survives a panicking test thread; a poisoned lock still yields it.
    fn failing(&self) -> MutexGuard<'_, HashSet<StoreOp>> {
        self.failing.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self, op: StoreOp) -> Result<(), StorageError> {
        if self.failing().contains(&op) {
            return Err(StorageError::Other(format!("injected failure: {:?}", op)));
        }
        Ok(())
    }
}

impl Default for FaultyKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for FaultyKvStore {
    async fn get(&self, key: &str) -> Result<String, StorageError> {
        self.check(StoreOp::Get)?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check(StoreOp::Set)?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check(StoreOp::Remove)?;
        self.inner.remove(key).await
    }

    async fn add_to_set(&self, set_key: &str, member: &str) -> Result<(), StorageError> {
        self.check(StoreOp::AddToSet)?;
        self.inner.add_to_set(set_key, member).await
    }

    async fn remove_from_set(&self, set_key: &str, member: &str) -> Result<(), StorageError> {
        self.check(StoreOp::RemoveFromSet)?;
        self.inner.remove_from_set(set_key, member).await
    }

    async fn members_of(&self, set_key: &str) -> Result<Vec<String>, StorageError> {
        self.check(StoreOp::MembersOf)?;
        self.inner.members_of(set_key).await
    }
}
