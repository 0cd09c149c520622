//! ConnectionService: idempotent create/delete and lookups over the record store and the
//! adjacency index.
//!
//! Each edge is stored twice: the encoded [`Connection`] under its record key, and peerB as a
//! member of the set under the adjacency key. Create and Delete touch both through two
//! independent actions on the task runner. The store offers no cross-key transactions, so a
//! failure or a shutdown between the two can leave them disagreeing: an index member without
//! a record, or a record without an index member. Create/Delete report the error but do not
//! undo the half that landed; [`ConnectionService::repair`] and
//! [`ConnectionService::repair_peers`] bring the two back in line.

use crate::config::ServiceConfig;
use crate::key;
use crate::lifecycle::{Lifecycle, ServiceState};
use chrono::Utc;
use conn_types::{
    action, Action, ActionError, Connection, ConnectionConfig, ConnectionError, ExecuteConfig,
    KvStore, TaskRunner,
};
use std::sync::Arc;

/// What [`ConnectionService::repair`] found for one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// Record and index agree (both present or both absent).
    Consistent,
    /// Record present, index member missing: member re-added.
    IndexRestored,
    /// Index member present, record missing: member removed.
    IndexPruned,
}

impl RepairOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairOutcome::Consistent => "consistent",
            RepairOutcome::IndexRestored => "index_restored",
            RepairOutcome::IndexPruned => "index_pruned",
        }
    }
}

/// Manages connections of the connection space.
pub struct ConnectionService {
    storage: Arc<dyn KvStore>,
    runner: Arc<dyn TaskRunner>,
    lifecycle: Lifecycle,
    weight: f64,
}

impl ConnectionService {
    pub fn new(
        storage: Arc<dyn KvStore>,
        runner: Arc<dyn TaskRunner>,
        config: ServiceConfig,
    ) -> Result<Self, ConnectionError> {
        config.validate()?;
        Ok(Self {
            storage,
            runner,
            lifecycle: Lifecycle::new(),
            weight: config.weight,
        })
    }

    /// Mark the service booted. Repeated calls, or calls after shutdown, do nothing.
    pub fn boot(&self) {
        if self.lifecycle.boot() {
            tracing::info!("connection service booted");
        }
    }

    /// Shut down for good: cancels the token shared with every in-flight and future runner call.
    pub fn shutdown(&self) {
        if self.lifecycle.shutdown() {
            tracing::info!("connection service shut down");
        }
    }

    pub fn state(&self) -> ServiceState {
        self.lifecycle.state()
    }

    /// Default weight given to newly created connections.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Create the edge `peer_a -> peer_b`, or return the existing one unchanged.
    pub async fn create(
        &self,
        namespace_a: &str,
        namespace_b: &str,
        peer_a: &str,
        peer_b: &str,
    ) -> Result<Connection, ConnectionError> {
        self.ensure_running()?;
        let record_key = key::record_key(namespace_a, namespace_b, peer_a, peer_b)?;
        let adjacency_key = key::adjacency_key(namespace_a, namespace_b, peer_a)?;

        match self.search(namespace_a, namespace_b, peer_a, peer_b).await {
            Ok(existing) => return Ok(existing),
            Err(ConnectionError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let candidate = Connection::new(ConnectionConfig {
            created: Some(Utc::now()),
            id: record_key.clone(),
            peer_a_id: peer_a.to_string(),
            peer_b_id: peer_b.to_string(),
            weight: self.weight,
        })?;

        let actions = vec![
            {
                let storage = Arc::clone(&self.storage);
                let set_key = adjacency_key;
                let member = peer_b.to_string();
                action(move |_| async move {
                    storage.add_to_set(&set_key, &member).await?;
                    Ok(())
                })
            },
            {
                let storage = Arc::clone(&self.storage);
                let key = record_key.clone();
                let record = candidate.clone();
                action(move |_| async move {
                    let raw = record
                        .encode()
                        .map_err(|e| ActionError::Codec(e.to_string()))?;
                    storage.set(&key, &raw).await?;
                    Ok(())
                })
            },
        ];
        self.execute("create", &record_key, actions).await?;

        tracing::debug!(id = %record_key, weight = self.weight, "connection created");
        Ok(candidate)
    }

    /// Delete the edge `peer_a -> peer_b`. Deleting a missing edge succeeds without side effects.
    pub async fn delete(
        &self,
        namespace_a: &str,
        namespace_b: &str,
        peer_a: &str,
        peer_b: &str,
    ) -> Result<(), ConnectionError> {
        self.ensure_running()?;
        let record_key = key::record_key(namespace_a, namespace_b, peer_a, peer_b)?;
        let adjacency_key = key::adjacency_key(namespace_a, namespace_b, peer_a)?;

        if !self.exists(namespace_a, namespace_b, peer_a, peer_b).await? {
            return Ok(());
        }

        let actions = vec![
            {
                let storage = Arc::clone(&self.storage);
                let set_key = adjacency_key;
                let member = peer_b.to_string();
                action(move |_| async move {
                    storage.remove_from_set(&set_key, &member).await?;
                    Ok(())
                })
            },
            {
                let storage = Arc::clone(&self.storage);
                let key = record_key.clone();
                action(move |_| async move {
                    storage.remove(&key).await?;
                    Ok(())
                })
            },
        ];
        self.execute("delete", &record_key, actions).await?;

        tracing::debug!(id = %record_key, "connection deleted");
        Ok(())
    }

    pub async fn exists(
        &self,
        namespace_a: &str,
        namespace_b: &str,
        peer_a: &str,
        peer_b: &str,
    ) -> Result<bool, ConnectionError> {
        match self.search(namespace_a, namespace_b, peer_a, peer_b).await {
            Ok(_) => Ok(true),
            Err(ConnectionError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Load the edge record. A missing record is `NotFound` carrying the record key.
    pub async fn search(
        &self,
        namespace_a: &str,
        namespace_b: &str,
        peer_a: &str,
        peer_b: &str,
    ) -> Result<Connection, ConnectionError> {
        let record_key = key::record_key(namespace_a, namespace_b, peer_a, peer_b)?;
        let raw = match self.storage.get(&record_key).await {
            Ok(raw) => raw,
            Err(e) if e.is_not_found() => return Err(ConnectionError::NotFound(record_key)),
            Err(e) => return Err(e.into()),
        };
        Connection::decode(&raw)
    }

    /// Peers connected from `peer_a` in the namespace pair, ascending. An empty or missing
    /// adjacency set is `NotFound` carrying the adjacency key.
    pub async fn search_peers(
        &self,
        namespace_a: &str,
        namespace_b: &str,
        peer_a: &str,
    ) -> Result<Vec<String>, ConnectionError> {
        let adjacency_key = key::adjacency_key(namespace_a, namespace_b, peer_a)?;
        let peers = self.storage.members_of(&adjacency_key).await?;
        if peers.is_empty() {
            return Err(ConnectionError::NotFound(adjacency_key));
        }
        Ok(peers)
    }

    /// Reconcile the record and the index member of one edge, treating the record as truth.
    ///
    /// Every index change is followed by a second record lookup. If a concurrent create or
    /// delete flipped the record in between, the change is undone and the edge is reported
    /// `Consistent`. A create or delete that is itself half-way through its dual write can still
    /// leave the pair diverged afterwards; a later repair picks that up.
    pub async fn repair(
        &self,
        namespace_a: &str,
        namespace_b: &str,
        peer_a: &str,
        peer_b: &str,
    ) -> Result<RepairOutcome, ConnectionError> {
        self.ensure_running()?;
        let adjacency_key = key::adjacency_key(namespace_a, namespace_b, peer_a)?;

        let has_record = self.exists(namespace_a, namespace_b, peer_a, peer_b).await?;
        let indexed = self
            .storage
            .members_of(&adjacency_key)
            .await?
            .iter()
            .any(|m| m == peer_b);

        let outcome = match (has_record, indexed) {
            (true, false) => {
                self.storage.add_to_set(&adjacency_key, peer_b).await?;
                if self.exists(namespace_a, namespace_b, peer_a, peer_b).await? {
                    RepairOutcome::IndexRestored
                } else {
                    self.storage.remove_from_set(&adjacency_key, peer_b).await?;
                    RepairOutcome::Consistent
                }
            }
            (false, true) => {
                if self
                    .prune_member(namespace_a, namespace_b, peer_a, peer_b, &adjacency_key)
                    .await?
                {
                    RepairOutcome::IndexPruned
                } else {
                    RepairOutcome::Consistent
                }
            }
            _ => RepairOutcome::Consistent,
        };
        if outcome != RepairOutcome::Consistent {
            tracing::info!(
                adjacency = %adjacency_key,
                peer_b,
                outcome = outcome.as_str(),
                "repaired connection index"
            );
        }
        Ok(outcome)
    }

    /// Drop adjacency members of `peer_a` whose record is gone. Returns how many were removed.
    pub async fn repair_peers(
        &self,
        namespace_a: &str,
        namespace_b: &str,
        peer_a: &str,
    ) -> Result<usize, ConnectionError> {
        self.ensure_running()?;
        let adjacency_key = key::adjacency_key(namespace_a, namespace_b, peer_a)?;

        let mut pruned = 0usize;
        for peer_b in self.storage.members_of(&adjacency_key).await? {
            if self.exists(namespace_a, namespace_b, peer_a, &peer_b).await? {
                continue;
            }
            if self
                .prune_member(namespace_a, namespace_b, peer_a, &peer_b, &adjacency_key)
                .await?
            {
                pruned += 1;
            }
        }
        if pruned > 0 {
            tracing::info!(adjacency = %adjacency_key, pruned, "pruned dangling index members");
        }
        Ok(pruned)
    }

    /// Remove `peer_b` from the index, then put it back if its record showed up meanwhile.
    /// Returns whether the member stayed removed.
    async fn prune_member(
        &self,
        namespace_a: &str,
        namespace_b: &str,
        peer_a: &str,
        peer_b: &str,
        adjacency_key: &str,
    ) -> Result<bool, ConnectionError> {
        self.storage.remove_from_set(adjacency_key, peer_b).await?;
        if self.exists(namespace_a, namespace_b, peer_a, peer_b).await? {
            self.storage.add_to_set(adjacency_key, peer_b).await?;
            return Ok(false);
        }
        Ok(true)
    }

    fn ensure_running(&self) -> Result<(), ConnectionError> {
        if self.lifecycle.state() == ServiceState::Shutdown {
            return Err(ConnectionError::ShutDown);
        }
        Ok(())
    }

    /// Run both halves of a dual write with one worker per action.
    async fn execute(
        &self,
        op: &'static str,
        record_key: &str,
        actions: Vec<Action>,
    ) -> Result<(), ConnectionError> {
        let num_workers = actions.len();
        let config = ExecuteConfig::new(actions)
            .with_canceler(self.lifecycle.canceler())
            .with_num_workers(num_workers);
        if let Err(e) = self.runner.execute(config).await {
            tracing::warn!(
                op,
                id = %record_key,
                error = %e,
                "dual write failed, index and record may disagree"
            );
            return Err(e.into());
        }
        Ok(())
    }
}
