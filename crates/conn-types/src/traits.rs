//! Traits for the storage and task-runner collaborators, and the error types shared across crates.

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// Key/record store with set membership. Each call is atomic for its own key only.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get the value stored at `key`. Absent keys fail with `StorageError::NotFound`.
    async fn get(&self, key: &str) -> Result<String, StorageError>;

    /// Store `value` at `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Add `member` to the set at `set_key`. Adding an existing member is a no-op.
    async fn add_to_set(&self, set_key: &str, member: &str) -> Result<(), StorageError>;

    /// Remove `member` from the set at `set_key`. Removing an absent member succeeds.
    async fn remove_from_set(&self, set_key: &str, member: &str) -> Result<(), StorageError>;

    /// All members of the set at `set_key`, in ascending order. Empty when the set is absent.
    async fn members_of(&self, set_key: &str) -> Result<Vec<String>, StorageError>;
}

/// Boxed future returned by an [`Action`].
pub type ActionFuture = Pin<Box<dyn Future<Output = Result<(), ActionError>> + Send + 'static>>;

/// One independent unit of work handed to a [`TaskRunner`]. Receives the shared cancel token.
pub type Action = Box<dyn FnOnce(CancellationToken) -> ActionFuture + Send + 'static>;

/// Box an async closure into an [`Action`].
pub fn action<F, Fut>(f: F) -> Action
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
{
    Box::new(move |canceler| Box::pin(f(canceler)))
}

/// Input for [`TaskRunner::execute`].
pub struct ExecuteConfig {
    pub actions: Vec<Action>,
    /// Once cancelled, no further actions are launched and running ones are aborted.
    pub canceler: CancellationToken,
    /// Upper bound on concurrently running actions. Must be greater than 0.
    pub num_workers: usize,
}

impl ExecuteConfig {
    /// Config running every action in parallel with a fresh, never-cancelled token.
    pub fn new(actions: Vec<Action>) -> Self {
        let num_workers = actions.len().max(1);
        Self {
            actions,
            canceler: CancellationToken::new(),
            num_workers,
        }
    }

    pub fn with_canceler(mut self, canceler: CancellationToken) -> Self {
        self.canceler = canceler;
        self
    }

    pub fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }
}

impl std::fmt::Debug for ExecuteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecuteConfig")
            .field("actions", &self.actions.len())
            .field("cancelled", &self.canceler.is_cancelled())
            .field("num_workers", &self.num_workers)
            .finish()
    }
}

/// Runs a fixed list of independent actions over a bounded pool of workers.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    /// Run all actions with at most `num_workers` in flight. Returns the first action error
    /// in completion order, or `TaskError::Cancelled` if the token cut the run short.
    async fn execute(&self, config: ExecuteConfig) -> Result<(), TaskError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    #[error("key not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Other(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
    #[error("codec: {0}")]
    Codec(String),
    #[error("action error: {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("invalid runner config: {0}")]
    InvalidConfig(String),
    #[error("action failed: {0}")]
    Action(#[from] ActionError),
    #[error("execution cancelled")]
    Cancelled,
    #[error("action panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("connection service is shut down")]
    ShutDown,
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
    #[error("task: {0}")]
    Task(#[from] TaskError),
    #[error("codec: {0}")]
    Codec(String),
}

impl ConnectionError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConnectionError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_config_defaults_to_full_parallelism() {
        let actions = vec![
            action(|_| async { Ok(()) }),
            action(|_| async { Ok(()) }),
            action(|_| async { Ok(()) }),
        ];
        let cfg = ExecuteConfig::new(actions);
        assert_eq!(cfg.num_workers, 3);
        assert!(!cfg.canceler.is_cancelled());

        let token = CancellationToken::new();
        token.cancel();
        let cfg = ExecuteConfig::new(Vec::new())
            .with_canceler(token)
            .with_num_workers(4);
        assert_eq!(cfg.num_workers, 4);
        assert!(cfg.canceler.is_cancelled());
    }

    #[test]
    fn not_found_helpers() {
        assert!(StorageError::NotFound("k".to_string()).is_not_found());
        assert!(!StorageError::Other("boom".to_string()).is_not_found());
        assert!(ConnectionError::NotFound("k".to_string()).is_not_found());
        let wrapped: ConnectionError = StorageError::NotFound("k".to_string()).into();
        assert!(!wrapped.is_not_found());
    }
}
