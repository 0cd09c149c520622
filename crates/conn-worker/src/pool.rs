//! Pool runner: one spawned task per action, concurrency capped by a semaphore.

use async_trait::async_trait;
use conn_types::{ExecuteConfig, TaskError, TaskRunner};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Runner that spawns each action onto the current tokio runtime.
///
/// At most `num_workers` actions hold a permit at once. The cancel token is checked before every
/// launch and raced against every running action, so a fired token both stops new launches and
/// drops in-flight work at its next await point. Effects already applied are not rolled back.
#[derive(Debug, Default, Clone)]
pub struct PoolTaskRunner;

impl PoolTaskRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TaskRunner for PoolTaskRunner {
    async fn execute(&self, config: ExecuteConfig) -> Result<(), TaskError> {
        let ExecuteConfig {
            actions,
            canceler,
            num_workers,
        } = config;
        if num_workers == 0 {
            return Err(TaskError::InvalidConfig(
                "num_workers must be greater than 0".to_string(),
            ));
        }

        let total = actions.len();
        tracing::debug!(actions = total, workers = num_workers, "executing actions");

        let semaphore = Arc::new(Semaphore::new(num_workers));
        let mut running: JoinSet<Result<(), TaskError>> = JoinSet::new();
        let mut cancelled = false;
        let mut launched = 0usize;

        for act in actions {
            if canceler.is_cancelled() {
                cancelled = true;
                break;
            }
            let permit = tokio::select! {
                biased;
                _ = canceler.cancelled() => {
                    cancelled = true;
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(p) => p,
                    // The semaphore is never closed.
                    Err(_) => {
                        cancelled = true;
                        break;
                    }
                },
            };

            let token = canceler.clone();
            let fut = act(token.clone());
            running.spawn(async move {
                let _permit = permit;
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(TaskError::Cancelled),
                    res = fut => res.map_err(TaskError::from),
                }
            });
            launched += 1;
        }

        let mut first_error: Option<TaskError> = None;
        while let Some(joined) = running.join_next().await {
            let result = match joined {
                Ok(res) => res,
                Err(e) if e.is_panic() => Err(TaskError::Panicked(e.to_string())),
                Err(_) => Err(TaskError::Cancelled),
            };
            match result {
                Ok(()) => {}
                Err(TaskError::Cancelled) => cancelled = true,
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            tracing::debug!(error = %e, launched, total, "action failed");
            return Err(e);
        }
        if cancelled {
            tracing::debug!(launched, total, "execution cancelled");
            return Err(TaskError::Cancelled);
        }
        Ok(())
    }
}
