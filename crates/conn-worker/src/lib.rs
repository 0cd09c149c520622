//! Task runner: executes a fixed list of independent actions over a bounded worker pool.

mod pool;

pub use conn_types::{action, Action, ActionError, ExecuteConfig, TaskError, TaskRunner};
pub use pool::PoolTaskRunner;
