//! Connection service: keeps the adjacency index and the edge records of namespace-scoped
//! peer connections in step, on top of a [`KvStore`] and a [`TaskRunner`].

mod config;
pub mod key;
mod lifecycle;
mod service;

pub use config::ServiceConfig;
pub use conn_types::{Connection, ConnectionError, KvStore, TaskRunner};
pub use lifecycle::ServiceState;
pub use service::{ConnectionService, RepairOutcome};
