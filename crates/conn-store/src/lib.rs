//! Key/record store implementations: in-memory, SQLite (feature `sqlite`), and a
//! fault-injecting wrapper for tests (feature `test-util`).

mod memory;

#[cfg(feature = "test-util")]
pub mod faulty;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use conn_types::{KvStore, StorageError};
pub use memory::InMemoryKvStore;

#[cfg(feature = "test-util")]
pub use faulty::{FaultyKvStore, StoreOp};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteKvStore;
