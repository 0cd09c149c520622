//! SQLite-backed key/record store (persistence across restarts).

use async_trait::async_trait;
use conn_types::{KvStore, StorageError};
use std::path::Path;

/// SQLite-backed store. Records and set members live in separate tables.
pub struct SqliteKvStore {
    conn: std::sync::Mutex<rusqlite::Connection>,
}

impl SqliteKvStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn =
            rusqlite::Connection::open(path).map_err(|e| StorageError::Other(e.to_string()))?;
        Self::init(conn)
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn =
            rusqlite::Connection::open_in_memory().map_err(|e| StorageError::Other(e.to_string()))?;
        Self::init(conn)
    }

    fn init(conn: rusqlite::Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS set_members (
                set_key TEXT NOT NULL,
                member TEXT NOT NULL,
                PRIMARY KEY (set_key, member)
            );
            "#,
        )
        .map_err(|e| StorageError::Other(e.to_string()))?;

        Ok(Self {
            conn: std::sync::Mutex::new(conn),
        })
    }

    fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::Other(format!("failed to acquire lock: {}", e)))?;
        f(&conn).map_err(|e| StorageError::Other(e.to_string()))
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<String, StorageError> {
        let value = self.with_conn(|conn| {
            let result = conn.query_row(
                "SELECT value FROM records WHERE key = ?1",
                [key],
                |row| row.get::<_, String>(0),
            );
            match result {
                Ok(v) => Ok(Some(v)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })?;
        value.ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO records (key, value) VALUES (?1, ?2)",
                rusqlite::params![key, value],
            )
        })?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.with_conn(|conn| conn.execute("DELETE FROM records WHERE key = ?1", [key]))?;
        Ok(())
    }

    async fn add_to_set(&self, set_key: &str, member: &str) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO set_members (set_key, member) VALUES (?1, ?2)",
                rusqlite::params![set_key, member],
            )
        })?;
        Ok(())
    }

    async fn remove_from_set(&self, set_key: &str, member: &str) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM set_members WHERE set_key = ?1 AND member = ?2",
                rusqlite::params![set_key, member],
            )
        })?;
        Ok(())
    }

    async fn members_of(&self, set_key: &str) -> Result<Vec<String>, StorageError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT member FROM set_members WHERE set_key = ?1 ORDER BY member ASC")?;
            let rows = stmt.query_map([set_key], |row| row.get::<_, String>(0))?;
            let mut members = Vec::new();
            for row in rows {
                members.push(row?);
            }
            Ok(members)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_round_trip() {
        let store = SqliteKvStore::open_in_memory().unwrap();
        assert!(store.get("k").await.unwrap_err().is_not_found());
        store.set("k", "v1").await.unwrap();
        store.set("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), "v2");
        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();
        assert!(store.get("k").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn set_membership() {
        let store = SqliteKvStore::open_in_memory().unwrap();
        store.add_to_set("s", "b").await.unwrap();
        store.add_to_set("s", "a").await.unwrap();
        store.add_to_set("s", "a").await.unwrap();
        assert_eq!(store.members_of("s").await.unwrap(), vec!["a", "b"]);
        store.remove_from_set("s", "a").await.unwrap();
        store.remove_from_set("s", "zzz").await.unwrap();
        assert_eq!(store.members_of("s").await.unwrap(), vec!["b"]);
        assert!(store.members_of("other").await.unwrap().is_empty());
    }
}
