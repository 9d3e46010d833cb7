//! Key-value stores holding serialized batch records.
//!
//! `KvStore` is the single seam the engine persists through: string keys,
//! opaque byte values, last write wins, no expiry. `StateStore` is the
//! embedded redb implementation; `RedisStore` (in `redis_store`) talks to
//! a shared Redis.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::BATCHES;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// String-keyed get/set of serialized records.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch the value stored under `key`, if any.
    async fn get(&self, key: &str) -> StateResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &[u8]) -> StateResult<()>;
}

/// Thread-safe embedded store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(BATCHES).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    pub fn get_raw(&self, key: &str) -> StateResult<Option<Vec<u8>>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(BATCHES).map_err(map_err!(Table))?;
        let value = table
            .get(key)
            .map_err(map_err!(Read))?
            .map(|guard| guard.value().to_vec());
        Ok(value)
    }

    pub fn put_raw(&self, key: &str, value: &[u8]) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(BATCHES).map_err(map_err!(Table))?;
            table.insert(key, value).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, bytes = value.len(), "batch record stored");
        Ok(())
    }

    /// List every stored key, in key order.
    pub fn keys(&self) -> StateResult<Vec<String>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(BATCHES).map_err(map_err!(Table))?;
        let mut keys = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, _) = entry.map_err(map_err!(Read))?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }
}

#[async_trait]
impl KvStore for StateStore {
    async fn get(&self, key: &str) -> StateResult<Option<Vec<u8>>> {
        self.get_raw(key)
    }

    async fn set(&self, key: &str, value: &[u8]) -> StateResult<()> {
        self.put_raw(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = StateStore::open_in_memory().unwrap();
        assert!(store.get("GPBInstances_nope_create").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_then_get() {
        let store = StateStore::open_in_memory().unwrap();
        store.set("k", br#"{"service":"a"}"#).await.unwrap();
        assert_eq!(
            store.get("k").await.unwrap().as_deref(),
            Some(&br#"{"service":"a"}"#[..])
        );
    }

    #[tokio::test]
    async fn set_overwrites_in_place() {
        let store = StateStore::open_in_memory().unwrap();
        store.set("k", b"first").await.unwrap();
        store.set("k", b"second").await.unwrap();

        assert_eq!(store.get("k").await.unwrap().unwrap(), b"second");
        assert_eq!(store.keys().unwrap(), vec!["k".to_string()]);
    }

    #[test]
    fn keys_are_listed_in_order() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_raw("GPBInstances_b_create", b"{}").unwrap();
        store.put_raw("GPBInstances_a_delete", b"{}").unwrap();

        assert_eq!(
            store.keys().unwrap(),
            vec![
                "GPBInstances_a_delete".to_string(),
                "GPBInstances_b_create".to_string()
            ]
        );
    }

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("batches.redb");

        {
            let store = StateStore::open(&db_path).unwrap();
            store.put_raw("GPBInstances_svc_create", b"payload").unwrap();
        }

        // Reopen the same database file.
        let store = StateStore::open(&db_path).unwrap();
        assert_eq!(
            store.get_raw("GPBInstances_svc_create").unwrap().unwrap(),
            b"payload"
        );
    }
}
