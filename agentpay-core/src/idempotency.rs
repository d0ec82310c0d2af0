//! Sets of already-handled keys.
//!
//! The watcher records each forwarded deposit hash and the executor claims
//! each settled transaction hash. Keys are never evicted on their own. The
//! in-memory store is lost on restart; the Postgres store survives it.

use crate::entities::idempotency_key::{
    ContainsIdempotencyKey, DeleteIdempotencyKey, InsertIdempotencyKey,
};
use crate::framework::DatabaseProcessor;
use async_trait::async_trait;
use kanau::processor::Processor;
use std::collections::HashSet;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn contains(&self, key: &str) -> Result<bool, StoreError>;

    /// Record `key`. Returns `true` if it was not present yet, so the caller
    /// owns the key from now on.
    async fn insert(&self, key: &str) -> Result<bool, StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryIdempotencyStore {
    keys: Mutex<HashSet<String>>,
}

impl MemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.keys.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.keys.lock().await.is_empty()
    }
}

#[async_trait]
impl IdempotencyStore for MemoryIdempotencyStore {
    async fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.keys.lock().await.contains(key))
    }

    async fn insert(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.keys.lock().await.insert(key.to_owned()))
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.keys.lock().await.remove(key);
        Ok(())
    }
}

/// Keys recorded by the deposit watcher.
pub const WATCHER_SCOPE: &str = "watcher";
/// Keys claimed by the settlement executor.
pub const EXECUTOR_SCOPE: &str = "executor";

/// Postgres-backed store. All rows live in `idempotency_keys`, separated by
/// `scope`.
#[derive(Debug, Clone)]
pub struct PgIdempotencyStore {
    db: DatabaseProcessor,
    scope: &'static str,
}

impl PgIdempotencyStore {
    pub fn new(db: DatabaseProcessor, scope: &'static str) -> Self {
        Self { db, scope }
    }
}

#[async_trait]
impl IdempotencyStore for PgIdempotencyStore {
    async fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self
            .db
            .process(ContainsIdempotencyKey {
                scope: self.scope,
                key: key.to_owned(),
            })
            .await?)
    }

    async fn insert(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self
            .db
            .process(InsertIdempotencyKey {
                scope: self.scope,
                key: key.to_owned(),
            })
            .await?)
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.db
            .process(DeleteIdempotencyKey {
                scope: self.scope,
                key: key.to_owned(),
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_insert_once() {
        let store = MemoryIdempotencyStore::new();
        assert!(!store.contains("0xabc").await.unwrap());
        assert!(store.insert("0xabc").await.unwrap());
        assert!(!store.insert("0xabc").await.unwrap());
        assert!(store.contains("0xabc").await.unwrap());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_memory_store_remove_releases_key() {
        let store = MemoryIdempotencyStore::new();
        store.insert("0xabc").await.unwrap();
        store.remove("0xabc").await.unwrap();
        assert!(store.is_empty().await);
        assert!(store.insert("0xabc").await.unwrap());
        // removing a missing key is not an error
        store.remove("0xdef").await.unwrap();
    }
}
