//! In-memory token store for tests and ephemeral sessions.
//!
//! Uses `DashMap` for concurrent access without external locks. Values do
//! not survive a restart; use `FileStore` for that.

use dashmap::DashMap;

use super::{DEFAULT_NAMESPACE, StorageError, StoreKey, TokenStore, scoped_key};

pub struct MemoryStore {
    store: DashMap<String, String>,
    namespace: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_namespace(DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            store: DashMap::new(),
            namespace: namespace.into(),
        }
    }

    /// Number of values currently stored.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for MemoryStore {
    async fn get(&self, key: StoreKey) -> Result<Option<String>, StorageError> {
        Ok(self
            .store
            .get(&scoped_key(&self.namespace, key))
            .map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: StoreKey, value: &str) -> Result<(), StorageError> {
        self.store
            .insert(scoped_key(&self.namespace, key), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: StoreKey) -> Result<(), StorageError> {
        self.store.remove(&scoped_key(&self.namespace, key));
        Ok(())
    }
}
