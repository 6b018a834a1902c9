//! Persisted token storage.
//!
//! Provides the `TokenStore` trait over a fixed key space, plus in-memory
//! and file-backed implementations. Every backend scopes its keys under a
//! namespace so several clients can share one storage area.

pub mod file;
pub mod memory;

use std::fmt;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "bounce_admin";

/// The closed set of persisted keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    AccessToken,
    RefreshToken,
    User,
}

impl StoreKey {
    pub const ALL: [StoreKey; 3] = [StoreKey::AccessToken, StoreKey::RefreshToken, StoreKey::User];

    /// Persisted key name.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::AccessToken => "accessToken",
            StoreKey::RefreshToken => "refreshToken",
            StoreKey::User => "user",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full key name inside a shared storage area.
pub fn scoped_key(namespace: &str, key: StoreKey) -> String {
    format!("{}.{}", namespace, key.as_str())
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt store: {0}")]
    Corrupt(String),
}

/// Pluggable token storage.
///
/// Operations may suspend on I/O. There is no transactional guarantee across
/// keys; callers order their writes.
pub trait TokenStore: Send + Sync {
    /// Read a value. `Ok(None)` when the key was never written or was removed.
    fn get(
        &self,
        key: StoreKey,
    ) -> impl std::future::Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Write a value, replacing any previous one.
    fn set(
        &self,
        key: StoreKey,
        value: &str,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(
        &self,
        key: StoreKey,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;
}

/// Store selected at runtime.
///
/// `TokenStore` uses RPITIT and is not object-safe, so this enum dispatches
/// manually.
pub enum AnyStore {
    Memory(MemoryStore),
    File(FileStore),
}

impl TokenStore for AnyStore {
    async fn get(&self, key: StoreKey) -> Result<Option<String>, StorageError> {
        match self {
            AnyStore::Memory(s) => s.get(key).await,
            AnyStore::File(s) => s.get(key).await,
        }
    }

    async fn set(&self, key: StoreKey, value: &str) -> Result<(), StorageError> {
        match self {
            AnyStore::Memory(s) => s.set(key, value).await,
            AnyStore::File(s) => s.set(key, value).await,
        }
    }

    async fn remove(&self, key: StoreKey) -> Result<(), StorageError> {
        match self {
            AnyStore::Memory(s) => s.remove(key).await,
            AnyStore::File(s) => s.remove(key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names() {
        assert_eq!(StoreKey::AccessToken.as_str(), "accessToken");
        assert_eq!(StoreKey::RefreshToken.as_str(), "refreshToken");
        assert_eq!(StoreKey::User.to_string(), "user");
    }

    #[test]
    fn test_scoped_key() {
        assert_eq!(scoped_key("app", StoreKey::User), "app.user");
        assert_eq!(
            scoped_key(DEFAULT_NAMESPACE, StoreKey::AccessToken),
            "bounce_admin.accessToken"
        );
    }

    #[tokio::test]
    async fn test_any_store_dispatches_to_memory() {
        let store = AnyStore::Memory(MemoryStore::new());
        store.set(StoreKey::User, "{}").await.unwrap();
        assert_eq!(store.get(StoreKey::User).await.unwrap().as_deref(), Some("{}"));
        store.remove(StoreKey::User).await.unwrap();
        assert!(store.get(StoreKey::User).await.unwrap().is_none());
    }
}
