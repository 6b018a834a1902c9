//! File-backed token store that survives process restarts.
//!
//! Layout: one JSON object per namespace at `<dir>/<namespace>.json`,
//! mapping persisted key names to raw string values:
//!
//! ```json
//! {"accessToken": "...", "refreshToken": "...", "user": "{\"id\":\"1\",...}"}
//! ```
//!
//! Writes go to a sibling temp file which is then renamed over the original,
//! so a crash mid-write never leaves a truncated file behind.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::{StorageError, StoreKey, TokenStore};

type Entries = BTreeMap<String, String>;

pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>, namespace: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{namespace}.json")),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Entries, StorageError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Entries::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            StorageError::Corrupt(format!("{}: {}", self.path.display(), e))
        })
    }

    async fn persist(&self, entries: &Entries) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

impl TokenStore for FileStore {
    async fn get(&self, key: StoreKey) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().await;
        let entries = self.load().await?;
        Ok(entries.get(key.as_str()).cloned())
    }

    async fn set(&self, key: StoreKey, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.as_str().to_string(), value.to_string());
        self.persist(&entries).await
    }

    async fn remove(&self, key: StoreKey) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        if entries.remove(key.as_str()).is_none() {
            return Ok(());
        }
        self.persist(&entries).await
    }
}
