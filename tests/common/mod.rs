//! Test utilities: session builders over wiremock, recording and failing stores.

#![allow(dead_code)]

use bounce_session::config::Config;
use bounce_session::gateway::RequestGateway;
use bounce_session::session::SessionManager;
use bounce_session::store::{MemoryStore, StorageError, StoreKey, TokenStore};
use bounce_session::types::UserRecord;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::watch;
use wiremock::MockServer;

pub const USER_JSON: &str = r#"{"id":"1","email":"a@b.com","name":"A"}"#;

pub fn test_user() -> UserRecord {
    UserRecord {
        id: "1".into(),
        email: "a@b.com".into(),
        name: "A".into(),
    }
}

pub fn login_body(access: &str, refresh: &str) -> Value {
    json!({
        "accessToken": access,
        "refreshToken": refresh,
        "user": {"id": "1", "email": "a@b.com", "name": "A"}
    })
}

pub fn gateway_for(server: &MockServer) -> RequestGateway {
    RequestGateway::with_client(&Config::test_with_server(&server.uri()), reqwest::Client::new())
}

/// Session over an in-memory store, addressing the mock server.
pub fn build_session(server: &MockServer) -> (Arc<SessionManager<MemoryStore>>, Arc<MemoryStore>) {
    build_session_with_store(server, Arc::new(MemoryStore::new()))
}

pub fn build_session_with_store<S: TokenStore>(
    server: &MockServer,
    store: Arc<S>,
) -> (Arc<SessionManager<S>>, Arc<S>) {
    let session = Arc::new(SessionManager::new(store.clone(), gateway_for(server)));
    (session, store)
}

/// Session whose gateway points at a port nothing listens on.
pub fn build_offline_session() -> (Arc<SessionManager<MemoryStore>>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let mut config = Config::test_default();
    config.api_base_url = "http://127.0.0.1:1".into();
    let gateway = RequestGateway::with_client(&config, reqwest::Client::new());
    (Arc::new(SessionManager::new(store.clone(), gateway)), store)
}

pub async fn seed_tokens<S: TokenStore>(store: &S, access: &str, refresh: &str) {
    store.set(StoreKey::AccessToken, access).await.unwrap();
    store.set(StoreKey::RefreshToken, refresh).await.unwrap();
}

pub async fn seed_user<S: TokenStore>(store: &S) {
    store.set(StoreKey::User, USER_JSON).await.unwrap();
}

pub async fn stored<S: TokenStore>(store: &S, key: StoreKey) -> Option<String> {
    store.get(key).await.unwrap()
}

/// Memory store that logs every operation, optionally with the
/// authentication state observed at the moment of the call.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    log: Mutex<Vec<String>>,
    observer: OnceLock<watch::Receiver<Option<UserRecord>>>,
}

impl RecordingStore {
    pub fn observe(&self, rx: watch::Receiver<Option<UserRecord>>) {
        let _ = self.observer.set(rx);
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear_log(&self) {
        self.log.lock().unwrap().clear();
    }

    fn record(&self, op: &str, key: StoreKey) {
        let entry = match self.observer.get() {
            Some(rx) => format!("{} {} authed={}", op, key, rx.borrow().is_some()),
            None => format!("{} {}", op, key),
        };
        self.log.lock().unwrap().push(entry);
    }
}

impl TokenStore for RecordingStore {
    async fn get(&self, key: StoreKey) -> Result<Option<String>, StorageError> {
        self.record("get", key);
        self.inner.get(key).await
    }

    async fn set(&self, key: StoreKey, value: &str) -> Result<(), StorageError> {
        self.record("set", key);
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: StoreKey) -> Result<(), StorageError> {
        self.record("remove", key);
        self.inner.remove(key).await
    }
}

/// Store whose every operation fails.
pub struct FailingStore;

fn broken() -> StorageError {
    StorageError::Io(std::io::Error::other("disk unavailable"))
}

impl TokenStore for FailingStore {
    async fn get(&self, _key: StoreKey) -> Result<Option<String>, StorageError> {
        Err(broken())
    }

    async fn set(&self, _key: StoreKey, _value: &str) -> Result<(), StorageError> {
        Err(broken())
    }

    async fn remove(&self, _key: StoreKey) -> Result<(), StorageError> {
        Err(broken())
    }
}
