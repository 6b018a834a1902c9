//! Authenticated API client for the bounce-house rental
//! admin backend.
//!
//! The same pipeline serves the CLI and any embedding UI shell:
//! `SessionManager` persists tokens through a `TokenStore`, dispatches via
//! the platform-aware `RequestGateway`, and refreshes-and-retries on 401.

pub mod config;
pub mod contacts;
pub mod error;
pub mod gateway;
pub mod ocsf;
pub mod session;
pub mod store;
pub mod types;

use std::sync::Arc;

use crate::config::{Config, StoreBackend};
use crate::error::ClientError;
use crate::gateway::RequestGateway;
use crate::session::SessionManager;
use crate::store::{AnyStore, FileStore, MemoryStore};

/// Build the store selected by the configuration.
pub fn build_store(config: &Config) -> AnyStore {
    match config.store_backend {
        StoreBackend::File => {
            tracing::info!(
                "Using file token store ({})",
                config.store_dir.display()
            );
            AnyStore::File(FileStore::new(&config.store_dir, &config.store_namespace))
        }
        StoreBackend::Memory => {
            tracing::info!("Using in-memory token store");
            AnyStore::Memory(MemoryStore::with_namespace(config.store_namespace.clone()))
        }
    }
}

/// Build a session from configuration and hydrate it from storage.
pub async fn connect(config: &Config) -> Result<Arc<SessionManager<AnyStore>>, ClientError> {
    let gateway = RequestGateway::new(config)?;
    let session = SessionManager::new(Arc::new(build_store(config)), gateway);
    session.init().await;
    Ok(Arc::new(session))
}
