//! Client configuration via environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::store::DEFAULT_NAMESPACE;

/// How requests are issued when running on a native device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeTransport {
    /// Body-reading transport; real status and payload are returned.
    Bridge,
    /// Fire-and-forget transport whose response cannot be read. The gateway
    /// synthesizes a success response. Kept only to reproduce old behavior.
    Opaque,
}

impl FromStr for NativeTransport {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bridge" => Ok(NativeTransport::Bridge),
            "opaque" | "no-cors" => Ok(NativeTransport::Opaque),
            other => Err(ConfigError::Invalid("NATIVE_TRANSPORT".into(), other.into())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    File,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "file" => Ok(StoreBackend::File),
            other => Err(ConfigError::Invalid("STORE_BACKEND".into(), other.into())),
        }
    }
}

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absolute API origin used in production and on native devices.
    pub api_base_url: String,
    /// Origin of the local reverse proxy that serves relative addresses in
    /// development.
    pub dev_proxy_url: String,
    pub dev_mode: bool,
    pub native_platform: bool,
    pub native_transport: NativeTransport,
    pub store_backend: StoreBackend,
    pub store_dir: PathBuf,
    pub store_namespace: String,
    /// No timeout when unset; a hung call then waits indefinitely.
    pub request_timeout: Option<Duration>,
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Nothing is required; every variable has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let request_timeout = match env::var("REQUEST_TIMEOUT_SECS") {
            Ok(v) => Some(Duration::from_secs(v.parse().map_err(|_| {
                ConfigError::Invalid("REQUEST_TIMEOUT_SECS".into(), v.clone())
            })?)),
            Err(_) => None,
        };

        Ok(Self {
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "https://www.satxbounce.com".into()),
            dev_proxy_url: env::var("DEV_PROXY_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
            dev_mode: env_flag("APP_DEV"),
            native_platform: env_flag("NATIVE_PLATFORM"),
            native_transport: env::var("NATIVE_TRANSPORT")
                .map(|v| v.parse::<NativeTransport>())
                .unwrap_or(Ok(NativeTransport::Bridge))?,
            store_backend: env::var("STORE_BACKEND")
                .map(|v| v.parse::<StoreBackend>())
                .unwrap_or(Ok(StoreBackend::File))?,
            store_dir: env::var("STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_store_dir()),
            store_namespace: env::var("STORE_NAMESPACE")
                .unwrap_or_else(|_| DEFAULT_NAMESPACE.into()),
            request_timeout,
            log_json: env_flag("LOG_JSON"),
        })
    }

    /// Configuration for tests: production addressing, web platform,
    /// in-memory store.
    pub fn test_default() -> Self {
        Self {
            api_base_url: "http://localhost:9".into(),
            dev_proxy_url: "http://localhost:5173".into(),
            dev_mode: false,
            native_platform: false,
            native_transport: NativeTransport::Bridge,
            store_backend: StoreBackend::Memory,
            store_dir: PathBuf::from("."),
            store_namespace: DEFAULT_NAMESPACE.into(),
            request_timeout: None,
            log_json: false,
        }
    }

    /// Test configuration pointing every address at one mock server.
    pub fn test_with_server(server_url: &str) -> Self {
        Self {
            api_base_url: server_url.to_string(),
            dev_proxy_url: server_url.to_string(),
            ..Self::test_default()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1:?}")]
    Invalid(String, String),
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| v == "true" || v == "1" || v == "True")
        .unwrap_or(false)
}

fn default_store_dir() -> PathBuf {
    env::var("HOME")
        .map(|home| PathBuf::from(home).join(".config").join("bounce-session"))
        .unwrap_or_else(|_| PathBuf::from(".bounce-session"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_creates_valid_config() {
        let cfg = Config::test_default();
        assert!(!cfg.dev_mode);
        assert!(!cfg.native_platform);
        assert_eq!(cfg.native_transport, NativeTransport::Bridge);
        assert_eq!(cfg.store_backend, StoreBackend::Memory);
        assert!(cfg.request_timeout.is_none());
    }

    #[test]
    fn test_with_server_overrides_both_origins() {
        let cfg = Config::test_with_server("http://127.0.0.1:4000");
        assert_eq!(cfg.api_base_url, "http://127.0.0.1:4000");
        assert_eq!(cfg.dev_proxy_url, "http://127.0.0.1:4000");
    }

    #[test]
    fn test_native_transport_parse() {
        assert_eq!("bridge".parse::<NativeTransport>().unwrap(), NativeTransport::Bridge);
        assert_eq!("Opaque".parse::<NativeTransport>().unwrap(), NativeTransport::Opaque);
        assert_eq!("no-cors".parse::<NativeTransport>().unwrap(), NativeTransport::Opaque);

        let err = "carrier-pigeon".parse::<NativeTransport>().unwrap_err();
        assert!(err.to_string().contains("NATIVE_TRANSPORT"));
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!("FILE".parse::<StoreBackend>().unwrap(), StoreBackend::File);
        assert!("redis".parse::<StoreBackend>().is_err());
    }
}
