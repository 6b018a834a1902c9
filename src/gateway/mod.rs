//! Platform-aware HTTP gateway.
//!
//! Resolves the base address from two runtime flags, dispatches the request
//! over the transport matching the platform, and normalizes the result into
//! a `GatewayResponse`. Transport failures are returned as
//! `ClientError::Transport` and never retried here.

pub mod opaque;
pub mod response;

use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::{Config, NativeTransport};
use crate::error::ClientError;

pub use response::GatewayResponse;

/// Runtime environment flags, read on every request.
#[derive(Debug, Default)]
pub struct RuntimeFlags {
    dev: AtomicBool,
    native: AtomicBool,
}

impl RuntimeFlags {
    pub fn new(dev: bool, native: bool) -> Self {
        Self {
            dev: AtomicBool::new(dev),
            native: AtomicBool::new(native),
        }
    }

    pub fn is_dev(&self) -> bool {
        self.dev.load(Ordering::Relaxed)
    }

    pub fn is_native(&self) -> bool {
        self.native.load(Ordering::Relaxed)
    }

    pub fn set_dev(&self, dev: bool) {
        self.dev.store(dev, Ordering::Relaxed);
    }

    pub fn set_native(&self, native: bool) {
        self.native.store(native, Ordering::Relaxed);
    }
}

/// Where request paths are anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseAddress<'a> {
    /// Relative addressing; an external reverse proxy resolves the host.
    Relative,
    Absolute(&'a str),
}

/// Development on a non-native platform uses relative addressing; everything
/// else uses the configured absolute base.
pub fn resolve_base(dev: bool, native: bool, configured: &str) -> BaseAddress<'_> {
    if dev && !native {
        BaseAddress::Relative
    } else {
        BaseAddress::Absolute(configured)
    }
}

/// Method, headers and body of one request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// A request carrying `value` as its JSON body.
    pub fn json<T: Serialize + ?Sized>(method: Method, value: &T) -> Result<Self, ClientError> {
        let body = serde_json::to_string(value).map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(Self {
            method,
            headers: HeaderMap::new(),
            body: Some(body),
        })
    }

    /// Add or replace a header.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, ClientError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ClientError::Transport(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ClientError::Transport(format!("invalid header value: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }
}

/// HTTP gateway shared by every component that talks to the API.
pub struct RequestGateway {
    http_client: reqwest::Client,
    api_base_url: String,
    dev_proxy_url: String,
    native_transport: NativeTransport,
    flags: Arc<RuntimeFlags>,
}

impl RequestGateway {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().map_err(ClientError::from)?;
        Ok(Self::with_client(config, http_client))
    }

    pub fn with_client(config: &Config, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            dev_proxy_url: config.dev_proxy_url.trim_end_matches('/').to_string(),
            native_transport: config.native_transport,
            flags: Arc::new(RuntimeFlags::new(config.dev_mode, config.native_platform)),
        }
    }

    /// Flags consulted on every call. Toggling them affects the next request.
    pub fn flags(&self) -> &Arc<RuntimeFlags> {
        &self.flags
    }

    /// Absolute URL the next request to `endpoint` will go to.
    pub fn url_for(&self, endpoint: &str) -> String {
        match resolve_base(self.flags.is_dev(), self.flags.is_native(), &self.api_base_url) {
            BaseAddress::Relative => format!("{}{}", self.dev_proxy_url, endpoint),
            BaseAddress::Absolute(base) => format!("{}{}", base, endpoint),
        }
    }

    /// Send a request and normalize the response.
    pub async fn send(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<GatewayResponse, ClientError> {
        let url = self.url_for(endpoint);
        let native = self.flags.is_native();
        tracing::debug!(%url, method = %options.method, native, "Sending request");

        let result = match (native, self.native_transport) {
            (false, _) => self.send_web(&url, options).await,
            (true, NativeTransport::Bridge) => self.send_bridge(&url, options).await,
            (true, NativeTransport::Opaque) => self.send_opaque(&url, options).await,
        };

        if let Err(ref e) = result {
            tracing::error!("Request to {} failed: {}", url, e);
        }
        result
    }

    /// POST `data` as JSON.
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        data: &T,
    ) -> Result<GatewayResponse, ClientError> {
        self.send(endpoint, RequestOptions::json(Method::POST, data)?)
            .await
    }

    pub async fn get(&self, endpoint: &str) -> Result<GatewayResponse, ClientError> {
        self.send(endpoint, RequestOptions::new(Method::GET)).await
    }

    /// Browser-style request: JSON content type by default, caller headers
    /// take precedence.
    async fn send_web(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<GatewayResponse, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.extend(options.headers);

        let mut req = self
            .http_client
            .request(options.method, url)
            .headers(headers);
        if let Some(body) = options.body {
            req = req.body(body);
        }

        let resp = req.send().await?;
        Ok(GatewayResponse::live(resp))
    }

    /// Native request through a body-reading transport. Headers go out as
    /// given; a JSON content type is added only when there is a body and the
    /// caller set none.
    async fn send_bridge(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<GatewayResponse, ClientError> {
        let mut headers = options.headers;
        if options.body.is_some() && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let mut req = self
            .http_client
            .request(options.method, url)
            .headers(headers);
        if let Some(body) = options.body {
            req = req.body(body);
        }

        let resp = req.send().await?;
        Ok(GatewayResponse::live(resp))
    }

    /// Native request whose response is never read.
    async fn send_opaque(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<GatewayResponse, ClientError> {
        if options.method == Method::POST {
            let fields = opaque::form_fields(options.body.as_deref());
            self.http_client
                .post(url)
                .form(&fields)
                .send()
                .await?;
            tracing::warn!("Opaque transport: synthesizing success for POST {}", url);
            return Ok(opaque::synthesize_post(&fields));
        }

        self.http_client
            .request(options.method, url)
            .send()
            .await?;
        tracing::warn!("Opaque transport: synthesizing success for {}", url);
        Ok(opaque::synthesize_other())
    }
}
