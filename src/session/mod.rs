//! Session state and the authenticated request pipeline.
//!
//! `SessionManager` owns the current user (published on a `watch` channel),
//! persists tokens through a `TokenStore`, and sends every request through
//! the `RequestGateway`. A 401 from `api_request` triggers one refresh and at
//! most one retry; a failed refresh logs the session out.
//!
//! Concurrent callers are not coordinated: two requests that both see a 401
//! will each run their own refresh.

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::ClientError;
use crate::gateway::{GatewayResponse, RequestGateway, RequestOptions};
use crate::ocsf;
use crate::store::{AnyStore, StoreKey, TokenStore};
use crate::types::{ErrorBody, LoginRequest, LoginResponse, RefreshRequest, TokenPair, UserRecord};

pub const LOGIN_PATH: &str = "/api/mobile/auth/login";
pub const LOGOUT_PATH: &str = "/api/mobile/auth/logout";
pub const REFRESH_PATH: &str = "/api/mobile/auth/refresh";

pub struct SessionManager<S: TokenStore = AnyStore> {
    store: Arc<S>,
    gateway: RequestGateway,
    user: watch::Sender<Option<UserRecord>>,
}

impl<S: TokenStore> SessionManager<S> {
    /// Build an anonymous session. Call `init` to hydrate persisted state.
    pub fn new(store: Arc<S>, gateway: RequestGateway) -> Self {
        let (user, _) = watch::channel(None);
        Self {
            store,
            gateway,
            user,
        }
    }

    /// Restore the current user from the persisted `user` record.
    ///
    /// Missing or malformed records leave the session anonymous.
    pub async fn init(&self) {
        let Some(raw) = self.read(StoreKey::User).await else {
            return;
        };

        match serde_json::from_str::<UserRecord>(&raw) {
            Ok(user) => {
                tracing::debug!(email = %user.email, "Restored stored user");
                self.user.send_replace(Some(user));
            }
            Err(e) => tracing::error!("Error loading stored user details: {}", e),
        }
    }

    /// Subscribe to current-user changes.
    ///
    /// The receiver holds the latest value immediately (`borrow()`), and
    /// `changed()` resolves on every later login or logout.
    pub fn subscribe(&self) -> watch::Receiver<Option<UserRecord>> {
        self.user.subscribe()
    }

    pub fn current_user(&self) -> Option<UserRecord> {
        self.user.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.borrow().is_some()
    }

    pub fn gateway(&self) -> &RequestGateway {
        &self.gateway
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Authenticate with email and password.
    ///
    /// Tokens and the user record are persisted before the new user is
    /// published, so observers can rely on storage already reflecting it.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserRecord, ClientError> {
        tracing::info!(email, "Login requested");

        let resp = self
            .gateway
            .post(LOGIN_PATH, &LoginRequest { email, password })
            .await?;
        tracing::debug!(status = %resp.status(), "Login response");

        if !resp.ok() {
            let body: ErrorBody = resp.json().await.unwrap_or_default();
            let message = body.error.unwrap_or_else(|| "Login failed".into());

            ocsf::authentication_event(
                ocsf::ACTIVITY_LOGON,
                ocsf::STATUS_FAILURE,
                ocsf::SEVERITY_MEDIUM,
                Some(email),
                ocsf::AUTH_PROTOCOL_PASSWORD,
                &format!("Login failed: {message}"),
            );
            return Err(ClientError::Auth(message));
        }

        let data: LoginResponse = resp.json().await?;
        let user_json =
            serde_json::to_string(&data.user).map_err(|e| ClientError::Decode(e.to_string()))?;

        self.write(StoreKey::AccessToken, &data.access_token).await;
        self.write(StoreKey::RefreshToken, &data.refresh_token).await;
        self.write(StoreKey::User, &user_json).await;

        self.user.send_replace(Some(data.user.clone()));

        ocsf::authentication_event(
            ocsf::ACTIVITY_LOGON,
            ocsf::STATUS_SUCCESS,
            ocsf::SEVERITY_INFORMATIONAL,
            Some(&data.user.email),
            ocsf::AUTH_PROTOCOL_PASSWORD,
            "Login succeeded",
        );

        Ok(data.user)
    }

    /// End the session. Never fails.
    ///
    /// The in-memory user is cleared first so no further authenticated
    /// traffic starts while storage is being cleared. The server is notified
    /// only if a refresh token was stored; its answer is ignored.
    pub async fn logout(&self) {
        let previous = self.user.send_replace(None);

        let refresh_token = self
            .read(StoreKey::RefreshToken)
            .await
            .filter(|t| !t.is_empty());

        for key in StoreKey::ALL {
            self.erase(key).await;
        }

        if let Some(refresh_token) = refresh_token {
            let body = RefreshRequest {
                refresh_token: &refresh_token,
            };
            match self.gateway.post(LOGOUT_PATH, &body).await {
                Ok(resp) if !resp.ok() => {
                    tracing::debug!(status = %resp.status(), "Logout endpoint rejected request");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Logout API error: {}", e),
            }
        }

        ocsf::authentication_event(
            ocsf::ACTIVITY_LOGOFF,
            ocsf::STATUS_SUCCESS,
            ocsf::SEVERITY_INFORMATIONAL,
            previous.as_ref().map(|u| u.email.as_str()),
            ocsf::AUTH_PROTOCOL_BEARER,
            "User logged out",
        );
    }

    /// Exchange the stored refresh token for a new token pair.
    ///
    /// Returns `false` without any network call when no refresh token is
    /// stored, and `false` on any failure. Does not touch the current user.
    pub async fn refresh_token(&self) -> bool {
        let Some(refresh_token) = self
            .read(StoreKey::RefreshToken)
            .await
            .filter(|t| !t.is_empty())
        else {
            return false;
        };

        tracing::info!("Refreshing access token");
        let body = RefreshRequest {
            refresh_token: &refresh_token,
        };

        let tokens = match self.gateway.post(REFRESH_PATH, &body).await {
            Ok(resp) if resp.ok() => resp.json::<TokenPair>().await,
            Ok(resp) => Err(ClientError::Api {
                status: resp.status().as_u16(),
                message: "Token refresh failed".into(),
            }),
            Err(e) => Err(e),
        };

        match tokens {
            Ok(tokens) => {
                self.write(StoreKey::AccessToken, &tokens.access_token).await;
                self.write(StoreKey::RefreshToken, &tokens.refresh_token).await;

                ocsf::authentication_event(
                    ocsf::ACTIVITY_SERVICE_TICKET,
                    ocsf::STATUS_SUCCESS,
                    ocsf::SEVERITY_INFORMATIONAL,
                    self.current_email().as_deref(),
                    ocsf::AUTH_PROTOCOL_BEARER,
                    "Token refresh succeeded",
                );
                true
            }
            Err(e) => {
                tracing::error!("Token refresh error: {}", e);
                ocsf::authentication_event(
                    ocsf::ACTIVITY_SERVICE_TICKET,
                    ocsf::STATUS_FAILURE,
                    ocsf::SEVERITY_LOW,
                    self.current_email().as_deref(),
                    ocsf::AUTH_PROTOCOL_BEARER,
                    &format!("Token refresh failed: {e}"),
                );
                false
            }
        }
    }

    /// Send an authenticated request.
    ///
    /// A missing access token still sends `Bearer ` and lets the server
    /// reject it. On 401 the token is refreshed and the request retried
    /// exactly once; the retry's response is returned whatever its status.
    /// Every other response is returned as-is.
    pub async fn api_request(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<GatewayResponse, ClientError> {
        let access_token = self.read(StoreKey::AccessToken).await.unwrap_or_default();
        tracing::debug!(endpoint, "Making API request");

        let resp = self
            .gateway
            .send(endpoint, with_bearer(options.clone(), &access_token)?)
            .await?;

        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        if !self.refresh_token().await {
            let email = self.current_email();
            self.logout().await;

            ocsf::authentication_event(
                ocsf::ACTIVITY_OTHER,
                ocsf::STATUS_FAILURE,
                ocsf::SEVERITY_MEDIUM,
                email.as_deref(),
                ocsf::AUTH_PROTOCOL_BEARER,
                "Session expired",
            );
            return Err(ClientError::SessionExpired);
        }

        let access_token = self.read(StoreKey::AccessToken).await.unwrap_or_default();
        tracing::info!(endpoint, "Retrying request with new token");

        self.gateway
            .send(endpoint, with_bearer(options, &access_token)?)
            .await
    }

    fn current_email(&self) -> Option<String> {
        self.user.borrow().as_ref().map(|u| u.email.clone())
    }

    /// Read a key; storage failures read as absent.
    async fn read(&self, key: StoreKey) -> Option<String> {
        match self.store.get(key).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", key, e);
                None
            }
        }
    }

    async fn write(&self, key: StoreKey, value: &str) {
        if let Err(e) = self.store.set(key, value).await {
            tracing::error!("Failed to store {}: {}", key, e);
        }
    }

    async fn erase(&self, key: StoreKey) {
        if let Err(e) = self.store.remove(key).await {
            tracing::error!("Failed to remove {}: {}", key, e);
        }
    }
}

fn with_bearer(mut options: RequestOptions, token: &str) -> Result<RequestOptions, ClientError> {
    let value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| ClientError::Transport(format!("invalid access token: {e}")))?;
    options.headers.insert(AUTHORIZATION, value);
    Ok(options)
}
