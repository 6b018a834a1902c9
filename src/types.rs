//! Wire DTOs for the mobile auth endpoints.
//!
//! Field names follow the server's camelCase JSON.

use serde::{Deserialize, Serialize};

/// The signed-in user, echoed to the UI and persisted under `user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// POST /api/mobile/auth/login request body.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// POST /api/mobile/auth/login success body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserRecord,
}

/// Body of both POST /api/mobile/auth/refresh and POST /api/mobile/auth/logout.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// POST /api/mobile/auth/refresh success body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Error body returned with non-ok auth responses.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    pub error: Option<String>,
}
