//! Opaque native transport: requests whose responses cannot be read.
//!
//! The gateway cannot observe the real status or payload in this mode, so it
//! synthesizes a success. Callers cannot tell success from failure; this
//! exists only to reproduce the historical device behavior.

use serde_json::{Value, json};

use super::response::GatewayResponse;

const SYNTHETIC_TEXT: &str = r#"{"success": true}"#;
const FALLBACK_EMAIL: &str = "user@example.com";

/// Re-encode a JSON object body as form fields.
///
/// Strings are sent as-is, other scalars by their JSON text. A body that is
/// not a JSON object yields no fields.
pub fn form_fields(body: Option<&str>) -> Vec<(String, String)> {
    let Some(raw) = body else {
        return Vec::new();
    };

    let parsed: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Opaque transport could not parse request body: {}", e);
            return Vec::new();
        }
    };

    match parsed {
        Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, value)
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Stand-in response for an opaque POST.
///
/// Shaped like a login response, echoing the posted email.
pub fn synthesize_post(fields: &[(String, String)]) -> GatewayResponse {
    let email = fields
        .iter()
        .find(|(k, _)| k == "email")
        .map(|(_, v)| v.as_str())
        .unwrap_or(FALLBACK_EMAIL);

    GatewayResponse::synthetic(
        json!({
            "accessToken": "mock-token",
            "refreshToken": "mock-refresh-token",
            "user": {
                "id": "1",
                "email": email,
                "name": "User"
            }
        }),
        SYNTHETIC_TEXT,
    )
}

/// Stand-in response for any other opaque method.
pub fn synthesize_other() -> GatewayResponse {
    GatewayResponse::synthetic(json!({"success": true}), SYNTHETIC_TEXT)
}
