//! OCSF (Open Cybersecurity Schema Framework) structured event logging.
//!
//! Session lifecycle events are emitted via `tracing::info!` on the `ocsf`
//! target as one JSON record each. Never panics.

use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};

// OCSF event class UIDs
pub const CLASS_AUTHENTICATION: u32 = 3001;

// Activity IDs
pub const ACTIVITY_LOGON: u32 = 1;
pub const ACTIVITY_LOGOFF: u32 = 2;
pub const ACTIVITY_SERVICE_TICKET: u32 = 4; // Token refresh
pub const ACTIVITY_OTHER: u32 = 99; // Forced session expiry

// Status IDs
pub const STATUS_SUCCESS: u32 = 1;
pub const STATUS_FAILURE: u32 = 2;

// Severity IDs
pub const SEVERITY_INFORMATIONAL: u32 = 1;
pub const SEVERITY_LOW: u32 = 2;
pub const SEVERITY_MEDIUM: u32 = 3;

// Auth protocol IDs
pub const AUTH_PROTOCOL_PASSWORD: u32 = 2;
pub const AUTH_PROTOCOL_BEARER: u32 = 99;

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn severity_name(id: u32) -> &'static str {
    match id {
        SEVERITY_INFORMATIONAL => "Informational",
        SEVERITY_LOW => "Low",
        SEVERITY_MEDIUM => "Medium",
        _ => "Unknown",
    }
}

fn status_name(id: u32) -> &'static str {
    match id {
        STATUS_SUCCESS => "Success",
        _ => "Failure",
    }
}

fn activity_name(id: u32) -> &'static str {
    match id {
        ACTIVITY_LOGON => "Logon",
        ACTIVITY_LOGOFF => "Logoff",
        ACTIVITY_SERVICE_TICKET => "Service Ticket",
        _ => "Other",
    }
}

/// Build an OCSF Authentication (3001) event.
pub fn authentication_record(
    activity_id: u32,
    status_id: u32,
    severity_id: u32,
    user_email: Option<&str>,
    auth_protocol_id: u32,
    message: &str,
) -> serde_json::Value {
    let auth_protocol = match auth_protocol_id {
        AUTH_PROTOCOL_PASSWORD => "Password",
        AUTH_PROTOCOL_BEARER => "Bearer Token",
        _ => "Unknown",
    };

    let mut event = json!({
        "class_uid": CLASS_AUTHENTICATION,
        "class_name": "Authentication",
        "activity_id": activity_id,
        "activity_name": activity_name(activity_id),
        "severity_id": severity_id,
        "severity": severity_name(severity_id),
        "status_id": status_id,
        "status": status_name(status_id),
        "time": now_millis(),
        "metadata": {
            "product": {
                "name": "bounce-session",
                "version": env!("CARGO_PKG_VERSION"),
                "vendor_name": "SATX Bounce"
            }
        },
        "auth_protocol_id": auth_protocol_id,
        "auth_protocol": auth_protocol,
        "message": message,
    });

    if let Some(email) = user_email {
        event["actor"] = json!({
            "user": {
                "email_addr": email,
                "type_id": 1,
                "type": "User"
            }
        });
    }

    event
}

/// Emit an OCSF Authentication (3001) event.
pub fn authentication_event(
    activity_id: u32,
    status_id: u32,
    severity_id: u32,
    user_email: Option<&str>,
    auth_protocol_id: u32,
    message: &str,
) {
    let event = authentication_record(
        activity_id,
        status_id,
        severity_id,
        user_email,
        auth_protocol_id,
        message,
    );
    if let Ok(json) = serde_json::to_string(&event) {
        tracing::info!(target: "ocsf", "{}", json);
    }
}
