//! Uniform response shape returned by every transport.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ClientError;

#[derive(Debug)]
enum ResponseBody {
    /// Body still attached to the HTTP response, read on demand.
    Live(reqwest::Response),
    /// Body made up by the gateway because the real one was unreadable.
    Synthetic { json: Value, text: String },
}

/// Normalized response: status, `ok`, and consuming body accessors.
#[derive(Debug)]
pub struct GatewayResponse {
    status: StatusCode,
    body: ResponseBody,
}

impl GatewayResponse {
    pub(crate) fn live(response: reqwest::Response) -> Self {
        Self {
            status: response.status(),
            body: ResponseBody::Live(response),
        }
    }

    pub(crate) fn synthetic(json: Value, text: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: ResponseBody::Synthetic {
                json,
                text: text.into(),
            },
        }
    }

    /// True for any 2xx status.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Whether the payload was synthesized rather than read from the wire.
    pub fn is_synthetic(&self) -> bool {
        matches!(self.body, ResponseBody::Synthetic { .. })
    }

    /// Decode the body as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        match self.body {
            ResponseBody::Live(resp) => resp.json().await.map_err(ClientError::from),
            ResponseBody::Synthetic { json, .. } => {
                serde_json::from_value(json).map_err(|e| ClientError::Decode(e.to_string()))
            }
        }
    }

    /// Read the body as text.
    pub async fn text(self) -> Result<String, ClientError> {
        match self.body {
            ResponseBody::Live(resp) => resp.text().await.map_err(ClientError::from),
            ResponseBody::Synthetic { text, .. } => Ok(text),
        }
    }
}
