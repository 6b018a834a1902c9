//! Client error taxonomy.
//!
//! Each variant maps to a user-facing message and a process exit code so the
//! CLI can report failures the same way the UI shell would display them.

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Bad credentials or a login the server rejected.
    #[error("{0}")]
    Auth(String),

    /// Network or transport failure. Never retried by the gateway.
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// Refresh was exhausted after a 401; the session has been logged out.
    #[error("Session expired")]
    SessionExpired,

    /// A response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    Decode(String),

    /// A non-ok response interpreted by a higher-level client.
    #[error("{message} ({status})")]
    Api { status: u16, message: String },
}

impl ClientError {
    /// Exit code used by the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            ClientError::Auth(_) => 2,
            ClientError::SessionExpired => 3,
            ClientError::Transport(_) => 4,
            ClientError::Api { .. } => 5,
            ClientError::Decode(_) => 6,
        }
    }

    /// Whether the caller should send the user back to the login screen.
    pub fn requires_login(&self) -> bool {
        matches!(self, ClientError::SessionExpired | ClientError::Auth(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}
