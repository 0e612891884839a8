use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

/// Top-level error type for the `netconsole-api` crate.
///
/// Callers can always tell a transient network failure ([`Transport`](Self::Transport))
/// apart from an HTTP error status ([`Http`](Self::Http)) and from a dead
/// session ([`SessionInvalid`](Self::SessionInvalid)).
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected by the backend.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The refresh call failed. The session store has been cleared and the
    /// user must log in again. Requests that waited on the same refresh
    /// share one `source`.
    #[error("Session invalid -- re-authentication required ({source})")]
    SessionInvalid { source: Arc<Error> },

    // ── Transport ───────────────────────────────────────────────────
    /// No response received (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A request path that would produce a malformed or double-prefixed URL.
    #[error("Invalid request path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── HTTP ────────────────────────────────────────────────────────
    /// Non-2xx response. `message` is the server-supplied message when
    /// the body carried one, otherwise the canonical status text.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        body: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Request body could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Session persistence ─────────────────────────────────────────
    /// Reading or writing the persisted session failed.
    #[error("Session store error: {0}")]
    SessionStore(String),
}

/// Error body shape the backend uses: `{"message": "..."}`.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl Error {
    /// Build an [`Error::Http`] from a status and raw response body,
    /// lifting the server's `message` field when present.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        let server_message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty());

        Self::Http {
            status: status.as_u16(),
            message: server_message.unwrap_or_else(|| status.to_string()),
            body,
        }
    }

    /// HTTP status carried by this error, if any.
    ///
    /// For [`SessionInvalid`](Self::SessionInvalid) this is the status of
    /// the failed refresh call.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::SessionInvalid { source } => source.status(),
            _ => None,
        }
    }

    /// Human-readable message for logs and diagnostics: the server message
    /// when one was supplied, else the transport-level error text.
    pub fn display_message(&self) -> String {
        match self {
            Self::Http { message, .. } | Self::Authentication { message } => message.clone(),
            Self::SessionInvalid { source } => source.display_message(),
            other => other.to_string(),
        }
    }

    /// Returns `true` for a plain 401 response.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }

    /// Returns `true` if the session is gone and the user must log in again.
    pub fn is_session_invalid(&self) -> bool {
        matches!(self, Self::SessionInvalid { .. })
    }

    /// Returns `true` if this error indicates auth has expired and
    /// re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        self.is_session_invalid() || self.is_unauthorized()
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
