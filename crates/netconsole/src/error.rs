//! CLI error types with miette diagnostics.
//!
//! Maps `netconsole_api::Error` and `ConfigError` variants into
//! user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use netconsole_api::Error as ApiError;
use netconsole_config::ConfigError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(netconsole::connection_failed),
        help(
            "Check that the API server is running and reachable.\n\
             Set the endpoint with --base-url, API_BASE_URL, or: netconsole config set base_url <URL>"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("TLS setup failed: {message}")]
    #[diagnostic(
        code(netconsole::tls_error),
        help(
            "Use --insecure (-k) to accept any certificate, or configure ca_cert.\n\
             Run: netconsole config set ca_cert /path/to/ca.pem"
        )
    )]
    TlsError { message: String },

    #[error("Request to {url} timed out")]
    #[diagnostic(
        code(netconsole::timeout),
        help("Increase timeout with --timeout or check server responsiveness.")
    )]
    Timeout { url: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Login failed: {message}")]
    #[diagnostic(
        code(netconsole::auth_failed),
        help("Check the username and password, then run: netconsole login")
    )]
    AuthFailed { message: String },

    #[error("Session expired or missing: {message}")]
    #[diagnostic(
        code(netconsole::session_expired),
        help("Log in again with: netconsole login")
    )]
    SessionExpired { message: String },

    #[error("Permission denied: {message}")]
    #[diagnostic(code(netconsole::forbidden))]
    PermissionDenied { message: String },

    #[error("Session store error: {message}")]
    #[diagnostic(
        code(netconsole::session_store),
        help("Try a different backend with --session file|keyring|memory")
    )]
    SessionStore { message: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(netconsole::not_found),
        help("Run: netconsole {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────

    #[error("API error ({status}): {message}")]
    #[diagnostic(code(netconsole::api_error))]
    Api { status: u16, message: String },

    #[error("Unexpected response from server: {message}")]
    #[diagnostic(code(netconsole::unexpected_response), help("Re-run with -vv to see the request."))]
    UnexpectedResponse { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(netconsole::validation))]
    Validation { field: String, reason: String },

    #[error("Invalid request path '{path}': {reason}")]
    #[diagnostic(
        code(netconsole::invalid_path),
        help("Paths are relative to the base endpoint, e.g. /devices")
    )]
    InvalidPath { path: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(netconsole::config))]
    Config(Box<figment::Error>),

    #[error("Failed to write configuration: {0}")]
    #[diagnostic(code(netconsole::config_write))]
    ConfigWrite(#[from] toml::ser::Error),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(netconsole::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(netconsole::json), help("Check the JSON contents and try again."))]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::SessionExpired { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::PermissionDenied { .. } => exit_code::PERMISSION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::InvalidPath { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Turn a 404 into a resource-specific `NotFound`; other errors map as usual.
    pub fn not_found_as(err: ApiError, resource_type: &str, identifier: &str) -> Self {
        if err.is_not_found() {
            return Self::NotFound {
                resource_type: resource_type.into(),
                identifier: identifier.into(),
                list_command: format!("{resource_type}s list"),
            };
        }
        err.into()
    }
}

// ── ApiError → CliError mapping ──────────────────────────────────────

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Transport(e) => {
                let url = e
                    .url()
                    .map_or_else(|| "(unknown)".into(), ToString::to_string);
                if e.is_timeout() {
                    CliError::Timeout { url }
                } else {
                    CliError::ConnectionFailed {
                        url,
                        source: Box::new(e),
                    }
                }
            }

            ApiError::Authentication { message } => CliError::AuthFailed { message },

            err @ ApiError::SessionInvalid { .. } => CliError::SessionExpired {
                message: err.display_message(),
            },

            ApiError::Http {
                status: 401,
                message,
                ..
            } => CliError::SessionExpired { message },

            ApiError::Http {
                status: 403,
                message,
                ..
            } => CliError::PermissionDenied { message },

            ApiError::Http {
                status, message, ..
            } => CliError::Api { status, message },

            ApiError::InvalidUrl(e) => CliError::Validation {
                field: "base_url".into(),
                reason: e.to_string(),
            },

            ApiError::InvalidPath { path, reason } => CliError::InvalidPath { path, reason },

            ApiError::Tls(message) => CliError::TlsError { message },

            ApiError::Deserialization { message, .. } => CliError::UnexpectedResponse { message },

            ApiError::Serialization(e) => CliError::Json(e),

            ApiError::SessionStore(message) => CliError::SessionStore { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Serialization(e) => CliError::ConfigWrite(e),
            ConfigError::Io(e) => CliError::Io(e),
            ConfigError::Api(e) => e.into(),
        }
    }
}
