//! Shared configuration for the netconsole client.
//!
//! Layered loading (defaults, TOML file, environment) and translation into
//! the `netconsole_api` transport, session store and client types.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use netconsole_api::{
    ApiClient, DEFAULT_BASE_URL, FileSessionStore, KeyringSessionStore, MemorySessionStore,
    RefreshPolicy, SharedSessionStore, TlsMode, TransportConfig,
};

/// Service name for keyring-backed sessions.
pub const KEYRING_SERVICE: &str = "netconsole";

/// Un-prefixed variable that overrides `base_url`.
pub const BASE_URL_ENV: &str = "API_BASE_URL";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Api(#[from] netconsole_api::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Base endpoint every request path is joined onto.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds, refresh calls included.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Skip TLS certificate verification.
    #[serde(default)]
    pub insecure: bool,

    /// Path to a PEM CA certificate to trust in addition to the system roots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    #[serde(default)]
    pub refresh_policy: RefreshPolicy,

    #[serde(default)]
    pub session: SessionConfig,

    /// Default CLI output format.
    #[serde(default = "default_output")]
    pub output: String,

    /// Default CLI color mode.
    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            insecure: false,
            ca_cert: None,
            refresh_policy: RefreshPolicy::default(),
            session: SessionConfig::default(),
            output: default_output(),
            color: default_color(),
        }
    }
}

/// Where the access and refresh tokens live between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub backend: SessionBackend,

    /// Session file for the `file` backend. Defaults to the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    Keyring,
    #[default]
    File,
    Memory,
}

impl SessionBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keyring => "keyring",
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

impl std::fmt::Display for SessionBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_timeout() -> u64 {
    30
}
fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "netconsole", "netconsole")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default session file for the `file` backend.
pub fn default_session_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".local/share").join("session.json"),
        |dirs| dirs.data_dir().join("session.json"),
    )
}

fn dirs_fallback(sub: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(sub);
    p.push("netconsole");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// The provider stack: defaults, then the TOML file at `path`, then
/// `NETCONSOLE_*` variables (`__` separates nested keys), then
/// `API_BASE_URL`.
pub fn figment_for(path: &std::path::Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NETCONSOLE_").split("__"))
        .merge(
            Env::raw()
                .only(&[BASE_URL_ENV])
                .map(|_| "base_url".into()),
        )
}

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&figment_for(&config_path()))
}

/// Extract and validate a Config from an arbitrary provider stack.
pub fn load_config_from(figment: &Figment) -> Result<Config, ConfigError> {
    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &std::path::Path) -> Result<(), ConfigError> {
    cfg.validate()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Reject values the client cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.base_url).map_err(|e| ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("{e}: {}", self.base_url),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation {
                field: "base_url".into(),
                reason: format!("expected an http(s) URL, got '{}'", self.base_url),
            });
        }
        if self.timeout == 0 {
            return Err(ConfigError::Validation {
                field: "timeout".into(),
                reason: "must be at least one second".into(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// `insecure` wins over `ca_cert`.
    pub fn tls_mode(&self) -> TlsMode {
        if self.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca) = self.ca_cert {
            TlsMode::CustomCa(ca.clone())
        } else {
            TlsMode::System
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig::default()
            .with_timeout(self.timeout())
            .with_tls(self.tls_mode())
    }

    /// Open the configured session backend.
    pub fn session_store(&self) -> Result<SharedSessionStore, ConfigError> {
        let store: SharedSessionStore = match self.session.backend {
            SessionBackend::Keyring => Arc::new(KeyringSessionStore::open(KEYRING_SERVICE)?),
            SessionBackend::File => {
                let path = self
                    .session
                    .path
                    .clone()
                    .unwrap_or_else(default_session_path);
                Arc::new(FileSessionStore::open(path)?)
            }
            SessionBackend::Memory => Arc::new(MemorySessionStore::new()),
        };
        Ok(store)
    }

    /// Build an [`ApiClient`] from this config with a freshly opened store.
    pub fn build_client(&self) -> Result<ApiClient, ConfigError> {
        self.validate()?;
        let session = self.session_store()?;
        let client = ApiClient::new(&self.base_url, session, &self.transport())?
            .with_refresh_policy(self.refresh_policy);
        Ok(client)
    }
}
