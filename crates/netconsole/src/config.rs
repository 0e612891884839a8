//! CLI configuration — thin wrapper around `netconsole_config`.
//!
//! Re-exports the shared types and layers `GlobalOpts` flag overrides
//! (--base-url, --timeout, --insecure, ...) on top of the loaded file.

use clap::ValueEnum;
use netconsole_api::{ApiClient, RefreshPolicy};

use crate::cli::{GlobalOpts, RefreshPolicyArg, SessionBackendArg};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use netconsole_config::{
    Config, SessionBackend, SessionConfig, config_path, default_session_path, load_config,
    save_config,
};

impl From<SessionBackendArg> for SessionBackend {
    fn from(arg: SessionBackendArg) -> Self {
        match arg {
            SessionBackendArg::Keyring => Self::Keyring,
            SessionBackendArg::File => Self::File,
            SessionBackendArg::Memory => Self::Memory,
        }
    }
}

impl From<RefreshPolicyArg> for RefreshPolicy {
    fn from(arg: RefreshPolicyArg) -> Self {
        match arg {
            RefreshPolicyArg::Independent => Self::Independent,
            RefreshPolicyArg::SingleFlight => Self::SingleFlight,
        }
    }
}

// ── CLI-specific helpers ────────────────────────────────────────────

/// Load the config file and apply flag overrides. Flags win.
pub fn resolve(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = load_config()?;

    if let Some(ref url) = global.base_url {
        cfg.base_url.clone_from(url);
    }
    if let Some(timeout) = global.timeout {
        cfg.timeout = timeout;
    }
    if global.insecure {
        cfg.insecure = true;
    }
    if let Some(backend) = global.session {
        cfg.session.backend = backend.into();
    }
    if let Some(policy) = global.refresh_policy {
        cfg.refresh_policy = policy.into();
    }

    cfg.validate()?;
    Ok(cfg)
}

/// Parse a config-file string into one of the CLI's value enums.
pub fn parse_choice<T: ValueEnum>(field: &str, value: &str) -> Result<T, CliError> {
    T::from_str(value, true).map_err(|reason| CliError::Validation {
        field: field.into(),
        reason,
    })
}

/// Take `--output` and `--color` from the config file unless a flag or
/// `NETCONSOLE_OUTPUT` already chose them.
pub fn apply_display_defaults(global: &mut GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    if global.output.is_none() {
        global.output = Some(parse_choice("output", &cfg.output)?);
    }
    if global.color.is_none() {
        global.color = Some(parse_choice("color", &cfg.color)?);
    }
    Ok(())
}

/// Resolve the config and build a ready-to-use client.
pub fn build_client(global: &GlobalOpts) -> Result<(Config, ApiClient), CliError> {
    let cfg = resolve(global)?;
    let client = cfg.build_client()?;
    tracing::debug!(
        base_url = %client.base_url(),
        session = %cfg.session.backend,
        refresh_policy = %cfg.refresh_policy,
        "client configured"
    );
    Ok((cfg, client))
}
