//! Config subcommand handlers.

use dialoguer::{Input, Select};

use netconsole_api::RefreshPolicy;

use crate::cli::{ColorMode, ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, Config, SessionBackend};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display as TOML-ish `key = value` lines.
fn format_config(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    let _ = writeln!(out, "base_url = \"{}\"", cfg.base_url);
    let _ = writeln!(out, "timeout = {}", cfg.timeout);
    let _ = writeln!(out, "insecure = {}", cfg.insecure);
    if let Some(ref ca) = cfg.ca_cert {
        let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
    }
    let _ = writeln!(out, "refresh_policy = \"{}\"", cfg.refresh_policy);
    let _ = writeln!(out, "output = \"{}\"", cfg.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.color);
    let _ = writeln!(out);
    let _ = writeln!(out, "[session]");
    let _ = writeln!(out, "backend = \"{}\"", cfg.session.backend);
    if let Some(ref path) = cfg.session.path {
        let _ = writeln!(out, "path = \"{}\"", path.display());
    }

    out
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: "must be 'true' or 'false'".into(),
    })
}

/// Apply one `config set` assignment.
pub fn apply_setting(cfg: &mut Config, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "base_url" | "base-url" => cfg.base_url = value,
        "timeout" => {
            cfg.timeout = value.parse().map_err(|_| CliError::Validation {
                field: "timeout".into(),
                reason: "must be a number (seconds)".into(),
            })?;
        }
        "insecure" => cfg.insecure = parse_bool("insecure", &value)?,
        "ca_cert" | "ca-cert" => cfg.ca_cert = Some(value.into()),
        "refresh_policy" | "refresh-policy" => {
            cfg.refresh_policy = value
                .parse::<RefreshPolicy>()
                .map_err(|reason| CliError::Validation {
                    field: "refresh_policy".into(),
                    reason,
                })?;
        }
        "session.backend" | "session" => {
            cfg.session.backend = match value.as_str() {
                "keyring" => SessionBackend::Keyring,
                "file" => SessionBackend::File,
                "memory" => SessionBackend::Memory,
                other => {
                    return Err(CliError::Validation {
                        field: "session.backend".into(),
                        reason: format!("expected 'keyring', 'file', or 'memory', got '{other}'"),
                    });
                }
            };
        }
        "session.path" => cfg.session.path = Some(value.into()),
        "output" => {
            config::parse_choice::<OutputFormat>("output", &value)?;
            cfg.output = value;
        }
        "color" => {
            config::parse_choice::<ColorMode>("color", &value)?;
            cfg.color = value;
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: base_url, timeout, insecure, \
                     ca_cert, refresh_policy, session.backend, session.path, output, color"
                ),
            });
        }
    }
    cfg.validate()?;
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &mut GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("netconsole -- configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let base_url: String = Input::new()
                .with_prompt("API base URL")
                .default(netconsole_api::DEFAULT_BASE_URL.into())
                .interact_text()
                .map_err(prompt_err)?;

            let backends = [SessionBackend::File, SessionBackend::Keyring, SessionBackend::Memory];
            let backend_choices = &[
                "Session file in the data directory (default)",
                "System keyring",
                "Memory only (log in every run)",
            ];
            let backend = Select::new()
                .with_prompt("Where should the session tokens live?")
                .items(backend_choices)
                .default(0)
                .interact()
                .map_err(prompt_err)?;

            let policy = Select::new()
                .with_prompt("Refresh coordination for concurrent requests")
                .items(&["independent", "single-flight"])
                .default(0)
                .interact()
                .map_err(prompt_err)?;

            let mut cfg = Config {
                base_url,
                ..Config::default()
            };
            cfg.session.backend = backends.get(backend).copied().unwrap_or_default();
            if policy == 1 {
                cfg.refresh_policy = RefreshPolicy::SingleFlight;
            }

            let path = config::save_config(&cfg)?;
            eprintln!("\n✓ Configuration written to {}", path.display());
            eprintln!("\n  Next: netconsole login");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::resolve(global)?;
            config::apply_display_defaults(global, &cfg)?;
            let out = output::render_single(global.output_format(), &cfg, format_config, |c| {
                c.base_url.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config()?;
            apply_setting(&mut cfg, &key, value)?;
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Set {key}");
            }
            Ok(())
        }
    }
}
