//! Login, logout and session command handlers.

use std::io::IsTerminal;

use dialoguer::{Input, Password};
use secrecy::SecretString;
use serde::Serialize;

use netconsole_api::{ApiClient, User};

use crate::cli::{GlobalOpts, LoginArgs, SessionArgs, SessionCommand};
use crate::config::{self, Config, SessionBackend};
use crate::error::CliError;
use crate::output;

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn require_terminal(field: &str) -> Result<(), CliError> {
    if std::io::stdin().is_terminal() {
        Ok(())
    } else {
        Err(CliError::Validation {
            field: field.into(),
            reason: format!("no terminal to prompt on; pass --{field}"),
        })
    }
}

fn user_detail(u: &User) -> String {
    let mut lines = vec![
        format!("ID:       {}", u.id),
        format!("Username: {}", u.username),
        format!("Name:     {}", u.name),
        format!("Email:    {}", u.email),
        format!("Role:     {}", u.role),
    ];
    if let Some(ref avatar) = u.avatar {
        lines.push(format!("Avatar:   {avatar}"));
    }
    lines.join("\n")
}

// ── Login / logout ──────────────────────────────────────────────────

pub async fn login(client: &ApiClient, args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let username = match args.username {
        Some(u) => u,
        None => {
            require_terminal("username")?;
            Input::new()
                .with_prompt("Username")
                .interact_text()
                .map_err(prompt_err)?
        }
    };

    let password = match args.password {
        Some(p) => p,
        None => {
            require_terminal("password")?;
            Password::new()
                .with_prompt("Password")
                .interact()
                .map_err(prompt_err)?
        }
    };

    if username.is_empty() || password.is_empty() {
        return Err(CliError::Validation {
            field: "credentials".into(),
            reason: "username and password cannot be empty".into(),
        });
    }

    let response = client
        .login(&username, &SecretString::from(password))
        .await?;

    if !global.quiet {
        eprintln!("✓ Logged in as {username}");
    }
    if let Some(user) = response.user {
        let out = output::render_single(
            global.output_format(),
            &user,
            user_detail,
            |u| u.id.clone(),
        )?;
        output::print_output(&out, global.quiet);
    }
    Ok(())
}

pub fn logout(client: &ApiClient, global: &GlobalOpts) -> Result<(), CliError> {
    client.logout()?;
    if !global.quiet {
        eprintln!("✓ Session cleared");
    }
    Ok(())
}

// ── Session ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SessionStatus {
    base_url: String,
    backend: SessionBackend,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    refresh_policy: String,
    authenticated: bool,
    refresh_token: bool,
}

pub async fn session(
    client: &ApiClient,
    cfg: &Config,
    args: SessionArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        SessionCommand::Status => {
            let stored = client.session().get()?;
            let status = SessionStatus {
                base_url: client.base_url().to_string(),
                backend: cfg.session.backend,
                path: (cfg.session.backend == SessionBackend::File).then(|| {
                    cfg.session
                        .path
                        .clone()
                        .unwrap_or_else(config::default_session_path)
                        .display()
                        .to_string()
                }),
                refresh_policy: client.refresh_policy().to_string(),
                authenticated: stored.is_some(),
                refresh_token: stored.as_ref().is_some_and(netconsole_api::Session::can_refresh),
            };

            let color = output::should_color(global.color_mode());
            let out = output::render_single(
                global.output_format(),
                &status,
                |s| {
                    let mut lines = vec![
                        format!("Base URL:       {}", s.base_url),
                        format!("Backend:        {}", s.backend),
                    ];
                    if let Some(ref path) = s.path {
                        lines.push(format!("Path:           {path}"));
                    }
                    lines.push(format!("Refresh policy: {}", s.refresh_policy));
                    lines.push(format!("Authenticated:  {}", output::yes_no(s.authenticated, color)));
                    lines.push(format!("Refresh token:  {}", output::yes_no(s.refresh_token, color)));
                    lines.join("\n")
                },
                |s| s.authenticated.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SessionCommand::Refresh => {
            client.refresh().await?;
            if !global.quiet {
                eprintln!("✓ Access token refreshed");
            }
            Ok(())
        }
    }
}
