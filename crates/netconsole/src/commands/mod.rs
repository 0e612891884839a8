//! Command dispatch: bridges CLI args -> API client calls -> output formatting.

pub mod auth;
pub mod config_cmd;
pub mod devices;
pub mod request;
pub mod util;

use netconsole_api::ApiClient;

use crate::cli::{Command, GlobalOpts};
use crate::config::Config;
use crate::error::CliError;

/// Dispatch an API-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    client: &ApiClient,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => auth::login(client, args, global).await,
        Command::Logout => auth::logout(client, global),
        Command::Session(args) => auth::session(client, cfg, args, global).await,
        Command::Request(args) => request::handle(client, args, global).await,
        Command::Devices(args) => devices::handle(client, args, global).await,
        // Config and Completions are handled before a client is built
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
