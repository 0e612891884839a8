//! Clap derive structures for the `netconsole` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// netconsole -- authenticated command-line client for the netconsole API
#[derive(Debug, Parser)]
#[command(
    name = "netconsole",
    version,
    about = "Talk to the netconsole network-management API from the command line",
    long_about = "Command-line client for the netconsole REST API.\n\n\
        Logs in once, keeps the access and refresh tokens in a session store,\n\
        and transparently refreshes an expired access token on 401.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// API base endpoint (overrides config and API_BASE_URL)
    #[arg(long, short = 'b', global = true)]
    pub base_url: Option<String>,

    /// Output format [default: `output` from the config file, else table]
    #[arg(long, short = 'o', env = "NETCONSOLE_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: `color` from the config file, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format on stderr
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Where the session tokens are kept
    #[arg(long, global = true)]
    pub session: Option<SessionBackendArg>,

    /// How concurrent token refreshes are coordinated
    #[arg(long, global = true)]
    pub refresh_policy: Option<RefreshPolicyArg>,
}

impl GlobalOpts {
    pub fn output_format(&self) -> &OutputFormat {
        self.output.as_ref().unwrap_or(&OutputFormat::Table)
    }

    pub fn color_mode(&self) -> &ColorMode {
        self.color.as_ref().unwrap_or(&ColorMode::Auto)
    }
}

// ── Value Enums ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SessionBackendArg {
    /// System keyring
    Keyring,
    /// JSON file in the data directory
    File,
    /// Process memory only (nothing persists)
    Memory,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RefreshPolicyArg {
    /// Each request that hits 401 refreshes on its own
    Independent,
    /// Concurrent 401s share one refresh
    SingleFlight,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in with username and password and store the session
    Login(LoginArgs),

    /// Drop the stored session
    Logout,

    /// Inspect or refresh the stored session
    Session(SessionArgs),

    /// Send an authenticated request to an arbitrary API path
    #[command(alias = "req")]
    Request(RequestArgs),

    /// Manage inventory devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Username (prompted when omitted)
    #[arg(long, short = 'u')]
    pub username: Option<String>,

    /// Password (prompted when omitted)
    #[arg(long, env = "NETCONSOLE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Debug, Args)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// Show whether a session is stored and where
    Status,

    /// Exchange the refresh token for a new access token now
    Refresh,
}

// ── Raw requests ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RequestArgs {
    /// HTTP method
    #[arg(value_enum, ignore_case = true)]
    pub method: HttpMethod,

    /// Path relative to the base endpoint (e.g. /devices)
    pub path: String,

    /// Query parameter as key=value (repeatable)
    #[arg(long = "param", short = 'P', value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Inline JSON body
    #[arg(long, short = 'd', conflicts_with = "from_file")]
    pub data: Option<String>,

    /// Read the JSON body from a file
    #[arg(long, short = 'F')]
    pub from_file: Option<PathBuf>,
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices
    #[command(alias = "ls")]
    List(DeviceListArgs),

    /// Show one device
    Get {
        /// Device ID
        device: String,
    },

    /// Create a device from a JSON payload
    Create(PayloadArgs),

    /// Update fields of a device from a JSON payload
    Update {
        /// Device ID
        device: String,

        #[command(flatten)]
        payload: PayloadArgs,
    },

    /// Delete a device
    #[command(alias = "rm")]
    Delete {
        /// Device ID
        device: String,
    },
}

#[derive(Debug, Args)]
pub struct DeviceListArgs {
    /// Only devices at this site
    #[arg(long, short = 's')]
    pub site: Option<String>,

    /// Only devices in this status
    #[arg(long)]
    pub status: Option<String>,

    /// Extra filter passed to the API as key=value (repeatable)
    #[arg(long, short = 'f', value_name = "KEY=VALUE")]
    pub filter: Vec<String>,
}

#[derive(Debug, Args)]
pub struct PayloadArgs {
    /// Inline JSON object
    #[arg(long, short = 'd', conflicts_with = "from_file", required_unless_present = "from_file")]
    pub data: Option<String>,

    /// Read the JSON object from a file
    #[arg(long, short = 'F')]
    pub from_file: Option<PathBuf>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create the config file with guided setup
    Init,

    /// Display the resolved configuration
    Show,

    /// Print the config file location
    Path,

    /// Set a configuration value
    Set {
        /// Config key (e.g. base_url, timeout, session.backend)
        key: String,

        /// Value to set
        value: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
