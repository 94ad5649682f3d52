//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};

/// healthlink - Register a health account and link wearable data providers.
#[derive(Parser, Debug)]
#[command(name = "healthlink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    // === Global flags ===
    /// Output format
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log level
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Local user id (overrides the stored session)
    #[arg(long, value_name = "ID", global = true)]
    pub user_id: Option<String>,

    /// Access token for backend calls (overrides the stored session)
    #[arg(long, value_name = "TOKEN", global = true)]
    pub access_token: Option<String>,
}

impl Cli {
    /// Resolve the effective output format from flags alone.
    #[must_use]
    pub fn effective_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the health account for the signed-in user if it does not exist
    Setup,

    /// Show registration state and connected providers
    Status,

    /// List providers that can be linked
    Providers(ProvidersArgs),

    /// Link a provider account and open its authorization page
    Connect(ConnectArgs),

    /// Store the session given by --user-id and --access-token in the system keyring
    Login,

    /// Remove the stored user session
    Logout,
}

impl Commands {
    /// Stable command name used in JSON output.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Status => "status",
            Self::Providers(_) => "providers",
            Self::Connect(_) => "connect",
            Self::Login => "login",
            Self::Logout => "logout",
        }
    }
}

/// Arguments for the `providers` command.
#[derive(Parser, Debug)]
pub struct ProvidersArgs {
    /// Only show providers whose name contains TERM (case-insensitive)
    #[arg(long, short = 's', value_name = "TERM")]
    pub search: Option<String>,
}

/// Arguments for the `connect` command.
#[derive(Parser, Debug)]
pub struct ConnectArgs {
    /// Provider slug, as listed by `healthlink providers`
    #[arg(value_name = "SLUG")]
    pub provider: String,

    /// Email of the account on the provider side
    #[arg(long, value_name = "EMAIL")]
    pub email: String,

    /// Print the authorization URL instead of opening a browser
    #[arg(long)]
    pub no_open: bool,
}

/// Output format.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text with colors
    #[default]
    Human,
    /// JSON for automation
    Json,
}

impl OutputFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Json => "json",
        }
    }
}
