use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use siemwatch_client::query::{ExportFormat, FilterField, QueryFilters};

#[derive(Parser)]
#[command(name = "siemwatch")]
#[command(about = "SiemWatch CLI: watch and browse security events")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Backend base URL (overrides config and SIEMWATCH_URL env var)
    #[arg(short, long, global = true, env = "SIEMWATCH_URL")]
    pub server: Option<String>,

    /// Config profile name
    #[arg(short, long, global = true, env = "SIEMWATCH_PROFILE", default_value = "default")]
    pub profile: String,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store Basic credentials for the backend
    Login(LoginArgs),
    /// Logout (remove stored credentials)
    Logout,
    /// Show current auth info
    Whoami,
    /// Live dashboard refreshed on a fixed interval
    Dashboard(DashboardArgs),
    /// List events of the last 24 hours
    Events(EventsArgs),
    /// Inspect a single event
    Event(EventArgs),
    /// Download the filtered event list as CSV or JSON
    Export(ExportArgs),
    /// Manage CLI configuration
    Config(ConfigArgs),
}

#[derive(clap::Args)]
pub struct LoginArgs {
    /// Username
    #[arg(short, long)]
    pub username: Option<String>,
    /// Password
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(clap::Args)]
pub struct DashboardArgs {
    /// Render one round and exit
    #[arg(long)]
    pub once: bool,
    /// Seconds between refresh rounds (overrides config)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,
}

/// Filters shared by `events` and `export`.
#[derive(clap::Args, Clone, Default)]
pub struct FilterArgs {
    /// Free-text search
    #[arg(long)]
    pub search: Option<String>,
    /// Event type (e.g. user_login)
    #[arg(long)]
    pub event_type: Option<String>,
    /// Severity (low, medium, high)
    #[arg(long)]
    pub severity: Option<String>,
    /// Hostname
    #[arg(long)]
    pub hostname: Option<String>,
    /// User name
    #[arg(long)]
    pub user: Option<String>,
}

impl FilterArgs {
    pub fn to_filters(&self) -> QueryFilters {
        let values = [
            (FilterField::Search, &self.search),
            (FilterField::EventType, &self.event_type),
            (FilterField::Severity, &self.severity),
            (FilterField::Hostname, &self.hostname),
            (FilterField::User, &self.user),
        ];
        values
            .into_iter()
            .fold(QueryFilters::default(), |filters, (field, value)| match value {
                Some(value) => filters.with(field, value.as_str()),
                None => filters,
            })
    }
}

#[derive(clap::Args)]
pub struct EventsArgs {
    /// Page number
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Show the full record of this event (repeatable)
    #[arg(long = "expand", value_name = "ID")]
    pub expand: Vec<String>,
}

#[derive(clap::Args)]
pub struct EventArgs {
    #[command(subcommand)]
    pub command: EventCommands,
}

#[derive(Subcommand)]
pub enum EventCommands {
    /// Show one event by id
    Show(EventShowArgs),
}

#[derive(clap::Args)]
pub struct EventShowArgs {
    /// Event id (`_id`)
    pub id: String,
}

#[derive(clap::Args)]
pub struct ExportArgs {
    /// File format
    #[arg(long = "as", value_name = "FORMAT", default_value = "json")]
    pub export_format: ExportFormat,
    /// Destination file (defaults to events.<format> in the current directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[command(flatten)]
    pub filters: FilterArgs,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current config
    Show,
    /// Set config value
    Set(ConfigSetArgs),
}

#[derive(clap::Args)]
pub struct ConfigSetArgs {
    /// Key to set (server, format, refresh_secs)
    pub key: String,
    /// Value
    pub value: String,
}
