//! Command-line interface definition.

use std::path::PathBuf;

use calhours_core::{AllDayPolicy, TracingOutputFormat};
use clap::{Args, Parser, Subcommand};

/// calhours - Where did the week go? Hours per Google calendar.
#[derive(Debug, Parser)]
#[command(name = "calhours")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CALHOURS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log line layout on stderr: compact, pretty or json
    #[arg(long, env = "CALHOURS_LOG_FORMAT", value_name = "FORMAT", global = true)]
    pub log_format: Option<TracingOutputFormat>,

    /// Path to the Google Cloud Console client secrets JSON
    #[arg(long, env = "CALHOURS_CREDENTIALS_FILE", global = true)]
    pub credentials_file: Option<PathBuf>,

    /// Where the OAuth credential is cached
    #[arg(long, global = true)]
    pub token_path: Option<PathBuf>,

    #[command(flatten)]
    pub report: ReportArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Returns the report arguments, whether given before or after `report`.
    pub fn report_args(&self) -> &ReportArgs {
        match self.command {
            Some(Command::Report(ref args)) => args,
            _ => &self.report,
        }
    }
}

/// Options of the report command.
#[derive(Debug, Clone, Default, Args)]
pub struct ReportArgs {
    /// Comma-separated calendar display names (default: calendars marked selected)
    #[arg(long, env = "CALHOURS_CALENDAR_NAMES", value_delimiter = ',')]
    pub calendar_names: Option<Vec<String>>,

    /// Length of the trailing window in days
    #[arg(long)]
    pub days: Option<u32>,

    /// Hours that count as 100 %
    #[arg(long)]
    pub reference_hours: Option<f64>,

    /// How all-day events count: exclude or full-day
    #[arg(long, value_name = "POLICY")]
    pub all_day: Option<AllDayPolicy>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print hours spent per calendar (default)
    Report(ReportArgs),

    /// Run the Google OAuth flow and cache the credential
    Auth {
        /// OAuth client ID (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_ID")]
        client_id: Option<String>,

        /// OAuth client secret (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_SECRET")]
        client_secret: Option<String>,

        /// Force re-authentication even if already authenticated
        #[arg(long, short)]
        force: bool,
    },

    /// List every calendar with its flags
    Calendars,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
