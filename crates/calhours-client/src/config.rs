//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/calhours/config.toml` by default:
//!
//! ```toml
//! [google]
//! client_id = "env::CALHOURS_CLIENT_ID"
//! client_secret = "pass::google/calhours"
//!
//! [logging]
//! format = "json"
//!
//! [report]
//! calendar_names = ["Work", "Side project"]
//! reference_hours = 156.0
//! window_days = 7
//! all_day_policy = "exclude"
//! ```
//!
//! Credential values support secret references, see [`crate::secret`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use calhours_core::report::{DEFAULT_REFERENCE_HOURS, DEFAULT_WINDOW_DAYS};
use calhours_core::{AllDayPolicy, ReportSettings, TracingConfig, TracingOutputFormat};
use calhours_providers::CalendarFilter;
use calhours_providers::google::{GoogleConfig, OAuthCredentials};
use serde::{Deserialize, Serialize};

use crate::cli::ReportArgs;
use crate::error::{ClientError, ClientResult};

/// Client secrets file looked up in the working directory when nothing
/// else provides OAuth credentials.
pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";

// ---------------------------------------------------------------------------
// ClientConfig (config.toml)
// ---------------------------------------------------------------------------

/// Configuration for the calhours client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Diagnostics on stderr.
    pub logging: LoggingSection,

    /// Google Calendar settings.
    pub google: Option<GoogleSettings>,

    /// Report settings.
    pub report: ReportSection,
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults if absent.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| ClientError::Config(format!("{} in {}", e, path.display())))
    }

    /// Parses a `config.toml` document.
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calhours")
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// The `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Line layout: `compact`, `pretty` or `json`.
    pub format: TracingOutputFormat,

    /// Prefix each line with a timestamp.
    pub timestamps: bool,

    /// Filter directive such as `calhours=trace,reqwest=debug`. Overrides
    /// `RUST_LOG` and the debug level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl LoggingSection {
    /// Builds the tracing setup. `format` is the `--log-format` flag.
    pub fn tracing_config(
        &self,
        debug: bool,
        format: Option<TracingOutputFormat>,
    ) -> TracingConfig {
        let base = if debug {
            TracingConfig::cli_debug()
        } else {
            TracingConfig::cli()
        };
        let config = base
            .with_format(format.unwrap_or(self.format))
            .with_timestamps(self.timestamps);
        match self.filter {
            Some(ref directive) => config.with_env_filter(directive.as_str()),
            None => config,
        }
    }
}

// ---------------------------------------------------------------------------
// ReportSection
// ---------------------------------------------------------------------------

/// The `[report]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    /// Calendars to report on, by display name. Absent means the calendars
    /// marked selected in the calendar list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_names: Option<Vec<String>>,

    /// Hours that count as 100 %.
    pub reference_hours: f64,

    /// Length of the trailing window in days.
    pub window_days: u32,

    /// How all-day events count.
    pub all_day_policy: AllDayPolicy,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            calendar_names: None,
            reference_hours: DEFAULT_REFERENCE_HOURS,
            window_days: DEFAULT_WINDOW_DAYS,
            all_day_policy: AllDayPolicy::default(),
        }
    }
}

/// Report options after merging CLI flags over `config.toml`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    /// Which calendars to include.
    pub filter: CalendarFilter,
    /// Window and percentage settings.
    pub settings: ReportSettings,
    /// How all-day events count.
    pub all_day_policy: AllDayPolicy,
}

impl ReportSection {
    /// Merges CLI flags over this section. Flags win.
    pub fn resolve(&self, args: &ReportArgs) -> ClientResult<ReportOptions> {
        let names = args
            .calendar_names
            .clone()
            .or_else(|| self.calendar_names.clone())
            .map(|names| {
                names
                    .into_iter()
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .collect::<Vec<_>>()
            });

        if names.as_ref().is_some_and(Vec::is_empty) {
            return Err(ClientError::Config(
                "calendar_names is set but names no calendar".to_string(),
            ));
        }

        let settings = ReportSettings {
            reference_hours: args.reference_hours.unwrap_or(self.reference_hours),
            window_days: args.days.unwrap_or(self.window_days),
        };
        settings.validate().map_err(ClientError::Config)?;

        Ok(ReportOptions {
            filter: CalendarFilter::from_names(names),
            settings,
            all_day_policy: args.all_day.unwrap_or(self.all_day_policy),
        })
    }
}

// ---------------------------------------------------------------------------
// GoogleSettings (in config.toml, including credentials)
// ---------------------------------------------------------------------------

/// Google Calendar provider settings.
///
/// Credentials (`client_id`, `client_secret`) are stored inline and support
/// secret references (`pass::…`, `env::…`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GoogleSettings {
    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// Path to a Google Cloud Console client secrets JSON.
    pub credentials_file: Option<PathBuf>,

    /// Path to the cached OAuth credential.
    pub token_path: Option<PathBuf>,

    /// API and token request timeout in seconds.
    pub timeout_secs: Option<u64>,

    /// First and last port tried for the OAuth redirect listener.
    pub loopback_ports: Option<[u16; 2]>,
}

impl GoogleSettings {
    /// Returns true when inline credentials are present.
    pub fn has_inline_credentials(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }

    /// Resolves Google OAuth credentials from inline fields.
    ///
    /// Both `client_id` and `client_secret` must be set. Each value is passed
    /// through [`crate::secret::resolve`].
    pub fn resolve_credentials(&self) -> Result<OAuthCredentials, String> {
        let raw_id = self.client_id.as_deref().ok_or_else(|| {
            format!(
                "Google credentials not found. Add to {}:\n  \
                 [google]\n  \
                 client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
                 client_secret = \"YOUR_SECRET\"\n\n  \
                 Or run: calhours auth --credentials-file <path>",
                ClientConfig::default_path().display()
            )
        })?;

        let raw_secret = self.client_secret.as_deref().ok_or_else(|| {
            "client_secret is missing from [google] section in config.toml".to_string()
        })?;

        let resolved_id = crate::secret::resolve(raw_id)
            .map_err(|e| format!("failed to resolve client_id: {}", e))?;
        let resolved_secret = crate::secret::resolve(raw_secret)
            .map_err(|e| format!("failed to resolve client_secret: {}", e))?;

        Ok(OAuthCredentials::new(resolved_id, resolved_secret))
    }
}

/// Builds the provider configuration.
///
/// The credential cache path comes from `--token-path`, then
/// `[google] token_path`, then the provider default. `timeout_secs` and
/// `loopback_ports` override the provider defaults when set.
pub fn google_config(
    credentials: OAuthCredentials,
    settings: Option<&GoogleSettings>,
    token_path: Option<&Path>,
) -> ClientResult<GoogleConfig> {
    credentials
        .validate()
        .map_err(|e| ClientError::Config(format!("invalid Google credentials: {}", e)))?;

    let mut config = GoogleConfig::new(credentials);
    let token_path = token_path
        .map(Path::to_path_buf)
        .or_else(|| settings.and_then(|g| g.token_path.clone()));
    if let Some(path) = token_path {
        config = config.with_token_path(path);
    }
    if let Some(secs) = settings.and_then(|g| g.timeout_secs) {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some([first, last]) = settings.and_then(|g| g.loopback_ports) {
        config = config.with_loopback_port_range(first, last);
    }
    config
        .validate()
        .map_err(|e| ClientError::Config(format!("invalid [google] settings: {}", e)))?;
    Ok(config)
}
