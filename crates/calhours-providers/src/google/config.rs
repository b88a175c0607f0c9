//! Google Calendar provider configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Client ID and secret of the user's own Google Cloud OAuth client.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    /// Ends in `.apps.googleusercontent.com`.
    pub client_id: String,
    pub client_secret: String,
}

/// Accepted layouts of a client secrets JSON document.
///
/// Google Cloud Console downloads nest the pair under `installed` (desktop
/// clients) or `web`; `gcloud` and hand-written files keep it at the root.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClientSecrets {
    Installed { installed: ClientPair },
    Web { web: ClientPair },
    Flat(ClientPair),
}

#[derive(Debug, Deserialize)]
struct ClientPair {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Reads a client secrets JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read client secrets {}: {}", path.display(), e))?;
        Self::from_json(&content)
    }

    /// Parses a client secrets JSON document in any of the accepted layouts.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| format!("failed to parse client secrets JSON: {}", e))?;

        let pair = match serde_json::from_value(value) {
            Ok(ClientSecrets::Installed { installed }) => installed,
            Ok(ClientSecrets::Web { web }) => web,
            Ok(ClientSecrets::Flat(pair)) => pair,
            Err(_) => {
                return Err("client secrets need client_id and client_secret, at the root \
                     or under 'installed' or 'web'"
                    .to_string());
            }
        };
        Ok(Self::new(pair.client_id, pair.client_secret))
    }

    /// Checks the shape of the pair before any network round trip.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Everything the Google backend needs besides the cached credential.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub credentials: OAuthCredentials,

    /// Credential cache, `~/.local/share/calhours/google-token.json` unless
    /// overridden.
    pub token_path: PathBuf,

    /// Per-request HTTP timeout.
    pub timeout: Duration,

    pub user_agent: String,

    /// Inclusive range scanned for a free loopback port during
    /// authorization.
    pub loopback_port_range: (u16, u16),

    /// Scopes requested and required of a cached credential.
    pub scopes: Vec<String>,

    /// Calendar API v3 root. Tests point it at a mock server.
    pub api_base_url: String,
}

impl GoogleConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Read-only access to calendars and events.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar.readonly";

    pub const DEFAULT_API_BASE_URL: &'static str = "https://www.googleapis.com/calendar/v3";

    pub const DEFAULT_LOOPBACK_PORTS: (u16, u16) = (8080, 8090);

    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            token_path: Self::default_token_path(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("calhours/{}", env!("CARGO_PKG_VERSION")),
            loopback_port_range: Self::DEFAULT_LOOPBACK_PORTS,
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
            api_base_url: Self::DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// `~/.local/share/calhours/google-token.json`, relative to the working
    /// directory when there is no home.
    pub fn default_token_path() -> PathBuf {
        let data_root = match dirs::home_dir() {
            Some(home) => home.join(".local").join("share"),
            None => PathBuf::from("."),
        };
        data_root.join("calhours").join("google-token.json")
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_loopback_port_range(mut self, first: u16, last: u16) -> Self {
        self.loopback_port_range = (first, last);
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Rejects settings that would only fail later, mid-flow.
    pub fn validate(&self) -> Result<(), String> {
        self.credentials
            .validate()
            .map_err(|e| format!("invalid credentials: {}", e))?;

        let (first, last) = self.loopback_port_range;
        if first > last {
            return Err(format!("loopback port range {}-{} is empty", first, last));
        }
        if self.timeout.is_zero() {
            return Err("request timeout must be greater than zero".to_string());
        }
        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }
        if let Err(e) = url::Url::parse(&self.api_base_url) {
            return Err(format!("invalid API base URL '{}': {}", self.api_base_url, e));
        }
        Ok(())
    }
}
