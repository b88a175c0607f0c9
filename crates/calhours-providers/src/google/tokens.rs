//! OAuth credential storage.
//!
//! The cached credential is a JSON document holding the access token, the
//! refresh token, the expiry and the granted scopes. [`FileCredentialStore`]
//! keeps it on disk; anything implementing [`CredentialStore`] can stand in.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

/// Seconds shaved off the advertised lifetime so a token is refreshed
/// slightly before it actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// An OAuth token set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// The access token for API requests.
    pub access_token: String,

    /// The refresh token for obtaining new access tokens.
    pub refresh_token: Option<String>,

    /// When the access token expires.
    pub expires_at: Option<DateTime<Utc>>,

    /// The OAuth scopes that were granted.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// When the tokens were last obtained or refreshed.
    pub last_refresh: DateTime<Utc>,
}

impl TokenInfo {
    /// Creates a new token info from OAuth response data.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in_secs.map(|secs| expiry_from(now, secs)),
            scopes,
            last_refresh: now,
        }
    }

    /// Returns true if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns true if the access token is expired at `now`.
    ///
    /// A token without an expiry never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    /// Returns true if the token carries a refresh token.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Returns true if the token has all the required scopes.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Replaces the access token after a refresh.
    pub fn update_access_token(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
    ) {
        let now = Utc::now();
        self.access_token = access_token.into();
        self.expires_at = expires_in_secs.map(|secs| expiry_from(now, secs));
        self.last_refresh = now;
    }
}

fn expiry_from(now: DateTime<Utc>, expires_in_secs: i64) -> DateTime<Utc> {
    now + Duration::seconds(expires_in_secs) - Duration::seconds(EXPIRY_MARGIN_SECS)
}

/// Persistence for the cached credential.
pub trait CredentialStore: Send + Sync {
    /// Loads the cached credential, or `None` if nothing is cached.
    fn load(&self) -> ProviderResult<Option<TokenInfo>>;

    /// Replaces the cached credential.
    fn save(&self, token: &TokenInfo) -> ProviderResult<()>;

    /// Removes the cached credential.
    fn clear(&self) -> ProviderResult<()>;
}

/// File-backed credential store.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so a crash never leaves a half-written credential behind. On Unix the
/// file is only readable by its owner.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the credential file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path)?;
        file.write_all(content)?;
        file.sync_all()
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> ProviderResult<Option<TokenInfo>> {
        if !self.path.exists() {
            debug!("no credential file at {:?}", self.path);
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read credential file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let token: TokenInfo = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to parse credential file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!("loaded credential from {:?}", self.path);
        Ok(Some(token))
    }

    fn save(&self, token: &TokenInfo) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::configuration(format!(
                    "failed to create credential directory: {}",
                    e
                ))
            })?;
        }

        let content = serde_json::to_vec_pretty(token).map_err(|e| {
            ProviderError::internal(format!("failed to serialize credential: {}", e))
        })?;

        let temp_path = self.path.with_extension("json.tmp");
        Self::write_private(&temp_path, &content).map_err(|e| {
            ProviderError::configuration(format!("failed to write credential file: {}", e))
        })?;

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to rename credential file: {}", e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600));
        }

        info!("saved credential to {:?}", self.path);
        Ok(())
    }

    fn clear(&self) -> ProviderResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                ProviderError::configuration(format!("failed to remove credential file: {}", e))
            })?;
            info!("cleared credential at {:?}", self.path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;

    fn scopes() -> Vec<String> {
        vec!["https://www.googleapis.com/auth/calendar.readonly".to_string()]
    }

    #[test]
    fn token_info_creation() {
        let token = TokenInfo::new(
            "access-token",
            Some("refresh-token".to_string()),
            Some(3600),
            scopes(),
        );

        assert_eq!(token.access_token, "access-token");
        assert!(token.can_refresh());
        assert!(!token.is_expired());
        let expires_at = token.expires_at.unwrap();
        assert!(expires_at <= token.last_refresh + Duration::seconds(3600 - EXPIRY_MARGIN_SECS));
    }

    #[test]
    fn token_without_expiry_never_expires() {
        let token = TokenInfo::new("access", None, None, vec![]);
        assert!(!token.is_expired_at(Utc::now() + Duration::days(365)));
        assert!(!token.can_refresh());
    }

    #[test]
    fn token_expires_inside_margin() {
        let token = TokenInfo::new("access", None, Some(30), vec![]);
        assert!(token.is_expired());
    }

    #[test]
    fn empty_refresh_token_cannot_refresh() {
        let token = TokenInfo::new("access", Some(String::new()), Some(3600), vec![]);
        assert!(!token.can_refresh());
    }

    #[test]
    fn scope_check() {
        let token = TokenInfo::new("access", None, None, scopes());
        assert!(token.has_scopes(&scopes()));
        assert!(token.has_scopes(&[]));
        assert!(!token.has_scopes(&["https://www.googleapis.com/auth/calendar".to_string()]));
    }

    #[test]
    fn update_access_token_keeps_refresh_token() {
        let mut token = TokenInfo::new("old", Some("refresh".to_string()), Some(10), scopes());
        token.update_access_token("new", Some(3600));
        assert_eq!(token.access_token, "new");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh"));
        assert!(!token.is_expired());
    }

    #[test]
    fn missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("token.json"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested").join("token.json"));
        let token = TokenInfo::new("access", Some("refresh".to_string()), Some(3600), scopes());

        store.save(&token).unwrap();
        assert_eq!(store.load().unwrap(), Some(token));
        assert!(!dir.path().join("nested").join("token.json.tmp").exists());
    }

    #[test]
    fn save_overwrites_previous_credential() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("token.json"));
        store
            .save(&TokenInfo::new("first", None, None, vec![]))
            .unwrap();
        store
            .save(&TokenInfo::new("second", None, None, vec![]))
            .unwrap();
        assert_eq!(store.load().unwrap().unwrap().access_token, "second");
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("token.json"));
        store.save(&TokenInfo::new("a", None, None, vec![])).unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn corrupt_file_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "{ not json").unwrap();
        let err = FileCredentialStore::new(&path).load().unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }

    #[test]
    fn clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("token.json"));
        store.save(&TokenInfo::new("a", None, None, vec![])).unwrap();
        store.clear().unwrap();
        assert!(!store.path().exists());
        store.clear().unwrap();
    }
}
