//! Authentication command and Google credential resolution.

use std::path::{Path, PathBuf};

use calhours_providers::google::{GoogleProvider, OAuthCredentials};
use tracing::{info, warn};

use crate::config::{google_config, ClientConfig, GoogleSettings, DEFAULT_CREDENTIALS_FILE};
use crate::error::{ClientError, ClientResult};

/// Where the OAuth client secrets were found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// `--client-id`/`--client-secret` flags or `--credentials-file`.
    Cli,
    /// `config.toml`, inline or through `[google] credentials_file`.
    Config,
    /// `credentials.json` in the working directory.
    DefaultFile,
}

/// Credential inputs given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CredentialArgs {
    /// `--client-id`.
    pub client_id: Option<String>,
    /// `--client-secret`.
    pub client_secret: Option<String>,
    /// `--credentials-file`.
    pub credentials_file: Option<PathBuf>,
}

/// Run the Google authentication flow.
///
/// A still-valid cached credential is kept unless `force` is set.
/// Credentials given on the command line are persisted to `config.toml`
/// so later runs find them.
pub async fn google(
    args: CredentialArgs,
    force: bool,
    token_path: Option<&Path>,
    config_path: &Path,
    config: &ClientConfig,
) -> ClientResult<()> {
    let (credentials, source) = resolve_google_credentials(
        &args,
        config.google.as_ref(),
        Path::new(DEFAULT_CREDENTIALS_FILE),
    )?;

    let provider_config = google_config(credentials.clone(), config.google.as_ref(), token_path)?;
    let token_file = provider_config.token_path.clone();
    let provider = GoogleProvider::new(provider_config)?;

    println!("Authenticating with Google Calendar...");
    println!("If a browser window opens, grant read-only calendar access there.");
    println!();

    if force {
        provider.reauthenticate().await?;
    } else {
        provider.authenticate().await?;
    }

    if source == CredentialSource::Cli {
        match save_credentials_to_config(config_path, &credentials) {
            Ok(()) => println!("Credentials saved to {}", config_path.display()),
            Err(e) => warn!("could not save credentials to {}: {}", config_path.display(), e),
        }
    }

    info!("Google authentication successful");
    println!("Authenticated. Credential cached at {}", token_file.display());
    Ok(())
}

/// Resolves Google OAuth client secrets.
///
/// Priority (highest to lowest):
/// 1. `--client-id` + `--client-secret`
/// 2. `--credentials-file` (Google Cloud Console JSON)
/// 3. `config.toml` `[google]` inline `client_id` + `client_secret`
/// 4. `config.toml` `[google] credentials_file`
/// 5. `default_file` if it exists
pub fn resolve_google_credentials(
    args: &CredentialArgs,
    config_google: Option<&GoogleSettings>,
    default_file: &Path,
) -> ClientResult<(OAuthCredentials, CredentialSource)> {
    if let (Some(id), Some(secret)) = (&args.client_id, &args.client_secret) {
        return Ok((OAuthCredentials::new(id, secret), CredentialSource::Cli));
    }

    if args.client_id.is_some() || args.client_secret.is_some() {
        return Err(ClientError::Config(
            "both --client-id and --client-secret are required when providing credentials directly"
                .to_string(),
        ));
    }

    if let Some(ref path) = args.credentials_file {
        return Ok((load_secrets_file(path)?, CredentialSource::Cli));
    }

    if let Some(google) = config_google {
        if google.has_inline_credentials() {
            let creds = google.resolve_credentials().map_err(|e| {
                ClientError::Config(format!(
                    "failed to resolve Google credentials from config: {}",
                    e
                ))
            })?;
            return Ok((creds, CredentialSource::Config));
        }
        if let Some(ref path) = google.credentials_file {
            return Ok((load_secrets_file(path)?, CredentialSource::Config));
        }
    }

    if default_file.exists() {
        return Ok((load_secrets_file(default_file)?, CredentialSource::DefaultFile));
    }

    Err(ClientError::Config(format!(
        "Google credentials are required. Provide via:\n  \
         - {} in the working directory\n  \
         - --credentials-file flag (path to Google Cloud Console JSON)\n  \
         - client_id + client_secret in {}\n  \
         - GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET with `calhours auth`",
        default_file.display(),
        ClientConfig::default_path().display()
    )))
}

fn load_secrets_file(path: &Path) -> ClientResult<OAuthCredentials> {
    OAuthCredentials::from_file(path).map_err(|e| {
        ClientError::Config(format!(
            "failed to load credentials from {}: {}",
            path.display(),
            e
        ))
    })
}

/// Writes `client_id`/`client_secret` under `[google]` in `config_path`,
/// keeping everything else in the file as it was.
fn save_credentials_to_config(config_path: &Path, credentials: &OAuthCredentials) -> ClientResult<()> {
    let content = if config_path.exists() {
        std::fs::read_to_string(config_path)?
    } else {
        String::new()
    };

    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| ClientError::Config(format!("could not parse config for writing: {}", e)))?;

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }

    let google = doc["google"]
        .as_table_mut()
        .ok_or_else(|| ClientError::Config("[google] is not a table".to_string()))?;
    google["client_id"] = toml_edit::value(credentials.client_id.as_str());
    google["client_secret"] = toml_edit::value(credentials.client_secret.as_str());

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_path, doc.to_string())?;
    info!("credentials saved to {}", config_path.display());
    Ok(())
}
