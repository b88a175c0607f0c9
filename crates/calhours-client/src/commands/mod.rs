//! Command implementations.

pub mod auth;
pub mod calendars;
pub mod config;
pub mod report;

use std::path::Path;

use calhours_providers::google::GoogleProvider;

use crate::config::{google_config, ClientConfig, DEFAULT_CREDENTIALS_FILE};
use crate::error::ClientResult;

use self::auth::{resolve_google_credentials, CredentialArgs};

/// Builds the Google provider from CLI overrides and `config.toml`.
pub fn google_provider(
    credentials_file: Option<&Path>,
    token_path: Option<&Path>,
    config: &ClientConfig,
) -> ClientResult<GoogleProvider> {
    let args = CredentialArgs {
        credentials_file: credentials_file.map(Path::to_path_buf),
        ..Default::default()
    };
    let (credentials, source) = resolve_google_credentials(
        &args,
        config.google.as_ref(),
        Path::new(DEFAULT_CREDENTIALS_FILE),
    )?;
    tracing::debug!(?source, "resolved OAuth client secrets");

    let provider_config = google_config(credentials, config.google.as_ref(), token_path)?;
    Ok(GoogleProvider::new(provider_config)?)
}
