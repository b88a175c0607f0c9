//! Google Calendar provider.
//!
//! Ties the credential bootstrap to the API client: [`GoogleProvider::connect`]
//! yields a [`GoogleCalendarClient`] holding a valid access token.

use tracing::info;

use crate::error::{ProviderError, ProviderResult};

use super::client::GoogleCalendarClient;
use super::config::GoogleConfig;
use super::credentials::CredentialProvider;
use super::oauth::OAuthClient;
use super::tokens::{CredentialStore, FileCredentialStore, TokenInfo};

/// Google Calendar provider.
pub struct GoogleProvider {
    config: GoogleConfig,
    credentials: CredentialProvider<FileCredentialStore, OAuthClient>,
}

impl GoogleProvider {
    /// Creates a new Google provider with the given configuration.
    ///
    /// Nothing is read from disk and no authentication happens yet.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;

        let store = FileCredentialStore::new(&config.token_path);
        let oauth_client = OAuthClient::from_config(&config)?;
        let credentials = CredentialProvider::new(store, oauth_client, config.scopes.clone());

        Ok(Self {
            config,
            credentials,
        })
    }

    /// Returns the provider configuration.
    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    /// Returns a valid credential, refreshing or authorizing as needed.
    pub async fn authenticate(&self) -> ProviderResult<TokenInfo> {
        self.credentials
            .acquire()
            .await
            .map_err(|e| e.with_provider("google"))
    }

    /// Discards the cached credential and runs the interactive flow.
    pub async fn reauthenticate(&self) -> ProviderResult<TokenInfo> {
        info!("forcing Google re-authentication");
        self.credentials.store().clear()?;
        self.credentials
            .reauthorize()
            .await
            .map_err(|e| e.with_provider("google"))
    }

    /// Authenticates and returns an API client.
    pub async fn connect(&self) -> ProviderResult<GoogleCalendarClient> {
        let token = self.authenticate().await?;
        GoogleCalendarClient::from_config(token.access_token, &self.config)
    }
}
