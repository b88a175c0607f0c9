//! Google Calendar backend.
//!
//! # Authentication Flow
//!
//! 1. The user provides their own OAuth client ID/secret (Google requires it)
//! 2. A cached credential is loaded from disk, if any
//! 3. A still-valid access token is used as is; an expired one is refreshed
//! 4. Otherwise the browser is opened on Google's consent page and the
//!    loopback listener receives the authorization code
//! 5. The resulting credential is written back before use
//!
//! # Example
//!
//! ```ignore
//! use calhours_providers::google::{GoogleConfig, GoogleProvider, OAuthCredentials};
//! use calhours_providers::{list_calendars, CalendarFilter};
//!
//! let credentials = OAuthCredentials::from_file("credentials.json")?;
//! let provider = GoogleProvider::new(GoogleConfig::new(credentials))?;
//! let client = provider.connect().await?;
//! let calendars = list_calendars(&client, &CalendarFilter::selected()).await?;
//! ```

mod client;
mod config;
mod credentials;
mod oauth;
mod provider;
mod tokens;

pub use client::GoogleCalendarClient;
pub use config::{GoogleConfig, OAuthCredentials};
pub use credentials::{Authorizer, CredentialProvider};
pub use oauth::{OAuthClient, PkceFlow};
pub use provider::GoogleProvider;
pub use tokens::{CredentialStore, FileCredentialStore, TokenInfo};
