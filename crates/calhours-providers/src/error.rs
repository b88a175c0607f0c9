//! Error types for calendar API access.
//!
//! Every failure is fatal to a run: errors propagate to the binary and
//! nothing in this crate retries.

use std::fmt;
use thiserror::Error;

/// What kind of failure a [`ProviderError`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Consent denied, token rejected or refresh refused (401).
    AuthenticationFailed,
    /// Token accepted but lacking access to the resource (403).
    AuthorizationFailed,
    /// Connection, DNS or timeout failure before any response.
    NetworkError,
    /// 5xx or any other unexpected status.
    ServerError,
    /// The body did not match the expected shape.
    InvalidResponse,
    /// 404, typically an unknown calendar ID.
    NotFound,
    /// 400, the API rejected the query.
    BadRequest,
    /// Local setup problem: client secrets, credential file, ports.
    ConfigurationError,
    /// Should not happen.
    InternalError,
}

impl ProviderErrorCode {
    /// Stable snake_case name, used in messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }

    /// Classifies a non-success HTTP status. Returns `None` for 2xx.
    pub fn from_http_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            400 => Some(Self::BadRequest),
            401 => Some(Self::AuthenticationFailed),
            403 => Some(Self::AuthorizationFailed),
            404 => Some(Self::NotFound),
            _ => Some(Self::ServerError),
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed calendar API or credential operation.
///
/// Displays as `[provider] code: message`, the provider tag being omitted
/// when unset.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthorizationFailed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::BadRequest, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Builds the error for a non-success API response.
    ///
    /// The response body is kept in the message except for 401, where it
    /// only repeats that the token is invalid.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        let code =
            ProviderErrorCode::from_http_status(status).unwrap_or(ProviderErrorCode::ServerError);
        let body = body.trim();
        let message = match code {
            ProviderErrorCode::AuthenticationFailed => {
                "access token expired or invalid".to_string()
            }
            _ if body.is_empty() => format!("API returned HTTP {}", status),
            _ => format!("API returned HTTP {}: {}", status, body),
        };
        Self::new(code, message)
    }

    /// Tags the error with the backend it came from.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Attaches the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.provider {
            Some(ref provider) => write!(f, "[{}] {}: {}", provider, self.code, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

/// Result alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
