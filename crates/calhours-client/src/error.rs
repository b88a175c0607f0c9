//! Client error types.

use calhours_core::AggregateError;
use calhours_providers::ProviderError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Calendar API or authentication failure.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Event durations could not be summed.
    #[error("aggregation error: {0}")]
    Aggregate(#[from] AggregateError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes() {
        let err = ClientError::Config("reference_hours must be positive".into());
        assert_eq!(
            err.to_string(),
            "configuration error: reference_hours must be positive"
        );

        let err: ClientError = ProviderError::server("boom").with_provider("google").into();
        assert_eq!(err.to_string(), "provider error: [google] server_error: boom");

        let err: ClientError = AggregateError::NegativeDuration {
            event_id: "e1".into(),
        }
        .into();
        assert!(err.to_string().starts_with("aggregation error: event e1"));
    }
}
