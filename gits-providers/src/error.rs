//! Error types for hosted provider operations

use thiserror::Error;

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while listing repositories from a provider
#[derive(Error, Debug)]
pub enum Error {
    /// GitHub API error
    #[error("GitHub API error: {0}")]
    GitHub(#[from] octocrab::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Missing or malformed credentials
    #[error("{provider} authentication error: {message}")]
    Auth {
        /// Provider name
        provider: &'static str,
        /// What is wrong
        message: String,
    },

    /// Non-success response
    #[error("{provider} returned {status}: {body}")]
    Status {
        /// Provider name
        provider: &'static str,
        /// HTTP status
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// Unexpected response shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Provider returned no usable repositories
    #[error("no repositories found for {0}")]
    Empty(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn auth(provider: &'static str, message: impl Into<String>) -> Self {
        Error::Auth {
            provider,
            message: message.into(),
        }
    }
}

impl From<Error> for gits_core::Error {
    fn from(err: Error) -> Self {
        gits_core::Error::Provider(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_to_core_provider_error() {
        let err: gits_core::Error = Error::Empty("acme".to_string()).into();
        assert!(matches!(err, gits_core::Error::Provider(_)));
        assert_eq!(
            err.to_string(),
            "Provider error: no repositories found for acme"
        );
    }

    #[test]
    fn test_auth_message() {
        let err = Error::auth("gitlab", "token is required");
        assert_eq!(
            err.to_string(),
            "gitlab authentication error: token is required"
        );
    }
}
