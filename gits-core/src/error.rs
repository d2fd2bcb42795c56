//! Error types for gits

use thiserror::Error;

/// Result type alias for gits operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for gits operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error (bad source type, missing search key, unreadable config)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider or network error while listing repositories
    #[error("Provider error: {0}")]
    Provider(String),

    /// Git subprocess or repository error
    #[error("Git error: {0}")]
    Git(String),

    /// Cache read/write error
    #[error("Cache error: {0}")]
    Cache(String),

    /// Requested project, repository or sub-project does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error stems from user configuration rather than runtime state
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        Error::Git(err.message().to_string())
    }
}
