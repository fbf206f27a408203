//! Client error types.

use std::fmt;

use ghfilters_providers::ProviderError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that end a run.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error (config file, client secret, flags).
    Config(String),
    /// Provider error outside of any one repository (auth, listing).
    Provider(ProviderError),
    /// A label or filter operation failed for a repository.
    Repository {
        repo: String,
        source: ProviderError,
    },
    /// IO error.
    Io(std::io::Error),
}

impl ClientError {
    /// Wraps a provider error with the repository it happened for.
    pub fn repository(repo: impl Into<String>, source: ProviderError) -> Self {
        Self::Repository {
            repo: repo.into(),
            source,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Provider(err) => write!(f, "{}", err),
            Self::Repository { repo, source } => write!(f, "repository '{}': {}", repo, source),
            Self::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Provider(err) => Some(err),
            Self::Repository { source, .. } => Some(source),
            Self::Io(err) => Some(err),
            Self::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ProviderError> for ClientError {
    fn from(err: ProviderError) -> Self {
        Self::Provider(err)
    }
}
