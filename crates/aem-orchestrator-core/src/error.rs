//! Common error types for the AEM orchestrator.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors shared across the orchestrator crates.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An instance identifier was empty or contained characters that cannot
    /// appear in a management API path.
    #[error("invalid instance id {0:?}")]
    InvalidInstanceId(String),

    /// A run mode string did not name a known deployment role.
    #[error("invalid run mode {0:?}: expected \"author\" or \"publish\"")]
    InvalidRunMode(String),

    /// An agent action string did not name a known lifecycle action.
    #[error("invalid agent action {0:?}")]
    InvalidAction(String),

    /// The HTTP client could not be constructed from the configuration.
    #[error("http client error: {0}")]
    HttpClient(String),
}
