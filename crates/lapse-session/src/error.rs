//! Error types for session store operations.

/// Failure reported by an [`IdGenerator`](crate::IdGenerator).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct IdGenerationError(pub String);

impl IdGenerationError {
    /// Create a new error with the given message.
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Session was never created or has already been evicted.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// The identifier source failed or produced an identifier already in use.
    #[error("Identifier generation failed: {0}")]
    IdGeneration(#[from] IdGenerationError),

    /// The background sweeper needs a Tokio runtime and none is running.
    #[error("No Tokio runtime available to run the session sweeper")]
    NoRuntime,

    /// Store configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, Error>;
