use thiserror::Error;

/// Top-level error type for the Ringline service.
#[derive(Debug, Error)]
pub enum RingError {
    #[error("call record not found: {0}")]
    CallNotFound(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
