//! Error types for sluice pipelines

use thiserror::Error;

/// Sluice error types
#[derive(Debug, Error)]
pub enum SluiceError {
    /// Chunked input could not be reconstructed into valid records.
    #[error("Decode error: {0}")]
    Decode(String),
    /// The input stream ended with an unterminated record in the carry.
    #[error("Incomplete record at end of stream")]
    IncompleteRecord,
    /// A record or request envelope failed structural validation.
    #[error("{0}")]
    Validation(String),
    /// Key derivation, encryption, or decryption failed.
    #[error("Crypto error: {0}")]
    Crypto(String),
    /// A supplied signature did not match the payload.
    #[error("Signature verification failed")]
    SignatureInvalid,
    /// A stage was configured with invalid options at pipeline-build time.
    #[error("Stage construction error: {0}")]
    Construction(String),
    /// The connection or file was closed mid-flight; clean teardown signal.
    #[error("Cancelled")]
    Cancelled,
    /// Internal invariant was violated.
    #[error("Internal error: {0}")]
    Internal(String),
    /// I/O operation failed while reading or writing data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SluiceError>;
