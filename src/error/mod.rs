//! Error types for the transfer engine and its collaborators

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransferError>;

/// Error taxonomy for a transfer run.
///
/// Only [`TransferError::Config`] and [`TransferError::Preset`] abort a run.
/// Expansion and job failures are recorded in the failure queues, retried up
/// to the configured bound, and reported at the end of the run.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Invalid or missing configuration; fatal.
    #[error("Config error: {0}")]
    Config(String),

    /// Namespace enumeration or rule generation failed; fatal.
    #[error("Preset error: {0}")]
    Preset(String),

    /// A URL pair could not be expanded into jobs; recorded, never fatal.
    #[error("Expansion error: {0}")]
    Expansion(String),

    /// A transfer job failed to execute; recorded, never fatal.
    #[error("Job error: {0}")]
    Job(String),

    /// Registry or network failure detail from the image client.
    #[error("Registry error: {0}")]
    Registry(String),

    /// Reference or document parse failure.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TransferError {
    /// Whether this error aborts the whole run instead of being queued.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TransferError::Config(_) | TransferError::Preset(_))
    }
}
