use std::path::PathBuf;

use thiserror::Error;

use crate::endpoint::EndpointError;

/// Errors surfaced by the transfer pipeline.
///
/// Everything returned to a caller as `Err` is fatal for the run. Per-key
/// failures use [`TransferError::Command`] but are only logged by workers.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read key list {path}")]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("authentication rejected by {endpoint}: {reason}")]
    Auth { endpoint: String, reason: String },

    #[error("failed to select db {db} on {endpoint}: {reason}")]
    Select {
        endpoint: String,
        db: u32,
        reason: String,
    },

    #[error("key scan failed at cursor {cursor}: {reason}")]
    Scan { cursor: u64, reason: String },

    #[error("{command} failed: {reason}")]
    Command {
        command: &'static str,
        reason: String,
    },

    #[error("transfer queue closed while sending {0}")]
    QueueClosed(&'static str),

    #[error("shutdown incomplete: {0}")]
    Shutdown(String),

    #[error("background task failed: {0}")]
    Task(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, TransferError>;
