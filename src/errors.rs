use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::ProviderId;

/// Error type for provider, storage, and configuration failures.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Provider could not produce a batch this cycle.
    #[error("provider '{provider}' is unavailable: {reason}")]
    ProviderUnavailable {
        /// Failing provider's id.
        provider: ProviderId,
        /// Upstream failure message.
        reason: String,
    },
    /// Day file decoded but is not a record array.
    #[error("day file {} is corrupted: {reason}", path.display())]
    Corrupted {
        /// Offending day file.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },
    /// Write, rename, or quarantine failed.
    #[error("storage failure at {}: {reason}", path.display())]
    Storage {
        /// File or directory being written.
        path: PathBuf,
        /// Underlying failure.
        reason: String,
    },
    /// Unclassified I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Unclassified JSON error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Invalid configuration or CLI arguments.
    #[error("configuration error: {0}")]
    Configuration(String),
}
