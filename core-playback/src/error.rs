//! # Playback Error Types
//!
//! Errors returned by the track resolver, the offline storage service and the
//! queue orchestrator. None of these operations panic; every failure is a
//! [`PlaybackError`] value the caller can retry, log or surface.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during queue and offline storage operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// The native engine was not ready or rejected a call.
    #[error("{context}: {message}")]
    Engine { context: String, message: String },

    // ========================================================================
    // Transfer Errors
    // ========================================================================
    /// A download failed or returned a non-200 status.
    #[error("{}", network_message(.status, .message))]
    Network { status: Option<u16>, message: String },

    /// A download for this song is already running.
    #[error("Download already in progress for song {0}")]
    DownloadInProgress(String),

    // ========================================================================
    // Storage Errors
    // ========================================================================
    /// Persisted metadata could not be parsed.
    #[error("Corrupted metadata at '{key}': {message}")]
    DataCorruption { key: String, message: String },

    /// Key-value store or filesystem failure outside a transfer.
    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // Queue Errors
    // ========================================================================
    /// The operation had nothing to act on; no state was changed.
    #[error("Precondition not met: {0}")]
    PreconditionNotMet(String),

    /// Another structural queue mutation is still running.
    #[error("Another queue mutation is already in progress")]
    MutationInFlight,

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

fn network_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("Download failed with status {}: {}", code, message),
        None => format!("Download failed: {}", message),
    }
}

/// Coarse classification of a [`PlaybackError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TransientEngine,
    Network,
    DataCorruption,
    PreconditionNotMet,
    Busy,
    Storage,
}

impl PlaybackError {
    /// Wraps an engine failure with a human-readable context string.
    pub fn engine(context: impl Into<String>, error: impl std::fmt::Display) -> Self {
        PlaybackError::Engine {
            context: context.into(),
            message: error.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PlaybackError::Engine { .. } => ErrorKind::TransientEngine,
            PlaybackError::Bridge(BridgeError::EngineNotReady(_)) => ErrorKind::TransientEngine,
            PlaybackError::Network { .. } => ErrorKind::Network,
            PlaybackError::DataCorruption { .. } => ErrorKind::DataCorruption,
            PlaybackError::PreconditionNotMet(_) => ErrorKind::PreconditionNotMet,
            PlaybackError::MutationInFlight | PlaybackError::DownloadInProgress(_) => {
                ErrorKind::Busy
            }
            PlaybackError::Storage(_) | PlaybackError::Bridge(_) => ErrorKind::Storage,
        }
    }

    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::TransientEngine | ErrorKind::Network | ErrorKind::Busy
        )
    }

    /// Returns `true` if this error is due to network issues.
    pub fn is_network_error(&self) -> bool {
        self.kind() == ErrorKind::Network
    }

    /// Returns `true` if the operation was a no-op because there was nothing to do.
    pub fn is_precondition(&self) -> bool {
        self.kind() == ErrorKind::PreconditionNotMet
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
