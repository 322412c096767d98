//! Errors raised while assembling a player session.

use thiserror::Error;

/// Failure to build a [`PlayerConfig`](crate::config::PlayerConfig) or to
/// install the logging subscriber.
#[derive(Error, Debug)]
pub enum Error {
    /// A setting was rejected by `validate()`, or logging was already initialised.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required host bridge was not injected and has no platform default.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },
}

impl Error {
    /// Name of the missing bridge trait, e.g. `"PlaybackEngine"`.
    pub fn capability(&self) -> Option<&str> {
        match self {
            Error::CapabilityMissing { capability, .. } => Some(capability),
            Error::Config(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
