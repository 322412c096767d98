use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Configuration error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),
}

impl CoreError {
    /// Name of the missing host capability, if that is what failed.
    pub fn missing_capability(&self) -> Option<&str> {
        match self {
            CoreError::Runtime(err) => err.capability(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
