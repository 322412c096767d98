//! # Player Configuration Module
//!
//! Builder-based configuration for a player session.
//!
//! ## Required Dependencies
//!
//! - `PlaybackEngine` - the host's native audio engine
//! - `KeyValueStore` - persistence for download metadata
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `FileSystemAccess` - download directory I/O (desktop default: tokio fs)
//! - `HttpClient` - file transfers (desktop default: reqwest)
//! - `Clock` - download timestamps (default: system clock)
//!
//! Without the `desktop-shims` feature, a missing file system or HTTP client
//! is reported by [`PlayerConfigBuilder::build`] as
//! [`Error::CapabilityMissing`].
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::PlayerConfig;
//! use std::sync::Arc;
//!
//! let config = PlayerConfig::builder()
//!     .playback_engine(Arc::new(MyEngine::new()))
//!     .key_value_store(Arc::new(store))
//!     .download_directory("offline")
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, FileSystemAccess, HttpClient, KeyValueStore, PlaybackEngine, SystemClock};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_DOWNLOAD_DIRECTORY: &str = "downloads";
pub const DEFAULT_AUDIO_EXTENSION: &str = "mp3";
pub const DEFAULT_METADATA_KEY_PREFIX: &str = "song-metadata:";
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

/// How a downloaded song's file name is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilenameStrategy {
    /// Sanitized song title. Two songs with the same title share a file.
    #[default]
    SanitizedTitle,
    /// Song id, unique per song.
    SongId,
}

/// Configuration for one player session.
#[derive(Clone)]
pub struct PlayerConfig {
    pub playback_engine: Arc<dyn PlaybackEngine>,
    pub key_value_store: Arc<dyn KeyValueStore>,
    pub file_system: Arc<dyn FileSystemAccess>,
    pub http_client: Arc<dyn HttpClient>,
    pub clock: Arc<dyn Clock>,

    /// Directory name under the data directory holding downloaded files
    pub download_directory: String,
    /// Extension appended to downloaded files, without the dot
    pub audio_extension: String,
    /// Prefix of every download metadata key
    pub metadata_key_prefix: String,
    pub filename_strategy: FilenameStrategy,
    /// Per-transfer timeout; `None` waits for the transfer indefinitely
    pub download_timeout: Option<Duration>,
    /// Capacity of the event broadcast channel
    pub event_buffer_size: usize,
    /// Seed for deterministic shuffles
    pub shuffle_seed: Option<u64>,
}

impl fmt::Debug for PlayerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerConfig")
            .field("playback_engine", &"PlaybackEngine { ... }")
            .field("key_value_store", &"KeyValueStore { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("http_client", &"HttpClient { ... }")
            .field("download_directory", &self.download_directory)
            .field("audio_extension", &self.audio_extension)
            .field("metadata_key_prefix", &self.metadata_key_prefix)
            .field("filename_strategy", &self.filename_strategy)
            .field("download_timeout", &self.download_timeout)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("shuffle_seed", &self.shuffle_seed)
            .finish()
    }
}

impl PlayerConfig {
    pub fn builder() -> PlayerConfigBuilder {
        PlayerConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Download directory, audio extension and metadata prefix are not empty
    /// - The download directory is a single relative path component
    /// - The event buffer can hold at least one event
    pub fn validate(&self) -> Result<()> {
        if self.download_directory.trim().is_empty() {
            return Err(Error::Config(
                "Download directory cannot be empty".to_string(),
            ));
        }

        if self.download_directory.contains(['/', '\\']) || self.download_directory == ".." {
            return Err(Error::Config(format!(
                "Download directory must be a plain directory name, got '{}'",
                self.download_directory
            )));
        }

        if self.audio_extension.trim().is_empty() {
            return Err(Error::Config("Audio extension cannot be empty".to_string()));
        }

        if self.audio_extension.starts_with('.') {
            return Err(Error::Config(
                "Audio extension must not start with a dot".to_string(),
            ));
        }

        if self.metadata_key_prefix.is_empty() {
            return Err(Error::Config(
                "Metadata key prefix cannot be empty".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.download_timeout == Some(Duration::ZERO) {
            return Err(Error::Config(
                "Download timeout must be greater than 0. Use None to disable it.".to_string(),
            ));
        }

        Ok(())
    }
}

fn playback_engine_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "PlaybackEngine".to_string(),
        message: "PlaybackEngine implementation is required to drive audio playback. \
                 Inject the host's native player through .playback_engine()."
            .to_string(),
    }
}

fn key_value_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "KeyValueStore".to_string(),
        message: "KeyValueStore implementation is required for download metadata. \
                 Desktop: use bridge_desktop::SqliteKeyValueStore. \
                 Mobile: inject MMKV or the platform preference store."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    use bridge_desktop::TokioFileSystem;

    let fs: Arc<dyn FileSystemAccess> = Arc::new(TokioFileSystem::new());
    Ok(fs)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(Error::CapabilityMissing {
        capability: "FileSystemAccess".to_string(),
        message: "FileSystemAccess implementation is required for offline downloads. \
                 Desktop: enable the 'desktop-shims' feature to use TokioFileSystem. \
                 Mobile: inject the sandboxed document directory bridge."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for offline downloads. \
                 Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                 Mobile: inject the platform's background transfer bridge."
            .to_string(),
    })
}

/// Builder for [`PlayerConfig`].
#[derive(Default)]
pub struct PlayerConfigBuilder {
    playback_engine: Option<Arc<dyn PlaybackEngine>>,
    key_value_store: Option<Arc<dyn KeyValueStore>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    http_client: Option<Arc<dyn HttpClient>>,
    clock: Option<Arc<dyn Clock>>,
    download_directory: Option<String>,
    audio_extension: Option<String>,
    metadata_key_prefix: Option<String>,
    filename_strategy: FilenameStrategy,
    download_timeout: Option<Duration>,
    event_buffer_size: Option<usize>,
    shuffle_seed: Option<u64>,
}

impl PlayerConfigBuilder {
    pub fn playback_engine(mut self, engine: Arc<dyn PlaybackEngine>) -> Self {
        self.playback_engine = Some(engine);
        self
    }

    pub fn key_value_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.key_value_store = Some(store);
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the directory name (under the data directory) for downloads.
    pub fn download_directory(mut self, name: impl Into<String>) -> Self {
        self.download_directory = Some(name.into());
        self
    }

    pub fn audio_extension(mut self, extension: impl Into<String>) -> Self {
        self.audio_extension = Some(extension.into());
        self
    }

    pub fn metadata_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.metadata_key_prefix = Some(prefix.into());
        self
    }

    pub fn filename_strategy(mut self, strategy: FilenameStrategy) -> Self {
        self.filename_strategy = strategy;
        self
    }

    pub fn download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = Some(timeout);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Makes every shuffle of the session reproducible.
    pub fn shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    /// Builds the final `PlayerConfig`.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when a required bridge was not injected
    ///   and no platform default exists
    /// - [`Error::Config`] when a setting is invalid
    pub fn build(self) -> Result<PlayerConfig> {
        let playback_engine = self
            .playback_engine
            .ok_or_else(playback_engine_missing_error)?;

        let key_value_store = self
            .key_value_store
            .ok_or_else(key_value_store_missing_error)?;

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let config = PlayerConfig {
            playback_engine,
            key_value_store,
            file_system,
            http_client,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            download_directory: self
                .download_directory
                .unwrap_or_else(|| DEFAULT_DOWNLOAD_DIRECTORY.to_string()),
            audio_extension: self
                .audio_extension
                .unwrap_or_else(|| DEFAULT_AUDIO_EXTENSION.to_string()),
            metadata_key_prefix: self
                .metadata_key_prefix
                .unwrap_or_else(|| DEFAULT_METADATA_KEY_PREFIX.to_string()),
            filename_strategy: self.filename_strategy,
            download_timeout: self.download_timeout,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            shuffle_seed: self.shuffle_seed,
        };

        config.validate()?;

        Ok(config)
    }
}
