//! Offline storage configuration and file naming

use core_runtime::config::{
    FilenameStrategy, PlayerConfig, DEFAULT_AUDIO_EXTENSION, DEFAULT_DOWNLOAD_DIRECTORY,
    DEFAULT_METADATA_KEY_PREFIX,
};
use std::time::Duration;

use crate::models::Song;

/// Configuration for the offline storage service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineConfig {
    /// Directory name under the app data directory (default: "downloads")
    pub download_directory: String,

    /// Extension of downloaded files, without the dot (default: "mp3")
    pub audio_extension: String,

    /// Metadata key prefix (default: "song-metadata:")
    pub metadata_key_prefix: String,

    /// How file names are derived (default: sanitized title)
    pub filename_strategy: FilenameStrategy,

    /// Per-transfer timeout (default: none)
    pub download_timeout: Option<Duration>,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            download_directory: DEFAULT_DOWNLOAD_DIRECTORY.to_string(),
            audio_extension: DEFAULT_AUDIO_EXTENSION.to_string(),
            metadata_key_prefix: DEFAULT_METADATA_KEY_PREFIX.to_string(),
            filename_strategy: FilenameStrategy::default(),
            download_timeout: None,
        }
    }
}

impl From<&PlayerConfig> for OfflineConfig {
    fn from(config: &PlayerConfig) -> Self {
        Self {
            download_directory: config.download_directory.clone(),
            audio_extension: config.audio_extension.clone(),
            metadata_key_prefix: config.metadata_key_prefix.clone(),
            filename_strategy: config.filename_strategy,
            download_timeout: config.download_timeout,
        }
    }
}

impl OfflineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_download_directory(mut self, name: impl Into<String>) -> Self {
        self.download_directory = name.into();
        self
    }

    pub fn with_filename_strategy(mut self, strategy: FilenameStrategy) -> Self {
        self.filename_strategy = strategy;
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = Some(timeout);
        self
    }

    /// File name (with extension) for a song's download.
    ///
    /// With [`FilenameStrategy::SanitizedTitle`] two songs whose titles
    /// sanitize to the same string map to the same file.
    pub fn file_name_for(&self, song: &Song) -> String {
        let stem = match self.filename_strategy {
            FilenameStrategy::SanitizedTitle => {
                let sanitized = sanitize_file_component(&song.title);
                if sanitized.is_empty() {
                    sanitize_file_component(&song.id)
                } else {
                    sanitized
                }
            }
            FilenameStrategy::SongId => sanitize_file_component(&song.id),
        };
        format!("{}.{}", stem, self.audio_extension)
    }
}

/// Replaces every character that is not an ASCII letter or digit with `_`.
pub fn sanitize_file_component(value: &str) -> String {
    value
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect()
}
