//! # Offline Storage Service
//!
//! Downloads song audio into a single download directory and keeps one
//! metadata record per downloaded song in the key-value store.
//!
//! - A metadata record is valid only while its file exists; every read path
//!   re-checks the file
//! - `download_song` short-circuits when the target file already exists
//! - Listing removes records whose file has disappeared
//! - File and metadata writes are not transactional; a failure between the
//!   two leaves a file without metadata, which the next download repairs

use crate::error::{PlaybackError, Result};
use crate::models::{DownloadMetadata, Song};
use crate::offline::config::OfflineConfig;
use crate::offline::repository::MetadataRepository;
use crate::resolver::LocalTrackSource;
use async_trait::async_trait;
use bridge_traits::{
    http::{DownloadRequest, HttpClient},
    storage::{FileSystemAccess, KeyValueStore},
    time::Clock,
};
use core_runtime::events::{CoreEvent, DownloadEvent, EventBus};
use core_runtime::logging::{redact_url, strip_path};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Result of a successful [`OfflineStorageService::download_song`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The file was transferred and metadata written.
    Downloaded { local_path: String },
    /// The target file already existed; nothing was transferred.
    AlreadyPresent { local_path: String },
}

impl DownloadOutcome {
    pub fn local_path(&self) -> &str {
        match self {
            DownloadOutcome::Downloaded { local_path }
            | DownloadOutcome::AlreadyPresent { local_path } => local_path,
        }
    }
}

/// Result of [`OfflineStorageService::delete_song`].
///
/// Every variant is a success from the caller's point of view.
/// `UnlinkFailed` keeps the metadata record and reports why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// No metadata existed for the song.
    NotDownloaded,
    /// Metadata existed but its file was already gone; nothing was unlinked.
    FileMissing,
    /// The file was unlinked and the metadata removed.
    Deleted,
    /// Unlinking failed; metadata was kept.
    UnlinkFailed { message: String },
}

/// Aggregate result of [`OfflineStorageService::clear_all_downloads`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearReport {
    pub removed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadStats {
    pub song_count: usize,
    pub total_size_bytes: u64,
}

/// Removes the song id from the active set when the download ends.
struct ActiveDownload<'a> {
    active: &'a Mutex<HashSet<String>>,
    song_id: String,
}

impl Drop for ActiveDownload<'_> {
    fn drop(&mut self) {
        self.active.lock().remove(&self.song_id);
    }
}

/// Offline storage service.
pub struct OfflineStorageService {
    config: OfflineConfig,
    repository: MetadataRepository,
    fs: Arc<dyn FileSystemAccess>,
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    event_bus: Option<Arc<EventBus>>,
    active_downloads: Mutex<HashSet<String>>,
    download_dir: RwLock<Option<PathBuf>>,
}

impl OfflineStorageService {
    /// Create a new offline storage service.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use core_playback::offline::{OfflineConfig, OfflineStorageService};
    /// use std::sync::Arc;
    ///
    /// let service = OfflineStorageService::new(
    ///     OfflineConfig::default(),
    ///     key_value_store,
    ///     filesystem,
    ///     http_client,
    ///     Arc::new(bridge_traits::SystemClock),
    /// );
    /// service.initialize().await?;
    /// ```
    pub fn new(
        config: OfflineConfig,
        store: Arc<dyn KeyValueStore>,
        fs: Arc<dyn FileSystemAccess>,
        http_client: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let repository = MetadataRepository::new(store, config.metadata_key_prefix.clone());

        Self {
            config,
            repository,
            fs,
            http_client,
            clock,
            event_bus: None,
            active_downloads: Mutex::new(HashSet::new()),
            download_dir: RwLock::new(None),
        }
    }

    /// Set event bus for download lifecycle events.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn config(&self) -> &OfflineConfig {
        &self.config
    }

    pub fn repository(&self) -> &MetadataRepository {
        &self.repository
    }

    /// Resolve and create the download directory.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<PathBuf> {
        let data_dir = self.fs.get_data_directory().await.map_err(|e| {
            error!("Failed to get data directory: {}", e);
            PlaybackError::Storage(format!("Failed to get data directory: {}", e))
        })?;

        let download_dir = data_dir.join(&self.config.download_directory);

        self.fs.create_dir_all(&download_dir).await.map_err(|e| {
            error!("Failed to create download directory: {}", e);
            PlaybackError::Storage(format!("Failed to create download directory: {}", e))
        })?;

        *self.download_dir.write() = Some(download_dir.clone());

        info!(directory = %self.config.download_directory, "Offline storage initialized");
        Ok(download_dir)
    }

    async fn ensure_download_dir(&self) -> Result<PathBuf> {
        let cached = self.download_dir.read().clone();
        match cached {
            Some(dir) => Ok(dir),
            None => self.initialize().await,
        }
    }

    /// Path the song's audio is (or would be) stored at.
    pub async fn local_path_for(&self, song: &Song) -> Result<PathBuf> {
        let dir = self.ensure_download_dir().await?;
        Ok(dir.join(self.config.file_name_for(song)))
    }

    fn begin_download(&self, song_id: &str) -> Result<ActiveDownload<'_>> {
        let mut active = self.active_downloads.lock();
        if !active.insert(song_id.to_string()) {
            return Err(PlaybackError::DownloadInProgress(song_id.to_string()));
        }
        Ok(ActiveDownload {
            active: &self.active_downloads,
            song_id: song_id.to_string(),
        })
    }

    fn emit(&self, event: DownloadEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Download(event)).ok();
        }
    }

    /// Download a song's audio for offline playback.
    ///
    /// Returns [`DownloadOutcome::AlreadyPresent`] without any transfer when
    /// the target file exists. Metadata is written only after a 200 response.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::DownloadInProgress`] if this song is already downloading
    /// - [`PlaybackError::Network`] on a transfer error or non-200 status
    /// - storage errors from the filesystem or key-value store
    #[instrument(skip(self, song), fields(song_id = %song.id))]
    pub async fn download_song(&self, song: &Song) -> Result<DownloadOutcome> {
        let _active = self.begin_download(&song.id)?;

        let target = self.local_path_for(song).await?;
        let local_path = target.to_string_lossy().into_owned();

        if self.fs.exists(&target).await? {
            if !self.repository.contains(&song.id).await? {
                debug!("File present without metadata, restoring record");
                let metadata = DownloadMetadata::from_song(song, local_path.clone(), self.clock.now());
                self.repository.save(&metadata).await?;
            }

            info!(file = strip_path(&local_path), "Song already downloaded");
            self.emit(DownloadEvent::Skipped {
                song_id: song.id.clone(),
            });
            return Ok(DownloadOutcome::AlreadyPresent { local_path });
        }

        self.emit(DownloadEvent::Started {
            song_id: song.id.clone(),
        });
        debug!(url = redact_url(&song.song_path), "Starting transfer");

        let mut request = DownloadRequest::new(song.song_path.clone(), target.clone());
        if let Some(timeout) = self.config.download_timeout {
            request = request.timeout(timeout);
        }

        let failure = match self.http_client.download_file(request).await {
            Ok(response) if response.is_ok() => None,
            Ok(response) => Some(PlaybackError::Network {
                status: Some(response.status_code),
                message: "unexpected response status".to_string(),
            }),
            Err(e) => Some(PlaybackError::Network {
                status: None,
                message: e.to_string(),
            }),
        };

        if let Some(err) = failure {
            warn!(error = %err, "Download failed");
            self.remove_partial_file(&target).await;
            self.emit(DownloadEvent::Failed {
                song_id: song.id.clone(),
                message: err.to_string(),
            });
            return Err(err);
        }

        let metadata = DownloadMetadata::from_song(song, local_path.clone(), self.clock.now());
        if let Err(e) = self.repository.save(&metadata).await {
            error!(error = %e, "Downloaded file but failed to save metadata");
            self.emit(DownloadEvent::Failed {
                song_id: song.id.clone(),
                message: e.to_string(),
            });
            return Err(e);
        }

        info!(file = strip_path(&local_path), "Song downloaded");
        self.emit(DownloadEvent::Completed {
            song_id: song.id.clone(),
            local_path: local_path.clone(),
        });
        Ok(DownloadOutcome::Downloaded { local_path })
    }

    async fn remove_partial_file(&self, path: &Path) {
        match self.fs.exists(path).await {
            Ok(true) => {
                if let Err(e) = self.fs.delete_file(path).await {
                    warn!(error = %e, "Failed to remove partial download");
                }
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Failed to check for partial download"),
        }
    }

    /// Delete a downloaded song.
    ///
    /// Metadata is removed only after the file was unlinked. An unlink
    /// failure is reported as [`DeleteOutcome::UnlinkFailed`], not as an error.
    #[instrument(skip(self))]
    pub async fn delete_song(&self, song_id: &str) -> Result<DeleteOutcome> {
        let metadata = match self.repository.load(song_id).await {
            Ok(Some(metadata)) => metadata,
            Ok(None) => {
                debug!("No metadata, nothing to delete");
                return Ok(DeleteOutcome::NotDownloaded);
            }
            Err(e @ PlaybackError::DataCorruption { .. }) => {
                warn!(error = %e, "Unreadable metadata treated as not downloaded");
                return Ok(DeleteOutcome::NotDownloaded);
            }
            Err(e) => return Err(e),
        };

        let path = PathBuf::from(&metadata.local_path);
        if !self.fs.exists(&path).await? {
            debug!("File already gone, skipping unlink");
            return Ok(DeleteOutcome::FileMissing);
        }

        if let Err(e) = self.fs.delete_file(&path).await {
            warn!(error = %e, file = strip_path(&metadata.local_path), "Failed to delete file");
            return Ok(DeleteOutcome::UnlinkFailed {
                message: e.to_string(),
            });
        }

        self.repository.remove(song_id).await?;

        info!(file = strip_path(&metadata.local_path), "Deleted downloaded song");
        self.emit(DownloadEvent::Deleted {
            song_id: song_id.to_string(),
        });
        Ok(DeleteOutcome::Deleted)
    }

    /// List downloaded songs, with `song_path` set to the local file.
    ///
    /// Unreadable records are skipped. Records whose file is missing are
    /// skipped and deleted.
    #[instrument(skip(self))]
    pub async fn get_downloaded_songs(&self) -> Result<Vec<Song>> {
        let ids = self.repository.song_ids().await?;
        let mut songs = Vec::with_capacity(ids.len());

        for song_id in ids {
            let metadata = match self.repository.load(&song_id).await {
                Ok(Some(metadata)) => metadata,
                Ok(None) => continue,
                Err(e) => {
                    warn!(song_id = %song_id, error = %e, "Skipping unreadable metadata");
                    continue;
                }
            };

            match self.fs.exists(Path::new(&metadata.local_path)).await {
                Ok(true) => songs.push(metadata.to_song()),
                Ok(false) => {
                    debug!(song_id = %song_id, "Pruning metadata for missing file");
                    match self.repository.remove(&song_id).await {
                        Ok(()) => self.emit(DownloadEvent::MetadataPruned { song_id }),
                        Err(e) => warn!(error = %e, "Failed to prune stale metadata"),
                    }
                }
                Err(e) => warn!(song_id = %song_id, error = %e, "Skipping unverifiable download"),
            }
        }

        debug!(count = songs.len(), "Listed downloaded songs");
        Ok(songs)
    }

    /// `true` iff metadata exists and its file exists. Never fails.
    pub async fn is_song_downloaded(&self, song_id: &str) -> bool {
        self.get_song_local_path(song_id).await.is_some()
    }

    /// Local file path of a downloaded song. Never fails.
    pub async fn get_song_local_path(&self, song_id: &str) -> Option<String> {
        let metadata = match self.repository.load(song_id).await {
            Ok(metadata) => metadata?,
            Err(e) => {
                debug!(song_id, error = %e, "Local path lookup failed");
                return None;
            }
        };

        match self.fs.exists(Path::new(&metadata.local_path)).await {
            Ok(true) => Some(metadata.local_path),
            Ok(false) => None,
            Err(e) => {
                debug!(song_id, error = %e, "Local file check failed");
                None
            }
        }
    }

    /// Delete every downloaded song, one after another.
    ///
    /// Individual failures are counted in the report, not returned.
    #[instrument(skip(self))]
    pub async fn clear_all_downloads(&self) -> Result<ClearReport> {
        let songs = self.get_downloaded_songs().await?;
        let mut report = ClearReport::default();

        for song in &songs {
            match self.delete_song(&song.id).await {
                Ok(DeleteOutcome::Deleted) => report.removed += 1,
                Ok(DeleteOutcome::NotDownloaded) | Ok(DeleteOutcome::FileMissing) => {}
                Ok(DeleteOutcome::UnlinkFailed { message }) => {
                    warn!(song_id = %song.id, error = %message, "Could not clear download");
                    report.failed += 1;
                }
                Err(e) => {
                    warn!(song_id = %song.id, error = %e, "Could not clear download");
                    report.failed += 1;
                }
            }
        }

        info!(removed = report.removed, failed = report.failed, "Cleared downloads");
        self.emit(DownloadEvent::Cleared {
            removed: report.removed,
            failed: report.failed,
        });
        Ok(report)
    }

    /// Count and total size of valid downloads.
    pub async fn download_stats(&self) -> Result<DownloadStats> {
        let songs = self.get_downloaded_songs().await?;
        let mut stats = DownloadStats::default();

        for song in &songs {
            match self.fs.metadata(Path::new(&song.song_path)).await {
                Ok(file) => {
                    stats.song_count += 1;
                    stats.total_size_bytes += file.size;
                }
                Err(e) => debug!(song_id = %song.id, error = %e, "Skipping file without metadata"),
            }
        }

        Ok(stats)
    }
}

#[async_trait]
impl LocalTrackSource for OfflineStorageService {
    async fn local_path(&self, song_id: &str) -> Option<String> {
        self.get_song_local_path(song_id).await
    }
}
