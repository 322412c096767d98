//! # Offline Storage Module
//!
//! Source of truth for "is this song available offline".
//!
//! ## Overview
//!
//! Only this module touches the download directory and the metadata key
//! namespace. A song counts as downloaded when its metadata record exists
//! and the file the record points at exists on disk.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │     OfflineStorageService              │
//! │  - download_song()                     │
//! │  - delete_song()                       │
//! │  - get_downloaded_songs()              │
//! └────────┬───────────────────────────────┘
//!          │
//!          ├──> MetadataRepository (KeyValueStore)
//!          ├──> FileSystemAccess (download directory)
//!          └──> HttpClient (transfers)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::offline::{DownloadOutcome, OfflineStorageService};
//!
//! # async fn example(service: &OfflineStorageService, song: &core_playback::Song) -> core_playback::Result<()> {
//! match service.download_song(song).await? {
//!     DownloadOutcome::Downloaded { local_path } => println!("saved to {}", local_path),
//!     DownloadOutcome::AlreadyPresent { .. } => println!("already offline"),
//! }
//!
//! assert!(service.is_song_downloaded(&song.id).await);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod manager;
pub mod repository;

pub use config::{sanitize_file_component, OfflineConfig};
pub use manager::{ClearReport, DeleteOutcome, DownloadOutcome, DownloadStats, OfflineStorageService};
pub use repository::MetadataRepository;
