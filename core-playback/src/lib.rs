//! # Queue Orchestration & Offline Storage
//!
//! Decides what a single-track native audio engine plays and keeps downloaded
//! audio consistent with its persisted metadata.
//!
//! ## Overview
//!
//! - [`TrackResolver`] maps songs to engine-ready tracks, preferring local files
//! - [`OfflineStorageService`](offline::OfflineStorageService) downloads, lists
//!   and deletes cached audio and its metadata
//! - [`QueueOrchestrator`](queue::QueueOrchestrator) owns the queue state and
//!   drives the [`PlaybackEngine`](bridge_traits::PlaybackEngine)
//!
//! Every operation returns [`Result`]; nothing here panics across the API.

pub mod error;
pub mod models;
pub mod offline;
pub mod queue;
pub mod resolver;

pub use error::{ErrorKind, PlaybackError, Result};
pub use models::{ContextType, DownloadMetadata, QueueContext, Song, Track};
pub use offline::{
    ClearReport, DeleteOutcome, DownloadOutcome, DownloadStats, OfflineConfig,
    OfflineStorageService,
};
pub use queue::{PlaybackStatus, QueueOrchestrator, QueueState, QueueStatePatch, TransitionPhase};
pub use resolver::{LocalTrackSource, TrackResolver};
