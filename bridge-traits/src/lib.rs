//! # Host Bridge Traits
//!
//! Capabilities the player core consumes but never implements itself.
//!
//! ## Overview
//!
//! The queue orchestrator and the offline storage service talk to the outside
//! world exclusively through the traits in this crate. Each host (desktop,
//! mobile shell, test harness) provides concrete adapters; `bridge-desktop`
//! ships the desktop defaults.
//!
//! ## Traits
//!
//! ### Audio
//! - [`PlaybackEngine`](playback::PlaybackEngine) - Native single-track audio transport
//!
//! ### Storage & Transfer
//! - [`KeyValueStore`](storage::KeyValueStore) - Persistent string key-value store
//! - [`FileSystemAccess`](storage::FileSystemAccess) - File existence, deletion, directories
//! - [`HttpClient`](http::HttpClient) - Remote file transfer onto the local filesystem
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Adapters should
//! convert platform errors into it and keep the message actionable (include the
//! path or URL involved).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single adapter instance can be
//! shared by the storage service and the orchestrator across async tasks.

pub mod error;
pub mod http;
pub mod playback;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use http::{DownloadRequest, DownloadResponse, HttpClient, RetryPolicy};
pub use playback::{PlaybackEngine, Track};
pub use storage::{FileMetadata, FileSystemAccess, KeyValueStore};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, SystemClock};
