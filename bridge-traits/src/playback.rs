//! Playback engine bridge and the engine-ready track type.
//!
//! The host owns a native, single-track audio engine with its own internal
//! queue. The core never decodes audio; it only decides which tracks the
//! engine holds and in what order, through [`PlaybackEngine`].

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Engine-ready unit of playback.
///
/// `id` equals the originating song id. `url` is either a local file path or a
/// remote stream URL; the engine treats both the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub url: String,
    pub title: String,
    pub artist: String,
    pub artwork: Option<String>,
}

impl Track {
    /// Whether `url` points at the local filesystem rather than the network.
    pub fn is_local(&self) -> bool {
        !(self.url.starts_with("http://") || self.url.starts_with("https://"))
    }
}

/// Native audio transport.
///
/// Indices are positions within the engine's own queue. Implementations must
/// keep the active track playing across `remove_upcoming_tracks` and `add`.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::playback::{PlaybackEngine, Track};
///
/// async fn start(engine: &dyn PlaybackEngine, tracks: Vec<Track>) -> Result<()> {
///     engine.reset().await?;
///     engine.add(tracks, None).await?;
///     engine.play().await
/// }
/// ```
#[async_trait::async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// Stop playback and clear the queue.
    async fn reset(&self) -> Result<()>;

    /// Append tracks, or insert them before `insert_before_index`.
    async fn add(&self, tracks: Vec<Track>, insert_before_index: Option<usize>) -> Result<()>;

    /// Drop every track after the active one.
    async fn remove_upcoming_tracks(&self) -> Result<()>;

    /// Jump to the track at `index`.
    async fn skip(&self, index: usize) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    /// Snapshot of the engine's queue, in order.
    async fn get_queue(&self) -> Result<Vec<Track>>;

    /// The track currently loaded, if any.
    async fn get_active_track(&self) -> Result<Option<Track>>;
}
