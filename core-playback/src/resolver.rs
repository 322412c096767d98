//! # Track Resolution
//!
//! Maps [`Song`] records to engine-ready [`Track`]s, substituting a verified
//! local file for the remote URL when one exists.

use crate::models::{Song, Track};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Source of verified local file paths.
///
/// Implemented by the offline storage service. A returned path has been
/// checked to exist on disk.
#[async_trait]
pub trait LocalTrackSource: Send + Sync {
    async fn local_path(&self, song_id: &str) -> Option<String>;
}

/// Resolves songs to tracks, preferring downloaded copies.
#[derive(Clone, Default)]
pub struct TrackResolver {
    local_source: Option<Arc<dyn LocalTrackSource>>,
}

impl TrackResolver {
    /// Resolver that always uses remote URLs.
    pub fn new() -> Self {
        Self { local_source: None }
    }

    pub fn with_local_source(local_source: Arc<dyn LocalTrackSource>) -> Self {
        Self {
            local_source: Some(local_source),
        }
    }

    /// Pure mapping. `local_path` must already be verified by the caller.
    pub fn to_track(song: &Song, local_path: Option<&str>) -> Track {
        Track {
            id: song.id.clone(),
            url: local_path.unwrap_or(&song.song_path).to_string(),
            title: song.title.clone(),
            artist: song.author.clone(),
            artwork: song.image_path.clone(),
        }
    }

    /// Batch form of [`to_track`](Self::to_track) using remote URLs; order is preserved.
    pub fn to_tracks(songs: &[Song]) -> Vec<Track> {
        songs.iter().map(|song| Self::to_track(song, None)).collect()
    }

    /// Resolves one song, consulting the local source when configured.
    pub async fn resolve(&self, song: &Song) -> Track {
        let local_path = match &self.local_source {
            Some(source) => source.local_path(&song.id).await,
            None => None,
        };

        if local_path.is_some() {
            debug!(song_id = %song.id, "Resolved song to local file");
        }

        Self::to_track(song, local_path.as_deref())
    }

    /// Resolves songs in input order. Index `i` of the result is `songs[i]`.
    pub async fn resolve_all(&self, songs: &[Song]) -> Vec<Track> {
        let mut tracks = Vec::with_capacity(songs.len());
        for song in songs {
            tracks.push(self.resolve(song).await);
        }
        tracks
    }
}
