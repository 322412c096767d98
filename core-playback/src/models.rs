//! Domain records shared by the resolver, the storage service and the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use bridge_traits::playback::Track;

/// A song as fetched from the backend. Never edited locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub author: String,
    /// Remote audio URL, or the local file path for downloaded songs
    pub song_path: String,
    #[serde(default)]
    pub image_path: Option<String>,
    pub user_id: String,
    pub created_at: String,
}

/// Collection that produced the current queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContextType {
    Playlist,
    Liked,
    Search,
    Home,
    Genre,
    ForYou,
}

impl ContextType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextType::Playlist => "playlist",
            ContextType::Liked => "liked",
            ContextType::Search => "search",
            ContextType::Home => "home",
            ContextType::Genre => "genre",
            ContextType::ForYou => "forYou",
        }
    }
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueContext {
    #[serde(rename = "type")]
    pub context_type: ContextType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
}

impl QueueContext {
    pub fn new(context_type: ContextType) -> Self {
        Self {
            context_type,
            id: None,
            section_id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_section_id(mut self, section_id: impl Into<String>) -> Self {
        self.section_id = Some(section_id.into());
        self
    }
}

/// Persisted record of a downloaded song.
///
/// Stored as JSON under `<prefix><song id>`. Valid only while the file at
/// `local_path` exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadMetadata {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub image_path: Option<String>,
    pub user_id: String,
    pub created_at: String,
    #[serde(rename = "localPath")]
    pub local_path: String,
    #[serde(rename = "downloadDate")]
    pub download_date: DateTime<Utc>,
}

impl DownloadMetadata {
    pub fn from_song(song: &Song, local_path: impl Into<String>, download_date: DateTime<Utc>) -> Self {
        Self {
            id: song.id.clone(),
            title: song.title.clone(),
            author: song.author.clone(),
            image_path: song.image_path.clone(),
            user_id: song.user_id.clone(),
            created_at: song.created_at.clone(),
            local_path: local_path.into(),
            download_date,
        }
    }

    /// The song this record describes, with `song_path` pointing at the local file.
    pub fn to_song(&self) -> Song {
        Song {
            id: self.id.clone(),
            title: self.title.clone(),
            author: self.author.clone(),
            song_path: self.local_path.clone(),
            image_path: self.image_path.clone(),
            user_id: self.user_id.clone(),
            created_at: self.created_at.clone(),
        }
    }
}
