//! Queue state and its container

use crate::models::{QueueContext, Track};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Entry of the mirrored engine queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: String,
}

impl QueueEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl From<&Track> for QueueEntry {
    fn from(track: &Track) -> Self {
        Self::new(track.id.clone())
    }
}

/// State of one player session's queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueState {
    pub is_shuffle_enabled: bool,
    /// Canonical pre-shuffle order
    pub original_queue: Vec<Track>,
    /// Mirror of what the engine holds
    pub current_queue: Vec<QueueEntry>,
    pub current_song_id: Option<String>,
    pub last_processed_track_id: Option<String>,
    pub context: Option<QueueContext>,
}

/// Partial update of a [`QueueState`]. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStatePatch {
    pub is_shuffle_enabled: Option<bool>,
    pub original_queue: Option<Vec<Track>>,
    pub current_queue: Option<Vec<QueueEntry>>,
    pub current_song_id: Option<Option<String>>,
    pub last_processed_track_id: Option<Option<String>>,
    pub context: Option<Option<QueueContext>>,
}

impl QueueStatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shuffle_enabled(mut self, enabled: bool) -> Self {
        self.is_shuffle_enabled = Some(enabled);
        self
    }

    pub fn original_queue(mut self, tracks: Vec<Track>) -> Self {
        self.original_queue = Some(tracks);
        self
    }

    pub fn current_queue(mut self, entries: Vec<QueueEntry>) -> Self {
        self.current_queue = Some(entries);
        self
    }

    pub fn current_song_id(mut self, id: Option<String>) -> Self {
        self.current_song_id = Some(id);
        self
    }

    pub fn last_processed_track_id(mut self, id: Option<String>) -> Self {
        self.last_processed_track_id = Some(id);
        self
    }

    pub fn context(mut self, context: Option<QueueContext>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn apply(self, state: &mut QueueState) {
        if let Some(enabled) = self.is_shuffle_enabled {
            state.is_shuffle_enabled = enabled;
        }
        if let Some(tracks) = self.original_queue {
            state.original_queue = tracks;
        }
        if let Some(entries) = self.current_queue {
            state.current_queue = entries;
        }
        if let Some(id) = self.current_song_id {
            state.current_song_id = id;
        }
        if let Some(id) = self.last_processed_track_id {
            state.last_processed_track_id = id;
        }
        if let Some(context) = self.context {
            state.context = context;
        }
    }
}

/// Owner of a session's [`QueueState`].
///
/// Reads return copies. `revision` increases once per applied change.
#[derive(Debug, Default)]
pub struct QueueStateStore {
    state: RwLock<QueueState>,
    revision: AtomicU64,
}

impl QueueStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> QueueState {
        self.state.read().clone()
    }

    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Applies a patch. Returns `false` when nothing was applied.
    ///
    /// A `current_song_id` equal to the current value is dropped from the
    /// patch; no other field is compared.
    pub fn update(&self, mut patch: QueueStatePatch) -> bool {
        let mut state = self.state.write();

        if patch.current_song_id.as_ref() == Some(&state.current_song_id) {
            patch.current_song_id = None;
        }
        if patch.is_empty() {
            return false;
        }

        patch.apply(&mut state);
        self.revision.fetch_add(1, Ordering::AcqRel);
        true
    }

    pub fn reset(&self) {
        *self.state.write() = QueueState::default();
        self.revision.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&QueueState) -> R) -> R {
        f(&self.state.read())
    }
}
