//! # Queue Orchestrator
//!
//! Decides which tracks the native engine holds and in what order.
//!
//! Structural mutations (replace, shuffle, unshuffle, add, reset) are
//! serialized by an in-flight flag: a mutation started while another is
//! pending fails with [`PlaybackError::MutationInFlight`] instead of waiting.
//!
//! Mutations that touch playback run as two-phase transitions. The optimistic
//! [`PlaybackStatus`] is recorded and `TransitionRequested` is emitted before
//! the engine is awaited; the transition then ends as confirmed or rolled
//! back. A rolled-back transition restores the previous status with
//! `is_playing = false`.

use crate::error::{PlaybackError, Result};
use crate::models::{QueueContext, Song, Track};
use crate::queue::shuffle::{upcoming_tail, Shuffler};
use crate::queue::state::{QueueEntry, QueueState, QueueStatePatch, QueueStateStore};
use crate::resolver::TrackResolver;
use bridge_traits::playback::PlaybackEngine;
use core_runtime::events::{CoreEvent, EventBus, QueueEvent, QueueOperation};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Where the latest transition stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum TransitionPhase {
    #[default]
    Idle,
    Requested,
    Confirmed,
    RolledBack,
}

/// Optimistic playback status shown to the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackStatus {
    pub is_playing: bool,
    pub current_track: Option<Track>,
    pub phase: TransitionPhase,
}

struct Transition {
    id: u64,
    operation: QueueOperation,
    fallback: PlaybackStatus,
}

struct MutationGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Queue state machine for one player session.
pub struct QueueOrchestrator {
    engine: Arc<dyn PlaybackEngine>,
    resolver: TrackResolver,
    state: QueueStateStore,
    status: RwLock<PlaybackStatus>,
    mutation_in_flight: AtomicBool,
    next_transition_id: AtomicU64,
    shuffler: Shuffler,
    event_bus: Option<Arc<EventBus>>,
}

impl QueueOrchestrator {
    pub fn new(engine: Arc<dyn PlaybackEngine>, resolver: TrackResolver) -> Self {
        Self {
            engine,
            resolver,
            state: QueueStateStore::new(),
            status: RwLock::new(PlaybackStatus::default()),
            mutation_in_flight: AtomicBool::new(false),
            next_transition_id: AtomicU64::new(0),
            shuffler: Shuffler::default(),
            event_bus: None,
        }
    }

    /// Makes shuffles reproducible.
    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffler = Shuffler::new(Some(seed));
        self
    }

    /// Set event bus for transition events.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Copy of the current queue state.
    pub fn get_queue_state(&self) -> QueueState {
        self.state.snapshot()
    }

    /// Applies a partial update; see [`QueueStateStore::update`].
    pub fn update_queue_state(&self, patch: QueueStatePatch) -> bool {
        self.state.update(patch)
    }

    pub fn get_current_context(&self) -> Option<QueueContext> {
        self.state.read(|state| state.context.clone())
    }

    pub fn playback_status(&self) -> PlaybackStatus {
        self.status.read().clone()
    }

    /// Number of state changes applied so far.
    pub fn state_revision(&self) -> u64 {
        self.state.revision()
    }

    pub fn is_mutation_in_flight(&self) -> bool {
        self.mutation_in_flight.load(Ordering::Acquire)
    }

    // ========================================================================
    // Structural mutations
    // ========================================================================

    /// Replace the engine queue with `songs` and start playing at `start_index`.
    ///
    /// Downloaded songs are queued from their local file. `start_index` past
    /// the end is clamped to the last song.
    #[instrument(skip(self, songs, context), fields(song_count = songs.len(), context = %context.context_type))]
    pub async fn update_queue_with_context(
        &self,
        songs: &[Song],
        context: QueueContext,
        start_index: usize,
    ) -> Result<()> {
        if songs.is_empty() {
            return Err(PlaybackError::PreconditionNotMet(
                "no songs to queue".to_string(),
            ));
        }
        let _guard = self.begin_mutation()?;

        let tracks = self.resolver.resolve_all(songs).await;
        let start = start_index.min(tracks.len() - 1);
        if start != start_index {
            warn!(start_index, clamped = start, "Start index past end of queue");
        }

        let start_track = tracks[start].clone();
        let transition = self.begin_transition(QueueOperation::ReplaceQueue, |status| {
            status.is_playing = true;
            status.current_track = Some(start_track);
        });

        let result = self.load_queue(tracks, start, context).await;
        self.finish(transition, result)
    }

    async fn load_queue(&self, tracks: Vec<Track>, start: usize, context: QueueContext) -> Result<()> {
        self.engine
            .reset()
            .await
            .map_err(|e| self.engine_error("Failed to reset playback engine", e))?;
        self.engine
            .add(tracks.clone(), None)
            .await
            .map_err(|e| self.engine_error("Failed to add tracks to engine", e))?;
        if start > 0 {
            self.engine
                .skip(start)
                .await
                .map_err(|e| self.engine_error("Failed to skip to start track", e))?;
        }

        let was_shuffled = self.state.read(|state| state.is_shuffle_enabled);
        let current_song_id = tracks[start].id.clone();
        self.state.update(
            QueueStatePatch::new()
                .context(Some(context.clone()))
                .current_queue(tracks.iter().map(QueueEntry::from).collect())
                .current_song_id(Some(current_song_id))
                .original_queue(tracks)
                .shuffle_enabled(false),
        );

        self.emit(QueueEvent::ContextChanged {
            context_type: context.context_type.to_string(),
            context_id: context.id,
        });
        if was_shuffled {
            self.emit(QueueEvent::ShuffleChanged { enabled: false });
        }

        self.engine
            .play()
            .await
            .map_err(|e| self.engine_error("Failed to start playback", e))?;
        Ok(())
    }

    /// Shuffle the tracks after the active one.
    ///
    /// The active track keeps playing and earlier tracks stay where they are.
    /// The live queue is snapshotted into `original_queue` only when shuffle
    /// was off, so reshuffling keeps the pre-shuffle order.
    #[instrument(skip(self))]
    pub async fn shuffle_queue(&self) -> Result<()> {
        let _guard = self.begin_mutation()?;

        let active = self.active_track().await?.ok_or_else(|| {
            PlaybackError::PreconditionNotMet("no active track to shuffle around".to_string())
        })?;
        let live = self
            .engine
            .get_queue()
            .await
            .map_err(|e| self.engine_error("Failed to read engine queue", e))?;

        let upcoming = self
            .shuffler
            .shuffle_upcoming(&live, &active.id)
            .ok_or_else(|| {
                PlaybackError::PreconditionNotMet(format!(
                    "active track {} is not in the engine queue",
                    active.id
                ))
            })?;
        let snapshot = !self.state.read(|state| state.is_shuffle_enabled);
        debug!(queue_len = live.len(), upcoming = upcoming.len(), "Shuffling upcoming tracks");

        let transition = self.begin_transition(QueueOperation::Shuffle, |_| {});
        let result = async move {
            self.replace_upcoming(upcoming).await?;
            let current_queue = self.live_entries().await?;

            let mut patch = QueueStatePatch::new()
                .current_queue(current_queue)
                .shuffle_enabled(true);
            if snapshot {
                patch = patch.original_queue(live);
            }
            self.state.update(patch);

            if snapshot {
                self.emit(QueueEvent::ShuffleChanged { enabled: true });
            }
            Ok::<(), PlaybackError>(())
        }
        .await;

        self.finish(transition, result)
    }

    /// Restore the pre-shuffle order for the tracks after the active one.
    ///
    /// Tracks that came before the active track in `original_queue` are
    /// history and are not re-queued. `original_queue` is not modified.
    #[instrument(skip(self))]
    pub async fn unshuffle_queue(&self) -> Result<()> {
        let _guard = self.begin_mutation()?;

        let original = self.state.read(|state| state.original_queue.clone());
        if original.is_empty() {
            return Err(PlaybackError::PreconditionNotMet(
                "no pre-shuffle order recorded".to_string(),
            ));
        }

        let active = self.active_track().await?.ok_or_else(|| {
            PlaybackError::PreconditionNotMet("no active track".to_string())
        })?;
        let tail = upcoming_tail(&original, &active.id).ok_or_else(|| {
            PlaybackError::PreconditionNotMet(format!(
                "active track {} is not in the pre-shuffle order",
                active.id
            ))
        })?;

        let transition = self.begin_transition(QueueOperation::Unshuffle, |_| {});
        let result = async move {
            self.replace_upcoming(tail).await?;
            let current_queue = self.live_entries().await?;

            let was_shuffled = self.state.read(|state| state.is_shuffle_enabled);
            self.state.update(
                QueueStatePatch::new()
                    .current_queue(current_queue)
                    .shuffle_enabled(false),
            );
            if was_shuffled {
                self.emit(QueueEvent::ShuffleChanged { enabled: false });
            }
            Ok::<(), PlaybackError>(())
        }
        .await;

        self.finish(transition, result)
    }

    /// Flip shuffle and return the resulting flag.
    ///
    /// If the underlying operation had nothing to do, or another mutation is
    /// in flight, the previous flag is returned unchanged. Engine failures are
    /// returned as errors.
    #[instrument(skip(self))]
    pub async fn toggle_shuffle(&self) -> Result<bool> {
        let enabled = self.state.read(|state| state.is_shuffle_enabled);

        let result = if enabled {
            self.unshuffle_queue().await
        } else {
            self.shuffle_queue().await
        };

        match result {
            Ok(()) => Ok(!enabled),
            Err(e) if e.is_precondition() => {
                debug!(reason = %e, "Shuffle toggle was a no-op");
                Ok(enabled)
            }
            Err(PlaybackError::MutationInFlight) => {
                debug!("Shuffle toggle skipped, another mutation is in flight");
                Ok(enabled)
            }
            Err(e) => Err(e),
        }
    }

    /// Append `songs`, or insert them before `insert_before_index`.
    ///
    /// The mirrored queue is re-read from the engine afterwards. With shuffle
    /// on, the added tracks are appended to `original_queue`; with shuffle off,
    /// `original_queue` becomes the live queue.
    #[instrument(skip(self, songs), fields(song_count = songs.len()))]
    pub async fn add_to_queue(&self, songs: &[Song], insert_before_index: Option<usize>) -> Result<()> {
        if songs.is_empty() {
            return Err(PlaybackError::PreconditionNotMet(
                "no songs to add".to_string(),
            ));
        }
        let _guard = self.begin_mutation()?;

        let tracks = self.resolver.resolve_all(songs).await;
        let transition = self.begin_transition(QueueOperation::AddToQueue, |_| {});

        let result = async move {
            self.engine
                .add(tracks.clone(), insert_before_index)
                .await
                .map_err(|e| self.engine_error("Failed to add tracks to engine", e))?;
            let live = self
                .engine
                .get_queue()
                .await
                .map_err(|e| self.engine_error("Failed to read engine queue", e))?;

            let shuffled = self.state.read(|state| state.is_shuffle_enabled);
            let original_queue = if shuffled {
                let mut original = self.state.read(|state| state.original_queue.clone());
                original.extend(tracks.iter().cloned());
                original
            } else {
                live.clone()
            };

            self.state.update(
                QueueStatePatch::new()
                    .current_queue(live.iter().map(QueueEntry::from).collect())
                    .original_queue(original_queue),
            );
            Ok::<(), PlaybackError>(())
        }
        .await;

        self.finish(transition, result)
    }

    /// Reset the engine and return the queue state to its initial shape.
    ///
    /// The state is reset even if the engine fails; the failure is returned.
    #[instrument(skip(self))]
    pub async fn reset_queue(&self) -> Result<()> {
        let _guard = self.begin_mutation()?;

        let mut transition = self.begin_transition(QueueOperation::Reset, |status| {
            status.is_playing = false;
            status.current_track = None;
        });
        transition.fallback.current_track = None;

        let result = self
            .engine
            .reset()
            .await
            .map_err(|e| self.engine_error("Failed to reset playback engine", e));

        self.state.reset();
        self.emit(QueueEvent::QueueReset);
        info!("Queue reset");

        self.finish(transition, result)
    }

    // ========================================================================
    // Engine notifications and transport
    // ========================================================================

    /// Record the engine's new active track.
    ///
    /// Repeated notifications for the same track are ignored. Returns `true`
    /// when the notification was processed.
    pub fn handle_active_track_changed(&self, track_id: Option<&str>) -> bool {
        let track_id = track_id.map(str::to_string);
        if self.state.read(|state| state.last_processed_track_id == track_id) {
            return false;
        }

        self.state.update(
            QueueStatePatch::new()
                .last_processed_track_id(track_id.clone())
                .current_song_id(track_id.clone()),
        );

        let track = track_id.as_deref().and_then(|id| {
            self.state.read(|state| {
                state
                    .original_queue
                    .iter()
                    .find(|track| track.id == id)
                    .cloned()
            })
        });
        self.status.write().current_track = track;

        debug!(track_id = ?track_id, "Active track changed");
        true
    }

    #[instrument(skip(self))]
    pub async fn pause(&self) -> Result<()> {
        let transition = self.begin_transition(QueueOperation::Pause, |status| {
            status.is_playing = false;
        });
        let result = self
            .engine
            .pause()
            .await
            .map_err(|e| self.engine_error("Failed to pause playback", e));
        self.finish(transition, result)
    }

    #[instrument(skip(self))]
    pub async fn resume(&self) -> Result<()> {
        let transition = self.begin_transition(QueueOperation::Resume, |status| {
            status.is_playing = true;
        });
        let result = self
            .engine
            .play()
            .await
            .map_err(|e| self.engine_error("Failed to resume playback", e));
        self.finish(transition, result)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn begin_mutation(&self) -> Result<MutationGuard<'_>> {
        self.mutation_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                debug!("Rejected queue mutation, another one is in flight");
                PlaybackError::MutationInFlight
            })?;

        Ok(MutationGuard {
            flag: &self.mutation_in_flight,
        })
    }

    fn begin_transition(
        &self,
        operation: QueueOperation,
        optimistic: impl FnOnce(&mut PlaybackStatus),
    ) -> Transition {
        let id = self.next_transition_id.fetch_add(1, Ordering::Relaxed) + 1;

        let fallback = {
            let mut status = self.status.write();
            let mut fallback = status.clone();
            fallback.is_playing = false;
            fallback.phase = TransitionPhase::RolledBack;

            optimistic(&mut status);
            status.phase = TransitionPhase::Requested;
            fallback
        };

        debug!(transition_id = id, %operation, "Transition requested");
        self.emit(QueueEvent::TransitionRequested {
            transition_id: id,
            operation,
        });

        Transition {
            id,
            operation,
            fallback,
        }
    }

    fn finish(&self, transition: Transition, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => {
                self.status.write().phase = TransitionPhase::Confirmed;
                let current_song_id = self.state.read(|state| state.current_song_id.clone());

                debug!(transition_id = transition.id, operation = %transition.operation, "Transition confirmed");
                self.emit(QueueEvent::TransitionConfirmed {
                    transition_id: transition.id,
                    operation: transition.operation,
                    current_song_id,
                });
                Ok(())
            }
            Err(e) => {
                warn!(
                    transition_id = transition.id,
                    operation = %transition.operation,
                    error = %e,
                    "Transition rolled back"
                );
                *self.status.write() = transition.fallback;
                self.emit(QueueEvent::TransitionRolledBack {
                    transition_id: transition.id,
                    operation: transition.operation,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn engine_error(&self, context: &str, err: impl std::fmt::Display) -> PlaybackError {
        error!(error = %err, "{}", context);
        self.status.write().is_playing = false;
        PlaybackError::engine(context, err)
    }

    async fn active_track(&self) -> Result<Option<Track>> {
        self.engine
            .get_active_track()
            .await
            .map_err(|e| self.engine_error("Failed to read active track", e))
    }

    async fn replace_upcoming(&self, tracks: Vec<Track>) -> Result<()> {
        self.engine
            .remove_upcoming_tracks()
            .await
            .map_err(|e| self.engine_error("Failed to remove upcoming tracks", e))?;
        if !tracks.is_empty() {
            self.engine
                .add(tracks, None)
                .await
                .map_err(|e| self.engine_error("Failed to add upcoming tracks to engine", e))?;
        }
        Ok(())
    }

    async fn live_entries(&self) -> Result<Vec<QueueEntry>> {
        let live = self
            .engine
            .get_queue()
            .await
            .map_err(|e| self.engine_error("Failed to read engine queue", e))?;
        Ok(live.iter().map(QueueEntry::from).collect())
    }

    fn emit(&self, event: QueueEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Queue(event)).ok();
        }
    }
}
