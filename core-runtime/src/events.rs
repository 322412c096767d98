//! # Event Bus System
//!
//! Broadcast channel (`tokio::sync::broadcast`) that lets hosts observe what
//! the queue orchestrator and the offline storage service are doing.
//!
//! ## Overview
//!
//! - **Event Types**: [`QueueEvent`] and [`DownloadEvent`], wrapped by [`CoreEvent`]
//! - **EventBus**: cloneable publisher handle
//! - **EventStream**: receiver wrapper with an optional predicate filter
//!
//! Queue mutations are announced in two phases. `TransitionRequested` is sent
//! before the engine is touched; exactly one of `TransitionConfirmed` or
//! `TransitionRolledBack` follows with the same `transition_id`.
//!
//! ```text
//! ┌──────────────────┐   emit   ┌───────────┐  subscribe  ┌────────────┐
//! │ QueueOrchestrator├─────────>│           ├────────────>│ UI layer   │
//! └──────────────────┘          │ EventBus  │             └────────────┘
//! ┌──────────────────┐   emit   │           │  subscribe  ┌────────────┐
//! │ OfflineStorage   ├─────────>│           ├────────────>│ Analytics  │
//! └──────────────────┘          └───────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, DownloadEvent, EventBus, EventStream};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut downloads = EventStream::new(bus.subscribe())
//!     .filter(|event| matches!(event, CoreEvent::Download(_)));
//!
//! bus.emit(CoreEvent::Download(DownloadEvent::Started {
//!     song_id: "42".to_string(),
//! }))
//! .ok();
//!
//! let event = downloads.recv().await.unwrap();
//! assert_eq!(event.description(), "Download started");
//! # }
//! ```
//!
//! Emission is best-effort: `emit` fails only when nobody is subscribed, and
//! producers ignore that case.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast::{self, error::RecvError, error::SendError};

pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that fall further behind receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = crate::config::DEFAULT_EVENT_BUFFER_SIZE;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published through the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Queue(QueueEvent),
    Download(DownloadEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Queue(e) => e.description(),
            CoreEvent::Download(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Download(DownloadEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Queue(QueueEvent::TransitionRolledBack { .. }) => EventSeverity::Warning,
            CoreEvent::Download(DownloadEvent::MetadataPruned { .. }) => EventSeverity::Warning,
            CoreEvent::Download(DownloadEvent::Cleared { failed, .. }) if *failed > 0 => {
                EventSeverity::Warning
            }
            CoreEvent::Queue(QueueEvent::TransitionConfirmed { .. }) => EventSeverity::Info,
            CoreEvent::Download(DownloadEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Download(DownloadEvent::Deleted { .. }) => EventSeverity::Info,
            CoreEvent::Download(DownloadEvent::Cleared { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Queue Events
// ============================================================================

/// Queue mutation that went through a two-phase transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum QueueOperation {
    ReplaceQueue,
    Shuffle,
    Unshuffle,
    AddToQueue,
    Reset,
    Pause,
    Resume,
}

impl QueueOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueOperation::ReplaceQueue => "replace_queue",
            QueueOperation::Shuffle => "shuffle",
            QueueOperation::Unshuffle => "unshuffle",
            QueueOperation::AddToQueue => "add_to_queue",
            QueueOperation::Reset => "reset",
            QueueOperation::Pause => "pause",
            QueueOperation::Resume => "resume",
        }
    }
}

impl fmt::Display for QueueOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted by the queue orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum QueueEvent {
    /// Optimistic state recorded; the engine has not been touched yet.
    TransitionRequested {
        transition_id: u64,
        operation: QueueOperation,
    },
    /// The engine accepted the mutation.
    TransitionConfirmed {
        transition_id: u64,
        operation: QueueOperation,
        current_song_id: Option<String>,
    },
    /// The engine rejected the mutation and the optimistic state was undone.
    TransitionRolledBack {
        transition_id: u64,
        operation: QueueOperation,
        message: String,
    },
    ShuffleChanged {
        enabled: bool,
    },
    /// A new listening context replaced the queue.
    ContextChanged {
        context_type: String,
        context_id: Option<String>,
    },
    QueueReset,
}

impl QueueEvent {
    fn description(&self) -> &str {
        match self {
            QueueEvent::TransitionRequested { .. } => "Queue transition requested",
            QueueEvent::TransitionConfirmed { .. } => "Queue transition confirmed",
            QueueEvent::TransitionRolledBack { .. } => "Queue transition rolled back",
            QueueEvent::ShuffleChanged { .. } => "Shuffle mode changed",
            QueueEvent::ContextChanged { .. } => "Playback context changed",
            QueueEvent::QueueReset => "Queue reset",
        }
    }
}

// ============================================================================
// Download Events
// ============================================================================

/// Events emitted by the offline storage service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum DownloadEvent {
    Started {
        song_id: String,
    },
    Completed {
        song_id: String,
        local_path: String,
    },
    /// The file was already on disk; no transfer happened.
    Skipped {
        song_id: String,
    },
    Failed {
        song_id: String,
        message: String,
    },
    Deleted {
        song_id: String,
    },
    /// Metadata pointed at a missing file and was removed.
    MetadataPruned {
        song_id: String,
    },
    Cleared {
        removed: usize,
        failed: usize,
    },
}

impl DownloadEvent {
    fn description(&self) -> &str {
        match self {
            DownloadEvent::Started { .. } => "Download started",
            DownloadEvent::Completed { .. } => "Download completed",
            DownloadEvent::Skipped { .. } => "Download skipped, file already present",
            DownloadEvent::Failed { .. } => "Download failed",
            DownloadEvent::Deleted { .. } => "Downloaded song deleted",
            DownloadEvent::MetadataPruned { .. } => "Stale download metadata pruned",
            DownloadEvent::Cleared { .. } => "All downloads cleared",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Clone the bus to get more producers; each `subscribe()` creates an
/// independent receiver that sees every event sent after it was created.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. [`PlayerConfig::validate`](crate::config::PlayerConfig::validate)
    /// rejects that value before a bus is built from configuration.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream, QueueEvent};
///
/// let bus = EventBus::new(16);
/// let rollbacks = EventStream::new(bus.subscribe()).filter(|event| {
///     matches!(event, CoreEvent::Queue(QueueEvent::TransitionRolledBack { .. }))
/// });
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`/`try_recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive a matching event without waiting.
    ///
    /// Returns `None` if no matching event is currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
