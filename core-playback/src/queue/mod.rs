//! # Queue Module
//!
//! Queue orchestration for a single-track native engine: full queue
//! replacement per listening context, shuffle and unshuffle around the active
//! track, incremental adds and reset.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::queue::QueueOrchestrator;
//! use core_playback::{ContextType, QueueContext, TrackResolver};
//!
//! let orchestrator = QueueOrchestrator::new(engine, TrackResolver::new());
//! orchestrator
//!     .update_queue_with_context(&songs, QueueContext::new(ContextType::Playlist).with_id("p1"), 0)
//!     .await?;
//!
//! let shuffled = orchestrator.toggle_shuffle().await?;
//! assert!(shuffled);
//! ```

pub mod orchestrator;
pub mod shuffle;
pub mod state;

pub use orchestrator::{PlaybackStatus, QueueOrchestrator, TransitionPhase};
pub use shuffle::{upcoming_tail, Shuffler};
pub use state::{QueueEntry, QueueState, QueueStatePatch, QueueStateStore};
