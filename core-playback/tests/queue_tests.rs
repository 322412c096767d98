//! Queue orchestration tests against an in-memory playback engine.

mod common;

use async_trait::async_trait;
use common::{song, songs, track_ids, EngineCall, FakeEngine};
use core_playback::error::ErrorKind;
use core_playback::{
    ContextType, LocalTrackSource, PlaybackError, QueueContext, QueueOrchestrator,
    QueueStatePatch, TrackResolver, TransitionPhase,
};
use core_runtime::events::{CoreEvent, EventBus, QueueEvent, QueueOperation};
use mockall::mock;
use mockall::predicate::eq;
use std::sync::Arc;
use tokio::sync::broadcast::Receiver;

// ============================================================================
// Helpers
// ============================================================================

fn playlist(id: &str) -> QueueContext {
    QueueContext::new(ContextType::Playlist).with_id(id)
}

fn setup() -> (Arc<FakeEngine>, QueueOrchestrator) {
    let engine = Arc::new(FakeEngine::new());
    let orchestrator =
        QueueOrchestrator::new(engine.clone(), TrackResolver::new()).with_shuffle_seed(11);
    (engine, orchestrator)
}

fn setup_with_events() -> (Arc<FakeEngine>, QueueOrchestrator, Receiver<CoreEvent>) {
    let bus = Arc::new(EventBus::new(64));
    let receiver = bus.subscribe();
    let engine = Arc::new(FakeEngine::new());
    let orchestrator = QueueOrchestrator::new(engine.clone(), TrackResolver::new())
        .with_shuffle_seed(11)
        .with_event_bus(bus);
    (engine, orchestrator, receiver)
}

fn drain(receiver: &mut Receiver<CoreEvent>) -> Vec<QueueEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        if let CoreEvent::Queue(event) = event {
            events.push(event);
        }
    }
    events
}

fn entry_ids(orchestrator: &QueueOrchestrator) -> Vec<String> {
    orchestrator
        .get_queue_state()
        .current_queue
        .into_iter()
        .map(|entry| entry.id)
        .collect()
}

fn original_ids(orchestrator: &QueueOrchestrator) -> Vec<String> {
    track_ids(&orchestrator.get_queue_state().original_queue)
}

fn sorted(mut ids: Vec<String>) -> Vec<String> {
    ids.sort();
    ids
}

// ============================================================================
// Replacing the queue
// ============================================================================

#[tokio::test]
async fn test_update_queue_starts_at_first_song() {
    let (engine, orchestrator) = setup();
    let context = QueueContext::new(ContextType::Liked);

    orchestrator
        .update_queue_with_context(&songs(&["a", "b", "c"]), context.clone(), 0)
        .await
        .unwrap();

    let state = orchestrator.get_queue_state();
    assert_eq!(state.current_song_id.as_deref(), Some("a"));
    assert_eq!(state.context, Some(context));
    assert!(!state.is_shuffle_enabled);
    assert!(!engine.calls().iter().any(|call| matches!(call, EngineCall::Skip(_))));
    assert!(engine.is_playing());
}

#[tokio::test]
async fn test_update_queue_playlist_scenario() {
    let (engine, orchestrator) = setup();

    orchestrator
        .update_queue_with_context(&songs(&["1", "2", "3"]), playlist("p1"), 1)
        .await
        .unwrap();

    assert_eq!(
        engine.calls(),
        vec![
            EngineCall::Reset,
            EngineCall::Add {
                ids: vec!["1".into(), "2".into(), "3".into()],
                insert_before_index: None,
            },
            EngineCall::Skip(1),
            EngineCall::Play,
        ]
    );

    let state = orchestrator.get_queue_state();
    assert_eq!(state.current_song_id.as_deref(), Some("2"));
    assert_eq!(state.context, Some(playlist("p1")));
    assert_eq!(original_ids(&orchestrator), vec!["1", "2", "3"]);
    assert_eq!(entry_ids(&orchestrator), vec!["1", "2", "3"]);
    assert_eq!(orchestrator.get_current_context(), Some(playlist("p1")));

    let status = orchestrator.playback_status();
    assert!(status.is_playing);
    assert_eq!(status.phase, TransitionPhase::Confirmed);
    assert_eq!(status.current_track.map(|t| t.id).as_deref(), Some("2"));
}

#[tokio::test]
async fn test_update_queue_clamps_start_index() {
    let (engine, orchestrator) = setup();

    orchestrator
        .update_queue_with_context(&songs(&["a", "b", "c"]), playlist("p1"), 10)
        .await
        .unwrap();

    assert!(engine.calls().contains(&EngineCall::Skip(2)));
    assert_eq!(
        orchestrator.get_queue_state().current_song_id.as_deref(),
        Some("c")
    );
}

#[tokio::test]
async fn test_update_queue_rejects_empty_input() {
    let (engine, orchestrator) = setup();

    let err = orchestrator
        .update_queue_with_context(&[], playlist("p1"), 0)
        .await
        .unwrap_err();

    assert!(err.is_precondition());
    assert!(engine.calls().is_empty());
    assert!(!orchestrator.is_mutation_in_flight());
}

#[tokio::test]
async fn test_update_queue_emits_transition_events() {
    let (_engine, orchestrator, mut receiver) = setup_with_events();

    orchestrator
        .update_queue_with_context(&songs(&["a", "b"]), playlist("p1"), 0)
        .await
        .unwrap();

    assert_eq!(
        drain(&mut receiver),
        vec![
            QueueEvent::TransitionRequested {
                transition_id: 1,
                operation: QueueOperation::ReplaceQueue,
            },
            QueueEvent::ContextChanged {
                context_type: "playlist".into(),
                context_id: Some("p1".into()),
            },
            QueueEvent::TransitionConfirmed {
                transition_id: 1,
                operation: QueueOperation::ReplaceQueue,
                current_song_id: Some("a".into()),
            },
        ]
    );
}

#[tokio::test]
async fn test_replacing_a_shuffled_queue_turns_shuffle_off() {
    let (_engine, orchestrator, mut receiver) = setup_with_events();
    orchestrator
        .update_queue_with_context(&songs(&["a", "b", "c"]), playlist("p1"), 0)
        .await
        .unwrap();
    orchestrator.shuffle_queue().await.unwrap();
    drain(&mut receiver);

    orchestrator
        .update_queue_with_context(&songs(&["x", "y"]), playlist("p2"), 0)
        .await
        .unwrap();

    assert!(!orchestrator.get_queue_state().is_shuffle_enabled);
    assert_eq!(original_ids(&orchestrator), vec!["x", "y"]);
    assert!(drain(&mut receiver).contains(&QueueEvent::ShuffleChanged { enabled: false }));
}

// ============================================================================
// Rollback
// ============================================================================

#[tokio::test]
async fn test_engine_failure_rolls_back_transition() {
    let (engine, orchestrator, mut receiver) = setup_with_events();
    engine.fail("play");

    let err = orchestrator
        .update_queue_with_context(&songs(&["a", "b"]), playlist("p1"), 0)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TransientEngine);
    assert!(err.is_transient());
    assert!(err.to_string().starts_with("Failed to start playback"));

    let status = orchestrator.playback_status();
    assert!(!status.is_playing);
    assert_eq!(status.phase, TransitionPhase::RolledBack);
    assert!(status.current_track.is_none());
    assert!(!orchestrator.is_mutation_in_flight());

    let events = drain(&mut receiver);
    assert!(matches!(
        events.last(),
        Some(QueueEvent::TransitionRolledBack {
            transition_id: 1,
            operation: QueueOperation::ReplaceQueue,
            ..
        })
    ));
}

#[tokio::test]
async fn test_failed_resume_restores_paused_status() {
    let (engine, orchestrator) = setup();
    orchestrator
        .update_queue_with_context(&songs(&["a", "b"]), playlist("p1"), 0)
        .await
        .unwrap();

    orchestrator.pause().await.unwrap();
    let paused = orchestrator.playback_status();
    assert!(!paused.is_playing);
    assert_eq!(paused.phase, TransitionPhase::Confirmed);
    assert!(!engine.is_playing());

    engine.fail("play");
    assert!(orchestrator.resume().await.is_err());

    let status = orchestrator.playback_status();
    assert!(!status.is_playing);
    assert_eq!(status.phase, TransitionPhase::RolledBack);
    assert_eq!(status.current_track.map(|t| t.id).as_deref(), Some("a"));

    engine.heal();
    orchestrator.resume().await.unwrap();
    assert!(orchestrator.playback_status().is_playing);
}

// ============================================================================
// Serialization of mutations
// ============================================================================

#[tokio::test]
async fn test_mutation_rejected_while_another_is_in_flight() {
    let engine = Arc::new(FakeEngine::new());
    let orchestrator = Arc::new(QueueOrchestrator::new(engine.clone(), TrackResolver::new()));
    let gate = engine.hold_reset();

    let pending = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator
                .update_queue_with_context(&songs(&["a", "b"]), playlist("p1"), 0)
                .await
        })
    };

    while !orchestrator.is_mutation_in_flight() {
        tokio::task::yield_now().await;
    }

    let err = orchestrator.shuffle_queue().await.unwrap_err();
    assert!(matches!(err, PlaybackError::MutationInFlight));
    assert_eq!(err.kind(), ErrorKind::Busy);

    let err = orchestrator.add_to_queue(&[song("c")], None).await.unwrap_err();
    assert!(matches!(err, PlaybackError::MutationInFlight));

    gate.notify_one();
    pending.await.unwrap().unwrap();

    assert!(!orchestrator.is_mutation_in_flight());
    assert_eq!(engine.queue_ids(), vec!["a", "b"]);
    orchestrator.add_to_queue(&[song("c")], None).await.unwrap();
}

// ============================================================================
// Shuffle
// ============================================================================

#[tokio::test]
async fn test_shuffle_keeps_active_track_and_membership() {
    let (engine, orchestrator) = setup();
    orchestrator
        .update_queue_with_context(&songs(&["a", "b", "c", "d", "e"]), playlist("p1"), 2)
        .await
        .unwrap();
    let before = engine.active_id();
    let members = sorted(engine.queue_ids());

    orchestrator.shuffle_queue().await.unwrap();

    assert_eq!(engine.active_id(), before);
    assert_eq!(sorted(engine.queue_ids()), members);

    let state = orchestrator.get_queue_state();
    assert!(state.is_shuffle_enabled);
    assert_eq!(original_ids(&orchestrator), vec!["a", "b", "c", "d", "e"]);

    assert_eq!(entry_ids(&orchestrator), engine.queue_ids());
}

#[tokio::test]
async fn test_shuffle_from_middle_leaves_history_in_place() {
    let (engine, orchestrator) = setup();
    orchestrator
        .update_queue_with_context(&songs(&["a", "b", "c", "d", "e"]), playlist("p1"), 2)
        .await
        .unwrap();

    orchestrator.shuffle_queue().await.unwrap();

    let live = engine.queue_ids();
    assert_eq!(live.len(), 5);
    assert_eq!(live[..3], ["a", "b", "c"]);
    assert_eq!(sorted(engine.upcoming_ids()), vec!["d", "e"]);
    assert_eq!(engine.active_id().as_deref(), Some("c"));
    assert_eq!(entry_ids(&orchestrator), live);
    assert_eq!(original_ids(&orchestrator), vec!["a", "b", "c", "d", "e"]);
}

#[tokio::test]
async fn test_reshuffle_keeps_pre_shuffle_order() {
    let (_engine, orchestrator) = setup();
    orchestrator
        .update_queue_with_context(&songs(&["a", "b", "c", "d", "e"]), playlist("p1"), 0)
        .await
        .unwrap();

    orchestrator.shuffle_queue().await.unwrap();
    orchestrator.shuffle_queue().await.unwrap();

    assert_eq!(original_ids(&orchestrator), vec!["a", "b", "c", "d", "e"]);
}

#[tokio::test]
async fn test_shuffle_without_active_track_is_a_precondition_failure() {
    let (engine, orchestrator) = setup();

    let err = orchestrator.shuffle_queue().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionNotMet);
    assert!(engine
        .calls()
        .iter()
        .all(|call| !matches!(call, EngineCall::RemoveUpcoming)));

    assert!(!orchestrator.toggle_shuffle().await.unwrap());
    assert!(!orchestrator.get_queue_state().is_shuffle_enabled);
}

#[tokio::test]
async fn test_shuffle_then_unshuffle_restores_upcoming_tail() {
    let (engine, orchestrator) = setup();
    orchestrator
        .update_queue_with_context(&songs(&["a", "b", "c", "d", "e"]), playlist("p1"), 2)
        .await
        .unwrap();

    orchestrator.shuffle_queue().await.unwrap();
    orchestrator.unshuffle_queue().await.unwrap();

    assert_eq!(engine.active_id().as_deref(), Some("c"));
    assert_eq!(engine.upcoming_ids(), vec!["d", "e"]);

    let state = orchestrator.get_queue_state();
    assert!(!state.is_shuffle_enabled);
    assert_eq!(entry_ids(&orchestrator), vec!["a", "b", "c", "d", "e"]);
    assert_eq!(entry_ids(&orchestrator), engine.queue_ids());
    assert_eq!(original_ids(&orchestrator), vec!["a", "b", "c", "d", "e"]);
}

#[tokio::test]
async fn test_unshuffle_without_recorded_order_fails() {
    let (_engine, orchestrator) = setup();

    let err = orchestrator.unshuffle_queue().await.unwrap_err();
    assert!(err.is_precondition());
}

#[tokio::test]
async fn test_unshuffle_when_active_track_is_unknown() {
    let (engine, orchestrator) = setup();
    orchestrator
        .update_queue_with_context(&songs(&["a", "b", "c"]), playlist("p1"), 0)
        .await
        .unwrap();
    orchestrator.shuffle_queue().await.unwrap();

    let foreign = TrackResolver::to_tracks(&songs(&["x", "y"]));
    orchestrator.update_queue_state(QueueStatePatch::new().original_queue(foreign));

    let err = orchestrator.unshuffle_queue().await.unwrap_err();
    assert!(err.is_precondition());
    assert!(err.to_string().contains("not in the pre-shuffle order"));
    assert_eq!(engine.active_id().as_deref(), Some("a"));
    assert!(orchestrator.get_queue_state().is_shuffle_enabled);
}

#[tokio::test]
async fn test_toggle_shuffle_on_fresh_queue() {
    let (engine, orchestrator, mut receiver) = setup_with_events();
    orchestrator
        .update_queue_with_context(&songs(&["a", "b", "c", "d", "e"]), playlist("p1"), 0)
        .await
        .unwrap();
    drain(&mut receiver);

    assert!(orchestrator.toggle_shuffle().await.unwrap());
    assert!(orchestrator.get_queue_state().is_shuffle_enabled);

    assert!(!orchestrator.toggle_shuffle().await.unwrap());
    let state = orchestrator.get_queue_state();
    assert!(!state.is_shuffle_enabled);
    assert_eq!(engine.upcoming_ids(), track_ids(&state.original_queue[1..]));

    let shuffle_events: Vec<_> = drain(&mut receiver)
        .into_iter()
        .filter(|event| matches!(event, QueueEvent::ShuffleChanged { .. }))
        .collect();
    assert_eq!(
        shuffle_events,
        vec![
            QueueEvent::ShuffleChanged { enabled: true },
            QueueEvent::ShuffleChanged { enabled: false },
        ]
    );
}

#[tokio::test]
async fn test_toggle_shuffle_while_mutation_in_flight_returns_previous_flag() {
    let engine = Arc::new(FakeEngine::new());
    let orchestrator = Arc::new(QueueOrchestrator::new(engine.clone(), TrackResolver::new()));
    let gate = engine.hold_reset();

    let pending = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator
                .update_queue_with_context(&songs(&["a", "b", "c"]), playlist("p1"), 0)
                .await
        })
    };

    while !orchestrator.is_mutation_in_flight() {
        tokio::task::yield_now().await;
    }

    assert!(!orchestrator.toggle_shuffle().await.unwrap());
    assert!(!orchestrator.get_queue_state().is_shuffle_enabled);

    gate.notify_one();
    pending.await.unwrap().unwrap();

    assert!(orchestrator.toggle_shuffle().await.unwrap());
}

#[tokio::test]
async fn test_toggle_shuffle_propagates_engine_failure() {
    let (engine, orchestrator) = setup();
    orchestrator
        .update_queue_with_context(&songs(&["a", "b", "c"]), playlist("p1"), 0)
        .await
        .unwrap();
    engine.fail("remove_upcoming_tracks");

    let err = orchestrator.toggle_shuffle().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransientEngine);
    assert!(!orchestrator.get_queue_state().is_shuffle_enabled);
    assert_eq!(orchestrator.playback_status().phase, TransitionPhase::RolledBack);
}

// ============================================================================
// Adding tracks
// ============================================================================

#[tokio::test]
async fn test_add_to_queue_appends_and_mirrors_engine() {
    let (engine, orchestrator) = setup();
    orchestrator
        .update_queue_with_context(&songs(&["a", "b"]), playlist("p1"), 0)
        .await
        .unwrap();

    orchestrator.add_to_queue(&[song("c")], None).await.unwrap();
    orchestrator.add_to_queue(&[song("d")], Some(1)).await.unwrap();

    assert_eq!(engine.queue_ids(), vec!["a", "d", "b", "c"]);
    assert_eq!(entry_ids(&orchestrator), vec!["a", "d", "b", "c"]);
    assert_eq!(original_ids(&orchestrator), vec!["a", "d", "b", "c"]);
    assert!(engine.calls().contains(&EngineCall::Add {
        ids: vec!["d".into()],
        insert_before_index: Some(1),
    }));
}

#[tokio::test]
async fn test_add_while_shuffled_extends_pre_shuffle_order() {
    let (engine, orchestrator) = setup();
    orchestrator
        .update_queue_with_context(&songs(&["a", "b", "c"]), playlist("p1"), 0)
        .await
        .unwrap();
    orchestrator.shuffle_queue().await.unwrap();

    orchestrator.add_to_queue(&[song("d")], None).await.unwrap();

    assert_eq!(original_ids(&orchestrator), vec!["a", "b", "c", "d"]);
    assert_eq!(entry_ids(&orchestrator), engine.queue_ids());
    assert!(orchestrator.get_queue_state().is_shuffle_enabled);
}

#[tokio::test]
async fn test_add_to_queue_rejects_empty_input() {
    let (engine, orchestrator) = setup();

    let err = orchestrator.add_to_queue(&[], None).await.unwrap_err();
    assert!(err.is_precondition());
    assert!(engine.calls().is_empty());
}

// ============================================================================
// Reset
// ============================================================================

#[tokio::test]
async fn test_reset_queue_clears_state_and_engine() {
    let (engine, orchestrator, mut receiver) = setup_with_events();
    orchestrator
        .update_queue_with_context(&songs(&["a", "b"]), playlist("p1"), 0)
        .await
        .unwrap();
    drain(&mut receiver);

    orchestrator.reset_queue().await.unwrap();

    assert_eq!(orchestrator.get_queue_state(), Default::default());
    assert!(engine.queue_ids().is_empty());

    let status = orchestrator.playback_status();
    assert!(!status.is_playing);
    assert!(status.current_track.is_none());
    assert!(drain(&mut receiver).contains(&QueueEvent::QueueReset));
}

#[tokio::test]
async fn test_reset_queue_clears_state_even_when_engine_fails() {
    let (engine, orchestrator) = setup();
    orchestrator
        .update_queue_with_context(&songs(&["a", "b"]), playlist("p1"), 0)
        .await
        .unwrap();
    engine.fail("reset");

    let err = orchestrator.reset_queue().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TransientEngine);
    assert_eq!(orchestrator.get_queue_state(), Default::default());

    let status = orchestrator.playback_status();
    assert_eq!(status.phase, TransitionPhase::RolledBack);
    assert!(status.current_track.is_none());
}

// ============================================================================
// Engine notifications and state updates
// ============================================================================

#[tokio::test]
async fn test_active_track_notifications_are_deduplicated() {
    let (_engine, orchestrator) = setup();
    orchestrator
        .update_queue_with_context(&songs(&["a", "b", "c"]), playlist("p1"), 0)
        .await
        .unwrap();

    assert!(orchestrator.handle_active_track_changed(Some("b")));
    let revision = orchestrator.state_revision();
    assert!(!orchestrator.handle_active_track_changed(Some("b")));
    assert_eq!(orchestrator.state_revision(), revision);

    let state = orchestrator.get_queue_state();
    assert_eq!(state.current_song_id.as_deref(), Some("b"));
    assert_eq!(state.last_processed_track_id.as_deref(), Some("b"));
    assert_eq!(
        orchestrator.playback_status().current_track.map(|t| t.id).as_deref(),
        Some("b")
    );

    assert!(orchestrator.handle_active_track_changed(None));
    assert!(orchestrator.get_queue_state().current_song_id.is_none());
}

#[tokio::test]
async fn test_update_queue_state_skips_unchanged_song_id() {
    let (_engine, orchestrator) = setup();
    orchestrator
        .update_queue_with_context(&songs(&["a", "b"]), playlist("p1"), 0)
        .await
        .unwrap();
    let revision = orchestrator.state_revision();

    assert!(!orchestrator.update_queue_state(QueueStatePatch::new().current_song_id(Some("a".into()))));
    assert_eq!(orchestrator.state_revision(), revision);

    assert!(orchestrator.update_queue_state(QueueStatePatch::new().current_song_id(Some("b".into()))));
    assert_eq!(orchestrator.state_revision(), revision + 1);
}

// ============================================================================
// Local files
// ============================================================================

mock! {
    Downloads {}

    #[async_trait]
    impl LocalTrackSource for Downloads {
        async fn local_path(&self, song_id: &str) -> Option<String>;
    }
}

#[tokio::test]
async fn test_downloaded_songs_are_queued_from_local_files() {
    let mut downloads = MockDownloads::new();
    downloads
        .expect_local_path()
        .with(eq("song-1"))
        .returning(|_| Some("/local/path/song1.mp3".to_string()));
    downloads
        .expect_local_path()
        .with(eq("song-2"))
        .returning(|_| None);

    let engine = Arc::new(FakeEngine::new());
    let orchestrator = QueueOrchestrator::new(
        engine.clone(),
        TrackResolver::with_local_source(Arc::new(downloads)),
    );

    orchestrator
        .update_queue_with_context(&songs(&["song-1", "song-2"]), playlist("p1"), 0)
        .await
        .unwrap();

    let queued = engine.queue();
    assert_eq!(queued[0].url, "/local/path/song1.mp3");
    assert_eq!(queued[1].url, "https://cdn.example.com/audio/song-2.mp3");
    assert_eq!(
        orchestrator.get_queue_state().original_queue[0].url,
        "/local/path/song1.mp3"
    );
}
