//! Run Session Integration Tests
//!
//! Poller, projector and completion router wired together, end to end.

mod common;

use std::time::Duration;

use common::{status, RecordingNavigator, Reply, ScriptedSource};
use ltuas::core::{PollConfig, PollerState, RouterOutcome, RunSession, Surface};
use ltuas::domain::{BackendNodeState, RunId, RunPhase, UiNodeStatus};
use serde_json::json;

fn config() -> PollConfig {
    PollConfig {
        interval: Duration::from_millis(1000),
        settle_delay: Duration::from_millis(1500),
    }
}

async fn run_for(duration: Duration) {
    tokio::time::sleep(duration).await;
}

#[tokio::test(start_paused = true)]
async fn test_success_navigates_once_after_settle_delay() {
    let mut done = status("r1", RunPhase::Success, &[("clap", BackendNodeState::Success)]);
    done.result = Some(json!({"clap_inf": {"dominant_sound": "dog bark"}}));
    let source = ScriptedSource::new(vec![
        Reply::Status(status("r1", RunPhase::Running, &[("clap", BackendNodeState::Running)])),
        Reply::Status(done),
    ]);
    let navigator = RecordingNavigator::new();

    let mut session = RunSession::open(
        RunId::new("r1"),
        source.clone(),
        navigator.clone(),
        config(),
        Surface::Page,
    )
    .unwrap();

    run_for(Duration::from_millis(10)).await;
    let view = session.current();
    assert_eq!(view.phase, RunPhase::Running);
    assert_eq!(view.status_of("clap"), UiNodeStatus::Loading);
    assert_eq!(view.status_of("whisper"), UiNodeStatus::Initial);

    let outcome = session.wait().await;
    assert_eq!(outcome, Some(RouterOutcome::Navigated(RunId::new("r1"))));

    let view = session.current();
    assert_eq!(view.phase, RunPhase::Success);
    assert_eq!(view.status_of("clap"), UiNodeStatus::Success);
    assert!(view.result.is_some());

    let calls = navigator.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, RunId::new("r1"));
    assert_eq!(calls[0].1, Surface::Page);

    // Navigation waits out the settle delay after the success response
    let success_fetch = source.fetch_times()[1];
    assert!(calls[0].2 - success_fetch >= Duration::from_millis(1500));

    run_for(Duration::from_secs(10)).await;
    assert_eq!(navigator.calls().len(), 1);
    assert_eq!(source.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_network_error_freezes_without_navigation() {
    let source = ScriptedSource::new(vec![Reply::Fail("connection reset".to_string())]);
    let navigator = RecordingNavigator::new();

    let mut session = RunSession::open(
        RunId::new("r1"),
        source.clone(),
        navigator.clone(),
        config(),
        Surface::Page,
    )
    .unwrap();

    let outcome = session.wait().await;
    match outcome {
        Some(RouterOutcome::Failed(Some(message))) => {
            assert!(message.starts_with("Failed to fetch status"), "{}", message)
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    run_for(Duration::from_secs(10)).await;
    let view = session.current();
    assert_eq!(view.phase, RunPhase::Error);
    assert_eq!(view.nodes, session.projector().graph().initial_table());
    assert_eq!(session.poller_state(), Some(PollerState::Failed));
    assert_eq!(source.fetch_count(), 1);
    assert!(navigator.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_error_keeps_last_node_statuses() {
    let source = ScriptedSource::new(vec![
        Reply::Status(status(
            "r1",
            RunPhase::Running,
            &[("clap", BackendNodeState::Success), ("whisper", BackendNodeState::Running)],
        )),
        Reply::Fail("timed out".to_string()),
    ]);
    let navigator = RecordingNavigator::new();

    let mut session = RunSession::open(
        RunId::new("r1"),
        source,
        navigator.clone(),
        config(),
        Surface::Page,
    )
    .unwrap();
    session.wait().await;

    let view = session.current();
    assert_eq!(view.phase, RunPhase::Error);
    assert_eq!(view.status_of("clap"), UiNodeStatus::Success);
    assert_eq!(view.status_of("whisper"), UiNodeStatus::Loading);
    assert!(navigator.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_close_before_first_response() {
    let source = ScriptedSource::new(vec![Reply::Status(status(
        "r2",
        RunPhase::Success,
        &[("clap", BackendNodeState::Success)],
    ))]);
    let navigator = RecordingNavigator::new();

    let mut session = RunSession::open(
        RunId::new("r2"),
        source,
        navigator.clone(),
        config(),
        Surface::Page,
    )
    .unwrap();
    session.close();
    run_for(Duration::from_secs(10)).await;

    let view = session.current();
    assert_eq!(view.phase, RunPhase::Cancelled);
    assert!(view.nodes.values().all(|s| *s == UiNodeStatus::Initial));
    assert_eq!(session.poller_state(), None);
    assert_eq!(session.wait().await, None);
    assert!(navigator.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_close_during_settle_delay_skips_navigation() {
    let source = ScriptedSource::new(vec![Reply::Status(status("r1", RunPhase::Success, &[]))]);
    let navigator = RecordingNavigator::new();

    let mut session = RunSession::open(
        RunId::new("r1"),
        source,
        navigator.clone(),
        config(),
        Surface::Dialog,
    )
    .unwrap();

    run_for(Duration::from_millis(700)).await;
    assert_eq!(session.current().phase, RunPhase::Success);

    session.close();
    run_for(Duration::from_secs(10)).await;

    assert!(navigator.calls().is_empty());
    assert_eq!(session.current().phase, RunPhase::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_dialog_surface_reaches_navigator() {
    let source = ScriptedSource::new(vec![Reply::Status(status("r1", RunPhase::Success, &[]))]);
    let navigator = RecordingNavigator::new();

    let mut session = RunSession::open(
        RunId::new("r1"),
        source,
        navigator.clone(),
        config(),
        Surface::Dialog,
    )
    .unwrap();
    assert_eq!(session.surface(), Surface::Dialog);

    session.wait().await;
    let calls = navigator.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, Surface::Dialog);
}

#[tokio::test(start_paused = true)]
async fn test_backend_cancelled_is_shown_as_error() {
    let source = ScriptedSource::new(vec![Reply::Status(status("r1", RunPhase::Cancelled, &[]))]);
    let navigator = RecordingNavigator::new();

    let mut session = RunSession::open(
        RunId::new("r1"),
        source,
        navigator.clone(),
        config(),
        Surface::Page,
    )
    .unwrap();

    let outcome = session.wait().await;
    assert_eq!(
        outcome,
        Some(RouterOutcome::Failed(Some("Run was cancelled".to_string())))
    );
    assert_eq!(session.poller_state(), Some(PollerState::Cancelled));
    assert!(navigator.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_switch_run_resets_table() {
    let source = ScriptedSource::new(vec![
        Reply::Status(status("r1", RunPhase::Running, &[("clap", BackendNodeState::Running)])),
        Reply::Status(status("r2", RunPhase::Running, &[("mellow", BackendNodeState::Running)])),
    ]);
    let navigator = RecordingNavigator::new();

    let mut session = RunSession::open(
        RunId::new("r1"),
        source,
        navigator,
        config(),
        Surface::Page,
    )
    .unwrap();
    run_for(Duration::from_millis(10)).await;
    assert_eq!(session.current().status_of("clap"), UiNodeStatus::Loading);

    session.switch_run(RunId::new("r2")).unwrap();
    let view = session.current();
    assert_eq!(view.run_id, Some(RunId::new("r2")));
    assert_eq!(view.phase, RunPhase::Idle);
    assert!(view.nodes.values().all(|s| *s == UiNodeStatus::Initial));

    run_for(Duration::from_millis(10)).await;
    let view = session.current();
    assert_eq!(view.phase, RunPhase::Running);
    assert_eq!(view.status_of("clap"), UiNodeStatus::Initial);
    assert_eq!(view.status_of("mellow"), UiNodeStatus::Loading);
}

#[tokio::test(start_paused = true)]
async fn test_all_readers_see_same_view() {
    let source = ScriptedSource::new(vec![Reply::Status(status(
        "r1",
        RunPhase::Running,
        &[("whisper", BackendNodeState::Running)],
    ))]);

    let session = RunSession::open(
        RunId::new("r1"),
        source,
        RecordingNavigator::new(),
        config(),
        Surface::Page,
    )
    .unwrap();
    let mut graph_reader = session.view();
    let mut status_reader = session.view();

    graph_reader.changed().await.unwrap();
    status_reader.changed().await.unwrap();
    assert_eq!(*graph_reader.borrow(), *status_reader.borrow());
    assert_eq!(graph_reader.borrow().status_of("whisper"), UiNodeStatus::Loading);
}
