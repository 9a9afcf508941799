use codegate_core::{AttemptId, AttemptStatus, CompletionRecord, ProjectSession, RetryState, SessionError};
use codegate_test_utils::{completed_record, full_app_payload, GateHarness, PROJECT};
use pretty_assertions::assert_eq;

#[test]
fn test_only_one_attempt_in_flight() {
    let mut session = ProjectSession::new(PROJECT);
    session.begin_attempt("a1").unwrap();

    assert_eq!(
        session.begin_attempt("a2"),
        Err(SessionError::AttemptInFlight {
            active: AttemptId::from("a1")
        })
    );

    session.finish_attempt(&AttemptId::from("a1"));
    assert!(session.begin_attempt("a2").is_ok());
}

#[test]
fn test_processed_history_is_bounded() {
    let mut session = ProjectSession::with_history(PROJECT, 2);
    for id in ["a", "b", "c"] {
        assert!(session.mark_processed(&AttemptId::from(id)));
    }

    assert!(!session.was_processed(&AttemptId::from("a")));
    assert!(session.was_processed(&AttemptId::from("c")));
    assert!(!session.mark_processed(&AttemptId::from("b")));
}

#[test]
fn test_record_without_active_attempt_is_stale() {
    let session = ProjectSession::new(PROJECT);
    let record = CompletionRecord::new("a1", PROJECT, AttemptStatus::Completed, "p");
    assert!(session.is_stale(&record));
}

#[tokio::test]
async fn test_next_attempt_can_start_after_commit() {
    let mut harness = GateHarness::new();
    assert!(harness.run(&completed_record("a1", full_app_payload())).await.is_committed());
    assert!(harness.run(&completed_record("a2", full_app_payload())).await.is_committed());
    assert_eq!(harness.store.write_count(), 2);
}

#[tokio::test]
async fn test_retry_prompt_replayed_once() {
    let mut harness = GateHarness::new();
    harness.run(&completed_record("a1", "[1, 2]")).await;

    assert_eq!(
        harness.session.retry_state(),
        &RetryState::PendingRetry {
            attempt_id: AttemptId::from("a1"),
            prompt: "prompt for a1".to_string(),
            reason_code: "invalid_file_map".to_string(),
        }
    );
    assert_eq!(harness.session.take_retry_prompt().as_deref(), Some("prompt for a1"));
    assert_eq!(harness.session.take_retry_prompt(), None);
}
