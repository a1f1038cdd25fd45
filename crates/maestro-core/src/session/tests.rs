use super::*;
use crate::plan::StepSpec;
use std::sync::Arc;

const ALL_STATES: [SessionState; 7] = [
    SessionState::Idle,
    SessionState::Classifying,
    SessionState::Planning,
    SessionState::Dispatching,
    SessionState::Aggregating,
    SessionState::Complete,
    SessionState::PartialFailure,
];

fn plan() -> PipelinePlan {
    PipelinePlan::build(
        "t",
        vec![
            StepSpec::new("a", "agent", ""),
            StepSpec::new("b", "agent", "").after("a"),
        ],
    )
    .unwrap()
}

#[test]
fn test_transition_table() {
    let legal = [
        (SessionState::Idle, SessionState::Classifying),
        (SessionState::Classifying, SessionState::Dispatching),
        (SessionState::Classifying, SessionState::Planning),
        (SessionState::Planning, SessionState::Dispatching),
        (SessionState::Planning, SessionState::Idle),
        (SessionState::Dispatching, SessionState::Dispatching),
        (SessionState::Dispatching, SessionState::Aggregating),
        (SessionState::Aggregating, SessionState::Complete),
        (SessionState::Aggregating, SessionState::PartialFailure),
        (SessionState::Complete, SessionState::Idle),
        (SessionState::PartialFailure, SessionState::Idle),
    ];

    for from in ALL_STATES {
        for to in ALL_STATES {
            assert_eq!(
                from.can_transition_to(to),
                legal.contains(&(from, to)),
                "{} -> {}",
                from,
                to
            );
        }
    }
}

#[test]
fn test_illegal_transition_is_rejected() {
    let mut session = OrchestrationSession::new("s1");
    let err = session.transition(SessionState::Dispatching).unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { ref from, ref to } if from == "idle" && to == "dispatching"));
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_begin_turn_settles_finished_turn() {
    let mut session = OrchestrationSession::new("s1");
    assert_eq!(session.begin_turn("prompt").unwrap(), 1);
    session.transition(SessionState::Dispatching).unwrap();
    session.transition(SessionState::Aggregating).unwrap();
    session.transition(SessionState::Complete).unwrap();

    assert_eq!(session.begin_turn("prompt").unwrap(), 2);
    assert_eq!(session.state(), SessionState::Classifying);
}

#[test]
fn test_begin_turn_fails_while_busy() {
    let mut session = OrchestrationSession::new("s1");
    session.begin_turn("prompt").unwrap();
    session.transition(SessionState::Planning).unwrap();

    assert!(matches!(
        session.begin_turn("prompt"),
        Err(Error::InvalidTransition { .. })
    ));
    assert_eq!(session.turn(), 1);
}

#[test]
fn test_task_lifecycle() {
    let plan = plan();
    let mut task = AgentTask::from_step(&plan.steps()[0]);
    assert_eq!(task.status(), TaskStatus::Pending);

    task.mark_dispatched().unwrap();
    task.mark_retrying(ErrorKind::Dispatch, "boom").unwrap();
    task.mark_dispatched().unwrap();
    task.mark_succeeded(serde_json::json!({"ok": true})).unwrap();

    assert_eq!(task.attempt(), 2);
    assert!(task.error().is_none());
    assert_eq!(task.result(), Some(&serde_json::json!({"ok": true})));
}

#[test]
fn test_succeeded_task_never_reverts() {
    let plan = plan();
    let mut task = AgentTask::from_step(&plan.steps()[0]);
    task.mark_dispatched().unwrap();
    task.mark_succeeded(serde_json::Value::Null).unwrap();

    assert!(task.mark_failed(ErrorKind::TaskTimeout, "late").is_err());
    assert!(task.mark_retrying(ErrorKind::Dispatch, "late").is_err());
    assert!(task.mark_dispatched().is_err());
    assert_eq!(task.status(), TaskStatus::Succeeded);
}

#[test]
fn test_pending_task_can_be_skipped_or_timed_out() {
    let plan = plan();
    let mut skipped = AgentTask::from_step(&plan.steps()[1]);
    skipped.mark_skipped("dependency failed").unwrap();
    assert_eq!(skipped.status(), TaskStatus::Skipped);

    let mut timed_out = AgentTask::from_step(&plan.steps()[1]);
    timed_out
        .mark_failed(ErrorKind::TaskTimeout, "session deadline")
        .unwrap();
    assert_eq!(timed_out.error(), Some(ErrorKind::TaskTimeout));
    assert_eq!(timed_out.attempt(), 0);
}

#[test]
fn test_duplicate_task_is_rejected() {
    let plan = plan();
    let mut session = OrchestrationSession::new("s1");
    session
        .insert_task(AgentTask::from_step(&plan.steps()[0]))
        .unwrap();
    let err = session
        .insert_task(AgentTask::from_step(&plan.steps()[0]))
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateTask(_)));
    assert!(matches!(
        session.task_mut("missing"),
        Err(Error::UnknownTask(_))
    ));
}

#[test]
fn test_install_plan_records_superseded() {
    let mut session = OrchestrationSession::new("s1");
    let first = plan();
    let second = first.replan("t", vec![StepSpec::new("c", "agent", "")]).unwrap();
    let first_id = first.id();

    session.install_plan(first);
    session.install_plan(second);

    assert_eq!(session.superseded_plans(), &[first_id]);
    assert_eq!(session.plan().unwrap().supersedes(), Some(first_id));
}

#[test]
fn test_history_is_bounded() {
    let mut session = OrchestrationSession::new("s1");
    for turn in 1..=(HISTORY_LIMIT as u64 + 5) {
        session.record_turn(TurnRecord {
            turn,
            category: format!("c{}", turn),
            mode: ModeKind::Single,
            final_state: SessionState::Complete,
            at: Utc::now(),
        });
    }
    assert_eq!(session.history().len(), HISTORY_LIMIT);
    assert_eq!(session.history()[0].turn, 6);
    assert_eq!(
        session.prior_category(),
        Some(format!("c{}", HISTORY_LIMIT + 5).as_str())
    );
}

#[tokio::test]
async fn test_store_lifecycle() {
    let store = SessionStore::new();
    let a = store.get_or_create("a").await;
    let again = store.get_or_create("a").await;
    assert!(Arc::ptr_eq(&a, &again));

    store.get_or_create("b").await;
    assert_eq!(store.len().await, 2);
    assert_eq!(store.summaries().await.len(), 2);

    assert!(store.end("a").await);
    assert!(!store.end("a").await);
    assert!(store.get("a").await.is_none());

    // Ending destroys state: the next turn starts fresh
    let fresh = store.get_or_create("a").await;
    assert_eq!(fresh.read().await.turn(), 0);
}

#[test]
fn test_abandon_turn_uses_legal_edges() {
    let mut session = OrchestrationSession::new("s1");
    session.begin_turn("prompt").unwrap();
    assert_eq!(session.abandon_turn(), SessionState::Idle);

    session.begin_turn("prompt").unwrap();
    session.transition(SessionState::Dispatching).unwrap();
    assert_eq!(session.abandon_turn(), SessionState::PartialFailure);

    // The next turn can still start
    assert_eq!(session.begin_turn("prompt").unwrap(), 3);
}

#[tokio::test]
async fn test_idle_sessions_are_evicted() {
    let store = SessionStore::new();
    store.get_or_create("idle").await;
    {
        let busy = store.get_or_create("busy").await;
        busy.write().await.begin_turn("prompt").unwrap();
    }
    let held = store.get_or_create("held").await;

    // Nothing is older than an hour
    assert_eq!(store.evict_idle(chrono::Duration::hours(1)).await, 0);

    let future = Utc::now() + chrono::Duration::seconds(5);
    assert_eq!(store.evict_idle_before(future).await, 1);
    assert!(store.get("idle").await.is_none());
    assert!(store.get("busy").await.is_some());
    assert!(store.get("held").await.is_some());

    drop(held);
    assert_eq!(store.evict_idle_before(future).await, 1);
    assert_eq!(store.len().await, 1);
}

#[test]
fn test_pending_feedback_is_taken_once() {
    let mut session = OrchestrationSession::new("s1");
    session.set_pending_feedback(PendingFeedback {
        turn: 1,
        category: "quick_fix".to_string(),
        confidence: 0.9,
        mode: ModeKind::Single,
    });
    assert_eq!(session.take_pending_feedback().unwrap().turn, 1);
    assert!(session.take_pending_feedback().is_none());
}
