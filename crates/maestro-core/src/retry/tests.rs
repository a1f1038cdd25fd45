use super::*;
use crate::error::ErrorKind;
use crate::plan::{PipelinePlan, StepSpec};

fn task() -> AgentTask {
    let plan = PipelinePlan::build("t", vec![StepSpec::new("fix", "implementer", "")]).unwrap();
    AgentTask::from_step(&plan.steps()[0])
}

fn manager(policy: RetryPolicy) -> (RetryManager, Arc<CalibrationEngine>) {
    let calibration = Arc::new(CalibrationEngine::default());
    let manager = RetryManager::new(policy, calibration.clone(), "keyword-v1", EventBus::default());
    (manager, calibration)
}

#[test]
fn test_default_policy() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts, 3);
    assert_eq!(policy.calculate_delay(1), Duration::from_millis(100));
    assert_eq!(policy.calculate_delay(2), Duration::from_millis(200));
    assert_eq!(policy.calculate_delay(3), Duration::from_millis(400));
}

#[test]
fn test_delays_are_capped_and_non_decreasing() {
    let policy = RetryPolicy::new()
        .with_initial_delay(Duration::from_millis(300))
        .with_max_delay(Duration::from_secs(2))
        .with_backoff_multiplier(3.0);

    let mut previous = Duration::ZERO;
    for attempt in 1..40 {
        let delay = policy.calculate_delay(attempt);
        assert!(delay >= previous);
        assert!(delay <= Duration::from_secs(2));
        previous = delay;
    }
    assert_eq!(previous, Duration::from_secs(2));
}

#[test]
fn test_attempt_bound() {
    let (manager, _) = manager(RetryPolicy::default());
    let mut task = task();

    let mut attempts = 0;
    loop {
        task.mark_dispatched().unwrap();
        attempts += 1;
        task.mark_retrying(ErrorKind::Dispatch, "boom").unwrap();
        if !manager.should_retry(&task) {
            break;
        }
    }
    assert_eq!(attempts, 3);
    assert_eq!(task.attempt(), 3);
}

#[test]
fn test_cancelled_is_not_retried() {
    let (manager, _) = manager(RetryPolicy::default());
    let mut task = task();
    task.mark_dispatched().unwrap();
    task.mark_retrying(ErrorKind::Cancelled, "stop").unwrap();
    assert!(!manager.should_retry(&task));
}

#[test]
fn test_serde_defaults() {
    let policy: RetryPolicy = serde_json::from_str(r#"{"max_attempts": 5}"#).unwrap();
    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.task_timeout_ms, 120_000);
}

#[test]
fn test_report_terminal_records_once_per_task() {
    let (manager, calibration) = manager(RetryPolicy::default());

    let mut succeeded = task();
    succeeded.mark_dispatched().unwrap();
    succeeded.mark_succeeded(serde_json::Value::Null).unwrap();
    assert!(manager.report_terminal(&succeeded, 0.9).is_some());

    let mut skipped = task();
    skipped.mark_skipped("dependency failed").unwrap();
    assert!(manager.report_terminal(&skipped, 0.9).is_none());

    let stats = calibration.stats("keyword-v1");
    assert_eq!(stats.samples, 1);
}

#[test]
fn test_confident_failure_raises_threshold() {
    let (manager, calibration) = manager(RetryPolicy::default());
    let mut failed = task();
    failed.mark_dispatched().unwrap();
    failed.mark_failed(ErrorKind::Dispatch, "boom").unwrap();

    let threshold = manager.report_terminal(&failed, 0.9).unwrap();
    assert!(threshold > 0.6);
    assert_eq!(calibration.current_threshold("keyword-v1"), threshold);
}
