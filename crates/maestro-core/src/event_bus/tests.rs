use super::*;
use crate::session::TaskStatus;

#[tokio::test]
async fn test_publish_subscribe() {
    let bus = EventBus::new(16);
    let mut rx = bus.subscribe();

    bus.publish(OrchestrationEvent::TurnStarted {
        session_id: "s1".to_string(),
        turn: 1,
    });

    let event = rx.recv().await.unwrap();
    assert_eq!(event.session_id(), Some("s1"));
    assert!(event.task_id().is_none());
}

#[tokio::test]
async fn test_multiple_subscribers() {
    let bus = EventBus::new(16);
    let mut rx1 = bus.subscribe();
    let mut rx2 = bus.subscribe();
    assert_eq!(bus.subscriber_count(), 2);

    let count = bus.publish(OrchestrationEvent::TaskSettled {
        task_id: "abc-fix".to_string(),
        status: TaskStatus::Succeeded,
        attempts: 1,
    });
    assert_eq!(count, 2);

    assert_eq!(rx1.recv().await.unwrap().task_id(), Some("abc-fix"));
    assert_eq!(rx2.recv().await.unwrap().task_id(), Some("abc-fix"));
}

#[test]
fn test_publish_without_subscribers_is_dropped() {
    let bus = EventBus::default();
    let count = bus.publish(OrchestrationEvent::ThresholdAdjusted {
        classifier_id: "keyword-v1".to_string(),
        threshold: 0.6,
    });
    assert_eq!(count, 0);
}

#[test]
fn test_event_serialization() {
    let event = OrchestrationEvent::TaskSettled {
        task_id: "abc-fix".to_string(),
        status: TaskStatus::Skipped,
        attempts: 0,
    };
    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("\"type\":\"task_settled\""));
    assert!(json.contains("\"status\":\"skipped\""));
}

#[tokio::test]
async fn test_logger_drains_until_bus_closes() {
    let bus = EventBus::new(16);
    let logger = bus.spawn_logger();
    assert_eq!(bus.subscriber_count(), 1);

    bus.publish(OrchestrationEvent::TurnStarted {
        session_id: "s1".to_string(),
        turn: 1,
    });
    bus.publish(OrchestrationEvent::TaskSettled {
        task_id: "abc-fix".to_string(),
        status: TaskStatus::Succeeded,
        attempts: 1,
    });
    drop(bus);

    assert_eq!(logger.await.unwrap(), 2);
}

#[tokio::test]
async fn test_lagging_logger_keeps_going() {
    let bus = EventBus::new(1);
    let logger = bus.spawn_logger();

    for turn in 1..=3 {
        bus.publish(OrchestrationEvent::TurnStarted {
            session_id: "s1".to_string(),
            turn,
        });
    }
    drop(bus);

    // Only the newest event survives a capacity of one
    assert_eq!(logger.await.unwrap(), 1);
}
