use super::types::OrchestrationEvent;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Broadcast channel for orchestration lifecycle events.
///
/// Publishing never waits on subscribers: a subscriber that falls more than
/// `capacity` events behind skips ahead and is told how many it missed.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<OrchestrationEvent>,
}

impl EventBus {
    /// Create a bus that buffers up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestrationEvent> {
        self.sender.subscribe()
    }

    /// Publish an event and return how many subscribers received it.
    pub fn publish(&self, event: OrchestrationEvent) -> usize {
        let delivered = self.sender.send(event).unwrap_or(0);
        trace!(delivered, "Published orchestration event");
        delivered
    }

    /// Number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Forward every event to the `tracing` log at debug level.
    ///
    /// The task ends once every clone of the bus is dropped and returns the
    /// number of events it logged.
    pub fn spawn_logger(&self) -> JoinHandle<u64> {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            let mut logged = 0u64;
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        logged += 1;
                        debug!(
                            session_id = event.session_id().unwrap_or("-"),
                            task_id = event.task_id().unwrap_or("-"),
                            event = ?event,
                            "Orchestration event"
                        );
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event logger fell behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            logged
        })
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
