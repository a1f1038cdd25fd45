//! Multi-Agent Coordinator
//!
//! Runs a [`PipelinePlan`](crate::plan::PipelinePlan) against the host:
//!
//! - **Fan-out**: each parallel group is dispatched concurrently, bounded by
//!   a FIFO semaphore of `max_concurrency` permits
//! - **Barrier**: a group must settle completely before the next one starts
//! - **Dependencies**: a step whose dependencies did not all succeed is
//!   `Skipped`; succeeded dependency results are forwarded in the payload
//! - **Retries**: one bounded loop per task, driven by the
//!   [`RetryManager`](crate::retry::RetryManager)
//! - **Deadline / cancellation**: abort the current group, fail its
//!   unfinished tasks and skip every later group

mod execution;
mod types;

pub use types::{CoordinatorConfig, FailedTask, OrchestrationResult, TaskOutput};

use crate::event_bus::EventBus;
use crate::host::HostDispatcher;
use crate::retry::RetryManager;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Dispatches pipeline plans to the host
pub struct MultiAgentCoordinator {
    host: Arc<dyn HostDispatcher>,
    retry: RetryManager,
    config: CoordinatorConfig,
    cancel_token: CancellationToken,
    events: EventBus,
}

impl MultiAgentCoordinator {
    /// Create a coordinator
    pub fn new(
        host: Arc<dyn HostDispatcher>,
        retry: RetryManager,
        config: CoordinatorConfig,
        events: EventBus,
    ) -> Self {
        Self {
            host,
            retry,
            config,
            cancel_token: CancellationToken::new(),
            events,
        }
    }

    /// Configuration
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Host the coordinator dispatches to
    pub fn host(&self) -> Arc<dyn HostDispatcher> {
        self.host.clone()
    }

    /// Retry manager
    pub fn retry(&self) -> &RetryManager {
        &self.retry
    }

    /// Cancel in-flight and future dispatches
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Token observed by dispatch
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }
}
