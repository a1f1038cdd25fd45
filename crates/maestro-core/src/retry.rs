//! Retry Manager - bounded exponential backoff for agent tasks
//!
//! The manager only answers questions (`should_retry`, `next_attempt_delay`,
//! `task_timeout`); the coordinator owns the loop. Terminal outcomes are fed
//! back into calibration exactly once per task through
//! [`RetryManager::report_terminal`].

use crate::calibration::CalibrationEngine;
use crate::event_bus::{EventBus, OrchestrationEvent};
use crate::session::{AgentTask, TaskStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts per task (first attempt included)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the second attempt
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound of any delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Deadline of a single attempt
    #[serde(default = "default_task_timeout_ms")]
    pub task_timeout_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_task_timeout_ms() -> u64 {
    120_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            task_timeout_ms: default_task_timeout_ms(),
        }
    }
}

impl RetryPolicy {
    /// Create the default policy
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum attempts
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set initial delay
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set maximum delay
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set backoff multiplier
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Set per-attempt timeout
    #[must_use]
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Delay after the given (1-based) failed attempt.
    ///
    /// No jitter: delays never decrease as the attempt number grows.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1).saturating_sub(1).min(i32::MAX as u32) as i32;
        let multiplier = self.backoff_multiplier.max(1.0);
        let base_delay = self.initial_delay_ms as f64 * multiplier.powi(exponent);

        let delay_ms = base_delay.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(delay_ms)
    }
}

/// Decides retries and reports terminal outcomes to calibration
#[derive(Clone)]
pub struct RetryManager {
    policy: RetryPolicy,
    calibration: Arc<CalibrationEngine>,
    classifier_id: String,
    events: EventBus,
}

impl RetryManager {
    /// Create a retry manager that reports to `calibration` under `classifier_id`
    pub fn new(
        policy: RetryPolicy,
        calibration: Arc<CalibrationEngine>,
        classifier_id: impl Into<String>,
        events: EventBus,
    ) -> Self {
        Self {
            policy,
            calibration,
            classifier_id: classifier_id.into(),
            events,
        }
    }

    /// Policy in effect
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Retryable failure with attempts left
    pub fn should_retry(&self, task: &AgentTask) -> bool {
        let retryable = task.error().is_some_and(|kind| kind.is_retryable());
        retryable && task.attempt() < self.policy.max_attempts
    }

    /// Backoff before the task's next attempt
    pub fn next_attempt_delay(&self, task: &AgentTask) -> Duration {
        self.policy.calculate_delay(task.attempt())
    }

    /// Deadline of a single attempt
    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.policy.task_timeout_ms)
    }

    /// Feed a terminal task outcome into calibration.
    ///
    /// Skipped tasks never ran and are not reported. Returns the new
    /// threshold when an outcome was recorded.
    pub fn report_terminal(&self, task: &AgentTask, confidence: f32) -> Option<f32> {
        let succeeded = match task.status() {
            TaskStatus::Succeeded => true,
            TaskStatus::Failed => false,
            _ => return None,
        };

        let threshold = self
            .calibration
            .record_outcome(&self.classifier_id, confidence, succeeded);
        debug!(
            task_id = %task.task_id(),
            succeeded,
            attempts = task.attempt(),
            threshold,
            "Reported task outcome"
        );
        self.events.publish(OrchestrationEvent::ThresholdAdjusted {
            classifier_id: self.classifier_id.clone(),
            threshold,
        });
        Some(threshold)
    }
}

#[cfg(test)]
mod tests;
