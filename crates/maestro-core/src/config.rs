//! Orchestrator configuration
//!
//! Every section has serde defaults, so an empty document yields a working
//! configuration.

use crate::calibration::CalibrationConfig;
use crate::coordinator::CoordinatorConfig;
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use maestro_skills::{ClassifierConfig, ResolverConfig};
use serde::{Deserialize, Serialize};

/// Orchestrator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Intent classifier
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Skill resolver
    #[serde(default)]
    pub resolver: ResolverConfig,
    /// Calibration engine
    #[serde(default)]
    pub calibration: CalibrationConfig,
    /// Retry policy
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Multi-agent coordinator
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    /// Event bus
    #[serde(default)]
    pub events: EventsConfig,
    /// Session store
    #[serde(default)]
    pub sessions: SessionsConfig,
}

/// Session store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Idle sessions untouched for this long are dropped; 0 keeps them forever
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
}

fn default_idle_ttl_secs() -> u64 {
    3600
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: default_idle_ttl_secs(),
        }
    }
}

impl SessionsConfig {
    /// Idle TTL, if eviction is enabled
    pub fn idle_ttl(&self) -> Option<chrono::Duration> {
        if self.idle_ttl_secs == 0 {
            return None;
        }
        chrono::Duration::try_seconds(i64::try_from(self.idle_ttl_secs).ok()?)
    }
}

/// Event bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Events buffered per subscriber
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

fn default_event_capacity() -> usize {
    256
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

impl OrchestratorConfig {
    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        let t = self.calibration.default_threshold;
        if !(0.0..=1.0).contains(&t) {
            return Err(Error::Configuration(format!(
                "calibration.default_threshold must be within [0, 1], got {}",
                t
            )));
        }
        if self.calibration.history_window == 0 {
            return Err(Error::Configuration(
                "calibration.history_window must be at least 1".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Configuration(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::Configuration(format!(
                "retry.backoff_multiplier must be >= 1.0, got {}",
                self.retry.backoff_multiplier
            )));
        }
        if self.retry.task_timeout_ms == 0 || self.coordinator.session_timeout_ms == 0 {
            return Err(Error::Configuration(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.coordinator.max_concurrency == 0 {
            return Err(Error::Configuration(
                "coordinator.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.classifier.max_input_chars == 0 {
            return Err(Error::Configuration(
                "classifier.max_input_chars must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
