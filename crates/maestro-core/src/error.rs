//! Error types for maestro-core
//!
//! This module provides the orchestration error taxonomy and user-friendly
//! error formatting for hook responses.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// No intent cleared the calibrated threshold (routed to the fallback plan)
    #[error("low classification confidence: top {confidence:.2} below threshold {threshold:.2}")]
    ClassificationLowConfidence {
        /// Confidence of the best intent
        confidence: f32,
        /// Threshold in effect
        threshold: f32,
    },

    /// Host failed to deliver or execute a task
    #[error("task dispatch error: {0}")]
    TaskDispatch(String),

    /// Task did not report back within its deadline
    #[error("task '{task_id}' timed out after {timeout_ms}ms")]
    TaskTimeout {
        /// Task identifier
        task_id: String,
        /// Deadline that elapsed
        timeout_ms: u64,
    },

    /// Plan template produced a dependency cycle
    #[error("plan dependency cycle involving: {0}")]
    PlanCycle(String),

    /// Whole-turn deadline exceeded
    #[error("session timed out after {elapsed_ms}ms")]
    SessionTimeout {
        /// Time spent before the deadline fired
        elapsed_ms: u64,
    },

    /// Session or task state machine violation
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state
        from: String,
        /// Requested state
        to: String,
    },

    /// Task id already present in the session
    #[error("duplicate task id: {0}")]
    DuplicateTask(String),

    /// Task id not present in the session
    #[error("unknown task id: {0}")]
    UnknownTask(String),

    /// Malformed payload at the host boundary
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Skill system error
    #[error("skills error: {0}")]
    Skills(#[from] maestro_skills::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Failure classification stored on an agent task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Host-side delivery or execution failure
    Dispatch,
    /// Task or session deadline elapsed
    TaskTimeout,
    /// Cancelled by the caller
    Cancelled,
}

impl ErrorKind {
    /// Whether another attempt may succeed
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Dispatch | ErrorKind::TaskTimeout)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Dispatch => "dispatch error",
            ErrorKind::TaskTimeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl Error {
    /// Task-level failure kind, if this error belongs to a single task
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::TaskDispatch(_) | Error::InvalidPayload(_) => Some(ErrorKind::Dispatch),
            Error::TaskTimeout { .. } | Error::SessionTimeout { .. } => Some(ErrorKind::TaskTimeout),
            _ => None,
        }
    }

    /// Whether the error aborts the whole turn
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::PlanCycle(_) | Error::InvalidTransition { .. } | Error::Configuration(_)
        )
    }
}

/// Trait for user-friendly error messages
///
/// Hook responses never carry raw errors; they carry these messages.
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get a suggestion for how to fix the error
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for Error {
    fn user_message(&self) -> String {
        match self {
            Error::ClassificationLowConfidence { .. } => {
                "The request was ambiguous, so it was routed through a clarification step."
                    .to_string()
            }
            Error::TaskDispatch(msg) => format!("A delegated task could not be completed: {}", msg),
            Error::TaskTimeout { task_id, .. } => {
                format!("Task '{}' did not finish in time.", task_id)
            }
            Error::PlanCycle(steps) => format!(
                "The orchestration plan is malformed (circular dependency between {}).",
                steps
            ),
            Error::SessionTimeout { .. } => {
                "The turn ran out of time; only partial results are available.".to_string()
            }
            Error::InvalidTransition { .. } => {
                "Another turn is still being orchestrated for this session.".to_string()
            }
            Error::DuplicateTask(id) | Error::UnknownTask(id) => {
                format!("Internal task bookkeeping error for '{}'.", id)
            }
            Error::InvalidPayload(msg) => format!("The hook event was malformed: {}", msg),
            Error::Configuration(msg) => format!("Orchestration is misconfigured: {}", msg),
            Error::Skills(e) => format!("Skill lookup failed: {}", e),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Error::PlanCycle(_) => {
                Some("Check the plan templates for steps that depend on each other.".to_string())
            }
            Error::SessionTimeout { .. } | Error::TaskTimeout { .. } => Some(
                "Raise `coordinator.session_timeout_ms` or `retry.task_timeout_ms`, or split the request."
                    .to_string(),
            ),
            Error::InvalidTransition { .. } => {
                Some("Wait for the current turn to finish before sending another.".to_string())
            }
            Error::InvalidPayload(_) => {
                Some("The event needs a `promptText` string and a non-empty `sessionId`.".to_string())
            }
            Error::Configuration(_) => Some("Check config/default.toml and MAESTRO_* variables.".to_string()),
            _ => None,
        }
    }
}

/// Format an error as a single `systemMessage` line for the host
pub fn format_error_for_hook(error: &Error) -> String {
    match error.suggestion() {
        Some(hint) => format!("{} {}", error.user_message(), hint),
        None => error.user_message(),
    }
}
