use crate::error::ErrorKind;
use crate::pipeline::ModeKind;
use crate::session::{SessionState, TaskStatus};
use serde::Serialize;
use uuid::Uuid;

/// Events emitted while a turn is orchestrated.
///
/// Events carry identifiers and outcomes only, never prompt text or host
/// results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestrationEvent {
    /// A turn started
    TurnStarted {
        /// Session identifier
        session_id: String,
        /// Turn number
        turn: u64,
    },
    /// The prompt was classified
    Classified {
        /// Session identifier
        session_id: String,
        /// Top intent category
        category: String,
        /// Top intent confidence
        confidence: f32,
        /// Threshold in effect
        threshold: f32,
    },
    /// Single or pipeline mode chosen
    ModeSelected {
        /// Session identifier
        session_id: String,
        /// Chosen mode
        mode: ModeKind,
        /// Whether no intent cleared the threshold
        low_confidence: bool,
    },
    /// A plan was built and installed
    PlanBuilt {
        /// Session identifier
        session_id: String,
        /// Plan identifier
        plan_id: Uuid,
        /// Template name
        template: String,
        /// Number of parallel groups
        groups: usize,
    },
    /// A parallel group started
    GroupStarted {
        /// Plan identifier
        plan_id: Uuid,
        /// Group index
        group: u32,
        /// Tasks dispatched in this group
        tasks: usize,
    },
    /// An attempt was sent to the host
    TaskDispatched {
        /// Task identifier
        task_id: String,
        /// Agent type
        agent_type: String,
        /// Attempt number (1-based)
        attempt: u32,
    },
    /// An attempt failed and will be retried
    TaskRetrying {
        /// Task identifier
        task_id: String,
        /// Attempt that failed
        attempt: u32,
        /// Backoff before the next attempt
        delay_ms: u64,
        /// Failure kind
        error: ErrorKind,
    },
    /// A task reached a terminal status
    TaskSettled {
        /// Task identifier
        task_id: String,
        /// Terminal status
        status: TaskStatus,
        /// Attempts made
        attempts: u32,
    },
    /// Calibration moved (or confirmed) a threshold
    ThresholdAdjusted {
        /// Classifier identifier
        classifier_id: String,
        /// New threshold
        threshold: f32,
    },
    /// A turn finished
    TurnCompleted {
        /// Session identifier
        session_id: String,
        /// Turn number
        turn: u64,
        /// Final session state
        final_state: SessionState,
    },
}

impl OrchestrationEvent {
    /// Session the event belongs to, for session-scoped events.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::TurnStarted { session_id, .. }
            | Self::Classified { session_id, .. }
            | Self::ModeSelected { session_id, .. }
            | Self::PlanBuilt { session_id, .. }
            | Self::TurnCompleted { session_id, .. } => Some(session_id),
            Self::GroupStarted { .. }
            | Self::TaskDispatched { .. }
            | Self::TaskRetrying { .. }
            | Self::TaskSettled { .. }
            | Self::ThresholdAdjusted { .. } => None,
        }
    }

    /// Task the event belongs to, for task-scoped events.
    #[must_use]
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::TaskDispatched { task_id, .. }
            | Self::TaskRetrying { task_id, .. }
            | Self::TaskSettled { task_id, .. } => Some(task_id),
            _ => None,
        }
    }
}
