//! Maestro Core - Prompt Orchestration Engine
//!
//! This crate sits between a host agent and its delegated sub-agents. For
//! every prompt submitted through the host's hook it:
//! - Classifies the prompt and reads the calibrated confidence threshold
//! - Routes simple requests to skill resolution (single mode)
//! - Expands complex requests into a dependency-layered plan (pipeline mode)
//! - Dispatches plan tasks concurrently with retries, timeouts and a cap
//! - Feeds observed outcomes back into threshold calibration
//! - Tracks per-session state machines and turn history

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod calibration;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod event_bus;
pub mod hook;
pub mod host;
pub mod orchestrator;
pub mod pipeline;
pub mod plan;
pub mod retry;
pub mod session;

pub use calibration::{CalibrationConfig, CalibrationEngine, CalibrationProfile, CalibrationStats};
pub use config::{EventsConfig, OrchestratorConfig, SessionsConfig};
pub use coordinator::{
    CoordinatorConfig, FailedTask, MultiAgentCoordinator, OrchestrationResult, TaskOutput,
};
pub use error::{format_error_for_hook, Error, ErrorKind, Result, UserFriendlyError};
pub use event_bus::{EventBus, OrchestrationEvent};
pub use hook::{HookInput, HookOutput, PriorTurn};
pub use host::{DelegatingHost, HostDispatcher, ReportStatus, TaskReport, TaskRequest};
pub use orchestrator::{Orchestrator, TurnOutcome};
pub use pipeline::{
    Decision, Mode, ModeKind, PipelineDetector, PlanTemplate, Route, TemplateRegistry,
    FALLBACK_TEMPLATE,
};
pub use plan::{PipelinePlan, PlanStep, StepSpec};
pub use retry::{RetryManager, RetryPolicy};
pub use session::{
    AgentTask, OrchestrationSession, PendingFeedback, SessionHandle, SessionState, SessionStore,
    SessionSummary, TaskStatus, TurnRecord,
};
