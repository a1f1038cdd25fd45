use crate::error::ErrorKind;
use crate::session::SessionState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Tasks in flight at once within a group
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Deadline for dispatching a whole plan
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
}

fn default_max_concurrency() -> usize {
    5
}

fn default_session_timeout_ms() -> u64 {
    300_000
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            session_timeout_ms: default_session_timeout_ms(),
        }
    }
}

/// Result of a succeeded task
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutput {
    /// Task id
    pub task_id: String,
    /// Agent type
    pub agent_type: String,
    /// Host result reference
    pub result: serde_json::Value,
    /// Attempts it took
    pub attempts: u32,
}

/// A task that ended `Failed`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedTask {
    /// Task id
    pub task_id: String,
    /// Agent type
    pub agent_type: String,
    /// Failure kind
    pub error: ErrorKind,
    /// Last failure message
    pub message: String,
    /// Attempts made
    pub attempts: u32,
}

/// Aggregated outcome of dispatching a plan
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationResult {
    /// Plan that was dispatched
    pub plan_id: Uuid,
    /// Succeeded tasks in plan order
    pub succeeded_results: Vec<TaskOutput>,
    /// Failed tasks in plan order
    pub failed_tasks: Vec<FailedTask>,
    /// Task ids that never ran
    pub skipped_tasks: Vec<String>,
    /// Whether the session deadline fired
    pub session_timed_out: bool,
    /// Whether dispatch was cancelled
    pub cancelled: bool,
    /// Session state after aggregation
    pub final_state: SessionState,
    /// Wall time spent dispatching
    pub elapsed_ms: u64,
}

impl OrchestrationResult {
    /// Every task succeeded
    pub fn is_complete(&self) -> bool {
        self.failed_tasks.is_empty() && self.skipped_tasks.is_empty()
    }

    /// Some task failed or was skipped
    pub fn is_partial_failure(&self) -> bool {
        !self.is_complete()
    }

    /// One-line summary for the user
    pub fn summary(&self) -> String {
        let total =
            self.succeeded_results.len() + self.failed_tasks.len() + self.skipped_tasks.len();
        let mut summary = format!(
            "{}/{} tasks succeeded",
            self.succeeded_results.len(),
            total
        );
        if !self.failed_tasks.is_empty() {
            let failed: Vec<String> = self
                .failed_tasks
                .iter()
                .map(|f| format!("{} ({})", f.task_id, f.error))
                .collect();
            summary.push_str(&format!("; failed: {}", failed.join(", ")));
        }
        if !self.skipped_tasks.is_empty() {
            summary.push_str(&format!("; skipped: {}", self.skipped_tasks.join(", ")));
        }
        if self.session_timed_out {
            summary.push_str("; session deadline reached");
        } else if self.cancelled {
            summary.push_str("; cancelled");
        }
        summary
    }

    /// Context block listing what each agent was asked to produce
    pub fn render_context(&self) -> Option<String> {
        if self.succeeded_results.is_empty() {
            return None;
        }
        let lines: Vec<String> = self
            .succeeded_results
            .iter()
            .map(|out| format!("- {} [{}]: {}", out.task_id, out.agent_type, out.result))
            .collect();
        Some(format!(
            "Orchestrated plan {}:\n{}",
            self.plan_id,
            lines.join("\n")
        ))
    }
}
