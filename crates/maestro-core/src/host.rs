//! Host boundary
//!
//! The host agent runtime executes tasks; the core only sends
//! [`TaskRequest`]s through a [`HostDispatcher`] and validates the
//! [`TaskReport`]s that come back.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Work unit sent to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    /// Task id
    pub task_id: String,
    /// Agent type to run
    pub agent_type: String,
    /// Instruction, prompt and dependency results
    pub input_payload: serde_json::Value,
}

/// Outcome status reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Task completed
    Succeeded,
    /// Task failed
    Failed,
}

/// Host answer to a [`TaskRequest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReport {
    /// Task id; must match the request
    pub task_id: String,
    /// Outcome
    pub status: ReportStatus,
    /// Result reference on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error description on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskReport {
    /// Successful report
    pub fn succeeded(task_id: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            task_id: task_id.into(),
            status: ReportStatus::Succeeded,
            result: Some(result),
            error: None,
        }
    }

    /// Failed report
    pub fn failed(task_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: ReportStatus::Failed,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Check the report against the request it answers and return the result.
    ///
    /// Mismatched ids and failed reports are dispatch errors.
    pub fn into_result(self, expected_task_id: &str) -> Result<serde_json::Value> {
        if self.task_id != expected_task_id {
            return Err(Error::TaskDispatch(format!(
                "report for '{}' received for task '{}'",
                self.task_id, expected_task_id
            )));
        }
        match self.status {
            ReportStatus::Succeeded => Ok(self.result.unwrap_or(serde_json::Value::Null)),
            ReportStatus::Failed => Err(Error::TaskDispatch(
                self.error
                    .unwrap_or_else(|| "host reported failure without detail".to_string()),
            )),
        }
    }
}

/// Sends tasks to the host agent runtime
#[async_trait]
pub trait HostDispatcher: Send + Sync {
    /// Execute one attempt of a task
    async fn dispatch(&self, request: TaskRequest) -> Result<TaskReport>;

    /// Whether reports reflect real work. Hosts that only acknowledge
    /// delivery return `false`, and their reports never reach calibration.
    fn reports_outcomes(&self) -> bool {
        true
    }
}

/// Host for the hook binary: the host runtime runs agents itself after the
/// hook returns, so each task resolves immediately to a delegation directive
/// that is rendered into the injected context.
#[derive(Debug, Clone, Default)]
pub struct DelegatingHost;

#[async_trait]
impl HostDispatcher for DelegatingHost {
    async fn dispatch(&self, request: TaskRequest) -> Result<TaskReport> {
        let instruction = request
            .input_payload
            .get("instruction")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(TaskReport::succeeded(
            request.task_id,
            serde_json::json!({
                "delegate": request.agent_type,
                "instruction": instruction,
            }),
        ))
    }

    // The work happens after the hook returns
    fn reports_outcomes(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_report_yields_result() {
        let report = TaskReport::succeeded("a1-fix", serde_json::json!({"patch": "diff"}));
        let result = report.into_result("a1-fix").unwrap();
        assert_eq!(result["patch"], "diff");
    }

    #[test]
    fn test_mismatched_report_is_dispatch_error() {
        let report = TaskReport::succeeded("a1-other", serde_json::Value::Null);
        let err = report.into_result("a1-fix").unwrap_err();
        assert!(matches!(err, Error::TaskDispatch(_)));
    }

    #[test]
    fn test_failed_report_is_dispatch_error() {
        let err = TaskReport::failed("a1-fix", "agent crashed")
            .into_result("a1-fix")
            .unwrap_err();
        assert_eq!(err.to_string(), "task dispatch error: agent crashed");
    }

    #[test]
    fn test_report_wire_format() {
        let report: TaskReport =
            serde_json::from_str(r#"{"taskId":"a1-fix","status":"failed","error":"x"}"#).unwrap();
        assert_eq!(report.status, ReportStatus::Failed);
        assert!(report.result.is_none());
    }

    #[tokio::test]
    async fn test_delegating_host_echoes_instruction() {
        let report = DelegatingHost
            .dispatch(TaskRequest {
                task_id: "a1-docs".to_string(),
                agent_type: "doc-writer".to_string(),
                input_payload: serde_json::json!({"instruction": "update docs"}),
            })
            .await
            .unwrap();
        let result = report.into_result("a1-docs").unwrap();
        assert_eq!(result["delegate"], "doc-writer");
        assert_eq!(result["instruction"], "update docs");
        assert!(!DelegatingHost.reports_outcomes());
    }
}
