//! Orchestration State
//!
//! Per-session state machine, agent task bookkeeping and the session store.
//!
//! ```text
//! Idle ─► Classifying ─┬────────────────────► Dispatching ─► Aggregating ─┬─► Complete ───────┐
//!  ▲                   └─► Planning ─┬──────►     ▲  │                    └─► PartialFailure ─┤
//!  │                                 │            └──┘ (next group)                          │
//!  ├─────────────────────────────────┘ (plan construction failed)                            │
//!  └─────────────────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every transition is checked. Sessions are shared as
//! `Arc<tokio::sync::RwLock<_>>`; callers hold the lock only for short,
//! synchronous updates.

use crate::error::{Error, ErrorKind, Result};
use crate::pipeline::ModeKind;
use crate::plan::{PipelinePlan, PlanStep};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Turn records kept per session
const HISTORY_LIMIT: usize = 50;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Waiting for a prompt
    Idle,
    /// Classifying the prompt
    Classifying,
    /// Building a pipeline plan
    Planning,
    /// Dispatching a parallel group (or handling a single capability)
    Dispatching,
    /// Collecting task outcomes
    Aggregating,
    /// Every task succeeded
    Complete,
    /// At least one task failed or was skipped
    PartialFailure,
}

impl SessionState {
    /// Whether `next` is a legal successor
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Classifying)
                | (Classifying, Dispatching)
                | (Classifying, Planning)
                | (Planning, Dispatching)
                | (Planning, Idle)
                | (Dispatching, Dispatching)
                | (Dispatching, Aggregating)
                | (Aggregating, Complete)
                | (Aggregating, PartialFailure)
                | (Complete, Idle)
                | (PartialFailure, Idle)
        )
    }

    /// Turn finished
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Complete | SessionState::PartialFailure)
    }

    /// A turn is in flight
    pub fn is_busy(self) -> bool {
        !matches!(self, SessionState::Idle) && !self.is_terminal()
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Classifying => "classifying",
            SessionState::Planning => "planning",
            SessionState::Dispatching => "dispatching",
            SessionState::Aggregating => "aggregating",
            SessionState::Complete => "complete",
            SessionState::PartialFailure => "partial_failure",
        };
        f.write_str(s)
    }
}

/// Status of an agent task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not yet sent
    Pending,
    /// Sent to the host
    Dispatched,
    /// Host reported success
    Succeeded,
    /// Gave up
    Failed,
    /// Waiting for the next attempt
    Retrying,
    /// Never dispatched (failed dependency or aborted group)
    Skipped,
}

impl TaskStatus {
    /// Whether `next` is a legal successor
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, Dispatched)
                | (Pending, Skipped)
                | (Pending, Failed)
                | (Dispatched, Succeeded)
                | (Dispatched, Failed)
                | (Dispatched, Retrying)
                | (Retrying, Dispatched)
                | (Retrying, Failed)
        )
    }

    /// No further transitions possible
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Skipped
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Dispatched => "dispatched",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
            TaskStatus::Retrying => "retrying",
            TaskStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// One unit of delegated work
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTask {
    task_id: String,
    agent_type: String,
    status: TaskStatus,
    attempt: u32,
    result: Option<serde_json::Value>,
    error: Option<ErrorKind>,
    error_message: Option<String>,
    parallel_group: u32,
    depends_on: BTreeSet<String>,
}

impl AgentTask {
    /// Pending task for a plan step
    pub fn from_step(step: &PlanStep) -> Self {
        Self {
            task_id: step.task_id.clone(),
            agent_type: step.agent_type.clone(),
            status: TaskStatus::Pending,
            attempt: 0,
            result: None,
            error: None,
            error_message: None,
            parallel_group: step.parallel_group,
            depends_on: step.depends_on.clone(),
        }
    }

    /// Task id
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Agent type
    pub fn agent_type(&self) -> &str {
        &self.agent_type
    }

    /// Current status
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Dispatch attempts so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Host result, once succeeded
    pub fn result(&self) -> Option<&serde_json::Value> {
        self.result.as_ref()
    }

    /// Kind of the latest failure
    pub fn error(&self) -> Option<ErrorKind> {
        self.error
    }

    /// Message of the latest failure
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Parallel group
    pub fn parallel_group(&self) -> u32 {
        self.parallel_group
    }

    /// Task ids this task waits for
    pub fn depends_on(&self) -> &BTreeSet<String> {
        &self.depends_on
    }

    fn transition(&mut self, next: TaskStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: format!("task {} {}", self.task_id, self.status),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Start an attempt
    pub fn mark_dispatched(&mut self) -> Result<()> {
        self.transition(TaskStatus::Dispatched)?;
        self.attempt += 1;
        Ok(())
    }

    /// Record success
    pub fn mark_succeeded(&mut self, result: serde_json::Value) -> Result<()> {
        self.transition(TaskStatus::Succeeded)?;
        self.result = Some(result);
        self.error = None;
        self.error_message = None;
        Ok(())
    }

    /// Record a failed attempt that will be retried
    pub fn mark_retrying(&mut self, kind: ErrorKind, message: impl Into<String>) -> Result<()> {
        self.transition(TaskStatus::Retrying)?;
        self.error = Some(kind);
        self.error_message = Some(message.into());
        Ok(())
    }

    /// Record a final failure
    pub fn mark_failed(&mut self, kind: ErrorKind, message: impl Into<String>) -> Result<()> {
        self.transition(TaskStatus::Failed)?;
        self.error = Some(kind);
        self.error_message = Some(message.into());
        Ok(())
    }

    /// Record that the task never ran
    pub fn mark_skipped(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(TaskStatus::Skipped)?;
        self.error_message = Some(reason.into());
        Ok(())
    }
}

/// A routing decision whose outcome is only known to the host.
///
/// The next turn's `priorTurnMetadata.succeeded` settles it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingFeedback {
    /// Turn that produced it
    pub turn: u64,
    /// Category handled
    pub category: String,
    /// Predicted confidence
    pub confidence: f32,
    /// Mode the turn ran in
    pub mode: ModeKind,
}

/// Finished turn
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRecord {
    /// Turn number (1-based)
    pub turn: u64,
    /// Top intent category
    pub category: String,
    /// Mode taken
    pub mode: ModeKind,
    /// State the turn ended in
    pub final_state: SessionState,
    /// Completion time
    pub at: DateTime<Utc>,
}

/// Summary view of a session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Session id
    pub session_id: String,
    /// Current state
    pub state: SessionState,
    /// Turns started
    pub turn: u64,
    /// Active plan id
    pub plan_id: Option<Uuid>,
    /// Tasks of the active plan
    pub task_count: usize,
    /// Creation time
    pub started_at: DateTime<Utc>,
    /// Last mutation
    pub last_updated_at: DateTime<Utc>,
}

/// State of one host session
#[derive(Debug)]
pub struct OrchestrationSession {
    session_id: String,
    state: SessionState,
    plan: Option<PipelinePlan>,
    tasks: HashMap<String, AgentTask>,
    started_at: DateTime<Utc>,
    last_updated_at: DateTime<Utc>,
    turn: u64,
    prompt: String,
    superseded_plans: Vec<Uuid>,
    pending_feedback: Option<PendingFeedback>,
    history: VecDeque<TurnRecord>,
}

impl OrchestrationSession {
    /// Fresh idle session
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            state: SessionState::Idle,
            plan: None,
            tasks: HashMap::new(),
            started_at: now,
            last_updated_at: now,
            turn: 0,
            prompt: String::new(),
            superseded_plans: Vec::new(),
            pending_feedback: None,
            history: VecDeque::new(),
        }
    }

    /// Session id
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current turn number
    pub fn turn(&self) -> u64 {
        self.turn
    }

    /// Creation time
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Last mutation
    pub fn last_updated_at(&self) -> DateTime<Utc> {
        self.last_updated_at
    }

    fn touch(&mut self) {
        self.last_updated_at = Utc::now();
    }

    /// Checked state transition
    pub fn transition(&mut self, next: SessionState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        debug!(session_id = %self.session_id, from = %self.state, to = %next, "Session transition");
        self.state = next;
        self.touch();
        Ok(())
    }

    /// Start a new turn: settle a finished turn back to idle, then classify.
    ///
    /// Fails with `InvalidTransition` while another turn is in flight.
    pub fn begin_turn(&mut self, prompt: impl Into<String>) -> Result<u64> {
        if self.state.is_terminal() {
            self.transition(SessionState::Idle)?;
        }
        self.transition(SessionState::Classifying)?;
        self.turn += 1;
        self.prompt = prompt.into();
        self.tasks.clear();
        Ok(self.turn)
    }

    /// Walk an interrupted turn to a resting state along legal edges.
    ///
    /// Used when a turn fails outside task handling; returns the state the
    /// session ends in.
    pub fn abandon_turn(&mut self) -> SessionState {
        use SessionState::*;
        let path: &[SessionState] = match self.state {
            Classifying => &[Planning, Idle],
            Planning => &[Idle],
            Dispatching => &[Aggregating, PartialFailure],
            Aggregating => &[PartialFailure],
            Idle | Complete | PartialFailure => &[],
        };
        for next in path {
            if self.transition(*next).is_err() {
                break;
            }
        }
        self.state
    }

    /// Prompt of the current turn (after truncation)
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Active plan
    pub fn plan(&self) -> Option<&PipelinePlan> {
        self.plan.as_ref()
    }

    /// Install a plan, recording the one it replaces
    pub fn install_plan(&mut self, plan: PipelinePlan) {
        if let Some(previous) = self.plan.take() {
            self.superseded_plans.push(previous.id());
        }
        self.plan = Some(plan);
        self.touch();
    }

    /// Plans replaced in this session, oldest first
    pub fn superseded_plans(&self) -> &[Uuid] {
        &self.superseded_plans
    }

    /// Add a task; ids must be unique
    pub fn insert_task(&mut self, task: AgentTask) -> Result<()> {
        if self.tasks.contains_key(task.task_id()) {
            return Err(Error::DuplicateTask(task.task_id().to_string()));
        }
        self.tasks.insert(task.task_id().to_string(), task);
        self.touch();
        Ok(())
    }

    /// Look up a task
    pub fn task(&self, task_id: &str) -> Option<&AgentTask> {
        self.tasks.get(task_id)
    }

    /// Mutable task lookup
    pub fn task_mut(&mut self, task_id: &str) -> Result<&mut AgentTask> {
        self.last_updated_at = Utc::now();
        self.tasks
            .get_mut(task_id)
            .ok_or_else(|| Error::UnknownTask(task_id.to_string()))
    }

    /// Tasks of the current turn
    pub fn tasks(&self) -> impl Iterator<Item = &AgentTask> {
        self.tasks.values()
    }

    /// Remember a decision for next-turn feedback
    pub fn set_pending_feedback(&mut self, decision: PendingFeedback) {
        self.pending_feedback = Some(decision);
    }

    /// Take the decision of the previous turn, if it awaits feedback
    pub fn take_pending_feedback(&mut self) -> Option<PendingFeedback> {
        self.pending_feedback.take()
    }

    /// Record a finished turn
    pub fn record_turn(&mut self, record: TurnRecord) {
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }

    /// Finished turns, oldest first
    pub fn history(&self) -> &VecDeque<TurnRecord> {
        &self.history
    }

    /// Category of the most recent finished turn
    pub fn prior_category(&self) -> Option<&str> {
        self.history.back().map(|r| r.category.as_str())
    }

    /// Summary view
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            state: self.state,
            turn: self.turn,
            plan_id: self.plan.as_ref().map(PipelinePlan::id),
            task_count: self.tasks.len(),
            started_at: self.started_at,
            last_updated_at: self.last_updated_at,
        }
    }
}

/// Shared handle to a session
pub type SessionHandle = Arc<RwLock<OrchestrationSession>>;

/// Session id -> session state
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing session or a fresh idle one
    pub async fn get_or_create(&self, session_id: &str) -> SessionHandle {
        if let Some(handle) = self.sessions.read().await.get(session_id) {
            return handle.clone();
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!(session_id = %session_id, "Session created");
                Arc::new(RwLock::new(OrchestrationSession::new(session_id)))
            })
            .clone()
    }

    /// Existing session
    pub async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Destroy a session's state; returns whether it existed
    pub async fn end(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            debug!(session_id = %session_id, "Session ended");
        }
        removed
    }

    /// Summaries of all sessions
    pub async fn summaries(&self) -> Vec<SessionSummary> {
        let handles: Vec<SessionHandle> = self.sessions.read().await.values().cloned().collect();
        let mut out = Vec::with_capacity(handles.len());
        for handle in handles {
            out.push(handle.read().await.summary());
        }
        out
    }

    /// Drop idle sessions untouched for longer than `ttl`; returns how many
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        self.evict_idle_before(Utc::now() - ttl).await
    }

    /// Drop idle sessions whose last update is older than `cutoff`.
    ///
    /// Sessions with a turn in flight, or whose handle is held elsewhere,
    /// are kept.
    pub async fn evict_idle_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|session_id, handle| {
            if Arc::strong_count(handle) > 1 {
                return true;
            }
            let keep = match handle.try_read() {
                Ok(s) => s.state().is_busy() || s.last_updated_at() >= cutoff,
                Err(_) => true,
            };
            if !keep {
                debug!(session_id = %session_id, "Idle session evicted");
            }
            keep
        });
        before - sessions.len()
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the store holds no sessions
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests;
