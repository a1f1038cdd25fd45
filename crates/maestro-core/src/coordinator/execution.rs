use super::types::{FailedTask, OrchestrationResult, TaskOutput};
use super::MultiAgentCoordinator;
use crate::error::{Error, ErrorKind, Result};
use crate::event_bus::OrchestrationEvent;
use crate::host::TaskRequest;
use crate::plan::{PipelinePlan, PlanStep};
use crate::session::{AgentTask, OrchestrationSession, SessionHandle, SessionState, TaskStatus};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{sleep, sleep_until, timeout, Instant};
use tracing::{debug, info, instrument, warn};

/// How a parallel group ended
enum GroupOutcome {
    Settled(Vec<Result<()>>),
    Aborted(ErrorKind),
}

impl MultiAgentCoordinator {
    /// Dispatch every step of `plan` for the session and aggregate the outcome.
    ///
    /// The session must be in `Planning` (or `Classifying`); it ends in
    /// `Complete` or `PartialFailure`. Task failures, timeouts and
    /// cancellation are absorbed into the result; only state-machine
    /// violations are returned as errors.
    ///
    /// Terminal outcomes are reported to calibration at `confidence`. With
    /// `None`, or when the host does not report real outcomes, nothing is
    /// recorded.
    #[instrument(skip(self, session, plan), fields(plan_id = %plan.id(), template = %plan.template()))]
    pub async fn dispatch(
        &self,
        session: &SessionHandle,
        plan: &PipelinePlan,
        confidence: Option<f32>,
    ) -> Result<OrchestrationResult> {
        let confidence = confidence.filter(|_| self.host.reports_outcomes());
        let started = Instant::now();
        let deadline = started + Duration::from_millis(self.config.session_timeout_ms);

        let prompt = {
            let mut s = session.write().await;
            s.transition(SessionState::Dispatching)?;
            for step in plan.steps() {
                s.insert_task(AgentTask::from_step(step))?;
            }
            s.prompt().to_string()
        };

        // FIFO permits shared by every group of this plan
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut abort: Option<ErrorKind> = None;

        for (index, group) in plan.groups().into_iter().enumerate() {
            if index > 0 {
                session.write().await.transition(SessionState::Dispatching)?;
            }

            if abort.is_none() {
                if self.cancel_token.is_cancelled() {
                    abort = Some(ErrorKind::Cancelled);
                } else if Instant::now() >= deadline {
                    abort = Some(ErrorKind::TaskTimeout);
                }
            }
            if let Some(kind) = abort {
                self.skip_steps(session, &group, &format!("turn aborted ({})", kind))
                    .await?;
                continue;
            }

            let (runnable, payloads) = {
                let s = session.read().await;
                let mut runnable = Vec::new();
                let mut payloads = Vec::new();
                let mut blocked = Vec::new();
                for step in group {
                    if dependencies_succeeded(&s, step) {
                        payloads.push(build_payload(&s, plan, step, &prompt));
                        runnable.push(step);
                    } else {
                        blocked.push(step);
                    }
                }
                drop(s);
                self.skip_steps(session, &blocked, "dependency did not succeed")
                    .await?;
                (runnable, payloads)
            };
            if runnable.is_empty() {
                continue;
            }

            debug!(group = index, tasks = runnable.len(), "Dispatching group");
            self.events.publish(OrchestrationEvent::GroupStarted {
                plan_id: plan.id(),
                group: index as u32,
                tasks: runnable.len(),
            });

            let futures = runnable.iter().zip(payloads).map(|(step, payload)| {
                self.run_task(session, step, payload, confidence, semaphore.clone())
            });

            let outcome = tokio::select! {
                results = join_all(futures) => GroupOutcome::Settled(results),
                _ = sleep_until(deadline) => GroupOutcome::Aborted(ErrorKind::TaskTimeout),
                _ = self.cancel_token.cancelled() => GroupOutcome::Aborted(ErrorKind::Cancelled),
            };

            match outcome {
                GroupOutcome::Settled(results) => {
                    for result in results {
                        result?;
                    }
                }
                GroupOutcome::Aborted(kind) => {
                    warn!(
                        group = index,
                        reason = %kind,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Aborting plan dispatch"
                    );
                    self.fail_unfinished(session, &runnable, kind, confidence)
                        .await?;
                    abort = Some(kind);
                }
            }
        }

        self.aggregate(session, plan, abort, started).await
    }

    /// Drive one task through its attempts
    async fn run_task(
        &self,
        session: &SessionHandle,
        step: &PlanStep,
        payload: serde_json::Value,
        confidence: Option<f32>,
        semaphore: Arc<Semaphore>,
    ) -> Result<()> {
        let task_timeout = self.retry.task_timeout();

        loop {
            // Held for one attempt only; backoff sleeps do not occupy a slot
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| Error::TaskDispatch("dispatch queue closed".to_string()))?;
            let attempt = {
                let mut s = session.write().await;
                let task = s.task_mut(&step.task_id)?;
                task.mark_dispatched()?;
                task.attempt()
            };
            debug!(task_id = %step.task_id, agent_type = %step.agent_type, attempt, "Dispatching task");
            self.events.publish(OrchestrationEvent::TaskDispatched {
                task_id: step.task_id.clone(),
                agent_type: step.agent_type.clone(),
                attempt,
            });

            let request = TaskRequest {
                task_id: step.task_id.clone(),
                agent_type: step.agent_type.clone(),
                input_payload: payload.clone(),
            };
            let outcome = match timeout(task_timeout, self.host.dispatch(request)).await {
                Ok(Ok(report)) => report.into_result(&step.task_id),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(Error::TaskTimeout {
                    task_id: step.task_id.clone(),
                    timeout_ms: task_timeout.as_millis() as u64,
                }),
            };
            drop(permit);

            let delay = {
                let mut s = session.write().await;
                let task = s.task_mut(&step.task_id)?;
                match outcome {
                    Ok(result) => {
                        task.mark_succeeded(result)?;
                        self.settle(task, confidence);
                        return Ok(());
                    }
                    Err(e) => {
                        let kind = e.kind().unwrap_or(ErrorKind::Dispatch);
                        let message = e.to_string();
                        task.mark_retrying(kind, message.clone())?;
                        if !self.retry.should_retry(task) {
                            task.mark_failed(kind, message)?;
                            self.settle(task, confidence);
                            return Ok(());
                        }

                        let delay = self.retry.next_attempt_delay(task);
                        warn!(
                            task_id = %step.task_id,
                            attempt,
                            max_attempts = self.retry.policy().max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %message,
                            "Task failed, retrying"
                        );
                        self.events.publish(OrchestrationEvent::TaskRetrying {
                            task_id: step.task_id.clone(),
                            attempt,
                            delay_ms: delay.as_millis() as u64,
                            error: kind,
                        });
                        delay
                    }
                }
            };
            sleep(delay).await;
        }
    }

    /// Publish a terminal task and report it to calibration
    fn settle(&self, task: &AgentTask, confidence: Option<f32>) {
        self.events.publish(OrchestrationEvent::TaskSettled {
            task_id: task.task_id().to_string(),
            status: task.status(),
            attempts: task.attempt(),
        });
        if let Some(confidence) = confidence {
            self.retry.report_terminal(task, confidence);
        }
    }

    async fn skip_steps(
        &self,
        session: &SessionHandle,
        steps: &[&PlanStep],
        reason: &str,
    ) -> Result<()> {
        if steps.is_empty() {
            return Ok(());
        }
        let mut s = session.write().await;
        for step in steps {
            let task = s.task_mut(&step.task_id)?;
            task.mark_skipped(reason)?;
            debug!(task_id = %step.task_id, reason, "Task skipped");
            self.settle(task, None);
        }
        Ok(())
    }

    /// Fail every task of an aborted group that had not settled yet
    async fn fail_unfinished(
        &self,
        session: &SessionHandle,
        steps: &[&PlanStep],
        kind: ErrorKind,
        confidence: Option<f32>,
    ) -> Result<()> {
        let message = match kind {
            ErrorKind::TaskTimeout => format!(
                "session deadline of {}ms reached",
                self.config.session_timeout_ms
            ),
            ErrorKind::Cancelled => "dispatch cancelled".to_string(),
            ErrorKind::Dispatch => "dispatch aborted".to_string(),
        };

        let mut s = session.write().await;
        for step in steps {
            let task = s.task_mut(&step.task_id)?;
            if task.status().is_terminal() {
                continue;
            }
            task.mark_failed(kind, message.clone())?;
            self.settle(task, confidence);
        }
        Ok(())
    }

    async fn aggregate(
        &self,
        session: &SessionHandle,
        plan: &PipelinePlan,
        abort: Option<ErrorKind>,
        started: Instant,
    ) -> Result<OrchestrationResult> {
        let mut s = session.write().await;
        s.transition(SessionState::Aggregating)?;

        let mut succeeded_results = Vec::new();
        let mut failed_tasks = Vec::new();
        let mut skipped_tasks = Vec::new();
        for step in plan.steps() {
            let task = s
                .task(&step.task_id)
                .ok_or_else(|| Error::UnknownTask(step.task_id.clone()))?;
            match task.status() {
                TaskStatus::Succeeded => succeeded_results.push(TaskOutput {
                    task_id: step.task_id.clone(),
                    agent_type: step.agent_type.clone(),
                    result: task.result().cloned().unwrap_or(serde_json::Value::Null),
                    attempts: task.attempt(),
                }),
                TaskStatus::Failed => failed_tasks.push(FailedTask {
                    task_id: step.task_id.clone(),
                    agent_type: step.agent_type.clone(),
                    error: task.error().unwrap_or(ErrorKind::Dispatch),
                    message: task.error_message().unwrap_or_default().to_string(),
                    attempts: task.attempt(),
                }),
                _ => skipped_tasks.push(step.task_id.clone()),
            }
        }

        let final_state = if failed_tasks.is_empty() && skipped_tasks.is_empty() {
            SessionState::Complete
        } else {
            SessionState::PartialFailure
        };
        s.transition(final_state)?;

        let result = OrchestrationResult {
            plan_id: plan.id(),
            succeeded_results,
            failed_tasks,
            skipped_tasks,
            session_timed_out: abort == Some(ErrorKind::TaskTimeout),
            cancelled: abort == Some(ErrorKind::Cancelled),
            final_state,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            succeeded = result.succeeded_results.len(),
            failed = result.failed_tasks.len(),
            skipped = result.skipped_tasks.len(),
            session_timed_out = result.session_timed_out,
            "Plan dispatched"
        );
        Ok(result)
    }
}

fn dependencies_succeeded(session: &OrchestrationSession, step: &PlanStep) -> bool {
    step.depends_on.iter().all(|dep| {
        session
            .task(dep)
            .is_some_and(|t| t.status() == TaskStatus::Succeeded)
    })
}

/// Instruction, prompt and succeeded dependency results keyed by step key
fn build_payload(
    session: &OrchestrationSession,
    plan: &PipelinePlan,
    step: &PlanStep,
    prompt: &str,
) -> serde_json::Value {
    let mut dependencies = serde_json::Map::new();
    for dep in &step.depends_on {
        let key = plan.step(dep).map(|d| d.key.clone());
        let result = session.task(dep).and_then(|t| t.result()).cloned();
        if let (Some(key), Some(result)) = (key, result) {
            dependencies.insert(key, result);
        }
    }
    serde_json::json!({
        "step": step.key,
        "instruction": step.instruction,
        "prompt": prompt,
        "dependencies": dependencies,
    })
}
