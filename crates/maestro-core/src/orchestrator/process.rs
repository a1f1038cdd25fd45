use super::core::Orchestrator;
use super::types::TurnOutcome;
use crate::coordinator::OrchestrationResult;
use crate::error::{format_error_for_hook, Error, Result, UserFriendlyError};
use crate::event_bus::OrchestrationEvent;
use crate::hook::{HookInput, HookOutput};
use crate::pipeline::{ModeKind, Route};
use crate::plan::PipelinePlan;
use crate::session::{PendingFeedback, SessionHandle, SessionState, TurnRecord};
use chrono::Utc;
use maestro_skills::classifier::truncate_tail;
use maestro_skills::{ClassificationContext, Intent, Resolution};
use tracing::{debug, info, instrument, warn};

impl Orchestrator {
    /// Handle a raw hook event. Never fails: problems become a
    /// `systemMessage` and the host proceeds.
    pub async fn handle_raw(&self, raw: &str) -> HookOutput {
        match HookInput::from_json(raw) {
            Ok(input) => self.handle_turn(input).await,
            Err(e) => {
                warn!(error = %e, "Rejected hook event");
                HookOutput::proceed().with_system_message(format_error_for_hook(&e))
            }
        }
    }

    /// Handle a parsed hook event and return the host decision
    pub async fn handle_turn(&self, input: HookInput) -> HookOutput {
        match self.process(input).await {
            Ok(outcome) => outcome.output,
            Err(e) => {
                warn!(error = %e, "Turn failed");
                HookOutput::proceed().with_system_message(format_error_for_hook(&e))
            }
        }
    }

    /// Run one turn: feedback, classification, routing, dispatch
    #[instrument(skip(self, input), fields(session_id = %input.session_id))]
    pub async fn process(&self, input: HookInput) -> Result<TurnOutcome> {
        input.validate()?;
        if let Some(ttl) = self.config.sessions.idle_ttl() {
            let evicted = self.sessions.evict_idle(ttl).await;
            if evicted > 0 {
                debug!(evicted, "Evicted idle sessions");
            }
        }
        let session = self.sessions.get_or_create(&input.session_id).await;
        let prior = input.prior_turn();
        let prompt =
            truncate_tail(&input.prompt_text, self.config.classifier.max_input_chars).to_string();

        let (turn, context) = {
            let mut s = session.write().await;
            let turn = s.begin_turn(prompt.as_str())?;
            // Metadata describes the previous turn only; unanswered decisions expire
            let pending = s.take_pending_feedback();
            if let Some(succeeded) = prior.as_ref().and_then(|p| p.succeeded) {
                self.apply_prior_feedback(pending, succeeded);
            }
            let prior_category = prior
                .as_ref()
                .and_then(|p| p.category.clone())
                .or_else(|| s.prior_category().map(str::to_string));
            let context = match prior_category {
                Some(category) => ClassificationContext::with_prior_category(category),
                None => ClassificationContext::default(),
            };
            (turn, context)
        };
        self.events.publish(OrchestrationEvent::TurnStarted {
            session_id: input.session_id.clone(),
            turn,
        });

        let intents = self.classifier.classify(&prompt, &context);
        let threshold = self.current_threshold();
        let top = intents
            .first()
            .cloned()
            .unwrap_or_else(|| Intent::general(prompt.as_str()));
        debug!(
            category = %top.category(),
            confidence = top.confidence(),
            threshold,
            "Classified prompt"
        );
        self.events.publish(OrchestrationEvent::Classified {
            session_id: input.session_id.clone(),
            category: top.category().to_string(),
            confidence: top.confidence(),
            threshold,
        });

        let route = self.detector.route(&intents, threshold);
        let low_confidence = matches!(route, Route::Pipeline { low_confidence: true, .. });
        self.events.publish(OrchestrationEvent::ModeSelected {
            session_id: input.session_id.clone(),
            mode: route.kind(),
            low_confidence,
        });

        let outcome = match route {
            Route::Single(intent) => {
                let (output, resolution) = self
                    .run_single(&session, &intents, &intent, threshold, turn)
                    .await?;
                TurnOutcome {
                    output,
                    turn,
                    intents,
                    threshold,
                    mode: ModeKind::Single,
                    low_confidence: false,
                    resolution: Some(resolution),
                    plan: None,
                    result: None,
                    final_state: SessionState::Complete,
                }
            }
            Route::Pipeline {
                template,
                intent,
                low_confidence,
            } => {
                {
                    let mut s = session.write().await;
                    s.transition(SessionState::Planning)?;
                }
                let plan = match self.detector.build_plan(&template) {
                    Ok(plan) => plan,
                    Err(e) => return self.abort_planning(&session, e, turn, intents, threshold).await,
                };
                let (output, result) = self
                    .run_pipeline(&session, &plan, &intent, low_confidence, threshold, turn)
                    .await?;
                let final_state = result.final_state;
                TurnOutcome {
                    output,
                    turn,
                    intents,
                    threshold,
                    mode: ModeKind::Pipeline,
                    low_confidence,
                    resolution: None,
                    plan: Some(plan),
                    result: Some(result),
                    final_state,
                }
            }
        };

        self.finish_turn(&session, &outcome, top.category()).await;
        Ok(outcome)
    }

    /// Close the loop for a previous turn whose outcome only the host saw
    fn apply_prior_feedback(&self, pending: Option<PendingFeedback>, succeeded: bool) {
        let Some(decision) = pending else {
            return;
        };
        let threshold =
            self.calibration
                .record_outcome(self.classifier.id(), decision.confidence, succeeded);
        debug!(
            category = %decision.category,
            turn = decision.turn,
            succeeded,
            threshold,
            mode = ?decision.mode,
            "Recorded prior-turn feedback"
        );
        self.events.publish(OrchestrationEvent::ThresholdAdjusted {
            classifier_id: self.classifier.id().to_string(),
            threshold,
        });
    }

    async fn run_single(
        &self,
        session: &SessionHandle,
        intents: &[Intent],
        intent: &Intent,
        threshold: f32,
        turn: u64,
    ) -> Result<(HookOutput, Resolution)> {
        let mut s = session.write().await;
        s.transition(SessionState::Dispatching)?;
        let resolution = self.resolver.resolve(intents, threshold);
        s.transition(SessionState::Aggregating)?;
        s.transition(SessionState::Complete)?;
        s.set_pending_feedback(PendingFeedback {
            turn,
            category: intent.category().to_string(),
            confidence: intent.confidence(),
            mode: ModeKind::Single,
        });

        info!(
            category = %intent.category(),
            capabilities = resolution.capabilities.len(),
            "Single capability turn"
        );
        let output = HookOutput::proceed().with_context(resolution.render_context());
        Ok((output, resolution))
    }

    async fn run_pipeline(
        &self,
        session: &SessionHandle,
        plan: &PipelinePlan,
        intent: &Intent,
        low_confidence: bool,
        threshold: f32,
        turn: u64,
    ) -> Result<(HookOutput, OrchestrationResult)> {
        // Fallback plans act on no prediction, so they teach calibration nothing
        let predicted = !low_confidence && !intent.is_general();
        let host_reports = self.coordinator.host().reports_outcomes();
        let confidence = predicted.then(|| intent.confidence());

        {
            let mut s = session.write().await;
            s.install_plan(plan.clone());
            self.events.publish(OrchestrationEvent::PlanBuilt {
                session_id: s.session_id().to_string(),
                plan_id: plan.id(),
                template: plan.template().to_string(),
                groups: plan.group_count(),
            });
        }
        info!(template = %plan.template(), outline = %plan.outline(), "Dispatching pipeline");

        let result = match self
            .coordinator
            .dispatch(session, plan, confidence)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                let state = session.write().await.abandon_turn();
                warn!(error = %e, state = %state, "Pipeline dispatch aborted");
                return Err(e);
            }
        };

        if predicted && !host_reports {
            session.write().await.set_pending_feedback(PendingFeedback {
                turn,
                category: intent.category().to_string(),
                confidence: intent.confidence(),
                mode: ModeKind::Pipeline,
            });
        }

        let header = format!(
            "Multi-agent plan `{}` for intent `{}`: {}",
            plan.template(),
            intent.category(),
            plan.outline()
        );
        let context = match result.render_context() {
            Some(body) => format!("{}\n{}", header, body),
            None => header,
        };

        let mut messages = Vec::new();
        if low_confidence {
            let low = Error::ClassificationLowConfidence {
                confidence: intent.confidence(),
                threshold,
            };
            messages.push(low.user_message());
        }
        if result.session_timed_out {
            let timeout = Error::SessionTimeout {
                elapsed_ms: result.elapsed_ms,
            };
            messages.push(format_error_for_hook(&timeout));
        }
        if result.is_partial_failure() {
            messages.push(format!("Partial result: {}.", result.summary()));
        }

        let mut output = HookOutput::proceed().with_context(Some(context));
        if !messages.is_empty() {
            output = output.with_system_message(messages.join(" "));
        }
        Ok((output, result))
    }

    /// Plan construction failed: return to idle and stop the host turn
    async fn abort_planning(
        &self,
        session: &SessionHandle,
        error: Error,
        turn: u64,
        intents: Vec<Intent>,
        threshold: f32,
    ) -> Result<TurnOutcome> {
        let mut s = session.write().await;
        s.transition(SessionState::Idle)?;
        warn!(error = %error, "Plan construction failed");

        if !error.is_fatal() {
            return Err(error);
        }
        let category = intents
            .first()
            .map(|i| i.category().to_string())
            .unwrap_or_default();
        s.record_turn(TurnRecord {
            turn,
            category,
            mode: ModeKind::Pipeline,
            final_state: SessionState::Idle,
            at: Utc::now(),
        });
        self.events.publish(OrchestrationEvent::TurnCompleted {
            session_id: s.session_id().to_string(),
            turn,
            final_state: SessionState::Idle,
        });

        Ok(TurnOutcome {
            output: HookOutput::halt(format_error_for_hook(&error)),
            turn,
            intents,
            threshold,
            mode: ModeKind::Pipeline,
            low_confidence: false,
            resolution: None,
            plan: None,
            result: None,
            final_state: SessionState::Idle,
        })
    }

    async fn finish_turn(&self, session: &SessionHandle, outcome: &TurnOutcome, category: &str) {
        let mut s = session.write().await;
        s.record_turn(TurnRecord {
            turn: outcome.turn,
            category: category.to_string(),
            mode: outcome.mode,
            final_state: outcome.final_state,
            at: Utc::now(),
        });
        self.events.publish(OrchestrationEvent::TurnCompleted {
            session_id: s.session_id().to_string(),
            turn: outcome.turn,
            final_state: outcome.final_state,
        });
        info!(
            turn = outcome.turn,
            mode = ?outcome.mode,
            final_state = %outcome.final_state,
            "Turn completed"
        );
    }
}
