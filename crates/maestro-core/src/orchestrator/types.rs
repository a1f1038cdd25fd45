use crate::coordinator::OrchestrationResult;
use crate::hook::HookOutput;
use crate::pipeline::ModeKind;
use crate::plan::PipelinePlan;
use crate::session::SessionState;
use maestro_skills::{Intent, Resolution};

/// Everything one turn produced
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Decision for the host
    pub output: HookOutput,
    /// Turn number within the session
    pub turn: u64,
    /// Ranked intents
    pub intents: Vec<Intent>,
    /// Threshold the turn was routed with
    pub threshold: f32,
    /// Mode taken
    pub mode: ModeKind,
    /// Whether no intent cleared the threshold
    pub low_confidence: bool,
    /// Capabilities selected (single mode)
    pub resolution: Option<Resolution>,
    /// Plan built (pipeline mode)
    pub plan: Option<PipelinePlan>,
    /// Dispatch outcome (pipeline mode)
    pub result: Option<OrchestrationResult>,
    /// Session state after the turn
    pub final_state: SessionState,
}

impl TurnOutcome {
    /// Top intent
    pub fn top_intent(&self) -> Option<&Intent> {
        self.intents.first()
    }
}
