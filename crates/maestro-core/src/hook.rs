//! Hook protocol
//!
//! One JSON event in, one JSON decision out. Field names are camelCase on the
//! wire; snake_case aliases are accepted on input.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Prompt-submitted event from the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookInput {
    /// User instruction
    #[serde(alias = "prompt", alias = "prompt_text")]
    pub prompt_text: String,
    /// Host session id
    #[serde(alias = "session_id")]
    pub session_id: String,
    /// Free-form metadata about the previous turn
    #[serde(
        default,
        alias = "prior_turn_metadata",
        skip_serializing_if = "Option::is_none"
    )]
    pub prior_turn_metadata: Option<serde_json::Value>,
}

/// Typed view of `priorTurnMetadata`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorTurn {
    /// Category the previous turn was handled as
    #[serde(default)]
    pub category: Option<String>,
    /// Confidence the previous turn was handled with
    #[serde(default)]
    pub confidence: Option<f32>,
    /// Whether the previous turn's work succeeded
    #[serde(default)]
    pub succeeded: Option<bool>,
}

impl HookInput {
    /// Create an input event
    pub fn new(prompt_text: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            prompt_text: prompt_text.into(),
            session_id: session_id.into(),
            prior_turn_metadata: None,
        }
    }

    /// Attach prior-turn metadata
    #[must_use]
    pub fn with_prior_turn(mut self, metadata: serde_json::Value) -> Self {
        self.prior_turn_metadata = Some(metadata);
        self
    }

    /// Parse and validate a raw event
    pub fn from_json(raw: &str) -> Result<Self> {
        let input: HookInput =
            serde_json::from_str(raw).map_err(|e| Error::InvalidPayload(e.to_string()))?;
        input.validate()?;
        Ok(input)
    }

    /// Reject events without a usable session id
    pub fn validate(&self) -> Result<()> {
        if self.session_id.trim().is_empty() {
            return Err(Error::InvalidPayload("sessionId is empty".to_string()));
        }
        Ok(())
    }

    /// Typed prior-turn metadata; malformed metadata is discarded
    pub fn prior_turn(&self) -> Option<PriorTurn> {
        let raw = self.prior_turn_metadata.as_ref()?;
        if raw.is_null() {
            return None;
        }
        match serde_json::from_value::<PriorTurn>(raw.clone()) {
            Ok(prior) => Some(prior),
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Discarding malformed priorTurnMetadata");
                None
            }
        }
    }
}

/// Decision returned to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    /// Whether the host should proceed with the turn
    #[serde(rename = "continue")]
    pub continue_turn: bool,
    /// Context appended to the prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injected_context: Option<String>,
    /// Message shown to the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
}

impl HookOutput {
    /// Proceed with no changes
    pub fn proceed() -> Self {
        Self {
            continue_turn: true,
            injected_context: None,
            system_message: None,
        }
    }

    /// Stop the turn with a message
    pub fn halt(message: impl Into<String>) -> Self {
        Self {
            continue_turn: false,
            injected_context: None,
            system_message: Some(message.into()),
        }
    }

    /// Set the injected context
    #[must_use]
    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.injected_context = context;
        self
    }

    /// Set the system message
    #[must_use]
    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }
}
