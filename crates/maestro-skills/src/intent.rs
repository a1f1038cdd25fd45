//! Classified intents.
//!
//! An [`Intent`] is the unit the classifier hands to the rest of the
//! pipeline. It can only be built through [`Intent::new`] (or the
//! [`Intent::general`] floor), and deserialization runs the same checks, so
//! every intent that reaches the orchestrator carries a non-empty category
//! and a confidence inside `[0, 1]`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Category of the catch-all intent that is always present
pub const GENERAL_CATEGORY: &str = "general";

/// Confidence assigned to the catch-all intent
pub const GENERAL_FLOOR_CONFIDENCE: f32 = 0.1;

/// A classified category and confidence for one user instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawIntent", rename_all = "camelCase")]
pub struct Intent {
    category: String,
    confidence: f32,
    keywords: BTreeSet<String>,
    raw_text: String,
}

/// Unvalidated wire shape of an [`Intent`]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIntent {
    category: String,
    confidence: f32,
    #[serde(default)]
    keywords: BTreeSet<String>,
    #[serde(default)]
    raw_text: String,
}

impl TryFrom<RawIntent> for Intent {
    type Error = Error;

    fn try_from(raw: RawIntent) -> Result<Self> {
        Intent::new(raw.category, raw.confidence, raw.keywords, raw.raw_text)
    }
}

impl Intent {
    /// Create a validated intent
    pub fn new(
        category: impl Into<String>,
        confidence: f32,
        keywords: BTreeSet<String>,
        raw_text: impl Into<String>,
    ) -> Result<Self> {
        let category = category.into();
        if category.trim().is_empty() {
            return Err(Error::InvalidIntent("category must not be empty".to_string()));
        }
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(Error::InvalidIntent(format!(
                "confidence {} for '{}' is outside [0, 1]",
                confidence, category
            )));
        }

        Ok(Self {
            category,
            confidence,
            keywords,
            raw_text: raw_text.into(),
        })
    }

    /// The catch-all intent with the fixed floor confidence
    pub fn general(raw_text: impl Into<String>) -> Self {
        Self {
            category: GENERAL_CATEGORY.to_string(),
            confidence: GENERAL_FLOOR_CONFIDENCE,
            keywords: BTreeSet::new(),
            raw_text: raw_text.into(),
        }
    }

    /// Intent category
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Confidence in `[0, 1]`
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Keywords that produced the match
    pub fn keywords(&self) -> &BTreeSet<String> {
        &self.keywords
    }

    /// The (possibly truncated) prompt text that was classified
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Whether this is the catch-all intent
    pub fn is_general(&self) -> bool {
        self.category == GENERAL_CATEGORY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_out_of_range_confidence() {
        assert!(Intent::new("search", 1.2, BTreeSet::new(), "").is_err());
        assert!(Intent::new("search", -0.1, BTreeSet::new(), "").is_err());
        assert!(Intent::new("search", f32::NAN, BTreeSet::new(), "").is_err());
    }

    #[test]
    fn test_rejects_empty_category() {
        let err = Intent::new("  ", 0.5, BTreeSet::new(), "text").unwrap_err();
        assert!(err.to_string().contains("category"));
    }

    #[test]
    fn test_general_floor() {
        let intent = Intent::general("");
        assert!(intent.is_general());
        assert_eq!(intent.confidence(), GENERAL_FLOOR_CONFIDENCE);
        assert!(intent.keywords().is_empty());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Intent =
            serde_json::from_str(r#"{"category":"debug","confidence":0.7,"rawText":"x"}"#).unwrap();
        assert_eq!(ok.category(), "debug");
        assert_eq!(ok.raw_text(), "x");

        let bad = serde_json::from_str::<Intent>(r#"{"category":"debug","confidence":3.0}"#);
        assert!(bad.is_err());
    }
}
