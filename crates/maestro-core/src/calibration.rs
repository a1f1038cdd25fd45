//! Calibration Engine - self-tuning confidence thresholds
//!
//! Keeps one [`CalibrationProfile`] per classifier. Reads
//! ([`CalibrationEngine::current_threshold`]) and writes
//! ([`CalibrationEngine::record_outcome`]) are separate calls, so nothing in
//! classification mutates calibration implicitly.
//!
//! ## Update rule
//!
//! For an outcome at predicted confidence `c` against threshold `t`, with
//! step size `η(k) = max(min_step, initial_step / (1 + k / half_life))` where
//! `k` is the number of outcomes already recorded:
//!
//! | Outcome | Condition | Update |
//! |---------|-----------|--------|
//! | failure | `c >= t` | `t += η · (min(1, c + margin) - t)` |
//! | success | `c < t` | `t += η · (c - t)` |
//! | otherwise | | unchanged |
//!
//! A fresh profile adapts quickly; a mature one barely moves. Moves are always
//! toward a fixed target, so repeated identical outcomes converge instead of
//! oscillating.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Calibration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Threshold used before any outcome is recorded
    #[serde(default = "default_threshold")]
    pub default_threshold: f32,
    /// Number of outcomes retained per profile
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Step size of the first adjustment
    #[serde(default = "default_initial_step")]
    pub initial_step: f32,
    /// Lower bound of the step size
    #[serde(default = "default_min_step")]
    pub min_step: f32,
    /// Sample count at which the step size has halved
    #[serde(default = "default_half_life")]
    pub half_life: f32,
    /// Margin above a failed confidence that the threshold moves toward
    #[serde(default = "default_failure_margin")]
    pub failure_margin: f32,
}

fn default_threshold() -> f32 {
    0.6
}

fn default_history_window() -> usize {
    200
}

fn default_initial_step() -> f32 {
    0.3
}

fn default_min_step() -> f32 {
    0.02
}

fn default_half_life() -> f32 {
    20.0
}

fn default_failure_margin() -> f32 {
    0.05
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            default_threshold: default_threshold(),
            history_window: default_history_window(),
            initial_step: default_initial_step(),
            min_step: default_min_step(),
            half_life: default_half_life(),
            failure_margin: default_failure_margin(),
        }
    }
}

/// One observed outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationRecord {
    /// Confidence the classifier predicted
    pub predicted_confidence: f32,
    /// Whether the resulting work succeeded
    pub observed_success: bool,
    /// When the outcome was recorded
    pub timestamp: DateTime<Utc>,
}

/// Threshold model for one classifier
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationProfile {
    classifier_id: String,
    threshold: f32,
    history: VecDeque<CalibrationRecord>,
    sample_count: u64,
}

impl CalibrationProfile {
    fn new(classifier_id: &str, threshold: f32) -> Self {
        Self {
            classifier_id: classifier_id.to_string(),
            threshold,
            history: VecDeque::new(),
            sample_count: 0,
        }
    }

    /// Classifier this profile belongs to
    pub fn classifier_id(&self) -> &str {
        &self.classifier_id
    }

    /// Current threshold in `[0, 1]`
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Retained outcomes, oldest first
    pub fn history(&self) -> &VecDeque<CalibrationRecord> {
        &self.history
    }

    /// Total outcomes ever recorded (including evicted ones)
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Success rate over the retained window
    pub fn success_rate(&self) -> Option<f32> {
        if self.history.is_empty() {
            return None;
        }
        let successes = self.history.iter().filter(|r| r.observed_success).count();
        Some(successes as f32 / self.history.len() as f32)
    }

    fn step_size(&self, config: &CalibrationConfig) -> f32 {
        let k = self.sample_count as f32;
        (config.initial_step / (1.0 + k / config.half_life.max(f32::EPSILON))).max(config.min_step)
    }

    fn apply(&mut self, confidence: f32, succeeded: bool, config: &CalibrationConfig) -> f32 {
        let step = self.step_size(config);
        let t = self.threshold;

        let target = match (succeeded, confidence >= t) {
            (false, true) => Some((confidence + config.failure_margin).min(1.0)),
            (true, false) => Some(confidence),
            _ => None,
        };
        if let Some(target) = target {
            self.threshold = (t + step * (target - t)).clamp(0.0, 1.0);
        }

        self.history.push_back(CalibrationRecord {
            predicted_confidence: confidence,
            observed_success: succeeded,
            timestamp: Utc::now(),
        });
        while self.history.len() > config.history_window.max(1) {
            self.history.pop_front();
        }
        self.sample_count += 1;

        self.threshold
    }
}

/// Snapshot of a profile for reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationStats {
    /// Classifier id
    pub classifier_id: String,
    /// Current threshold
    pub threshold: f32,
    /// Total outcomes recorded
    pub samples: u64,
    /// Success rate over the retained window
    pub success_rate: Option<f32>,
}

/// Per-classifier threshold store.
///
/// Profiles live in a [`DashMap`]; every update holds the entry's shard lock
/// for the whole read-modify-write, so outcomes from concurrently completing
/// tasks are applied one at a time and none are lost.
#[derive(Debug, Default)]
pub struct CalibrationEngine {
    profiles: DashMap<String, CalibrationProfile>,
    config: CalibrationConfig,
}

impl CalibrationEngine {
    /// Create an engine
    pub fn new(mut config: CalibrationConfig) -> Self {
        config.default_threshold = if config.default_threshold.is_finite() {
            config.default_threshold.clamp(0.0, 1.0)
        } else {
            default_threshold()
        };
        Self {
            profiles: DashMap::new(),
            config,
        }
    }

    /// Current threshold for a classifier (configured default on cold start)
    pub fn current_threshold(&self, classifier_id: &str) -> f32 {
        self.profiles
            .get(classifier_id)
            .map(|p| p.threshold)
            .unwrap_or(self.config.default_threshold)
    }

    /// Record an observed outcome and return the updated threshold
    pub fn record_outcome(&self, classifier_id: &str, predicted_confidence: f32, succeeded: bool) -> f32 {
        let confidence = if predicted_confidence.is_finite() {
            predicted_confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };

        let mut profile = self
            .profiles
            .entry(classifier_id.to_string())
            .or_insert_with(|| CalibrationProfile::new(classifier_id, self.config.default_threshold));

        let before = profile.threshold;
        let after = profile.apply(confidence, succeeded, &self.config);

        debug!(
            classifier_id = %classifier_id,
            confidence = confidence,
            succeeded = succeeded,
            before = before,
            after = after,
            samples = profile.sample_count,
            "Calibration outcome recorded"
        );

        after
    }

    /// Clone of a profile, if any outcome was recorded
    pub fn profile(&self, classifier_id: &str) -> Option<CalibrationProfile> {
        self.profiles.get(classifier_id).map(|p| p.clone())
    }

    /// Stats for a classifier (cold-start values when unknown)
    pub fn stats(&self, classifier_id: &str) -> CalibrationStats {
        match self.profiles.get(classifier_id) {
            Some(p) => CalibrationStats {
                classifier_id: classifier_id.to_string(),
                threshold: p.threshold,
                samples: p.sample_count,
                success_rate: p.success_rate(),
            },
            None => CalibrationStats {
                classifier_id: classifier_id.to_string(),
                threshold: self.config.default_threshold,
                samples: 0,
                success_rate: None,
            },
        }
    }

    /// Forget everything learned for a classifier
    pub fn reset(&self, classifier_id: &str) {
        self.profiles.remove(classifier_id);
    }

    /// Engine configuration
    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }
}
