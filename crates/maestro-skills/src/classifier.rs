//! Intent classifier for incoming prompts.
//!
//! The [`KeywordClassifier`] scores every registered category against the
//! prompt and returns the candidates ranked by confidence.
//!
//! # Scoring
//!
//! | Factor | Default | Description |
//! |--------|---------|-------------|
//! | Keyword strength | 0.75 | `1 - (1 - gain)^m` for `m` distinct keyword matches |
//! | Keyword density | 0.25 | `m / n` over the `n` content words of the prompt |
//! | Length | ±0.10 | Long prompts favour complex categories |
//! | Structure | ±0.05 | Multi-line or list-shaped prompts favour complex categories |
//! | Continuity | +0.05 | Same category as the previous turn |
//!
//! The catch-all `general` intent is always appended at a fixed floor
//! confidence, so the result is never empty.
//!
//! # Security
//!
//! - **Input length limit**: oversized prompts are cut from the tail before
//!   scoring instead of being rejected

use crate::category::{CategoryDef, CategoryRegistry, Complexity};
use crate::intent::Intent;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::{debug, instrument};

/// Pre-compiled word tokenizer
static WORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9_]+").expect("WORD_REGEX is a compile-time constant"));

/// Identifier of the built-in keyword classifier
pub const KEYWORD_CLASSIFIER_ID: &str = "keyword-v1";

/// Per-turn context features available to a classifier
#[derive(Debug, Clone, Default)]
pub struct ClassificationContext {
    /// Category chosen for the previous turn of the session
    pub prior_category: Option<String>,
}

impl ClassificationContext {
    /// Context carrying the previous turn's category
    pub fn with_prior_category(category: impl Into<String>) -> Self {
        Self {
            prior_category: Some(category.into()),
        }
    }
}

/// Maps prompt text to ranked intents
pub trait Classifier: Send + Sync {
    /// Stable identifier, used as the calibration profile key
    fn id(&self) -> &str;

    /// Classify a prompt. The result is sorted by descending confidence and
    /// is never empty.
    fn classify(&self, prompt_text: &str, context: &ClassificationContext) -> Vec<Intent>;
}

/// Configuration for the keyword classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Maximum prompt length in characters; longer input is truncated
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    /// Probability-style gain of each additional keyword match
    #[serde(default = "default_match_gain")]
    pub match_gain: f32,
    /// Weight of keyword strength
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,
    /// Weight of keyword density
    #[serde(default = "default_density_weight")]
    pub density_weight: f32,
    /// Content-word count at which a prompt counts as fully "long"
    #[serde(default = "default_long_prompt_tokens")]
    pub long_prompt_tokens: usize,
    /// Weight of the length heuristic
    #[serde(default = "default_length_weight")]
    pub length_weight: f32,
    /// Weight of the structure heuristic
    #[serde(default = "default_structure_weight")]
    pub structure_weight: f32,
    /// Bonus when the category matches the previous turn
    #[serde(default = "default_continuity_bonus")]
    pub continuity_bonus: f32,
}

fn default_max_input_chars() -> usize {
    10_000
}

fn default_match_gain() -> f32 {
    0.6
}

fn default_keyword_weight() -> f32 {
    0.75
}

fn default_density_weight() -> f32 {
    0.25
}

fn default_long_prompt_tokens() -> usize {
    30
}

fn default_length_weight() -> f32 {
    0.1
}

fn default_structure_weight() -> f32 {
    0.05
}

fn default_continuity_bonus() -> f32 {
    0.05
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_input_chars: default_max_input_chars(),
            match_gain: default_match_gain(),
            keyword_weight: default_keyword_weight(),
            density_weight: default_density_weight(),
            long_prompt_tokens: default_long_prompt_tokens(),
            length_weight: default_length_weight(),
            structure_weight: default_structure_weight(),
            continuity_bonus: default_continuity_bonus(),
        }
    }
}

/// Deterministic keyword/heuristic classifier
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    categories: CategoryRegistry,
    config: ClassifierConfig,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(CategoryRegistry::with_defaults())
    }
}

impl KeywordClassifier {
    /// Create a classifier over a category registry
    pub fn new(categories: CategoryRegistry) -> Self {
        Self {
            categories,
            config: ClassifierConfig::default(),
        }
    }

    /// Create a classifier with custom configuration
    pub fn with_config(categories: CategoryRegistry, config: ClassifierConfig) -> Self {
        Self { categories, config }
    }

    /// Category registry used for scoring
    pub fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }

    /// Score one category. Returns `None` when no keyword matches.
    fn score_category(
        &self,
        category: &CategoryDef,
        words: &[String],
        shape: &PromptShape,
        context: &ClassificationContext,
    ) -> Option<(f32, BTreeSet<String>)> {
        let matched: BTreeSet<String> = category
            .keywords
            .iter()
            .filter(|kw| words.iter().any(|w| w == *kw))
            .cloned()
            .collect();

        if matched.is_empty() {
            return None;
        }

        let m = matched.len() as i32;
        let strength = 1.0 - (1.0 - self.config.match_gain).powi(m);
        let density = (matched.len() as f32 / words.len() as f32).min(1.0);

        let mut score = self.config.keyword_weight * strength + self.config.density_weight * density;

        let length = (words.len() as f32 / self.config.long_prompt_tokens.max(1) as f32).min(1.0);
        let structure = if shape.structured { 1.0 } else { 0.0 };
        let shape_term = self.config.length_weight * length + self.config.structure_weight * structure;
        match category.complexity {
            Complexity::Complex => score += shape_term,
            Complexity::Simple => score -= shape_term,
        }

        if context.prior_category.as_deref() == Some(category.name.as_str()) {
            score += self.config.continuity_bonus;
        }

        Some((score.clamp(0.0, 1.0), matched))
    }
}

impl Classifier for KeywordClassifier {
    fn id(&self) -> &str {
        KEYWORD_CLASSIFIER_ID
    }

    #[instrument(skip(self, prompt_text, context), fields(input_len = prompt_text.len()))]
    fn classify(&self, prompt_text: &str, context: &ClassificationContext) -> Vec<Intent> {
        let text = truncate_tail(prompt_text, self.config.max_input_chars);
        if text.len() < prompt_text.len() {
            debug!(
                "Input too long ({} > {} chars), truncated",
                prompt_text.chars().count(),
                self.config.max_input_chars
            );
        }

        let words = content_words(text);
        let shape = PromptShape::of(text);

        let mut intents: Vec<Intent> = Vec::new();
        if !words.is_empty() {
            for category in self.categories.iter() {
                if let Some((score, matched)) = self.score_category(category, &words, &shape, context)
                {
                    if let Ok(intent) = Intent::new(category.name.clone(), score, matched, text) {
                        intents.push(intent);
                    }
                }
            }
        }
        intents.push(Intent::general(text));

        // Stable sort keeps registration order on ties
        intents.sort_by(|a, b| {
            b.confidence()
                .partial_cmp(&a.confidence())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            "Classified input into {} intents (top: {} {:.2})",
            intents.len(),
            intents[0].category(),
            intents[0].confidence()
        );

        intents
    }
}

/// Layout features of a prompt
struct PromptShape {
    structured: bool,
}

impl PromptShape {
    fn of(text: &str) -> Self {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let has_list = lines.iter().any(|l| {
            l.starts_with("- ")
                || l.starts_with("* ")
                || l.split_once(". ")
                    .map(|(n, _)| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
                    .unwrap_or(false)
        });
        Self {
            structured: lines.len() >= 2 || has_list,
        }
    }
}

/// Keep at most `max_chars` characters, dropping the tail
pub fn truncate_tail(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Lowercase words with stop words removed
pub fn content_words(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    WORD_REGEX
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|w| !is_stop_word(w))
        .map(str::to_string)
        .collect()
}

/// Check if a word is a stop word
fn is_stop_word(word: &str) -> bool {
    const STOP_WORDS: &[&str] = &[
        "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
        "from", "is", "are", "was", "were", "be", "been", "it", "its", "this", "that", "these",
        "those", "i", "me", "my", "we", "our", "you", "your", "please", "can", "could", "would",
        "should", "will", "just", "some", "into", "about", "as", "so", "do", "does", "then",
        "also", "up", "all", "there", "here",
    ];

    STOP_WORDS.contains(&word)
}
