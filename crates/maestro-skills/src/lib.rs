//! # Maestro Skills - Intent Classification & Skill Resolution
//!
//! This crate turns a raw user prompt into ranked [`Intent`]s and maps the
//! calibrated winner to capability identifiers from an external skill
//! catalog.
//!
//! ## Core Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`KeywordClassifier`] | Scores prompts against the category registry |
//! | [`CategoryRegistry`] | Categories with keywords, single-capability and complexity tags |
//! | [`SkillCatalog`] | Read-only `category -> capabilities` lookup (external collaborator) |
//! | [`SkillResolver`] | Selects capabilities for intents that clear the calibrated threshold |
//!
//! ## Architecture
//!
//! ```text
//! Prompt text
//!     │
//!     ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │  KeywordClassifier                                          │
//! │  • Tail truncation        • Stop-word filtering            │
//! │  • Keyword strength       • Length / structure heuristics  │
//! └────────────────────────────────────────────────────────────┘
//!     │  Vec<Intent> (never empty, `general` floor)
//!     ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │  SkillResolver  (threshold supplied by calibration)        │
//! └────────────────────────────────────────────────────────────┘
//!     │
//!     ▼
//! Injected context for the host
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use maestro_skills::{
//!     Classifier, ClassificationContext, KeywordClassifier, SkillResolver, StaticCatalog,
//! };
//! use std::sync::Arc;
//!
//! let classifier = KeywordClassifier::default();
//! let intents = classifier.classify("fix typo in readme", &ClassificationContext::default());
//!
//! let resolver = SkillResolver::new(Arc::new(StaticCatalog::with_defaults()));
//! let resolution = resolver.resolve(&intents, 0.6);
//! println!("{:?}", resolution.render_context());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod category;
pub mod classifier;
pub mod error;
pub mod intent;
pub mod resolver;

pub use catalog::{SkillCatalog, StaticCatalog};
pub use category::{CategoryDef, CategoryRegistry, Complexity};
pub use classifier::{
    ClassificationContext, Classifier, ClassifierConfig, KeywordClassifier, KEYWORD_CLASSIFIER_ID,
};
pub use error::{Error, Result};
pub use intent::{Intent, GENERAL_CATEGORY, GENERAL_FLOOR_CONFIDENCE};
pub use resolver::{Resolution, ResolverConfig, SkillResolver};
