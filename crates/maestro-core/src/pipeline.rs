//! Pipeline Detector - single capability vs. multi-agent pipeline
//!
//! ## Decision rule
//!
//! | Top intent | Result |
//! |------------|--------|
//! | clears threshold, single-capability category | `Single` |
//! | clears threshold, category has a template | `Pipeline` from that template |
//! | clears threshold, no template | `Pipeline` from the fallback |
//! | below threshold (low confidence) | `Pipeline` from the fallback |
//!
//! The fallback is the generic clarify-then-delegate template.

mod templates;

pub use templates::{PlanTemplate, TemplateRegistry, FALLBACK_TEMPLATE};

use crate::error::{Error, Result};
use crate::plan::PipelinePlan;
use maestro_skills::{CategoryRegistry, Intent};
use serde::Serialize;
use tracing::{debug, instrument};

/// Which execution mode a turn takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    /// One capability, no coordinator dispatch
    Single,
    /// Multi-agent pipeline
    Pipeline,
}

/// Routing choice before any plan is built
#[derive(Debug, Clone)]
pub enum Route {
    /// Handle with a single capability
    Single(Intent),
    /// Build a plan from a template
    Pipeline {
        /// Template to instantiate
        template: PlanTemplate,
        /// Intent that selected the template
        intent: Intent,
        /// Whether no intent cleared the threshold
        low_confidence: bool,
    },
}

impl Route {
    /// Mode of this route
    pub fn kind(&self) -> ModeKind {
        match self {
            Route::Single(_) => ModeKind::Single,
            Route::Pipeline { .. } => ModeKind::Pipeline,
        }
    }

    /// Intent that drove the route
    pub fn intent(&self) -> &Intent {
        match self {
            Route::Single(intent) | Route::Pipeline { intent, .. } => intent,
        }
    }
}

/// Execution mode with its plan
#[derive(Debug, Clone)]
pub enum Mode {
    /// Single capability
    Single(Intent),
    /// Validated plan
    Pipeline(PipelinePlan),
}

impl Mode {
    /// Mode kind
    pub fn kind(&self) -> ModeKind {
        match self {
            Mode::Single(_) => ModeKind::Single,
            Mode::Pipeline(_) => ModeKind::Pipeline,
        }
    }
}

/// Detector output
#[derive(Debug, Clone)]
pub struct Decision {
    /// Chosen mode
    pub mode: Mode,
    /// Whether no intent cleared the threshold
    pub low_confidence: bool,
}

/// Chooses between single-capability handling and a pipeline
#[derive(Debug, Clone)]
pub struct PipelineDetector {
    categories: CategoryRegistry,
    templates: TemplateRegistry,
}

impl Default for PipelineDetector {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl PipelineDetector {
    /// Create a detector
    pub fn new(categories: CategoryRegistry, templates: TemplateRegistry) -> Self {
        Self {
            categories,
            templates,
        }
    }

    /// Detector over the built-in categories and templates
    pub fn with_defaults() -> Self {
        Self::new(CategoryRegistry::with_defaults(), TemplateRegistry::with_defaults())
    }

    /// Template registry
    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    /// Pick a route for ranked intents under the calibrated threshold
    #[instrument(skip(self, intents), fields(intents = intents.len()))]
    pub fn route(&self, intents: &[Intent], threshold: f32) -> Route {
        let Some(top) = intents.first() else {
            // Classifiers never return an empty list; treat it as no signal
            return Route::Pipeline {
                template: self.templates.fallback().clone(),
                intent: Intent::general(""),
                low_confidence: true,
            };
        };

        let clears = top.confidence() >= threshold;
        if clears && self.categories.is_single_capability(top.category()) {
            debug!(category = %top.category(), confidence = top.confidence(), "Single capability");
            return Route::Single(top.clone());
        }

        if !clears {
            let low = Error::ClassificationLowConfidence {
                confidence: top.confidence(),
                threshold,
            };
            debug!("{}; using fallback template", low);
        }

        let template = match self.templates.get(top.category()) {
            Some(template) if clears => template.clone(),
            _ => self.templates.fallback().clone(),
        };
        debug!(template = %template.name, category = %top.category(), "Pipeline");

        Route::Pipeline {
            template,
            intent: top.clone(),
            low_confidence: !clears,
        }
    }

    /// Instantiate a template (fails with `PlanCycle` on a cyclic template)
    pub fn build_plan(&self, template: &PlanTemplate) -> Result<PipelinePlan> {
        PipelinePlan::build(template.name.clone(), template.steps.clone())
    }

    /// Route and, for pipelines, build the plan
    pub fn decide(&self, intents: &[Intent], threshold: f32) -> Result<Decision> {
        match self.route(intents, threshold) {
            Route::Single(intent) => Ok(Decision {
                mode: Mode::Single(intent),
                low_confidence: false,
            }),
            Route::Pipeline {
                template,
                low_confidence,
                ..
            } => Ok(Decision {
                mode: Mode::Pipeline(self.build_plan(&template)?),
                low_confidence,
            }),
        }
    }
}

#[cfg(test)]
mod tests;
