use crate::plan::StepSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name of the template used when no category template applies
pub const FALLBACK_TEMPLATE: &str = "clarify_then_delegate";

/// Category -> plan template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTemplate {
    /// Template name
    pub name: String,
    /// Step specs; dependencies refer to step keys
    pub steps: Vec<StepSpec>,
}

impl PlanTemplate {
    /// Create a template
    pub fn new(name: impl Into<String>, steps: Vec<StepSpec>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }
}

/// Fixed registry of multi-step templates keyed by intent category
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    by_category: HashMap<String, PlanTemplate>,
    fallback: PlanTemplate,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl TemplateRegistry {
    /// Registry with only the fallback template
    pub fn empty() -> Self {
        Self {
            by_category: HashMap::new(),
            fallback: fallback_template(),
        }
    }

    /// Registry with the built-in templates
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(
            "implement_feature",
            PlanTemplate::new(
                "implement_feature",
                vec![
                    StepSpec::new(
                        "implement",
                        "implementer",
                        "Implement the requested feature in the codebase.",
                    ),
                    StepSpec::new(
                        "tests",
                        "test-writer",
                        "Write tests that cover the requested feature.",
                    ),
                    StepSpec::new(
                        "docs",
                        "doc-writer",
                        "Update user-facing documentation for the requested feature.",
                    ),
                ],
            ),
        );
        registry.register(
            "refactor",
            PlanTemplate::new(
                "refactor",
                vec![
                    StepSpec::new(
                        "analyze",
                        "code-analyst",
                        "Map the code affected by the refactor and its callers.",
                    ),
                    StepSpec::new("rewrite", "implementer", "Apply the refactor.").after("analyze"),
                    StepSpec::new(
                        "update_tests",
                        "test-writer",
                        "Adjust tests to the refactored structure.",
                    )
                    .after("analyze"),
                    StepSpec::new("verify", "verifier", "Run the test suite and report regressions.")
                        .after("rewrite")
                        .after("update_tests"),
                ],
            ),
        );
        registry.register(
            "debug",
            PlanTemplate::new(
                "debug",
                vec![
                    StepSpec::new("reproduce", "debugger", "Reproduce the reported failure."),
                    StepSpec::new("diagnose", "debugger", "Find the root cause.").after("reproduce"),
                    StepSpec::new("fix", "implementer", "Fix the root cause.").after("diagnose"),
                    StepSpec::new("verify", "verifier", "Confirm the failure no longer reproduces.")
                        .after("fix"),
                ],
            ),
        );
        registry.register(
            "review",
            PlanTemplate::new(
                "review",
                vec![
                    StepSpec::new("security", "security-reviewer", "Review for security issues."),
                    StepSpec::new("correctness", "code-reviewer", "Review for logic errors."),
                    StepSpec::new("style", "style-reviewer", "Review for style and readability."),
                    StepSpec::new("summarize", "writer", "Merge the review findings.")
                        .after("security")
                        .after("correctness")
                        .after("style"),
                ],
            ),
        );
        registry
    }

    /// Register (or replace) the template for a category
    pub fn register(&mut self, category: impl Into<String>, template: PlanTemplate) {
        self.by_category.insert(category.into(), template);
    }

    /// Template for a category
    pub fn get(&self, category: &str) -> Option<&PlanTemplate> {
        self.by_category.get(category)
    }

    /// Clarify-then-delegate template
    pub fn fallback(&self) -> &PlanTemplate {
        &self.fallback
    }
}

fn fallback_template() -> PlanTemplate {
    PlanTemplate::new(
        FALLBACK_TEMPLATE,
        vec![
            StepSpec::new(
                "clarify",
                "clarifier",
                "Restate the request and list the open questions before acting.",
            ),
            StepSpec::new(
                "delegate",
                "generalist",
                "Carry out the clarified request.",
            )
            .after("clarify"),
        ],
    )
}
