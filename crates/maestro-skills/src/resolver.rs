//! Skill resolver for calibrated intents.
//!
//! Maps the ranked intents of a prompt to the capability identifiers that
//! should be injected as context for the host.
//!
//! # Selection
//!
//! 1. Drop intents below the calibrated threshold
//! 2. Keep the top intent and any runner-up within `secondary_margin` of it
//! 3. Look each category up in the [`SkillCatalog`]
//! 4. De-duplicate in rank order and cap at `max_capabilities`
//!
//! The catch-all `general` intent never resolves to capabilities.

use crate::catalog::SkillCatalog;
use crate::intent::Intent;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Configuration for the skill resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Maximum capabilities injected per turn
    #[serde(default = "default_max_capabilities")]
    pub max_capabilities: usize,
    /// Runner-up intents within this distance of the top one also contribute
    #[serde(default = "default_secondary_margin")]
    pub secondary_margin: f32,
}

fn default_max_capabilities() -> usize {
    5
}

fn default_secondary_margin() -> f32 {
    0.15
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_capabilities: default_max_capabilities(),
            secondary_margin: default_secondary_margin(),
        }
    }
}

/// Capabilities resolved for one turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    /// Category that drove the resolution, if any intent cleared the threshold
    pub category: Option<String>,
    /// Capability identifiers in rank order
    pub capabilities: Vec<String>,
}

impl Resolution {
    /// Resolution with nothing to inject
    pub fn empty() -> Self {
        Self {
            category: None,
            capabilities: Vec::new(),
        }
    }

    /// Whether any capability was resolved
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Render as context text for the host, or `None` when empty
    pub fn render_context(&self) -> Option<String> {
        if self.capabilities.is_empty() {
            return None;
        }
        let category = self.category.as_deref().unwrap_or("general");
        Some(format!(
            "Detected intent `{}`. Relevant skills for this request: {}.",
            category,
            self.capabilities.join(", ")
        ))
    }
}

/// Resolves calibrated intents to capability identifiers
#[derive(Clone)]
pub struct SkillResolver {
    catalog: Arc<dyn SkillCatalog>,
    config: ResolverConfig,
}

impl SkillResolver {
    /// Create a resolver over a catalog
    pub fn new(catalog: Arc<dyn SkillCatalog>) -> Self {
        Self {
            catalog,
            config: ResolverConfig::default(),
        }
    }

    /// Create a resolver with custom configuration
    pub fn with_config(catalog: Arc<dyn SkillCatalog>, config: ResolverConfig) -> Self {
        Self { catalog, config }
    }

    /// Resolve ranked intents against the calibrated threshold
    #[instrument(skip(self, intents), fields(intents = intents.len()))]
    pub fn resolve(&self, intents: &[Intent], threshold: f32) -> Resolution {
        let Some(top) = intents
            .iter()
            .find(|i| !i.is_general() && i.confidence() >= threshold)
        else {
            debug!("No intent cleared threshold {:.2}", threshold);
            return Resolution::empty();
        };

        let floor = (top.confidence() - self.config.secondary_margin).max(threshold);
        let mut capabilities: Vec<String> = Vec::new();

        for intent in intents
            .iter()
            .filter(|i| !i.is_general() && i.confidence() >= floor)
        {
            for capability in self.catalog.resolve_capability(intent.category()) {
                if capabilities.len() >= self.config.max_capabilities {
                    break;
                }
                if !capabilities.contains(&capability) {
                    capabilities.push(capability);
                }
            }
        }

        debug!(
            category = %top.category(),
            count = capabilities.len(),
            "Resolved capabilities"
        );

        Resolution {
            category: Some(top.category().to_string()),
            capabilities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MockSkillCatalog, StaticCatalog};
    use std::collections::BTreeSet;

    fn intent(category: &str, confidence: f32) -> Intent {
        Intent::new(category, confidence, BTreeSet::new(), "prompt").unwrap()
    }

    #[test]
    fn test_resolves_top_intent() {
        let resolver = SkillResolver::new(Arc::new(StaticCatalog::with_defaults()));
        let resolution = resolver.resolve(&[intent("quick_fix", 0.94), Intent::general("")], 0.6);

        assert_eq!(resolution.category.as_deref(), Some("quick_fix"));
        assert_eq!(resolution.capabilities, vec!["edit-file"]);
        assert!(resolution.render_context().unwrap().contains("edit-file"));
    }

    #[test]
    fn test_below_threshold_resolves_nothing() {
        let resolver = SkillResolver::new(Arc::new(StaticCatalog::with_defaults()));
        let resolution = resolver.resolve(&[intent("quick_fix", 0.4), Intent::general("")], 0.6);
        assert!(resolution.is_empty());
        assert!(resolution.category.is_none());
        assert!(resolution.render_context().is_none());
    }

    #[test]
    fn test_secondary_within_margin_contributes() {
        let resolver = SkillResolver::new(Arc::new(StaticCatalog::with_defaults()));
        let intents = [
            intent("test", 0.8),
            intent("documentation", 0.7),
            intent("search", 0.5),
        ];
        let resolution = resolver.resolve(&intents, 0.6);
        assert_eq!(
            resolution.capabilities,
            vec!["test-runner", "test-writer", "doc-writer"]
        );
    }

    #[test]
    fn test_dedupes_and_caps() {
        let mut catalog = MockSkillCatalog::new();
        catalog
            .expect_resolve_capability()
            .times(2)
            .returning(|_| vec!["a".into(), "b".into(), "c".into()]);

        let config = ResolverConfig {
            max_capabilities: 2,
            secondary_margin: 0.5,
        };
        let resolver = SkillResolver::with_config(Arc::new(catalog), config);
        let resolution = resolver.resolve(&[intent("x", 0.9), intent("y", 0.8)], 0.5);

        assert_eq!(resolution.capabilities, vec!["a", "b"]);
    }

    #[test]
    fn test_general_never_resolves() {
        let mut catalog = MockSkillCatalog::new();
        catalog.expect_resolve_capability().never();

        let resolver = SkillResolver::new(Arc::new(catalog));
        let resolution = resolver.resolve(&[Intent::general("hi")], 0.0);
        assert!(resolution.is_empty());
    }
}
