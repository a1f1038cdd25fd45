//! Skill catalog lookup.
//!
//! The catalog of skill documents lives outside this crate; the resolver only
//! needs a read-only `category -> capability ids` lookup, expressed by
//! [`SkillCatalog`]. [`StaticCatalog`] is an in-memory implementation seeded
//! with built-in entries and overridable from configuration.

use std::collections::HashMap;
use tracing::debug;

/// Read-only lookup of capabilities for an intent category
#[cfg_attr(test, mockall::automock)]
pub trait SkillCatalog: Send + Sync {
    /// Capability identifiers registered for a category (possibly empty)
    fn resolve_capability(&self, intent_category: &str) -> Vec<String>;
}

/// In-memory catalog keyed by category
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: HashMap<String, Vec<String>>,
}

impl StaticCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the built-in capability mapping
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        for (category, capabilities) in [
            ("quick_fix", &["edit-file"][..]),
            ("explain", &["code-explainer"][..]),
            ("search", &["codebase-search"][..]),
            ("test", &["test-runner", "test-writer"][..]),
            ("documentation", &["doc-writer"][..]),
            ("implement_feature", &["feature-planner"][..]),
            ("refactor", &["refactor-guide"][..]),
            ("debug", &["debugger"][..]),
            ("review", &["code-reviewer"][..]),
        ] {
            catalog.insert(category, capabilities.iter().map(|c| c.to_string()).collect());
        }
        catalog
    }

    /// Add or replace the capabilities of a category
    pub fn insert(&mut self, category: impl Into<String>, capabilities: Vec<String>) {
        self.entries.insert(category.into(), capabilities);
    }

    /// Builder-style [`insert`](Self::insert)
    #[must_use]
    pub fn with_entry(mut self, category: impl Into<String>, capabilities: Vec<String>) -> Self {
        self.insert(category, capabilities);
        self
    }

    /// Merge entries over the current ones; later entries win
    pub fn extend(&mut self, entries: impl IntoIterator<Item = (String, Vec<String>)>) {
        for (category, capabilities) in entries {
            debug!(category = %category, count = capabilities.len(), "Overriding catalog entry");
            self.entries.insert(category, capabilities);
        }
    }

    /// Number of categories with entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SkillCatalog for StaticCatalog {
    fn resolve_capability(&self, intent_category: &str) -> Vec<String> {
        self.entries.get(intent_category).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_builtin_categories() {
        let catalog = StaticCatalog::with_defaults();
        assert_eq!(catalog.resolve_capability("quick_fix"), vec!["edit-file"]);
        assert_eq!(catalog.resolve_capability("test").len(), 2);
        assert!(catalog.resolve_capability("general").is_empty());
    }

    #[test]
    fn test_extend_overrides() {
        let mut catalog = StaticCatalog::with_defaults();
        catalog.extend([("quick_fix".to_string(), vec!["patch-skill".to_string()])]);
        assert_eq!(catalog.resolve_capability("quick_fix"), vec!["patch-skill"]);

        let catalog = StaticCatalog::new().with_entry("deploy", vec!["release-notes".into()]);
        assert_eq!(catalog.len(), 1);
    }
}
