//! Intent category registry.
//!
//! Each category carries the keywords the classifier scores against and two
//! tags the pipeline detector reads:
//!
//! | Tag | Meaning |
//! |-----|---------|
//! | `single_capability` | One skill can satisfy the request without a pipeline |
//! | `complexity` | Long, structured prompts push [`Complexity::Complex`] categories up and [`Complexity::Simple`] ones down |

use crate::error::{Error, Result};
use crate::intent::GENERAL_CATEGORY;
use serde::{Deserialize, Serialize};

/// How a category reacts to prompt length and structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    /// Short, targeted requests
    Simple,
    /// Multi-step work that usually arrives as a longer prompt
    Complex,
}

/// Definition of one intent category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDef {
    /// Category name (e.g. `quick_fix`)
    pub name: String,
    /// Trigger keywords, lowercase
    pub keywords: Vec<String>,
    /// Whether a single capability can handle the request
    pub single_capability: bool,
    /// Length/structure behaviour
    pub complexity: Complexity,
}

impl CategoryDef {
    /// Create a category definition
    pub fn new(
        name: impl Into<String>,
        keywords: &[&str],
        single_capability: bool,
        complexity: Complexity,
    ) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            single_capability,
            complexity,
        }
    }
}

/// Ordered set of category definitions.
///
/// Registration order doubles as the tie-breaker when two categories score
/// the same.
#[derive(Debug, Clone, Default)]
pub struct CategoryRegistry {
    categories: Vec<CategoryDef>,
}

impl CategoryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in coding-assistant categories
    pub fn with_defaults() -> Self {
        Self {
            categories: default_categories(),
        }
    }

    /// Register a category, rejecting duplicates and the reserved catch-all
    pub fn register(&mut self, def: CategoryDef) -> Result<()> {
        if def.name.trim().is_empty() {
            return Err(Error::InvalidCategory("name must not be empty".to_string()));
        }
        if def.name == GENERAL_CATEGORY {
            return Err(Error::InvalidCategory(format!(
                "'{}' is reserved for the catch-all intent",
                GENERAL_CATEGORY
            )));
        }
        if def.keywords.is_empty() {
            return Err(Error::InvalidCategory(format!(
                "category '{}' has no keywords",
                def.name
            )));
        }
        if self.get(&def.name).is_some() {
            return Err(Error::InvalidCategory(format!(
                "category '{}' already registered",
                def.name
            )));
        }
        self.categories.push(def);
        Ok(())
    }

    /// Look up a category by name
    pub fn get(&self, name: &str) -> Option<&CategoryDef> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Whether the category is tagged single-capability.
    ///
    /// Unknown categories (including `general`) are not.
    pub fn is_single_capability(&self, name: &str) -> bool {
        self.get(name).map(|c| c.single_capability).unwrap_or(false)
    }

    /// Iterate categories in registration order
    pub fn iter(&self) -> impl Iterator<Item = &CategoryDef> {
        self.categories.iter()
    }

    /// Number of registered categories
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

fn default_categories() -> Vec<CategoryDef> {
    use Complexity::{Complex, Simple};

    vec![
        CategoryDef::new(
            "quick_fix",
            &[
                "fix", "typo", "typos", "spelling", "rename", "tweak", "wording", "readme",
                "minor", "small", "quick", "adjust", "correct",
            ],
            true,
            Simple,
        ),
        CategoryDef::new(
            "explain",
            &[
                "explain", "why", "how", "what", "describe", "understand", "meaning",
                "walkthrough", "clarify",
            ],
            true,
            Simple,
        ),
        CategoryDef::new(
            "search",
            &["find", "search", "locate", "where", "grep", "lookup", "list", "show"],
            true,
            Simple,
        ),
        CategoryDef::new(
            "test",
            &["test", "tests", "testing", "coverage", "unit", "assert", "spec"],
            true,
            Simple,
        ),
        CategoryDef::new(
            "documentation",
            &[
                "docs", "document", "documentation", "docstring", "comments", "changelog",
                "readme",
            ],
            true,
            Simple,
        ),
        CategoryDef::new(
            "implement_feature",
            &[
                "implement", "feature", "add", "build", "create", "develop", "endpoint",
                "support", "integrate", "new",
            ],
            false,
            Complex,
        ),
        CategoryDef::new(
            "refactor",
            &[
                "refactor", "restructure", "migrate", "rewrite", "cleanup", "extract",
                "modularize", "simplify", "reorganize", "split",
            ],
            false,
            Complex,
        ),
        CategoryDef::new(
            "debug",
            &[
                "debug", "bug", "crash", "crashes", "broken", "failing", "fails", "error",
                "exception", "panic", "regression", "investigate", "reproduce",
            ],
            false,
            Complex,
        ),
        CategoryDef::new(
            "review",
            &[
                "review", "audit", "inspect", "security", "vulnerability", "assess", "critique",
            ],
            false,
            Complex,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_tagged() {
        let registry = CategoryRegistry::with_defaults();
        assert!(registry.is_single_capability("quick_fix"));
        assert!(!registry.is_single_capability("implement_feature"));
        assert!(!registry.is_single_capability(GENERAL_CATEGORY));
        assert_eq!(
            registry.get("refactor").map(|c| c.complexity),
            Some(Complexity::Complex)
        );
    }

    #[test]
    fn test_register_rejects_duplicates_and_reserved() {
        let mut registry = CategoryRegistry::with_defaults();
        let dup = CategoryDef::new("debug", &["trace"], false, Complexity::Complex);
        assert!(registry.register(dup).is_err());

        let reserved = CategoryDef::new(GENERAL_CATEGORY, &["anything"], true, Complexity::Simple);
        assert!(registry.register(reserved).is_err());

        let empty = CategoryDef::new("deploy", &[], false, Complexity::Complex);
        assert!(registry.register(empty).is_err());

        let ok = CategoryDef::new("Deploy", &["Ship", "release"], false, Complexity::Complex);
        registry.register(ok).unwrap();
        assert_eq!(registry.get("Deploy").unwrap().keywords, vec!["ship", "release"]);
    }
}
