//! Configuration loading
//!
//! Layers embedded defaults, optional files and `MAESTRO_*` environment
//! variables into an [`AppConfig`].

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use maestro_core::OrchestratorConfig;
use serde::Deserialize;
use std::collections::HashMap;

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Binary configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Engine settings (`[classifier]`, `[retry]`, ...)
    #[serde(flatten)]
    pub orchestrator: OrchestratorConfig,
    /// `category -> capabilities` overrides merged over the built-in catalog
    #[serde(default)]
    pub catalog: HashMap<String, Vec<String>>,
}

/// Load configuration from files and environment
pub fn load_config() -> Result<AppConfig> {
    let config = Config::builder()
        // 1. Embedded defaults
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        // 2. External overrides (optional)
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name("config/local").required(false))
        // 3. Environment variables, e.g. MAESTRO_RETRY__MAX_ATTEMPTS=5
        .add_source(
            Environment::with_prefix("MAESTRO")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let app: AppConfig = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;
    app.orchestrator
        .validate()
        .context("Invalid orchestration settings")?;
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_defaults_parse() {
        let config = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .unwrap();
        let app: AppConfig = config.try_deserialize().unwrap();

        assert_eq!(app.orchestrator.retry.max_attempts, 3);
        assert_eq!(app.orchestrator.coordinator.max_concurrency, 5);
        assert!((app.orchestrator.calibration.default_threshold - 0.6).abs() < f32::EPSILON);
        assert_eq!(app.orchestrator.sessions.idle_ttl_secs, 3600);
        assert!(app.catalog.is_empty());
        assert!(app.orchestrator.validate().is_ok());
    }
}
