use crate::calibration::CalibrationEngine;
use crate::config::OrchestratorConfig;
use crate::coordinator::MultiAgentCoordinator;
use crate::error::Result;
use crate::event_bus::EventBus;
use crate::host::HostDispatcher;
use crate::pipeline::{PipelineDetector, TemplateRegistry};
use crate::retry::RetryManager;
use crate::session::SessionStore;
use maestro_skills::{
    CategoryRegistry, ClassificationContext, Classifier, Intent, KeywordClassifier, SkillCatalog,
    SkillResolver,
};
use std::sync::Arc;
use tracing::info;

/// Handles hook events end to end
pub struct Orchestrator {
    pub(crate) classifier: Arc<dyn Classifier>,
    pub(crate) calibration: Arc<CalibrationEngine>,
    pub(crate) resolver: SkillResolver,
    pub(crate) detector: PipelineDetector,
    pub(crate) coordinator: MultiAgentCoordinator,
    pub(crate) sessions: SessionStore,
    pub(crate) events: EventBus,
    pub(crate) config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create an orchestrator over the built-in categories and templates
    pub fn new(
        config: OrchestratorConfig,
        catalog: Arc<dyn SkillCatalog>,
        host: Arc<dyn HostDispatcher>,
    ) -> Result<Self> {
        Self::with_registries(
            config,
            catalog,
            host,
            CategoryRegistry::with_defaults(),
            TemplateRegistry::with_defaults(),
        )
    }

    /// Create an orchestrator with custom categories and templates
    pub fn with_registries(
        config: OrchestratorConfig,
        catalog: Arc<dyn SkillCatalog>,
        host: Arc<dyn HostDispatcher>,
        categories: CategoryRegistry,
        templates: TemplateRegistry,
    ) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.events.capacity);
        let classifier: Arc<dyn Classifier> = Arc::new(KeywordClassifier::with_config(
            categories.clone(),
            config.classifier.clone(),
        ));
        let calibration = Arc::new(CalibrationEngine::new(config.calibration.clone()));
        let coordinator =
            build_coordinator(&config, host, calibration.clone(), classifier.id(), &events);

        info!(
            classifier = %classifier.id(),
            max_concurrency = config.coordinator.max_concurrency,
            default_threshold = config.calibration.default_threshold,
            "Orchestrator initialized"
        );

        Ok(Self {
            classifier,
            calibration,
            resolver: SkillResolver::with_config(catalog, config.resolver.clone()),
            detector: PipelineDetector::new(categories, templates),
            coordinator,
            sessions: SessionStore::new(),
            events,
            config,
        })
    }

    /// Replace the classifier; its id becomes the calibration key
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.coordinator = build_coordinator(
            &self.config,
            self.coordinator.host(),
            self.calibration.clone(),
            classifier.id(),
            &self.events,
        );
        self.classifier = classifier;
        self
    }

    /// Share an existing calibration engine
    #[must_use]
    pub fn with_calibration(mut self, calibration: Arc<CalibrationEngine>) -> Self {
        self.coordinator = build_coordinator(
            &self.config,
            self.coordinator.host(),
            calibration.clone(),
            self.classifier.id(),
            &self.events,
        );
        self.calibration = calibration;
        self
    }

    /// Calibration engine
    pub fn calibration(&self) -> &Arc<CalibrationEngine> {
        &self.calibration
    }

    /// Event bus
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Session store
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Coordinator
    pub fn coordinator(&self) -> &MultiAgentCoordinator {
        &self.coordinator
    }

    /// Pipeline detector
    pub fn detector(&self) -> &PipelineDetector {
        &self.detector
    }

    /// Classifier id used as the calibration key
    pub fn classifier_id(&self) -> &str {
        self.classifier.id()
    }

    /// Classify a prompt outside any session (no continuity bonus)
    pub fn classify(&self, prompt_text: &str) -> Vec<Intent> {
        self.classifier
            .classify(prompt_text, &ClassificationContext::default())
    }

    /// Threshold currently in effect for the classifier
    pub fn current_threshold(&self) -> f32 {
        self.calibration.current_threshold(self.classifier.id())
    }

    /// Configuration
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Destroy a session's state
    pub async fn end_session(&self, session_id: &str) -> bool {
        self.sessions.end(session_id).await
    }
}

fn build_coordinator(
    config: &OrchestratorConfig,
    host: Arc<dyn HostDispatcher>,
    calibration: Arc<CalibrationEngine>,
    classifier_id: &str,
    events: &EventBus,
) -> MultiAgentCoordinator {
    let retry = RetryManager::new(
        config.retry.clone(),
        calibration,
        classifier_id,
        events.clone(),
    );
    MultiAgentCoordinator::new(host, retry, config.coordinator.clone(), events.clone())
}
