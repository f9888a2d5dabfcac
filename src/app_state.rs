use std::sync::Arc;

use crate::{
    config::Config,
    services::{ai_provider::provider_from_settings, QuizGenerationService, QuizOrchestrator},
};

#[derive(Clone)]
pub struct AppState {
    pub generation_service: Arc<QuizGenerationService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let provider = provider_from_settings(&config.provider);
        log::info!(
            "Using {} provider with model {}",
            provider.name(),
            config.provider.model
        );

        let orchestrator = QuizOrchestrator::from_config(provider, &config);
        let generation_service = Arc::new(QuizGenerationService::new(
            orchestrator,
            config.max_concurrent_generations,
        ));

        Self {
            generation_service,
            config: Arc::new(config),
        }
    }

    /// State around an already-built service, for embedding and tests.
    pub fn with_service(generation_service: Arc<QuizGenerationService>, config: Config) -> Self {
        Self {
            generation_service,
            config: Arc::new(config),
        }
    }
}
