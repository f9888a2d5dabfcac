pub mod agents;
pub mod ai_provider;
pub mod quiz_generation_service;
pub mod quiz_orchestrator;
pub mod run_context;

pub use quiz_generation_service::QuizGenerationService;
pub use quiz_orchestrator::QuizOrchestrator;
pub use run_context::RunContext;
