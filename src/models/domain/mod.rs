pub mod content_analysis;
pub mod difficulty;
pub mod quality_review;
pub mod question;
pub mod quiz_result;
pub use content_analysis::ContentAnalysis;
pub use difficulty::{Difficulty, DifficultyCounts, DifficultyDistribution, DifficultyLevel, PointsTable};
pub use quality_review::{QualityIssue, QualityReviewResult, Severity, SeverityWeights};
pub use question::{normalize_text, Choice, GeneratedQuestion, QuestionType};
pub use quiz_result::{AuditTrail, GenerationRequest, PipelineStage, QuizResult, StageRecord};
