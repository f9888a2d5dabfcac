use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::domain::{
    difficulty::{DifficultyCounts, DifficultyDistribution},
    question::GeneratedQuestion,
};

/// One pipeline run's input. Immutable once handed to the orchestrator.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GenerationRequest {
    pub content: String,
    pub topic: String,
    pub desired_question_count: u32,
    pub target_distribution: DifficultyDistribution,
    pub min_quality_score: f64,
    #[serde(default)]
    pub include_audit_trail: bool,
}

impl GenerationRequest {
    pub fn new(content: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            topic: topic.into(),
            desired_question_count: 10,
            target_distribution: DifficultyDistribution::default(),
            min_quality_score: 70.0,
            include_audit_trail: false,
        }
    }

    pub fn with_question_count(mut self, count: u32) -> Self {
        self.desired_question_count = count;
        self
    }

    pub fn with_distribution(mut self, distribution: DifficultyDistribution) -> Self {
        self.target_distribution = distribution;
        self
    }

    pub fn with_min_quality_score(mut self, score: f64) -> Self {
        self.min_quality_score = score;
        self
    }

    pub fn with_audit_trail(mut self) -> Self {
        self.include_audit_trail = true;
        self
    }

    /// Topic hint for the analyzer; `None` when the caller left it blank.
    pub fn topic_hint(&self) -> Option<&str> {
        let topic = self.topic.trim();
        (!topic.is_empty()).then_some(topic)
    }
}

/// The only value a successful run hands back to its caller.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuizResult {
    pub title: String,
    pub description: String,
    pub questions: Vec<GeneratedQuestion>,
    pub total_points: u32,
    pub estimated_time_minutes: u32,
    pub difficulty_distribution: DifficultyCounts,
    pub quality_score: f64,
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_trail: Option<AuditTrail>,
}

/// Pipeline states. `Failed` is reachable from every non-terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Created,
    Analyzing,
    Generating,
    Reviewing,
    Balancing,
    Finalizing,
    Completed,
    Failed,
}

impl PipelineStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Completed | PipelineStage::Failed)
    }

    pub fn can_transition_to(self, next: PipelineStage) -> bool {
        use PipelineStage::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Created, Analyzing)
            | (Analyzing, Generating)
            | (Generating, Reviewing)
            | (Reviewing, Generating)
            | (Reviewing, Balancing)
            | (Balancing, Finalizing)
            | (Finalizing, Completed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Created => "created",
            PipelineStage::Analyzing => "analyzing",
            PipelineStage::Generating => "generating",
            PipelineStage::Reviewing => "reviewing",
            PipelineStage::Balancing => "balancing",
            PipelineStage::Finalizing => "finalizing",
            PipelineStage::Completed => "completed",
            PipelineStage::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct StageRecord {
    pub stage: PipelineStage,
    pub entered_at: DateTime<Utc>,
}

/// Optional record of how a run reached its result.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct AuditTrail {
    pub run_id: String,
    pub transitions: Vec<StageRecord>,
    pub review_scores: Vec<f64>,
    pub quality_retries: u32,
    pub reclassified_questions: usize,
    pub tokens_used: u64,
}
