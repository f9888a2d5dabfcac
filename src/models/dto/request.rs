use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::domain::{DifficultyDistribution, GenerationRequest};

fn default_question_count() -> u32 {
    10
}

fn default_min_quality_score() -> f64 {
    70.0
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateQuizRequestDto {
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,

    #[serde(default)]
    #[validate(length(max = 200))]
    pub topic: String,

    #[serde(default = "default_question_count")]
    #[validate(range(min = 1, max = 50))]
    pub desired_question_count: u32,

    #[serde(default)]
    #[validate(nested)]
    pub difficulty_distribution: DistributionDto,

    #[serde(default = "default_min_quality_score")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub min_quality_score: f64,

    #[serde(default)]
    pub include_audit_trail: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Validate)]
#[validate(schema(function = "validate_percentages"))]
pub struct DistributionDto {
    #[validate(range(max = 100))]
    pub easy: u32,
    #[validate(range(max = 100))]
    pub medium: u32,
    #[validate(range(max = 100))]
    pub hard: u32,
}

impl Default for DistributionDto {
    fn default() -> Self {
        let defaults = DifficultyDistribution::default();
        Self {
            easy: defaults.easy,
            medium: defaults.medium,
            hard: defaults.hard,
        }
    }
}

fn validate_percentages(distribution: &DistributionDto) -> Result<(), ValidationError> {
    let total = DifficultyDistribution::from(*distribution).total();
    if total != 100 {
        let mut error = ValidationError::new("distribution_total");
        error.message = Some(format!("percentages must sum to 100, got {}", total).into());
        return Err(error);
    }
    Ok(())
}

impl From<DistributionDto> for DifficultyDistribution {
    fn from(dto: DistributionDto) -> Self {
        DifficultyDistribution::new(dto.easy, dto.medium, dto.hard)
    }
}

impl From<GenerateQuizRequestDto> for GenerationRequest {
    fn from(dto: GenerateQuizRequestDto) -> Self {
        GenerationRequest {
            content: dto.content,
            topic: dto.topic,
            desired_question_count: dto.desired_question_count,
            target_distribution: dto.difficulty_distribution.into(),
            min_quality_score: dto.min_quality_score,
            include_audit_trail: dto.include_audit_trail,
        }
    }
}
