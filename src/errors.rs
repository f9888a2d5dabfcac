use std::time::Duration;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::models::domain::PipelineStage;

/// Failure of a single call to an AI provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("invalid prompt: {0}")]
    InvalidPrompt(String),

    #[error("provider returned an empty response")]
    EmptyResponse,

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Transient failures are retried with backoff; everything else surfaces
    /// on the first occurrence.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout(_) | ProviderError::Network(_) | ProviderError::RateLimited(_)
        )
    }

    /// The call went through but the reply carried nothing usable. Agents
    /// re-prompt on these the same way they do for unparseable output.
    pub fn is_unusable_reply(&self) -> bool {
        matches!(self, ProviderError::EmptyResponse | ProviderError::Malformed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("content analysis failed: {message}")]
    ContentAnalysis {
        message: String,
        last_response: Option<String>,
    },

    #[error("question generation failed: {0}")]
    QuestionGeneration(String),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("generation cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidInput(_) => "invalid_input",
            PipelineError::ContentAnalysis { .. } => "content_analysis_error",
            PipelineError::QuestionGeneration(_) => "question_generation_error",
            PipelineError::Provider(_) => "provider_error",
            PipelineError::Cancelled => "cancelled",
        }
    }
}

/// A run that ended in `Failed`: the stage it was in and why.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{stage} stage failed: {error}")]
pub struct StageFailure {
    pub stage: PipelineStage,
    #[source]
    pub error: PipelineError,
}

impl StageFailure {
    pub fn new(stage: PipelineStage, error: PipelineError) -> Self {
        Self { stage, error }
    }

    pub fn to_response(&self) -> FailureResponse {
        FailureResponse {
            stage: self.stage.to_string(),
            error_kind: self.error.kind().to_string(),
            message: self.error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureResponse {
    pub stage: String,
    pub error_kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Pipeline(#[from] StageFailure),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Pipeline(failure) => match failure.error {
                PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                PipelineError::ContentAnalysis { .. } | PipelineError::QuestionGeneration(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                PipelineError::Provider(_) => StatusCode::BAD_GATEWAY,
                PipelineError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Pipeline(failure) => {
                HttpResponse::build(self.status_code()).json(failure.to_response())
            }
            _ => HttpResponse::build(self.status_code()).json(ErrorResponse {
                error: self.to_string(),
                code: self.status_code().as_u16(),
            }),
        }
    }
}

/// A request that fails validation never reaches the pipeline; it is
/// reported in the same shape as a failed run.
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Pipeline(StageFailure::new(
            PipelineStage::Created,
            PipelineError::InvalidInput(err.to_string()),
        ))
    }
}

pub type AppResult<T> = Result<T, AppError>;
