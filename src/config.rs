use std::{env, str::FromStr, time::Duration};

use secrecy::{ExposeSecret, SecretString};

use crate::{
    errors::{AppError, AppResult},
    models::domain::{PointsTable, QuestionType, SeverityWeights},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Ollama,
}

impl FromStr for ProviderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "ollama" => Ok(ProviderKind::Ollama),
            other => Err(AppError::ConfigError(format!(
                "unknown AI_PROVIDER '{}', expected 'openai' or 'ollama'",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub web_server_host: String,
    pub web_server_port: u16,
    pub provider: ProviderSettings,
    pub retry: RetryPolicy,
    pub max_concurrent_generations: usize,
    pub pipeline: PipelineSettings,
}

/// How to reach the language model.
#[derive(Clone, Debug)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub api_key: SecretString,
    pub api_base: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Timeout and backoff applied to every provider call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub timeout: Duration,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout: Duration::from_secs(60),
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): base * 2^(attempt-1),
    /// capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Every tunable the pipeline stages read.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineSettings {
    pub max_content_length: usize,
    pub max_analysis_retries: u32,
    pub min_question_count: u32,
    pub max_question_count: u32,
    pub minutes_per_question: u32,
    pub question_type_rotation: Vec<QuestionType>,
    pub severity_weights: SeverityWeights,
    pub points_table: PointsTable,
    pub max_quality_retries: u32,
    pub analysis_excerpt_chars: usize,
    pub generation_excerpt_chars: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_content_length: 50_000,
            max_analysis_retries: 2,
            min_question_count: 3,
            max_question_count: 20,
            minutes_per_question: 3,
            question_type_rotation: vec![
                QuestionType::MultipleChoice,
                QuestionType::FillBlank,
                QuestionType::ShortAnswer,
                QuestionType::TrueFalse,
            ],
            severity_weights: SeverityWeights::default(),
            points_table: PointsTable::default(),
            max_quality_retries: 2,
            analysis_excerpt_chars: 3000,
            generation_excerpt_chars: 2000,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        let kind: ProviderKind = env::var("AI_PROVIDER")
            .unwrap_or_else(|_| "openai".to_string())
            .parse()?;

        let default_model = match kind {
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::Ollama => "llama3.1",
        };

        let retry_defaults = RetryPolicy::default();
        let pipeline_defaults = PipelineSettings::default();

        Ok(Self {
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "127.0.0.1".to_string()),
            web_server_port: env_or("WEB_SERVER_PORT", 8080),
            provider: ProviderSettings {
                kind,
                api_key: SecretString::from(env::var("AI_API_KEY").unwrap_or_default()),
                api_base: env::var("AI_API_BASE").ok().filter(|v| !v.trim().is_empty()),
                model: env::var("AI_MODEL").unwrap_or_else(|_| default_model.to_string()),
                max_tokens: env_or("AI_MAX_TOKENS", 2048),
                temperature: env_or("AI_TEMPERATURE", 0.7),
            },
            retry: RetryPolicy {
                max_attempts: env_or("AI_MAX_ATTEMPTS", retry_defaults.max_attempts),
                timeout: Duration::from_secs(env_or("AI_TIMEOUT_SECONDS", 60)),
                base_delay: Duration::from_millis(env_or("AI_BACKOFF_BASE_MS", 500)),
                max_delay: retry_defaults.max_delay,
            },
            max_concurrent_generations: env_or("MAX_CONCURRENT_GENERATIONS", 4),
            pipeline: PipelineSettings {
                max_content_length: env_or(
                    "MAX_CONTENT_LENGTH",
                    pipeline_defaults.max_content_length,
                ),
                max_analysis_retries: env_or(
                    "MAX_ANALYSIS_RETRIES",
                    pipeline_defaults.max_analysis_retries,
                ),
                max_quality_retries: env_or(
                    "MAX_QUALITY_RETRIES",
                    pipeline_defaults.max_quality_retries,
                ),
                ..pipeline_defaults
            },
        })
    }

    /// Rejects settings that would make the service unusable.
    pub fn validate_for_production(&self) -> AppResult<()> {
        if self.provider.kind == ProviderKind::OpenAi
            && self.provider.api_key.expose_secret().trim().is_empty()
        {
            return Err(AppError::ConfigError(
                "AI_API_KEY must be set for the openai provider".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(AppError::ConfigError(
                "AI_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        if self.max_concurrent_generations == 0 {
            return Err(AppError::ConfigError(
                "MAX_CONCURRENT_GENERATIONS must be at least 1".to_string(),
            ));
        }

        if self.pipeline.question_type_rotation.is_empty() {
            return Err(AppError::ConfigError(
                "question type rotation cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
            provider: ProviderSettings {
                kind: ProviderKind::OpenAi,
                api_key: SecretString::from("test-key".to_string()),
                api_base: None,
                model: "test-model".to_string(),
                max_tokens: 512,
                temperature: 0.0,
            },
            retry: RetryPolicy {
                max_attempts: 3,
                timeout: Duration::from_secs(1),
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(4),
            },
            max_concurrent_generations: 2,
            pipeline: PipelineSettings::default(),
        }
    }
}
