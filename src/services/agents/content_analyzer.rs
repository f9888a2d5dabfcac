use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;

use crate::{
    config::PipelineSettings,
    constants::prompts::{CLARIFICATION_PROMPT, CONTENT_ANALYZER_PROMPT},
    errors::PipelineError,
    models::domain::{ContentAnalysis, DifficultyLevel},
    services::{
        agents::{excerpt, parse_agent_output, reply_text, schema_for},
        ai_provider::ProviderGateway,
        run_context::RunContext,
    },
};

/// Shape the provider is asked to return.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct AnalysisPayload {
    pub topic: String,
    pub difficulty_level: DifficultyLevel,
    pub key_concepts: Vec<String>,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    #[serde(default)]
    pub prerequisite_knowledge: Vec<String>,
    pub estimated_time_minutes: i64,
}

/// First pipeline stage: raw content in, `ContentAnalysis` out.
pub struct ContentAnalyzer {
    gateway: Arc<ProviderGateway>,
    settings: PipelineSettings,
}

impl ContentAnalyzer {
    pub fn new(gateway: Arc<ProviderGateway>, settings: &PipelineSettings) -> Self {
        Self {
            gateway,
            settings: settings.clone(),
        }
    }

    pub fn validate_content(&self, content: &str) -> Result<(), PipelineError> {
        if content.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "content must not be empty".to_string(),
            ));
        }

        let length = content.chars().count();
        if length > self.settings.max_content_length {
            return Err(PipelineError::InvalidInput(format!(
                "content is {} characters, maximum is {}",
                length, self.settings.max_content_length
            )));
        }

        Ok(())
    }

    /// Questions worth asking for content that takes `minutes` to study,
    /// clamped to the configured range.
    pub fn recommended_question_count(&self, minutes: u32) -> u32 {
        let per_question = self.settings.minutes_per_question.max(1);
        let min = self.settings.min_question_count.max(1);
        let max = self.settings.max_question_count.max(min);
        minutes.div_ceil(per_question).clamp(min, max)
    }

    pub async fn analyze(
        &self,
        ctx: &RunContext,
        content: &str,
        topic_hint: Option<&str>,
    ) -> Result<ContentAnalysis, PipelineError> {
        self.validate_content(content)?;

        let base_prompt = self.build_user_prompt(content, topic_hint);
        let attempts = self.settings.max_analysis_retries + 1;
        let mut last_response: Option<String> = None;
        let mut last_problem = String::new();

        for attempt in 1..=attempts {
            let user_prompt = if attempt == 1 {
                base_prompt.clone()
            } else {
                format!(
                    "{}\n\n{}\nProblem with the previous reply: {}",
                    base_prompt, CLARIFICATION_PROMPT, last_problem
                )
            };

            let reply = reply_text(
                self.gateway
                    .generate(ctx, CONTENT_ANALYZER_PROMPT, &user_prompt)
                    .await,
            )?;
            let (text, parsed) = match reply {
                Ok(text) => {
                    let parsed = self.parse_analysis(&text);
                    (Some(text), parsed)
                }
                Err(problem) => (None, Err(problem)),
            };

            match parsed {
                Ok(analysis) => {
                    log::info!(
                        "[{}] Analysis complete: {} ({}), {} key concepts",
                        ctx.run_id(),
                        analysis.topic,
                        analysis.difficulty_level,
                        analysis.key_concepts.len()
                    );
                    return Ok(analysis);
                }
                Err(problem) => {
                    log::warn!(
                        "[{}] Unusable analysis on attempt {}/{}: {}",
                        ctx.run_id(),
                        attempt,
                        attempts,
                        problem
                    );
                    last_problem = problem;
                    if text.is_some() {
                        last_response = text;
                    }
                }
            }
        }

        Err(PipelineError::ContentAnalysis {
            message: format!(
                "no usable analysis after {} attempt(s): {}",
                attempts, last_problem
            ),
            last_response,
        })
    }

    fn build_user_prompt(&self, content: &str, topic_hint: Option<&str>) -> String {
        let hint = topic_hint
            .map(|topic| format!("Topic hint: {}\n\n", topic))
            .unwrap_or_default();

        format!(
            "{}Content:\n{}\n\nRespond with JSON matching this schema:\n{}",
            hint,
            excerpt(content, self.settings.analysis_excerpt_chars),
            schema_for::<AnalysisPayload>()
        )
    }

    fn parse_analysis(&self, text: &str) -> Result<ContentAnalysis, String> {
        let payload: AnalysisPayload =
            parse_agent_output(text).map_err(|e| format!("invalid JSON: {}", e))?;

        if payload.topic.trim().is_empty() {
            return Err("topic is empty".to_string());
        }
        if payload.estimated_time_minutes <= 0 {
            return Err(format!(
                "estimated_time_minutes must be positive, got {}",
                payload.estimated_time_minutes
            ));
        }

        let minutes = u32::try_from(payload.estimated_time_minutes).unwrap_or(u32::MAX);
        let analysis = ContentAnalysis::new(
            payload.topic,
            payload.difficulty_level,
            payload.key_concepts,
            payload.learning_objectives,
            payload.prerequisite_knowledge,
            minutes,
            self.recommended_question_count(minutes),
        );

        if analysis.key_concepts.is_empty() {
            return Err("key_concepts is empty".to_string());
        }

        Ok(analysis)
    }
}
