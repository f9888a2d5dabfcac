//! The four pipeline agents.

pub mod content_analyzer;
pub mod difficulty_balancer;
pub mod quality_reviewer;
pub mod question_generator;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

use crate::{errors::PipelineError, services::ai_provider::ProviderResponse};

pub use content_analyzer::ContentAnalyzer;
pub use difficulty_balancer::{BalanceOutcome, DifficultyBalancer};
pub use quality_reviewer::{QualityReview, QualityReviewer};
pub use question_generator::{GenerationOutcome, QuestionGenerator, QuestionSlot};

static FENCED_BLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("FENCED_BLOCK_REGEX is a valid regex")
});

/// Pulls the JSON payload out of a model reply. Accepts a bare document, a
/// fenced code block, or a document surrounded by prose.
pub fn extract_json(text: &str) -> &str {
    if let Some(block) = FENCED_BLOCK_REGEX
        .captures(text)
        .and_then(|caps| caps.get(1))
    {
        return block.as_str().trim();
    }

    let trimmed = text.trim();
    let start = trimmed.find(['{', '[']);
    let end = trimmed.rfind(['}', ']']);
    match (start, end) {
        (Some(start), Some(end)) if end > start => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// Text of a provider reply. An empty or unreadable reply comes back as
/// `Ok(Err(problem))` so the agent can re-prompt; any other failure ends the
/// stage.
pub(crate) fn reply_text(
    result: Result<ProviderResponse, PipelineError>,
) -> Result<Result<String, String>, PipelineError> {
    match result {
        Ok(response) => Ok(Ok(response.text)),
        Err(PipelineError::Provider(err)) if err.is_unusable_reply() => Ok(Err(err.to_string())),
        Err(err) => Err(err),
    }
}

pub fn parse_agent_output<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(extract_json(text))
}

/// The first `max_chars` characters of `text`, cut on a char boundary.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Pretty JSON schema for `T`, embedded in prompts so the provider knows the
/// exact output shape.
pub fn schema_for<T: schemars::JsonSchema>() -> String {
    let schema = schemars::schema_for!(T);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
