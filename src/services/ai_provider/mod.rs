//! Language-model providers and the gateway every pipeline stage calls
//! them through.

pub mod gateway;
pub mod ollama_provider;
pub mod openai_provider;

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::{
    config::{ProviderKind, ProviderSettings},
    errors::ProviderError,
};

pub use gateway::ProviderGateway;
pub use ollama_provider::OllamaProvider;
pub use openai_provider::OpenAiProvider;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GenerationConfig {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.7,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProviderResponse {
    pub text: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}

/// A language model that turns a system and user prompt into text.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AiProvider: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        config: &GenerationConfig,
    ) -> Result<ProviderResponse, ProviderError>;

    fn name(&self) -> &'static str;
}

/// Builds the provider named by the configuration.
pub fn provider_from_settings(settings: &ProviderSettings) -> Arc<dyn AiProvider> {
    match settings.kind {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(settings)),
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(settings)),
    }
}

/// Maps an HTTP status and body to the provider error taxonomy.
pub(crate) fn classify_http_failure(status: u16, body: &str) -> ProviderError {
    let detail = format!("HTTP {}: {}", status, truncate(body, 300));
    match status {
        401 | 403 => ProviderError::Auth(detail),
        408 | 504 => ProviderError::Network(detail),
        429 => ProviderError::RateLimited(detail),
        500..=599 => ProviderError::Network(detail),
        _ => ProviderError::InvalidPrompt(detail),
    }
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
