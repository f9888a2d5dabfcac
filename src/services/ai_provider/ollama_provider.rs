use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    config::ProviderSettings,
    errors::ProviderError,
    services::ai_provider::{classify_http_failure, AiProvider, GenerationConfig, ProviderResponse},
};

const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Self-hosted model served by Ollama.
pub struct OllamaProvider {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    eval_count: u64,
}

impl OllamaProvider {
    pub fn new(settings: &ProviderSettings) -> Self {
        let base = settings
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/api/generate", base.trim_end_matches('/')),
            model: settings.model.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AiProvider for OllamaProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        config: &GenerationConfig,
    ) -> Result<ProviderResponse, ProviderError> {
        let started = Instant::now();

        // Ollama's generate endpoint takes a single prompt.
        let payload = OllamaRequest {
            model: &self.model,
            prompt: format!("{}\n\n{}", system_prompt, user_prompt),
            stream: false,
            options: OllamaOptions {
                temperature: config.temperature,
                num_predict: config.max_tokens,
            },
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Network(format!("request timed out: {}", e))
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("Ollama returned {}: {}", status, body);
            return Err(classify_http_failure(status.as_u16(), &body));
        }

        let data: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        if data.response.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        let latency_ms = started.elapsed().as_millis() as u64;
        log::info!(
            "Ollama generation successful: {} tokens in {}ms",
            data.eval_count,
            latency_ms
        );

        Ok(ProviderResponse {
            text: data.response.trim().to_string(),
            tokens_used: data.eval_count,
            latency_ms,
        })
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}
