use std::time::Instant;

use async_openai::{
    config::OpenAIConfig,
    error::{ApiError, OpenAIError},
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use secrecy::ExposeSecret;

use crate::{
    config::ProviderSettings,
    errors::ProviderError,
    services::ai_provider::{AiProvider, GenerationConfig, ProviderResponse},
};

/// Hosted chat-completions provider. Any OpenAI-compatible endpoint works
/// through `AI_API_BASE`.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiProvider {
    pub fn new(settings: &ProviderSettings) -> Self {
        let mut openai_config =
            OpenAIConfig::new().with_api_key(settings.api_key.expose_secret());
        if let Some(base) = &settings.api_base {
            openai_config = openai_config.with_api_base(base);
        }

        Self {
            client: Client::with_config(openai_config),
            model: settings.model.clone(),
        }
    }
}

fn map_openai_error(err: OpenAIError) -> ProviderError {
    match err {
        OpenAIError::Reqwest(e) if e.is_timeout() => {
            ProviderError::Network(format!("request timed out: {}", e))
        }
        OpenAIError::Reqwest(e) => ProviderError::Network(e.to_string()),
        OpenAIError::ApiError(api) => classify_api_error(&api),
        OpenAIError::JSONDeserialize(e, _) => ProviderError::Malformed(e.to_string()),
        OpenAIError::StreamError(e) => ProviderError::Network(e.to_string()),
        other => ProviderError::InvalidPrompt(other.to_string()),
    }
}

/// Classifies an API error object by its `type` and `code`. Server errors
/// arrive with neither set.
fn classify_api_error(api: &ApiError) -> ProviderError {
    let message = api.to_string();
    let kind = api.r#type.as_deref().unwrap_or_default();
    let code = api.code.as_deref().unwrap_or_default();

    match (kind, code) {
        (_, "invalid_api_key" | "insufficient_quota")
        | ("authentication_error" | "permission_error" | "insufficient_quota", _) => {
            ProviderError::Auth(message)
        }
        (_, "rate_limit_exceeded") | ("rate_limit_error" | "requests" | "tokens", _) => {
            ProviderError::RateLimited(message)
        }
        ("server_error" | "api_error" | "overloaded_error", _) | ("", "") => {
            ProviderError::Network(message)
        }
        _ => ProviderError::InvalidPrompt(message),
    }
}

fn build_error(err: OpenAIError) -> ProviderError {
    ProviderError::InvalidPrompt(err.to_string())
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        config: &GenerationConfig,
    ) -> Result<ProviderResponse, ProviderError> {
        log::debug!(
            "Calling chat completions, model {}, prompt {} chars",
            self.model,
            user_prompt.len()
        );
        let started = Instant::now();

        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_prompt)
                    .build()
                    .map_err(build_error)?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_prompt)
                    .build()
                    .map_err(build_error)?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(config.temperature)
            .max_tokens(config.max_tokens)
            .build()
            .map_err(build_error)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            log::warn!("Chat completion call failed: {}", e);
            map_openai_error(e)
        })?;

        let text = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse)?;

        let tokens_used = response
            .usage
            .map(|usage| usage.total_tokens as u64)
            .unwrap_or(0);

        Ok(ProviderResponse {
            text: text.trim().to_string(),
            tokens_used,
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(kind: Option<&str>, code: Option<&str>, message: &str) -> OpenAIError {
        OpenAIError::ApiError(ApiError {
            message: message.to_string(),
            r#type: kind.map(str::to_string),
            param: None,
            code: code.map(str::to_string),
        })
    }

    #[test]
    fn server_errors_are_retried() {
        let err = map_openai_error(api_error(
            None,
            None,
            "The server had an error while processing your request",
        ));
        assert!(matches!(err, ProviderError::Network(_)));
        assert!(err.is_transient());

        let typed = map_openai_error(api_error(Some("server_error"), None, "boom"));
        assert!(typed.is_transient());
    }

    #[test]
    fn rate_limits_are_retried() {
        let err = map_openai_error(api_error(
            Some("requests"),
            Some("rate_limit_exceeded"),
            "Rate limit reached",
        ));
        assert!(matches!(err, ProviderError::RateLimited(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn credential_problems_are_auth_errors() {
        let bad_key = map_openai_error(api_error(
            Some("invalid_request_error"),
            Some("invalid_api_key"),
            "Incorrect API key provided",
        ));
        assert!(matches!(bad_key, ProviderError::Auth(_)));

        let quota = map_openai_error(api_error(
            Some("insufficient_quota"),
            Some("insufficient_quota"),
            "You exceeded your current quota",
        ));
        assert!(matches!(quota, ProviderError::Auth(_)));
        assert!(!quota.is_transient());
    }

    #[test]
    fn rejected_requests_are_not_retried() {
        let err = map_openai_error(api_error(
            Some("invalid_request_error"),
            Some("context_length_exceeded"),
            "This model's maximum context length is 8192 tokens",
        ));
        assert!(matches!(err, ProviderError::InvalidPrompt(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn undecodable_body_is_malformed() {
        let json_err = serde_json::from_str::<serde_json::Value>("{\"choices\":")
            .expect_err("truncated json");
        let err = map_openai_error(OpenAIError::JSONDeserialize(json_err, "{\"choices\":".into()));
        assert!(err.is_unusable_reply());
    }

    #[test]
    fn invalid_arguments_are_prompt_errors() {
        let err = map_openai_error(OpenAIError::InvalidArgument("model is required".into()));
        assert!(matches!(err, ProviderError::InvalidPrompt(_)));
    }
}
