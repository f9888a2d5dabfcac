use std::sync::Arc;

use crate::{
    config::RetryPolicy,
    errors::{PipelineError, ProviderError},
    services::{
        ai_provider::{AiProvider, GenerationConfig, ProviderResponse},
        run_context::RunContext,
    },
};

pub const MAX_PROMPT_LENGTH: usize = 50_000;

/// Single entry point for provider calls: prompt validation, per-call
/// timeout, bounded exponential backoff on transient failures, and
/// cancellation.
pub struct ProviderGateway {
    provider: Arc<dyn AiProvider>,
    policy: RetryPolicy,
    generation: GenerationConfig,
}

impl ProviderGateway {
    pub fn new(
        provider: Arc<dyn AiProvider>,
        policy: RetryPolicy,
        generation: GenerationConfig,
    ) -> Self {
        Self {
            provider,
            policy,
            generation,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub async fn generate(
        &self,
        ctx: &RunContext,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<ProviderResponse, PipelineError> {
        validate_prompt("system", system_prompt)?;
        validate_prompt("user", user_prompt)?;

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            ctx.ensure_active()?;

            let call = tokio::time::timeout(
                self.policy.timeout,
                self.provider
                    .generate(system_prompt, user_prompt, &self.generation),
            );

            let outcome = tokio::select! {
                _ = ctx.cancel_token().cancelled() => return Err(PipelineError::Cancelled),
                result = call => result.unwrap_or(Err(ProviderError::Timeout(self.policy.timeout))),
            };

            match outcome {
                Ok(response) => {
                    ctx.record_tokens(response.tokens_used);
                    log::debug!(
                        "[{}] {} responded in {}ms ({} tokens)",
                        ctx.run_id(),
                        self.provider.name(),
                        response.latency_ms,
                        response.tokens_used
                    );
                    return Ok(response);
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.policy.backoff(attempt);
                    log::warn!(
                        "[{}] {} call failed (attempt {}/{}): {}; retrying in {:?}",
                        ctx.run_id(),
                        self.provider.name(),
                        attempt,
                        max_attempts,
                        err,
                        delay
                    );
                    tokio::select! {
                        _ = ctx.cancel_token().cancelled() => return Err(PipelineError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(err) => {
                    log::error!(
                        "[{}] {} call failed after {} attempt(s): {}",
                        ctx.run_id(),
                        self.provider.name(),
                        attempt,
                        err
                    );
                    return Err(PipelineError::Provider(err));
                }
            }
        }
    }
}

fn validate_prompt(label: &str, prompt: &str) -> Result<(), ProviderError> {
    if prompt.trim().is_empty() {
        return Err(ProviderError::InvalidPrompt(format!(
            "{} prompt must be a non-empty string",
            label
        )));
    }
    if prompt.chars().count() > MAX_PROMPT_LENGTH {
        return Err(ProviderError::InvalidPrompt(format!(
            "{} prompt exceeds maximum length of {} characters",
            label, MAX_PROMPT_LENGTH
        )));
    }
    Ok(())
}
