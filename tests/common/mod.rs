#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use serde_json::json;

use quizsmith::{
    config::{PipelineSettings, RetryPolicy},
    constants::prompts::CONTENT_ANALYZER_PROMPT,
    errors::ProviderError,
    models::domain::{
        ContentAnalysis, DifficultyCounts, GeneratedQuestion, QualityReviewResult,
    },
    services::{
        agents::QualityReview,
        ai_provider::{AiProvider, GenerationConfig, ProviderGateway, ProviderResponse},
        QuizOrchestrator,
    },
};

pub const LOOPS_PASSAGE: &str = "Loops let a program repeat a block of code without writing it out \
many times. Python offers two loop statements. A for loop walks over the items of a sequence such \
as a list, a string or a range, binding each item to a loop variable in turn. A while loop keeps \
running its body for as long as its condition stays true, so the body must eventually change \
something the condition depends on or the loop never ends. Each pass through the body is called \
an iteration. Two statements change the normal flow. The break statement leaves the innermost \
loop at once, skipping any remaining iterations, which is useful when a search has found what it \
was looking for. The continue statement skips the rest of the current iteration and moves on to \
the next one. Loops can be nested, and break only exits the loop it appears in. A loop counter is \
a variable that tracks how many iterations have run; with a for loop over range the counter is \
managed for you, while a while loop needs you to update it yourself. Choosing between the two is \
mostly about whether you know the number of iterations in advance: if you do, reach for a for \
loop; if you are waiting for some condition to change, a while loop usually reads more clearly.";

/// Deterministic stand-in for a language model. Analysis prompts get a fixed
/// analysis; question prompts get a question of the requested type whose
/// text is unique per call.
pub struct StubProvider {
    calls: AtomicUsize,
}

impl StubProvider {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn prompt_field<'a>(prompt: &'a str, label: &str) -> &'a str {
    prompt
        .lines()
        .find_map(|line| line.strip_prefix(label))
        .map(str::trim)
        .unwrap_or_default()
}

pub fn analysis_reply() -> String {
    json!({
        "topic": "Python Loops",
        "difficulty_level": "beginner",
        "key_concepts": ["for loop", "while loop", "break statement", "loop counter"],
        "learning_objectives": ["Choose between for and while loops"],
        "prerequisite_knowledge": ["Variables", "Boolean conditions"],
        "estimated_time_minutes": 20
    })
    .to_string()
}

pub fn question_reply(question_type: &str, concept: &str, call: usize) -> String {
    let text = format!("Question {} about the {} in Python?", call, concept);
    let explanation = format!(
        "The passage explains how the {} behaves during each iteration.",
        concept
    );

    let (answer, choices) = match question_type {
        "multiple_choice" => (
            "It repeats a block of code",
            json!([
                {"text": "It repeats a block of code", "is_correct": true},
                {"text": "It defines a new class", "is_correct": false},
                {"text": "It imports a module", "is_correct": false},
                {"text": "It raises an exception", "is_correct": false}
            ]),
        ),
        "true_false" => (
            "True",
            json!([
                {"text": "True", "is_correct": true},
                {"text": "False", "is_correct": false}
            ]),
        ),
        _ => ("iteration", serde_json::Value::Null),
    };

    json!({
        "question_type": question_type,
        "text": text,
        "correct_answer": answer,
        "choices": choices,
        "explanation": explanation,
        "hint": "Re-read the paragraph about loops.",
        "difficulty": "easy"
    })
    .to_string()
}

#[async_trait]
impl AiProvider for StubProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<ProviderResponse, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        let text = if system_prompt == CONTENT_ANALYZER_PROMPT {
            analysis_reply()
        } else {
            question_reply(
                prompt_field(user_prompt, "Question type:"),
                prompt_field(user_prompt, "Key concept to test:"),
                call,
            )
        };

        Ok(ProviderResponse {
            text,
            tokens_used: 100,
            latency_ms: 1,
        })
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Fails every call with the same error.
pub struct FailingProvider(pub ProviderError);

#[async_trait]
impl AiProvider for FailingProvider {
    async fn generate(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<ProviderResponse, ProviderError> {
        Err(self.0.clone())
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Reviewer that rejects everything it sees.
pub struct RejectEverything;

impl QualityReview for RejectEverything {
    fn review(
        &self,
        questions: &[GeneratedQuestion],
        _analysis: &ContentAnalysis,
    ) -> QualityReviewResult {
        QualityReviewResult {
            overall_score: 0.0,
            issues: vec![],
            suggestions: vec![],
            difficulty_distribution: DifficultyCounts::from_difficulties(
                questions.iter().map(|q| q.difficulty),
            ),
            coverage_gaps: vec![],
            flagged_questions: (0..questions.len()).collect(),
        }
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        timeout: Duration::from_secs(2),
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
    }
}

pub fn orchestrator(provider: Arc<dyn AiProvider>) -> QuizOrchestrator {
    let gateway = Arc::new(ProviderGateway::new(
        provider,
        fast_retry(),
        GenerationConfig::default(),
    ));
    QuizOrchestrator::new(gateway, &PipelineSettings::default())
}
