use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    constants::prompts::CONTENT_ANALYZER_PROMPT,
    errors::ProviderError,
    models::domain::QuestionType,
    services::ai_provider::{AiProvider, GenerationConfig, ProviderResponse},
};

/// Replays a fixed list of replies in order and records every prompt it
/// receives. Runs out with a fatal error.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn from_texts(replies: Vec<&str>) -> Self {
        Self::new(replies.into_iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn user_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.iter().map(|(_, user)| user.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AiProvider for ScriptedProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<ProviderResponse, ProviderError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push((system_prompt.to_string(), user_prompt.to_string()));
        }

        let next = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front())
            .unwrap_or_else(|| Err(ProviderError::InvalidPrompt("script exhausted".to_string())));

        next.map(|text| ProviderResponse {
            tokens_used: text.len() as u64 / 4,
            text,
            latency_ms: 1,
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Answers any prompt the pipeline sends with a valid reply about Python
/// loops, after `delay`. Tracks how many calls overlap.
pub struct LoopsQuizProvider {
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl LoopsQuizProvider {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn reply(&self, system_prompt: &str, user_prompt: &str, call: usize) -> String {
        if system_prompt == CONTENT_ANALYZER_PROMPT {
            return fixtures::analysis_json(30);
        }

        let field = |label: &str| {
            user_prompt
                .lines()
                .find_map(|line| line.strip_prefix(label))
                .map(str::trim)
                .unwrap_or_default()
                .to_string()
        };
        let question_type: QuestionType =
            serde_json::from_value(serde_json::Value::String(field("Question type:")))
                .unwrap_or(QuestionType::ShortAnswer);
        let concept = field("Key concept to test:");

        fixtures::question_json(
            question_type,
            &format!("Question {} on the {} in Python?", call, concept),
            "easy",
        )
    }
}

#[async_trait]
impl AiProvider for LoopsQuizProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<ProviderResponse, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(ProviderResponse {
            text: self.reply(system_prompt, user_prompt, call),
            tokens_used: 50,
            latency_ms: self.delay.as_millis() as u64,
        })
    }

    fn name(&self) -> &'static str {
        "loops-stub"
    }
}

pub mod fixtures {
    use std::sync::Arc;

    use serde_json::json;

    use super::ScriptedProvider;
    use crate::{
        config::Config,
        errors::ProviderError,
        models::domain::{
            Choice, ContentAnalysis, Difficulty, DifficultyLevel, GeneratedQuestion, QuestionType,
        },
        services::ai_provider::{GenerationConfig, ProviderGateway},
    };

    pub fn scripted_gateway(replies: Vec<&str>) -> (Arc<ProviderGateway>, Arc<ScriptedProvider>) {
        scripted_gateway_with(replies.into_iter().map(|r| Ok(r.to_string())).collect())
    }

    /// Like `scripted_gateway`, but individual calls may fail.
    pub fn scripted_gateway_with(
        replies: Vec<Result<String, ProviderError>>,
    ) -> (Arc<ProviderGateway>, Arc<ScriptedProvider>) {
        let provider = Arc::new(ScriptedProvider::new(replies));
        let gateway = Arc::new(ProviderGateway::new(
            provider.clone(),
            Config::test_config().retry,
            GenerationConfig::default(),
        ));
        (gateway, provider)
    }

    pub fn analysis_json(minutes: i64) -> String {
        json!({
            "topic": "Python Loops",
            "difficulty_level": "beginner",
            "key_concepts": ["for loop", "while loop", "break statement"],
            "learning_objectives": ["Iterate over a list"],
            "prerequisite_knowledge": ["Variables"],
            "estimated_time_minutes": minutes
        })
        .to_string()
    }

    pub fn sample_analysis() -> ContentAnalysis {
        ContentAnalysis::new(
            "Python Loops",
            DifficultyLevel::Beginner,
            vec![
                "for loop".to_string(),
                "while loop".to_string(),
                "break statement".to_string(),
            ],
            vec!["Iterate over a list".to_string()],
            vec!["Variables".to_string()],
            30,
            10,
        )
    }

    /// A reply the question generator accepts for `question_type`.
    pub fn question_json(question_type: QuestionType, text: &str, difficulty: &str) -> String {
        let choices = match question_type {
            QuestionType::MultipleChoice => json!([
                {"text": "repeats a block", "is_correct": true},
                {"text": "defines a class", "is_correct": false},
                {"text": "imports a module", "is_correct": false},
                {"text": "raises an error", "is_correct": false}
            ]),
            QuestionType::TrueFalse => json!([
                {"text": "True", "is_correct": true},
                {"text": "False", "is_correct": false}
            ]),
            _ => serde_json::Value::Null,
        };
        let answer = match question_type {
            QuestionType::MultipleChoice => "repeats a block",
            QuestionType::TrueFalse => "True",
            _ => "iteration",
        };

        json!({
            "question_type": question_type,
            "text": text,
            "correct_answer": answer,
            "choices": choices,
            "explanation": "A loop runs its body once per iteration until its condition ends it.",
            "hint": "Think about repetition.",
            "points": 10,
            "difficulty": difficulty
        })
        .to_string()
    }

    pub fn short_answer(text: &str, difficulty: Difficulty) -> GeneratedQuestion {
        GeneratedQuestion {
            question_type: QuestionType::ShortAnswer,
            text: text.to_string(),
            correct_answer: "iteration".to_string(),
            choices: None,
            explanation: "Each pass through a loop body is called an iteration.".to_string(),
            hint: "Starts with i.".to_string(),
            points: 10,
            difficulty,
            concept: "for loop".to_string(),
        }
    }

    pub fn multiple_choice(text: &str, choices: Vec<(&str, bool)>) -> GeneratedQuestion {
        let choices: Vec<Choice> = choices
            .into_iter()
            .map(|(text, correct)| Choice::new(text, correct))
            .collect();
        let answer = choices
            .iter()
            .find(|c| c.is_correct)
            .map(|c| c.text.clone())
            .unwrap_or_default();

        GeneratedQuestion {
            question_type: QuestionType::MultipleChoice,
            text: text.to_string(),
            correct_answer: answer,
            choices: Some(choices),
            explanation: "The break statement exits the innermost loop immediately.".to_string(),
            hint: "It interrupts.".to_string(),
            points: 10,
            difficulty: Difficulty::Medium,
            concept: "break statement".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ai_provider::GenerationConfig;

    #[tokio::test]
    async fn scripted_provider_replays_in_order() {
        let provider = ScriptedProvider::from_texts(vec!["one", "two"]);
        let config = GenerationConfig::default();

        let first = provider.generate("s", "u1", &config).await.expect("first");
        let second = provider.generate("s", "u2", &config).await.expect("second");
        let third = provider.generate("s", "u3", &config).await;

        assert_eq!(first.text, "one");
        assert_eq!(second.text, "two");
        assert!(third.is_err());
        assert_eq!(provider.user_prompts(), vec!["u1", "u2", "u3"]);
    }

    #[tokio::test]
    async fn loops_provider_answers_the_requested_type() {
        let provider = LoopsQuizProvider::new(Duration::ZERO);
        let reply = provider
            .generate(
                "generator",
                "Key concept to test: while loop\nQuestion type: true_false\n",
                &GenerationConfig::default(),
            )
            .await
            .expect("reply");

        let value: serde_json::Value = serde_json::from_str(&reply.text).expect("json");
        assert_eq!(value["question_type"], "true_false");
        assert_eq!(value["text"], "Question 1 on the while loop in Python?");
        assert_eq!(provider.peak_in_flight(), 1);
    }
}
