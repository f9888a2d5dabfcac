use std::{collections::HashSet, sync::Arc};

use schemars::JsonSchema;
use serde::Deserialize;

use crate::{
    config::PipelineSettings,
    constants::prompts::{CLARIFICATION_PROMPT, QUESTION_GENERATOR_PROMPT},
    errors::PipelineError,
    models::domain::{Choice, ContentAnalysis, Difficulty, GeneratedQuestion, QuestionType},
    services::{
        agents::{excerpt, parse_agent_output, reply_text, schema_for},
        ai_provider::ProviderGateway,
        run_context::RunContext,
    },
};

/// Shape the provider is asked to return for one question.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct QuestionPayload {
    pub question_type: QuestionType,
    pub text: String,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub choices: Option<Vec<Choice>>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub hint: String,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

/// What one position in the quiz should contain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuestionSlot {
    pub concept: String,
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
}

impl QuestionSlot {
    /// Slot that would regenerate `question` in place.
    pub fn for_question(question: &GeneratedQuestion) -> Self {
        Self {
            concept: question.concept.clone(),
            question_type: question.question_type,
            difficulty: question.difficulty,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenerationOutcome {
    pub questions: Vec<GeneratedQuestion>,
    pub warnings: Vec<String>,
}

/// Second pipeline stage: one provider request per slot, with a single
/// targeted retry for a slot whose reply is unusable.
pub struct QuestionGenerator {
    gateway: Arc<ProviderGateway>,
    settings: PipelineSettings,
}

impl QuestionGenerator {
    pub fn new(gateway: Arc<ProviderGateway>, settings: &PipelineSettings) -> Self {
        Self {
            gateway,
            settings: settings.clone(),
        }
    }

    /// Cycles through the key concepts and the question-type rotation until
    /// `count` slots exist.
    pub fn plan(&self, analysis: &ContentAnalysis, count: usize) -> Vec<QuestionSlot> {
        if analysis.key_concepts.is_empty() {
            return Vec::new();
        }

        let rotation: &[QuestionType] = if self.settings.question_type_rotation.is_empty() {
            &[QuestionType::MultipleChoice]
        } else {
            &self.settings.question_type_rotation
        };
        let baseline = analysis.difficulty_level.baseline();

        (0..count)
            .map(|i| QuestionSlot {
                concept: analysis.key_concepts[i % analysis.key_concepts.len()].clone(),
                question_type: rotation[i % rotation.len()],
                difficulty: baseline,
            })
            .collect()
    }

    pub async fn generate(
        &self,
        ctx: &RunContext,
        analysis: &ContentAnalysis,
        source: &str,
        count: usize,
    ) -> Result<GenerationOutcome, PipelineError> {
        let mut outcome = GenerationOutcome::default();
        let mut taken: HashSet<String> = HashSet::new();

        for slot in self.plan(analysis, count) {
            ctx.ensure_active()?;
            match self.fill_slot(ctx, analysis, source, &slot, &taken).await? {
                Some(question) => {
                    taken.insert(question.text_key());
                    outcome.questions.push(question);
                }
                None => {
                    log::warn!(
                        "[{}] Dropped {} question for concept '{}'",
                        ctx.run_id(),
                        slot.question_type,
                        slot.concept
                    );
                    outcome
                        .warnings
                        .push(format!("dropped question for concept {}", slot.concept));
                }
            }
        }

        if outcome.questions.is_empty() {
            return Err(PipelineError::QuestionGeneration(format!(
                "no valid questions could be produced ({} requested)",
                count
            )));
        }

        log::info!(
            "[{}] Generated {}/{} questions",
            ctx.run_id(),
            outcome.questions.len(),
            count
        );
        Ok(outcome)
    }

    /// Replacement for a flagged question. `taken` holds the text keys of
    /// every question the replacement must not duplicate.
    pub async fn regenerate(
        &self,
        ctx: &RunContext,
        analysis: &ContentAnalysis,
        source: &str,
        slot: &QuestionSlot,
        taken: &HashSet<String>,
    ) -> Result<Option<GeneratedQuestion>, PipelineError> {
        self.fill_slot(ctx, analysis, source, slot, taken).await
    }

    async fn fill_slot(
        &self,
        ctx: &RunContext,
        analysis: &ContentAnalysis,
        source: &str,
        slot: &QuestionSlot,
        taken: &HashSet<String>,
    ) -> Result<Option<GeneratedQuestion>, PipelineError> {
        let base_prompt = self.build_user_prompt(analysis, source, slot);

        let reply = reply_text(
            self.gateway
                .generate(ctx, QUESTION_GENERATOR_PROMPT, &base_prompt)
                .await,
        )?;
        let problem = match reply.and_then(|text| self.accept(&text, slot, taken)) {
            Ok(question) => return Ok(Some(question)),
            Err(problem) => problem,
        };

        log::debug!(
            "[{}] Regenerating slot for '{}': {}",
            ctx.run_id(),
            slot.concept,
            problem
        );
        let retry_prompt = format!(
            "{}\n\n{}\nProblem with the previous reply: {}",
            base_prompt, CLARIFICATION_PROMPT, problem
        );
        let reply = reply_text(
            self.gateway
                .generate(ctx, QUESTION_GENERATOR_PROMPT, &retry_prompt)
                .await,
        )?;

        match reply.and_then(|text| self.accept(&text, slot, taken)) {
            Ok(question) => Ok(Some(question)),
            Err(problem) => {
                log::debug!(
                    "[{}] Slot for '{}' still invalid: {}",
                    ctx.run_id(),
                    slot.concept,
                    problem
                );
                Ok(None)
            }
        }
    }

    /// Turns a reply into a question that satisfies every structural
    /// invariant, or explains why it cannot.
    fn accept(
        &self,
        text: &str,
        slot: &QuestionSlot,
        taken: &HashSet<String>,
    ) -> Result<GeneratedQuestion, String> {
        let payload: QuestionPayload =
            parse_agent_output(text).map_err(|e| format!("invalid JSON: {}", e))?;

        if payload.question_type != slot.question_type {
            return Err(format!(
                "expected a {} question, got {}",
                slot.question_type, payload.question_type
            ));
        }

        let choices = match payload.choices {
            Some(choices) if slot.question_type.has_choices() && !choices.is_empty() => Some(
                choices
                    .into_iter()
                    .map(|c| Choice::new(c.text.trim(), c.is_correct))
                    .collect::<Vec<_>>(),
            ),
            _ => None,
        };

        let mut correct_answer = payload.correct_answer.trim().to_string();
        if correct_answer.is_empty() {
            if let Some(choice) = choices.iter().flatten().find(|c| c.is_correct) {
                correct_answer = choice.text.clone();
            }
        }

        let difficulty = payload.difficulty.unwrap_or(slot.difficulty);
        let question = GeneratedQuestion {
            question_type: payload.question_type,
            text: payload.text.trim().to_string(),
            correct_answer,
            choices,
            explanation: payload.explanation.trim().to_string(),
            hint: payload.hint.trim().to_string(),
            points: self.settings.points_table.points_for(difficulty),
            difficulty,
            concept: slot.concept.clone(),
        };

        question.validate().map_err(|e| e.to_string())?;

        if taken.contains(&question.text_key()) {
            return Err("duplicates an existing question".to_string());
        }

        Ok(question)
    }

    fn build_user_prompt(
        &self,
        analysis: &ContentAnalysis,
        source: &str,
        slot: &QuestionSlot,
    ) -> String {
        let objectives = analysis
            .learning_objectives
            .iter()
            .map(|o| format!("- {}", o))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Topic: {}\nOverall level: {}\nKey concept to test: {}\nQuestion type: {}\nTarget difficulty: {}\n\nLearning objectives:\n{}\n\nContent:\n{}\n\nRespond with JSON matching this schema:\n{}",
            analysis.topic,
            analysis.difficulty_level,
            slot.concept,
            slot.question_type,
            slot.difficulty,
            objectives,
            excerpt(source, self.settings.generation_excerpt_chars),
            schema_for::<QuestionPayload>()
        )
    }
}
