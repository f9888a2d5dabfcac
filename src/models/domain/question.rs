use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::domain::difficulty::Difficulty;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice, // Exactly one correct option, two or more options
    FillBlank,
    ShortAnswer,
    TrueFalse, // Exactly two options, one correct
}

impl QuestionType {
    pub fn has_choices(self) -> bool {
        matches!(self, QuestionType::MultipleChoice | QuestionType::TrueFalse)
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuestionType::MultipleChoice => write!(f, "multiple_choice"),
            QuestionType::FillBlank => write!(f, "fill_blank"),
            QuestionType::ShortAnswer => write!(f, "short_answer"),
            QuestionType::TrueFalse => write!(f, "true_false"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct Choice {
    pub text: String,
    pub is_correct: bool,
}

impl Choice {
    pub fn new(text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            text: text.into(),
            is_correct,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct GeneratedQuestion {
    pub question_type: QuestionType,
    pub text: String,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
    pub explanation: String,
    pub hint: String,
    pub points: u32,
    pub difficulty: Difficulty,
    /// Key concept this question was generated for. Internal bookkeeping for
    /// targeted regeneration; not part of the response schema.
    #[serde(default, skip_serializing)]
    pub concept: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuestionValidationError {
    #[error("question text is empty")]
    EmptyText,

    #[error("correct answer is empty")]
    EmptyAnswer,

    #[error("points must be positive")]
    ZeroPoints,

    #[error("{0} question requires choices")]
    MissingChoices(QuestionType),

    #[error("{0} question must not carry choices")]
    UnexpectedChoices(QuestionType),

    #[error("multiple choice question needs at least two choices, got {0}")]
    TooFewChoices(usize),

    #[error("true/false question needs exactly two choices, got {0}")]
    WrongChoiceCount(usize),

    #[error("expected exactly one correct choice, got {0}")]
    CorrectChoiceCount(usize),

    #[error("choice text is empty")]
    EmptyChoice,
}

impl GeneratedQuestion {
    /// Checks the structural invariants every accepted question must hold.
    pub fn validate(&self) -> Result<(), QuestionValidationError> {
        if self.text.trim().is_empty() {
            return Err(QuestionValidationError::EmptyText);
        }
        if self.correct_answer.trim().is_empty() {
            return Err(QuestionValidationError::EmptyAnswer);
        }
        if self.points == 0 {
            return Err(QuestionValidationError::ZeroPoints);
        }

        match (self.question_type.has_choices(), &self.choices) {
            (true, None) => Err(QuestionValidationError::MissingChoices(self.question_type)),
            (true, Some(choices)) if choices.is_empty() => {
                Err(QuestionValidationError::MissingChoices(self.question_type))
            }
            (false, Some(_)) => Err(QuestionValidationError::UnexpectedChoices(
                self.question_type,
            )),
            (false, None) => Ok(()),
            (true, Some(choices)) => self.validate_choices(choices),
        }
    }

    fn validate_choices(&self, choices: &[Choice]) -> Result<(), QuestionValidationError> {
        match self.question_type {
            QuestionType::TrueFalse if choices.len() != 2 => {
                return Err(QuestionValidationError::WrongChoiceCount(choices.len()))
            }
            QuestionType::MultipleChoice if choices.len() < 2 => {
                return Err(QuestionValidationError::TooFewChoices(choices.len()))
            }
            _ => {}
        }

        if choices.iter().any(|c| c.text.trim().is_empty()) {
            return Err(QuestionValidationError::EmptyChoice);
        }

        let correct = choices.iter().filter(|c| c.is_correct).count();
        if correct != 1 {
            return Err(QuestionValidationError::CorrectChoiceCount(correct));
        }

        Ok(())
    }

    pub fn correct_choice(&self) -> Option<&Choice> {
        self.choices
            .as_ref()
            .and_then(|choices| choices.iter().find(|c| c.is_correct))
    }

    /// Normalised text used for uniqueness checks.
    pub fn text_key(&self) -> String {
        normalize_text(&self.text)
    }
}

pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
