use std::collections::{hash_map::Entry, BTreeSet, HashMap};

#[cfg(test)]
use mockall::automock;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    config::PipelineSettings,
    models::domain::{
        normalize_text, ContentAnalysis, DifficultyCounts, GeneratedQuestion, QualityIssue,
        QualityReviewResult, QuestionType, Severity, SeverityWeights,
    },
};

static AMBIGUOUS_WORDING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(all of the above|none of the above|both a and b|may or may not|sometimes|etc)\b")
        .expect("AMBIGUOUS_WORDING_REGEX is a valid regex")
});

const MIN_QUESTION_CHARS: usize = 10;
const MIN_EXPLANATION_CHARS: usize = 20;
const MIN_KEYWORD_CHARS: usize = 4;
const MIN_PLAUSIBLE_CHOICES: usize = 3;

/// Scores a question list. Implementations never mutate their inputs.
#[cfg_attr(test, automock)]
pub trait QualityReview: Send + Sync {
    fn review(
        &self,
        questions: &[GeneratedQuestion],
        analysis: &ContentAnalysis,
    ) -> QualityReviewResult;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum IssueKind {
    Duplicate,
    Structure,
    Wording,
    Explanation,
    Distractors,
}

impl IssueKind {
    fn suggestion(self) -> &'static str {
        match self {
            IssueKind::Duplicate => "Replace duplicated questions with ones that test other concepts",
            IssueKind::Structure => "Fix questions whose answer or choices are malformed",
            IssueKind::Wording => "Reword ambiguous questions and avoid all/none of the above options",
            IssueKind::Explanation => "Give every question an explanation of why the answer is correct",
            IssueKind::Distractors => "Write distinct, plausible distractors for multiple choice questions",
        }
    }
}

/// Deterministic reviewer: rule-based issue detection with severity-weighted
/// scoring.
pub struct QualityReviewer {
    weights: SeverityWeights,
}

impl QualityReviewer {
    pub fn new(settings: &PipelineSettings) -> Self {
        Self {
            weights: settings.severity_weights.clone(),
        }
    }

    fn inspect(
        &self,
        index: usize,
        question: &GeneratedQuestion,
        first_seen: &mut HashMap<String, usize>,
        found: &mut Vec<(IssueKind, QualityIssue)>,
    ) {
        let mut push = |kind: IssueKind, severity: Severity, description: String| {
            found.push((
                kind,
                QualityIssue {
                    question_index: index,
                    description,
                    severity,
                },
            ));
        };

        match first_seen.entry(question.text_key()) {
            Entry::Occupied(original) => push(
                IssueKind::Duplicate,
                Severity::High,
                format!("duplicates question {}", original.get()),
            ),
            Entry::Vacant(slot) => {
                slot.insert(index);
            }
        }

        if let Err(e) = question.validate() {
            push(IssueKind::Structure, Severity::High, e.to_string());
        }

        if question.text.trim().chars().count() < MIN_QUESTION_CHARS {
            push(
                IssueKind::Wording,
                Severity::Medium,
                "question text is too short to be unambiguous".to_string(),
            );
        }

        let choice_texts = question.choices.iter().flatten().map(|c| c.text.as_str());
        if std::iter::once(question.text.as_str())
            .chain(choice_texts)
            .any(|text| AMBIGUOUS_WORDING_REGEX.is_match(text))
        {
            push(
                IssueKind::Wording,
                Severity::Medium,
                "ambiguous wording".to_string(),
            );
        }

        let explanation = question.explanation.trim();
        if explanation.is_empty() {
            push(
                IssueKind::Explanation,
                Severity::Medium,
                "missing explanation".to_string(),
            );
        } else if explanation.chars().count() < MIN_EXPLANATION_CHARS
            || normalize_text(explanation) == normalize_text(&question.correct_answer)
        {
            push(
                IssueKind::Explanation,
                Severity::Low,
                "explanation is uninformative".to_string(),
            );
        }

        if question.question_type == QuestionType::MultipleChoice {
            if let Some(choices) = &question.choices {
                let answer = normalize_text(&question.correct_answer);
                let mut seen = BTreeSet::new();
                let duplicates = choices
                    .iter()
                    .filter(|c| !seen.insert(normalize_text(&c.text)))
                    .count();
                if duplicates > 0 {
                    push(
                        IssueKind::Distractors,
                        Severity::High,
                        format!("{} duplicate choice(s)", duplicates),
                    );
                }

                if choices
                    .iter()
                    .any(|c| !c.is_correct && normalize_text(&c.text) == answer)
                {
                    push(
                        IssueKind::Distractors,
                        Severity::High,
                        "a distractor matches the correct answer".to_string(),
                    );
                }

                if choices.len() < MIN_PLAUSIBLE_CHOICES {
                    push(
                        IssueKind::Distractors,
                        Severity::Low,
                        "too few distractors to be plausible".to_string(),
                    );
                }
            }
        }
    }
}

impl QualityReview for QualityReviewer {
    fn review(
        &self,
        questions: &[GeneratedQuestion],
        analysis: &ContentAnalysis,
    ) -> QualityReviewResult {
        let mut first_seen = HashMap::new();
        let mut found = Vec::new();
        for (index, question) in questions.iter().enumerate() {
            self.inspect(index, question, &mut first_seen, &mut found);
        }

        let penalty: f64 = found
            .iter()
            .map(|(_, issue)| self.weights.weight(issue.severity))
            .sum();
        let kinds: BTreeSet<IssueKind> = found.iter().map(|(kind, _)| *kind).collect();
        let issues: Vec<QualityIssue> = found.into_iter().map(|(_, issue)| issue).collect();

        let coverage_gaps = coverage_gaps(questions, &analysis.key_concepts);
        let mut suggestions: Vec<String> =
            kinds.iter().map(|k| k.suggestion().to_string()).collect();
        if !coverage_gaps.is_empty() {
            suggestions.push(format!(
                "Add questions covering: {}",
                coverage_gaps.join(", ")
            ));
        }

        let flagged_questions = issues
            .iter()
            .filter(|issue| issue.severity == Severity::High)
            .map(|issue| issue.question_index)
            .collect();

        QualityReviewResult {
            overall_score: (100.0 - penalty).max(0.0),
            issues,
            suggestions,
            difficulty_distribution: DifficultyCounts::from_difficulties(
                questions.iter().map(|q| q.difficulty),
            ),
            coverage_gaps,
            flagged_questions,
        }
    }
}

/// Key concepts no question text or explanation refers to. A concept counts
/// as covered when the whole phrase appears, or every keyword of at least
/// four characters does.
fn coverage_gaps(questions: &[GeneratedQuestion], key_concepts: &[String]) -> Vec<String> {
    let haystack = questions
        .iter()
        .map(|q| format!("{} {}", q.text, q.explanation))
        .collect::<Vec<_>>()
        .join(" ");
    let haystack = normalize_text(&haystack);

    key_concepts
        .iter()
        .filter(|concept| {
            let phrase = normalize_text(concept);
            if haystack.contains(&phrase) {
                return false;
            }
            let keywords: Vec<&str> = phrase
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| w.chars().count() >= MIN_KEYWORD_CHARS)
                .collect();
            keywords.is_empty() || !keywords.iter().all(|k| haystack.contains(k))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::domain::{Choice, Difficulty},
        test_utils::fixtures::{multiple_choice, sample_analysis, short_answer},
    };

    fn reviewer() -> QualityReviewer {
        QualityReviewer::new(&PipelineSettings::default())
    }

    fn clean_quiz() -> Vec<GeneratedQuestion> {
        vec![
            short_answer("What is one pass of a for loop called?", Difficulty::Easy),
            short_answer("What keeps a while loop running?", Difficulty::Medium),
            multiple_choice(
                "Which statement exits a loop early?",
                vec![("break", true), ("continue", false), ("pass", false), ("return", false)],
            ),
        ]
    }

    #[test]
    fn clean_questions_score_full_marks() {
        let review = reviewer().review(&clean_quiz(), &sample_analysis());

        assert_eq!(review.overall_score, 100.0);
        assert!(review.issues.is_empty());
        assert!(review.flagged_questions.is_empty());
        assert!(review.coverage_gaps.is_empty());
        assert_eq!(
            review.difficulty_distribution,
            DifficultyCounts {
                easy: 1,
                medium: 2,
                hard: 0
            }
        );
    }

    #[test]
    fn duplicate_text_flags_the_later_copy() {
        let mut questions = clean_quiz();
        questions.push(short_answer("what is one pass of a FOR loop called?", Difficulty::Hard));

        let review = reviewer().review(&questions, &sample_analysis());

        assert_eq!(review.flagged_questions, BTreeSet::from([3]));
        assert_eq!(review.overall_score, 85.0);
        assert_eq!(review.issues[0].description, "duplicates question 0");
    }

    #[test]
    fn ambiguous_options_are_penalised() {
        let questions = vec![multiple_choice(
            "Which statement exits a loop early?",
            vec![
                ("break", true),
                ("continue", false),
                ("None of the above", false),
            ],
        )];

        let review = reviewer().review(&questions, &sample_analysis());

        assert_eq!(review.issues.len(), 1);
        assert_eq!(review.issues[0].severity, Severity::Medium);
        assert_eq!(review.overall_score, 95.0);
        assert!(review.flagged_questions.is_empty());
    }

    #[test]
    fn duplicate_distractors_are_high_severity() {
        let questions = vec![multiple_choice(
            "Which statement exits a loop early?",
            vec![("break", true), ("pass", false), ("Pass", false), ("return", false)],
        )];

        let review = reviewer().review(&questions, &sample_analysis());

        assert!(review.flagged_questions.contains(&0));
        assert!(review
            .suggestions
            .iter()
            .any(|s| s.contains("plausible distractors")));
    }

    #[test]
    fn missing_and_thin_explanations() {
        let mut missing = short_answer("What is one pass of a for loop called?", Difficulty::Easy);
        missing.explanation = "  ".to_string();
        let mut thin = short_answer("What keeps a while loop running?", Difficulty::Easy);
        thin.explanation = "Iteration".to_string();

        let review = reviewer().review(&[missing, thin], &sample_analysis());

        let severities: Vec<Severity> = review.issues.iter().map(|i| i.severity).collect();
        assert_eq!(severities, vec![Severity::Medium, Severity::Low]);
        assert_eq!(review.overall_score, 93.0);
    }

    #[test]
    fn structurally_invalid_question_is_flagged() {
        let mut broken = multiple_choice(
            "Which statement exits a loop early?",
            vec![("break", true), ("continue", true), ("pass", false)],
        );
        broken.choices = Some(vec![Choice::new("break", true), Choice::new("exit", true)]);

        let review = reviewer().review(&[broken], &sample_analysis());
        assert!(review.flagged_questions.contains(&0));
    }

    #[test]
    fn reports_uncovered_concepts() {
        let questions = vec![short_answer(
            "What is one pass of a for loop called?",
            Difficulty::Easy,
        )];

        let review = reviewer().review(&questions, &sample_analysis());

        assert_eq!(review.coverage_gaps, vec!["while loop", "break statement"]);
        assert!(review
            .suggestions
            .iter()
            .any(|s| s == "Add questions covering: while loop, break statement"));
    }

    #[test]
    fn score_uses_configured_weights_and_floors_at_zero() {
        let settings = PipelineSettings {
            severity_weights: SeverityWeights::new([(Severity::High, 60.0)]),
            ..PipelineSettings::default()
        };
        let question = short_answer("What is one pass of a for loop called?", Difficulty::Easy);
        let questions = vec![question.clone(), question.clone(), question];

        let review = QualityReviewer::new(&settings).review(&questions, &sample_analysis());

        assert_eq!(review.overall_score, 0.0);
        assert_eq!(review.flagged_questions, BTreeSet::from([1, 2]));
    }
}
