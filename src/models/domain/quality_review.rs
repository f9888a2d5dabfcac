use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::domain::difficulty::DifficultyCounts;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QualityIssue {
    /// Position in the question list the review was run against.
    pub question_index: usize,
    pub description: String,
    pub severity: Severity,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QualityReviewResult {
    pub overall_score: f64,
    pub issues: Vec<QualityIssue>,
    pub suggestions: Vec<String>,
    pub difficulty_distribution: DifficultyCounts,
    pub coverage_gaps: Vec<String>,
    pub flagged_questions: BTreeSet<usize>,
}

impl QualityReviewResult {
    /// Per-question score: 100 minus the weighted issues attached to that
    /// question, floored at zero.
    pub fn question_scores(&self, question_count: usize, weights: &SeverityWeights) -> Vec<f64> {
        let mut scores = vec![100.0; question_count];
        for issue in &self.issues {
            if let Some(score) = scores.get_mut(issue.question_index) {
                *score = (*score - weights.weight(issue.severity)).max(0.0);
            }
        }
        scores
    }
}

/// Penalty table keyed by severity.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SeverityWeights(BTreeMap<Severity, f64>);

impl Default for SeverityWeights {
    fn default() -> Self {
        Self(BTreeMap::from([
            (Severity::Low, 2.0),
            (Severity::Medium, 5.0),
            (Severity::High, 15.0),
        ]))
    }
}

impl SeverityWeights {
    pub fn new(weights: impl IntoIterator<Item = (Severity, f64)>) -> Self {
        Self(weights.into_iter().collect())
    }

    pub fn weight(&self, severity: Severity) -> f64 {
        self.0.get(&severity).copied().unwrap_or(0.0)
    }
}
