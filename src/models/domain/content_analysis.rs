use serde::{Deserialize, Serialize};

use crate::models::domain::difficulty::DifficultyLevel;

/// Structured view of a piece of educational content. Produced once per
/// pipeline run by the content analyzer and never modified afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ContentAnalysis {
    pub topic: String,
    pub difficulty_level: DifficultyLevel,
    /// Unique, in the order the analyzer reported them.
    pub key_concepts: Vec<String>,
    pub learning_objectives: Vec<String>,
    pub prerequisite_knowledge: Vec<String>,
    pub estimated_time_minutes: u32,
    pub recommended_question_count: u32,
}

impl ContentAnalysis {
    /// Builds an analysis, deduplicating key concepts (case-insensitively,
    /// first spelling wins) and dropping blank entries from every list.
    pub fn new(
        topic: impl Into<String>,
        difficulty_level: DifficultyLevel,
        key_concepts: Vec<String>,
        learning_objectives: Vec<String>,
        prerequisite_knowledge: Vec<String>,
        estimated_time_minutes: u32,
        recommended_question_count: u32,
    ) -> Self {
        Self {
            topic: topic.into().trim().to_string(),
            difficulty_level,
            key_concepts: unique_concepts(key_concepts),
            learning_objectives: non_blank(learning_objectives),
            prerequisite_knowledge: non_blank(prerequisite_knowledge),
            estimated_time_minutes,
            recommended_question_count,
        }
    }
}

fn unique_concepts(concepts: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    concepts
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .filter(|c| seen.insert(c.to_lowercase()))
        .collect()
}

fn non_blank(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
