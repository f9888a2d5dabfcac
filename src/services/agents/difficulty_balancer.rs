use std::cmp::Reverse;

use crate::{
    config::PipelineSettings,
    models::domain::{
        Difficulty, DifficultyCounts, DifficultyDistribution, GeneratedQuestion, PointsTable,
    },
};

/// Below this many questions the distribution is reported as observed.
pub const MIN_BALANCE_SAMPLE: usize = 3;

/// Buckets may end this many questions away from their target.
const TOLERANCE: usize = 1;

pub const INSUFFICIENT_SAMPLE_WARNING: &str = "insufficient sample for balancing";

#[derive(Clone, Debug, PartialEq)]
pub struct BalanceOutcome {
    pub questions: Vec<GeneratedQuestion>,
    /// Number of single-tier moves performed.
    pub reclassified: usize,
    pub warnings: Vec<String>,
}

pub struct DifficultyBalancer {
    points: PointsTable,
}

impl DifficultyBalancer {
    pub fn new(settings: &PipelineSettings) -> Self {
        Self {
            points: settings.points_table,
        }
    }

    /// Reclassifies questions one tier at a time until every bucket is within
    /// one question of `target`. `scores[i]` is the quality score of
    /// `questions[i]`; the weakest question in an over-full bucket moves
    /// first. Only `difficulty` and `points` are ever changed.
    pub fn balance(
        &self,
        mut questions: Vec<GeneratedQuestion>,
        target: &DifficultyDistribution,
        scores: &[f64],
    ) -> BalanceOutcome {
        if questions.len() < MIN_BALANCE_SAMPLE {
            return BalanceOutcome {
                questions,
                reclassified: 0,
                warnings: vec![INSUFFICIENT_SAMPLE_WARNING.to_string()],
            };
        }

        let wanted = target.target_counts(questions.len());
        let max_moves = questions.len() * Difficulty::ALL.len();
        let mut reclassified = 0;

        while reclassified < max_moves {
            let counts =
                DifficultyCounts::from_difficulties(questions.iter().map(|q| q.difficulty));
            if counts.within(&wanted, TOLERANCE) {
                break;
            }

            let Some((from, to)) = next_move(&counts, &wanted) else {
                break;
            };
            let Some(index) = weakest_in(&questions, from, scores) else {
                break;
            };

            let next = from.step_towards(to);
            let question = &mut questions[index];
            log::debug!(
                "Reclassifying question {} from {} to {}",
                index,
                question.difficulty,
                next
            );
            question.difficulty = next;
            question.points = self.points.points_for(next);
            reclassified += 1;
        }

        BalanceOutcome {
            questions,
            reclassified,
            warnings: Vec::new(),
        }
    }
}

/// The most under-filled bucket, and the over-full bucket to draw from.
/// Among equally over-full buckets the one nearest the deficit wins, so a
/// move never crosses a bucket that could have supplied it directly.
fn next_move(counts: &DifficultyCounts, wanted: &DifficultyCounts) -> Option<(Difficulty, Difficulty)> {
    let deficit = Difficulty::ALL
        .into_iter()
        .filter(|d| counts.get(*d) < wanted.get(*d))
        .max_by_key(|d| (wanted.get(*d) - counts.get(*d), Reverse(d.index())))?;

    let surplus = Difficulty::ALL
        .into_iter()
        .filter(|d| counts.get(*d) > wanted.get(*d))
        .max_by_key(|d| {
            (
                counts.get(*d) - wanted.get(*d),
                Reverse(d.index().abs_diff(deficit.index())),
            )
        })?;

    Some((surplus, deficit))
}

/// Lowest-scored question labelled `difficulty`; ties go to the later one.
fn weakest_in(questions: &[GeneratedQuestion], difficulty: Difficulty, scores: &[f64]) -> Option<usize> {
    questions
        .iter()
        .enumerate()
        .filter(|(_, q)| q.difficulty == difficulty)
        .map(|(i, _)| (i, scores.get(i).copied().unwrap_or(100.0)))
        .min_by(|(ia, a), (ib, b)| a.total_cmp(b).then(ib.cmp(ia)))
        .map(|(i, _)| i)
}
