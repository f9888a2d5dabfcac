use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Difficulty of a single question. Ordered easy < medium < hard so that
/// neighbouring tiers can be found by index.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn index(self) -> usize {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// One tier towards `target`, never skipping a tier.
    pub fn step_towards(self, target: Difficulty) -> Difficulty {
        use std::cmp::Ordering;
        match self.cmp(&target) {
            Ordering::Less => Self::ALL[self.index() + 1],
            Ordering::Greater => Self::ALL[self.index() - 1],
            Ordering::Equal => self,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

/// Overall level of a piece of content, as judged by the analyzer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl DifficultyLevel {
    /// The question difficulty used as the starting hint for generation.
    pub fn baseline(self) -> Difficulty {
        match self {
            DifficultyLevel::Beginner => Difficulty::Easy,
            DifficultyLevel::Intermediate => Difficulty::Medium,
            DifficultyLevel::Advanced => Difficulty::Hard,
        }
    }
}

impl std::fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DifficultyLevel::Beginner => write!(f, "beginner"),
            DifficultyLevel::Intermediate => write!(f, "intermediate"),
            DifficultyLevel::Advanced => write!(f, "advanced"),
        }
    }
}

/// Percentages per difficulty. Must sum to 100 when used as a target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct DifficultyDistribution {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

impl Default for DifficultyDistribution {
    fn default() -> Self {
        Self {
            easy: 30,
            medium: 50,
            hard: 20,
        }
    }
}

impl DifficultyDistribution {
    pub fn new(easy: u32, medium: u32, hard: u32) -> Self {
        Self { easy, medium, hard }
    }

    pub fn percentage(&self, difficulty: Difficulty) -> u32 {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }

    /// Sum of the three percentages, widened so out-of-range values from a
    /// deserialized request cannot overflow.
    pub fn total(&self) -> u64 {
        u64::from(self.easy) + u64::from(self.medium) + u64::from(self.hard)
    }

    pub fn is_valid_target(&self) -> bool {
        self.total() == 100
    }

    /// Applies the percentages to `total` questions, rounding each bucket to
    /// the nearest integer and folding any rounding drift into the largest
    /// bucket so the counts always add up to `total`.
    pub fn target_counts(&self, total: usize) -> DifficultyCounts {
        let mut counts = [0i64; 3];
        for difficulty in Difficulty::ALL {
            let exact = self.percentage(difficulty) as f64 * total as f64 / 100.0;
            counts[difficulty.index()] = exact.round() as i64;
        }

        let drift = total as i64 - counts.iter().sum::<i64>();
        if drift != 0 {
            let largest = Difficulty::ALL
                .iter()
                .copied()
                .max_by_key(|d| (self.percentage(*d), std::cmp::Reverse(d.index())))
                .unwrap_or(Difficulty::Medium);
            counts[largest.index()] = (counts[largest.index()] + drift).max(0);
        }

        DifficultyCounts {
            easy: counts[0] as usize,
            medium: counts[1] as usize,
            hard: counts[2] as usize,
        }
    }
}

/// Observed number of questions per difficulty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DifficultyCounts {
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
}

impl DifficultyCounts {
    pub fn from_difficulties(difficulties: impl IntoIterator<Item = Difficulty>) -> Self {
        let mut counts = Self::default();
        for difficulty in difficulties {
            *counts.get_mut(difficulty) += 1;
        }
        counts
    }

    pub fn get(&self, difficulty: Difficulty) -> usize {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }

    pub fn get_mut(&mut self, difficulty: Difficulty) -> &mut usize {
        match difficulty {
            Difficulty::Easy => &mut self.easy,
            Difficulty::Medium => &mut self.medium,
            Difficulty::Hard => &mut self.hard,
        }
    }

    pub fn total(&self) -> usize {
        self.easy + self.medium + self.hard
    }

    /// True when every bucket is within `tolerance` questions of `target`.
    pub fn within(&self, target: &DifficultyCounts, tolerance: usize) -> bool {
        Difficulty::ALL
            .iter()
            .all(|d| self.get(*d).abs_diff(target.get(*d)) <= tolerance)
    }
}

/// Points awarded per difficulty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct PointsTable {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

impl Default for PointsTable {
    fn default() -> Self {
        Self {
            easy: 5,
            medium: 10,
            hard: 15,
        }
    }
}

impl PointsTable {
    pub fn points_for(&self, difficulty: Difficulty) -> u32 {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_of_huge_percentages_does_not_overflow() {
        let distribution = DifficultyDistribution::new(u32::MAX, 1, 0);
        assert_eq!(distribution.total(), u64::from(u32::MAX) + 1);
        assert!(!distribution.is_valid_target());
    }

    #[test]
    fn target_counts_round_to_nearest() {
        let target = DifficultyDistribution::new(40, 40, 20);
        assert_eq!(
            target.target_counts(5),
            DifficultyCounts {
                easy: 2,
                medium: 2,
                hard: 1
            }
        );
    }

    #[test]
    fn target_counts_fold_drift_into_largest_bucket() {
        // 30/50/20 of 7 rounds to 2/4/1 = 7, of 3 rounds to 1/2/1 = 4
        let target = DifficultyDistribution::default();
        let counts = target.target_counts(3);
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.medium, 1);

        let counts = target.target_counts(7);
        assert_eq!(counts.total(), 7);
    }

    #[test]
    fn target_counts_handle_even_split() {
        let target = DifficultyDistribution::new(34, 33, 33);
        for total in 0..30 {
            assert_eq!(target.target_counts(total).total(), total);
        }
    }

    #[test]
    fn step_towards_never_skips_a_tier() {
        assert_eq!(Difficulty::Easy.step_towards(Difficulty::Hard), Difficulty::Medium);
        assert_eq!(Difficulty::Hard.step_towards(Difficulty::Easy), Difficulty::Medium);
        assert_eq!(Difficulty::Medium.step_towards(Difficulty::Medium), Difficulty::Medium);
    }

    #[test]
    fn difficulty_rejects_unknown_variant() {
        assert!(serde_json::from_str::<Difficulty>("\"extreme\"").is_err());
        assert_eq!(
            serde_json::from_str::<Difficulty>("\"hard\"").expect("valid variant"),
            Difficulty::Hard
        );
    }

    #[test]
    fn counts_within_tolerance() {
        let observed = DifficultyCounts {
            easy: 1,
            medium: 3,
            hard: 1,
        };
        let target = DifficultyCounts {
            easy: 2,
            medium: 2,
            hard: 1,
        };
        assert!(observed.within(&target, 1));
        assert!(!observed.within(&target, 0));
    }
}
