use serde::{Deserialize, Serialize};

/// Sum, count and mean over the non-negative values of a score column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub sum: f64,
    pub count: usize,
    /// `NaN` when no value contributed.
    pub mean: f64,
}

pub struct StatsHelper;

impl StatsHelper {
    /// Negative and missing scores are excluded from both sum and count.
    pub fn non_negative_summary<I>(scores: I) -> ScoreSummary
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let (sum, count) = scores
            .into_iter()
            .flatten()
            .filter(|score| *score >= 0.0)
            .fold((0.0, 0usize), |(sum, count), score| (sum + score, count + 1));
        ScoreSummary {
            sum,
            count,
            mean: sum / count as f64,
        }
    }

    /// Number of present scores at or above `threshold`.
    pub fn count_at_least<I>(scores: I, threshold: f64) -> usize
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        scores
            .into_iter()
            .flatten()
            .filter(|score| *score >= threshold)
            .count()
    }
}
