use super::error::EngineError;
use super::normalizer::DomainScore;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Qualitative bucket of a 0-100 score, as shown on dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Good,
    Satisfactory,
    NeedsAttention,
}

impl ScoreBand {
    pub fn ordered() -> [ScoreBand; 4] {
        [
            ScoreBand::Excellent,
            ScoreBand::Good,
            ScoreBand::Satisfactory,
            ScoreBand::NeedsAttention,
        ]
    }

    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            ScoreBand::Excellent
        } else if score >= 60.0 {
            ScoreBand::Good
        } else if score >= 40.0 {
            ScoreBand::Satisfactory
        } else {
            ScoreBand::NeedsAttention
        }
    }

    /// Inclusive lower bound of the band.
    pub fn threshold(&self) -> f64 {
        match self {
            ScoreBand::Excellent => 80.0,
            ScoreBand::Good => 60.0,
            ScoreBand::Satisfactory => 40.0,
            ScoreBand::NeedsAttention => 0.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "Excellent",
            ScoreBand::Good => "Good",
            ScoreBand::Satisfactory => "Satisfactory",
            ScoreBand::NeedsAttention => "Needs attention",
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "\u{1f7e2}",
            ScoreBand::Good => "\u{1f535}",
            ScoreBand::Satisfactory => "\u{1f7e1}",
            ScoreBand::NeedsAttention => "\u{1f534}",
        }
    }
}

/// One domain's contribution to the composite, so the blend can be audited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainWeight {
    pub domain: String,
    pub score: f64,
    /// 1 for the lowest score.
    pub rank: usize,
    pub weight: f64,
    /// Fraction of the total weight.
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeIndex {
    pub value: f64,
    /// Unweighted mean of the same scores.
    pub mean: f64,
    /// Contributions ordered by rank.
    pub weights: Vec<DomainWeight>,
}

impl CompositeIndex {
    pub fn band(&self) -> ScoreBand {
        ScoreBand::from_score(self.value)
    }

    pub fn weight_for(&self, domain: &str) -> Option<&DomainWeight> {
        self.weights.iter().find(|weight| weight.domain == domain)
    }
}

/// First `count` terms of `1, 2, 3, 5, 8, ...`, largest first.
pub fn fibonacci_weights(count: usize) -> Vec<f64> {
    let mut terms = Vec::with_capacity(count);
    let (mut current, mut next) = (1.0_f64, 2.0_f64);
    for _ in 0..count {
        terms.push(current);
        (current, next) = (next, current + next);
    }
    terms.reverse();
    terms
}

/// Blends domain scores into the composite index.
///
/// Scores are ranked ascending (ties keep their supplied order) and paired with
/// [`fibonacci_weights`], so the weakest domain pulls hardest on the result.
pub fn composite_index(scores: &[DomainScore]) -> Result<CompositeIndex, EngineError> {
    if scores.is_empty() {
        return Err(EngineError::InsufficientData);
    }

    let mut ranked: Vec<&DomainScore> = scores.iter().collect();
    ranked.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));

    let weights = fibonacci_weights(ranked.len());
    let total_weight: f64 = weights.iter().sum();
    let weighted_sum: f64 = ranked
        .iter()
        .zip(&weights)
        .map(|(entry, weight)| entry.score * weight)
        .sum();

    let lowest = ranked[0].score;
    let highest = ranked[ranked.len() - 1].score;
    let value = (weighted_sum / total_weight).clamp(lowest, highest);
    let mean = scores.iter().map(|entry| entry.score).sum::<f64>() / scores.len() as f64;

    let weights = ranked
        .iter()
        .zip(weights)
        .enumerate()
        .map(|(index, (entry, weight))| DomainWeight {
            domain: entry.domain.clone(),
            score: entry.score,
            rank: index + 1,
            weight,
            share: weight / total_weight,
        })
        .collect();

    debug!(value, mean, domains = scores.len(), "composite index calculated");
    Ok(CompositeIndex {
        value,
        mean,
        weights,
    })
}
