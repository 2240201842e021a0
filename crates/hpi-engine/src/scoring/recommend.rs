use super::calculator::ScoreBand;
use super::normalizer::NormalizedMetric;
use super::report::AssessmentReport;
use super::snapshot::MetricsHistory;
use super::trend::TrendDelta;
use serde::{Deserialize, Serialize};

/// Historical scores carried per focus domain.
pub const HISTORY_DEPTH: usize = 3;

/// Outbound hook to whatever writes recommendation text (an LLM client, a rules engine, a stub).
pub trait Recommender: Send + Sync {
    fn recommend(&self, request: &RecommendationRequest) -> Result<Recommendation, RecommendationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RecommendationError {
    #[error("recommendation request names no focus domains")]
    EmptyRequest,
    #[error("recommendation provider unavailable: {0}")]
    Unavailable(String),
    #[error("recommendation provider rejected the request: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusDomain {
    pub domain: String,
    pub label: String,
    pub current: f64,
    pub band: ScoreBand,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<NormalizedMetric>,
    /// Oldest first, at most [`HISTORY_DEPTH`] entries, current assessment excluded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<f64>,
}

/// Context a recommender receives: the composite picture plus the weakest domains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub composite: f64,
    pub composite_band: ScoreBand,
    pub composite_delta: TrendDelta,
    pub focus: Vec<FocusDomain>,
}

impl RecommendationRequest {
    /// Picks the `limit` lowest-scoring domains, worst first.
    pub fn from_report(report: &AssessmentReport, history: &MetricsHistory, limit: usize) -> Self {
        let stored = match history.snapshots().split_last() {
            Some((last, rest)) if last == &report.snapshot => rest,
            _ => history.snapshots(),
        };

        let focus = report
            .focus_domains(limit)
            .into_iter()
            .map(|entry| {
                let delta = report
                    .trend
                    .domain(&entry.domain)
                    .map(|trend| trend.delta)
                    .unwrap_or(TrendDelta::Unavailable);

                let past: Vec<f64> = stored
                    .iter()
                    .filter_map(|snapshot| snapshot.score(&entry.domain))
                    .collect();
                let recent = past[past.len().saturating_sub(HISTORY_DEPTH)..].to_vec();

                FocusDomain {
                    domain: entry.domain.clone(),
                    label: entry.label.clone(),
                    current: entry.score,
                    band: entry.band,
                    previous: delta.previous(),
                    change_percent: delta.change_percent(),
                    metrics: report.metrics.for_domain(&entry.domain).cloned().collect(),
                    history: recent,
                }
            })
            .collect();

        Self {
            composite: report.composite.value,
            composite_band: report.composite_band,
            composite_delta: report.trend.composite.delta,
            focus,
        }
    }

    /// Hands the request to a recommender, refusing empty requests up front.
    pub fn send(&self, recommender: &dyn Recommender) -> Result<Recommendation, RecommendationError> {
        if self.focus.is_empty() {
            return Err(RecommendationError::EmptyRequest);
        }
        recommender.recommend(self)
    }
}
