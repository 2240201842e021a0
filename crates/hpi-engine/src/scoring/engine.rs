use super::calculator::{composite_index, CompositeIndex};
use super::error::{EngineError, SchemaError};
use super::extractor::{extract_answers, RawAnswerSet};
use super::normalizer::{normalize_domain_scores, normalize_metrics, AuxiliaryMetric, DomainScore, NormalizedMetrics};
use super::radar::RadarChart;
use super::registry::MetricRegistry;
use super::report::AssessmentReport;
use super::snapshot::{MetricsHistory, Snapshot};
use super::trend::{DeltaSeries, TrendAnalyzer, TrendConfig, TrendResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Domain scores of one answer set together with their composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    pub scores: Vec<DomainScore>,
    pub composite: CompositeIndex,
}

impl Scorecard {
    pub fn snapshot(&self, taken_at: DateTime<Utc>) -> Snapshot {
        Snapshot::new(taken_at, self.scores.clone(), &self.composite)
    }
}

/// Stateless pipeline over one registry: extract, normalize, aggregate, compare.
pub struct HpiEngine {
    registry: MetricRegistry,
    analyzer: TrendAnalyzer,
}

impl HpiEngine {
    /// Rejects registries that fail [`MetricRegistry::validate`].
    pub fn new(registry: MetricRegistry, trend: TrendConfig) -> Result<Self, SchemaError> {
        registry.validate()?;
        Ok(Self {
            registry,
            analyzer: TrendAnalyzer::new(trend),
        })
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    pub fn trend_config(&self) -> &TrendConfig {
        self.analyzer.config()
    }

    pub fn score(&self, raw: &RawAnswerSet) -> Result<Scorecard, EngineError> {
        let extracted = extract_answers(raw, &self.registry)?;
        let scores = normalize_domain_scores(&extracted, &self.registry)?;
        let composite = composite_index(&scores)?;
        Ok(Scorecard { scores, composite })
    }

    pub fn normalize_metrics(&self, metrics: &[AuxiliaryMetric]) -> NormalizedMetrics {
        normalize_metrics(metrics, &self.registry)
    }

    pub fn trend(&self, current: &Snapshot, history: &MetricsHistory) -> Result<TrendResult, EngineError> {
        self.analyzer.analyze(current, history)
    }

    pub fn delta_series(
        &self,
        current: &Snapshot,
        history: &MetricsHistory,
    ) -> Result<DeltaSeries, EngineError> {
        self.analyzer.delta_series(current, history)
    }

    pub fn radar(&self, snapshot: &Snapshot) -> Result<RadarChart, EngineError> {
        RadarChart::from_snapshot(snapshot, &self.registry)
    }

    /// Runs the whole pipeline for one assessment against the supplied history.
    pub fn report(
        &self,
        raw: &RawAnswerSet,
        metrics: &[AuxiliaryMetric],
        taken_at: DateTime<Utc>,
        history: &MetricsHistory,
    ) -> Result<AssessmentReport, EngineError> {
        let scorecard = self.score(raw)?;
        let snapshot = scorecard.snapshot(taken_at);
        let normalized = self.normalize_metrics(metrics);
        let trend = self.trend(&snapshot, history)?;
        let radar = self.radar(&snapshot)?;

        info!(
            registry = %self.registry.version,
            composite = scorecard.composite.value,
            history = history.len(),
            "assessment scored"
        );

        Ok(AssessmentReport::assemble(
            &self.registry,
            snapshot,
            scorecard.composite,
            normalized,
            trend,
            radar,
        ))
    }
}

impl Default for HpiEngine {
    fn default() -> Self {
        Self {
            registry: MetricRegistry::standard(),
            analyzer: TrendAnalyzer::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::calculator::ScoreBand;
    use crate::scoring::recommend::{
        Recommendation, RecommendationError, RecommendationRequest, Recommender,
    };
    use crate::scoring::trend::{Direction, TrendDelta};
    use chrono::TimeZone;
    use std::sync::Mutex;

    fn at(month: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, month, 1, 12, 0, 0).unwrap()
    }

    /// Answers scoring friends low and career high; reverse-scored questions set to their best.
    fn answers(friends: i64, others: i64) -> RawAnswerSet {
        let registry = MetricRegistry::standard();
        registry
            .domains()
            .iter()
            .map(|domain| {
                let value = if domain.key == "friends" { friends } else { others };
                let answers = (1..=domain.question_count)
                    .map(|question| {
                        if domain.is_reverse_scored(question) {
                            registry.scale.reflect(value as u8) as i64
                        } else {
                            value
                        }
                    })
                    .collect();
                (domain.key.clone(), answers)
            })
            .collect()
    }

    #[test]
    fn score_runs_extract_normalize_and_aggregate() {
        let engine = HpiEngine::default();

        let scorecard = engine.score(&answers(1, 4)).expect("scored");

        assert_eq!(scorecard.scores.len(), 8);
        assert!(scorecard.scores.iter().all(|s| (0.0..=100.0).contains(&s.score)));
        let friends = scorecard
            .scores
            .iter()
            .find(|s| s.domain == "friends")
            .expect("friends");
        assert_eq!(friends.score, 0.0);
        // Friends carries the top weight 34 of 87; the other seven score 100.
        assert!((scorecard.composite.value - 5300.0 / 87.0).abs() < 1e-9);
        assert_eq!(scorecard.composite.mean, 87.5);
    }

    #[test]
    fn engine_rejects_an_invalid_registry() {
        let mut registry = MetricRegistry::standard();
        registry.scale.max = registry.scale.min;

        assert!(matches!(
            HpiEngine::new(registry, TrendConfig::default()),
            Err(SchemaError::InvalidAnswerScale { .. })
        ));
        assert!(HpiEngine::new(MetricRegistry::standard(), TrendConfig::default()).is_ok());
    }

    #[test]
    fn identical_input_scores_identically() {
        let engine = HpiEngine::default();
        let first = engine.score(&answers(2, 3)).expect("first");
        let second = engine.score(&answers(2, 3)).expect("second");
        assert_eq!(first.composite.value.to_bits(), second.composite.value.to_bits());
        assert_eq!(first, second);
    }

    #[test]
    fn report_combines_every_stage() {
        let engine = HpiEngine::default();
        let previous = engine.score(&answers(3, 3)).expect("previous").snapshot(at(1));
        let history = MetricsHistory::from_snapshots(vec![previous]).expect("history");
        let metrics = vec![
            AuxiliaryMetric::new("Встречи с друзьями в месяц").with_values(2.0, 6.0),
            AuxiliaryMetric::new("Volunteer hours").in_domain("friends"),
        ];

        let report = engine
            .report(&answers(1, 4), &metrics, at(2), &history)
            .expect("report");

        assert_eq!(report.registry_version, "standard-v1");
        assert_eq!(report.radar.axes.len(), 8);
        assert_eq!(report.metrics.warnings.len(), 1);
        assert_eq!(report.composite_band, ScoreBand::Good);

        let friends = report.domain("friends").expect("friends entry");
        assert_eq!(friends.band, ScoreBand::NeedsAttention);
        assert_eq!(friends.weight, 34.0);
        assert_eq!(
            report.trend.domain("friends").and_then(|t| t.delta.direction()),
            Some(Direction::Declined)
        );
        assert_eq!(
            report.trend.domain("career").and_then(|t| t.delta.direction()),
            Some(Direction::Improved)
        );

        let focus = report.focus_domains(2);
        assert_eq!(focus[0].domain, "friends");
        assert_eq!(focus[1].domain, "relations_love");

        let insights = report.insights();
        assert_eq!(insights.strengths.len(), 7);
        assert_eq!(insights.focus_areas, vec!["Friends (0.0)".to_string()]);
        assert!(insights.observations[0].starts_with("HPI declined"));
        assert!(insights
            .observations
            .iter()
            .any(|line| line == "Declined since last assessment: Friends"));
    }

    #[test]
    fn report_json_exposes_bands_and_trend_status() {
        let engine = HpiEngine::default();
        let report = engine
            .report(&answers(2, 2), &[], at(3), &MetricsHistory::new())
            .expect("report");

        let json = serde_json::to_value(&report).expect("serializes");
        assert_eq!(json["composite_band"], "needs_attention");
        assert_eq!(json["trend"]["composite"]["delta"]["status"], "unavailable");
        assert_eq!(json["domains"][0]["band_label"], "Needs attention");
        assert!(json["metrics"].get("warnings").is_none());
    }

    #[test]
    fn invalid_answers_stop_the_pipeline() {
        let engine = HpiEngine::default();
        let raw = answers(2, 2).with_answers("career", &[2, 2, 9, 2, 2, 2]);
        assert!(matches!(
            engine.report(&raw, &[], at(3), &MetricsHistory::new()),
            Err(EngineError::Validation(_))
        ));
    }

    #[derive(Default)]
    struct RecordingRecommender {
        requests: Mutex<Vec<RecommendationRequest>>,
    }

    impl Recommender for RecordingRecommender {
        fn recommend(
            &self,
            request: &RecommendationRequest,
        ) -> Result<Recommendation, RecommendationError> {
            self.requests.lock().expect("lock").push(request.clone());
            let domains: Vec<String> = request.focus.iter().map(|f| f.domain.clone()).collect();
            Ok(Recommendation {
                text: format!("Focus on {}", domains.join(", ")),
                domains,
            })
        }
    }

    struct OfflineRecommender;

    impl Recommender for OfflineRecommender {
        fn recommend(
            &self,
            _request: &RecommendationRequest,
        ) -> Result<Recommendation, RecommendationError> {
            Err(RecommendationError::Unavailable("offline".to_string()))
        }
    }

    #[test]
    fn recommendation_request_carries_focus_context() {
        let engine = HpiEngine::default();
        let snapshots = vec![
            engine.score(&answers(4, 3)).expect("jan").snapshot(at(1)),
            engine.score(&answers(3, 3)).expect("feb").snapshot(at(2)),
            engine.score(&answers(2, 3)).expect("mar").snapshot(at(3)),
            engine.score(&answers(2, 3)).expect("apr").snapshot(at(4)),
        ];
        let history = MetricsHistory::from_snapshots(snapshots).expect("history");
        let metrics = vec![AuxiliaryMetric::new("friend_meetups_per_month").with_values(3.0, 6.0)];

        let report = engine
            .report(&answers(1, 3), &metrics, at(5), &history)
            .expect("report");
        let request = RecommendationRequest::from_report(&report, &history, 3);

        assert_eq!(request.focus.len(), 3);
        let friends = &request.focus[0];
        assert_eq!(friends.domain, "friends");
        assert_eq!(friends.current, 0.0);
        assert!((friends.previous.expect("previous score") - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(friends.change_percent, Some(-100.0));
        assert_eq!(friends.history.len(), 3);
        assert_eq!(friends.metrics.len(), 1);
        assert!(matches!(request.composite_delta, TrendDelta::Available { .. }));

        let recorder = RecordingRecommender::default();
        let recommendation = request.send(&recorder).expect("recommendation");
        assert!(recommendation.text.starts_with("Focus on friends"));
        assert_eq!(recorder.requests.lock().expect("lock").len(), 1);

        assert!(matches!(
            request.send(&OfflineRecommender),
            Err(RecommendationError::Unavailable(_))
        ));
    }

    #[test]
    fn request_history_keeps_earlier_snapshots_sharing_the_current_time() {
        let engine = HpiEngine::default();
        let mut history = MetricsHistory::from_snapshots(vec![
            engine.score(&answers(2, 3)).expect("mar").snapshot(at(3)),
            engine.score(&answers(3, 3)).expect("apr").snapshot(at(4)),
        ])
        .expect("history");

        let report = engine
            .report(&answers(1, 3), &[], at(4), &history)
            .expect("report");
        let friends = report.trend.domain("friends").expect("friends trend");
        assert!((friends.delta.delta().expect("delta") + 200.0 / 3.0).abs() < 1e-9);

        let request = RecommendationRequest::from_report(&report, &history, 1);
        assert_eq!(request.focus[0].history.len(), 2);

        history.push(report.snapshot.clone()).expect("persisted");
        let request = RecommendationRequest::from_report(&report, &history, 1);
        assert_eq!(request.focus[0].history.len(), 2);
    }

    #[test]
    fn empty_request_never_reaches_recommender() {
        let engine = HpiEngine::default();
        let report = engine
            .report(&answers(2, 2), &[], at(3), &MetricsHistory::new())
            .expect("report");
        let request = RecommendationRequest::from_report(&report, &MetricsHistory::new(), 0);

        let recorder = RecordingRecommender::default();
        assert!(matches!(
            request.send(&recorder),
            Err(RecommendationError::EmptyRequest)
        ));
        assert!(recorder.requests.lock().expect("lock").is_empty());
    }
}
