use super::error::EngineError;
use super::snapshot::{MetricsHistory, Snapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_EPSILON: f64 = 1e-6;
pub const DEFAULT_ROLLING_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendConfig {
    /// Deltas within `±epsilon` count as unchanged.
    pub epsilon: f64,
    /// Number of snapshots, current included, in the moving average.
    pub rolling_window: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            rolling_window: DEFAULT_ROLLING_WINDOW,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Improved,
    Declined,
    Unchanged,
}

impl Direction {
    pub fn classify(delta: f64, epsilon: f64) -> Self {
        if delta > epsilon {
            Direction::Improved
        } else if delta < -epsilon {
            Direction::Declined
        } else {
            Direction::Unchanged
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::Improved => "improved",
            Direction::Declined => "declined",
            Direction::Unchanged => "unchanged",
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            Direction::Improved => "\u{2191}",
            Direction::Declined => "\u{2193}",
            Direction::Unchanged => "\u{2192}",
        }
    }
}

/// Change against the baseline snapshot. `Unavailable` when there is nothing to compare with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrendDelta {
    Unavailable,
    Available {
        previous: f64,
        delta: f64,
        direction: Direction,
        /// Absent when the baseline is zero.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        change_percent: Option<f64>,
    },
}

impl TrendDelta {
    pub fn between(previous: f64, current: f64, epsilon: f64) -> Self {
        let delta = current - previous;
        TrendDelta::Available {
            previous,
            delta,
            direction: Direction::classify(delta, epsilon),
            change_percent: (previous != 0.0).then(|| delta / previous * 100.0),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, TrendDelta::Available { .. })
    }

    pub fn delta(&self) -> Option<f64> {
        match self {
            TrendDelta::Available { delta, .. } => Some(*delta),
            TrendDelta::Unavailable => None,
        }
    }

    pub fn previous(&self) -> Option<f64> {
        match self {
            TrendDelta::Available { previous, .. } => Some(*previous),
            TrendDelta::Unavailable => None,
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            TrendDelta::Available { direction, .. } => Some(*direction),
            TrendDelta::Unavailable => None,
        }
    }

    pub fn change_percent(&self) -> Option<f64> {
        match self {
            TrendDelta::Available { change_percent, .. } => *change_percent,
            TrendDelta::Unavailable => None,
        }
    }
}

/// Simple moving average over the most recent snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingAverage {
    pub value: f64,
    pub window: usize,
    /// Snapshots that actually contributed.
    pub samples: usize,
    /// Fewer than `window` snapshots were available.
    pub partial: bool,
}

impl RollingAverage {
    fn over(values: &[f64], window: usize) -> Self {
        let samples = values.len();
        let value = if samples == 0 {
            0.0
        } else {
            values.iter().sum::<f64>() / samples as f64
        };
        Self {
            value,
            window,
            samples,
            partial: samples < window,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainTrend {
    pub domain: String,
    pub current: f64,
    pub delta: TrendDelta,
    pub rolling: RollingAverage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeTrend {
    pub current: f64,
    pub delta: TrendDelta,
    pub rolling: RollingAverage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub taken_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_taken_at: Option<DateTime<Utc>>,
    /// Snapshots in the analysed series, current included.
    pub series_length: usize,
    pub domains: Vec<DomainTrend>,
    pub composite: CompositeTrend,
}

impl TrendResult {
    pub fn domain(&self, domain: &str) -> Option<&DomainTrend> {
        self.domains.iter().find(|trend| trend.domain == domain)
    }

    pub fn with_direction(&self, direction: Direction) -> impl Iterator<Item = &DomainTrend> {
        self.domains
            .iter()
            .filter(move |trend| trend.delta.direction() == Some(direction))
    }
}

/// One snapshot's value in a chartable series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub taken_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Change from the previous snapshot, when both carry a value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSeries {
    pub domain: String,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaSeries {
    pub domains: Vec<DomainSeries>,
    pub composite: Vec<SeriesPoint>,
}

/// Compares the current snapshot with an ordered history. Never mutates the history.
pub struct TrendAnalyzer {
    config: TrendConfig,
}

impl TrendAnalyzer {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    pub fn analyze(
        &self,
        current: &Snapshot,
        history: &MetricsHistory,
    ) -> Result<TrendResult, EngineError> {
        let series = series(current, history)?;
        let baseline = series.len().checked_sub(2).map(|index| series[index]);
        let window = self.config.rolling_window.max(1);
        let recent = &series[series.len().saturating_sub(window)..];

        let domains = current
            .scores()
            .iter()
            .map(|entry| {
                let delta = baseline
                    .and_then(|snapshot| snapshot.score(&entry.domain))
                    .map(|previous| TrendDelta::between(previous, entry.score, self.config.epsilon))
                    .unwrap_or(TrendDelta::Unavailable);
                let values: Vec<f64> = recent
                    .iter()
                    .filter_map(|snapshot| snapshot.score(&entry.domain))
                    .collect();

                DomainTrend {
                    domain: entry.domain.clone(),
                    current: entry.score,
                    delta,
                    rolling: RollingAverage::over(&values, window),
                }
            })
            .collect();

        let composite_values: Vec<f64> = recent.iter().map(|snapshot| snapshot.composite()).collect();
        let composite = CompositeTrend {
            current: current.composite(),
            delta: baseline
                .map(|snapshot| {
                    TrendDelta::between(snapshot.composite(), current.composite(), self.config.epsilon)
                })
                .unwrap_or(TrendDelta::Unavailable),
            rolling: RollingAverage::over(&composite_values, window),
        };

        debug!(
            series_length = series.len(),
            has_baseline = baseline.is_some(),
            "trend analysed"
        );

        Ok(TrendResult {
            taken_at: current.taken_at(),
            baseline_taken_at: baseline.map(Snapshot::taken_at),
            series_length: series.len(),
            domains,
            composite,
        })
    }

    /// Per-snapshot scores and step deltas for every domain of the current snapshot.
    pub fn delta_series(
        &self,
        current: &Snapshot,
        history: &MetricsHistory,
    ) -> Result<DeltaSeries, EngineError> {
        let series = series(current, history)?;

        let domains = current
            .scores()
            .iter()
            .map(|entry| DomainSeries {
                domain: entry.domain.clone(),
                points: points(&series, |snapshot| snapshot.score(&entry.domain)),
            })
            .collect();
        let composite = points(&series, |snapshot| Some(snapshot.composite()));

        Ok(DeltaSeries { domains, composite })
    }
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new(TrendConfig::default())
    }
}

/// History followed by the current snapshot. A last history entry equal to the current
/// snapshot is the current snapshot already persisted and is not counted twice.
fn series<'a>(
    current: &'a Snapshot,
    history: &'a MetricsHistory,
) -> Result<Vec<&'a Snapshot>, EngineError> {
    let mut stored: &[Snapshot] = history.snapshots();
    if let Some((last, rest)) = stored.split_last() {
        if last == current {
            stored = rest;
        } else if current.taken_at() < last.taken_at() {
            return Err(EngineError::UnorderedHistory {
                index: stored.len(),
                taken_at: current.taken_at(),
            });
        }
    }

    let mut series: Vec<&Snapshot> = stored.iter().collect();
    series.push(current);
    Ok(series)
}

fn points<F>(series: &[&Snapshot], value: F) -> Vec<SeriesPoint>
where
    F: Fn(&Snapshot) -> Option<f64>,
{
    let mut previous: Option<f64> = None;
    series
        .iter()
        .map(|&snapshot| {
            let score = value(snapshot);
            let delta = match (previous, score) {
                (Some(before), Some(now)) => Some(now - before),
                _ => None,
            };
            previous = score;
            SeriesPoint {
                taken_at: snapshot.taken_at(),
                score,
                delta,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::normalizer::DomainScore;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 8, 30, 0).unwrap()
    }

    fn snapshot(day: u32, scores: &[(&str, f64)]) -> Snapshot {
        let scores = scores
            .iter()
            .map(|(domain, score)| DomainScore {
                domain: domain.to_string(),
                raw_average: 1.0 + score * 3.0 / 100.0,
                score: *score,
            })
            .collect();
        Snapshot::from_scores(at(day), scores).expect("snapshot")
    }

    fn history(snapshots: Vec<Snapshot>) -> MetricsHistory {
        MetricsHistory::from_snapshots(snapshots).expect("ordered history")
    }

    #[test]
    fn empty_history_reports_every_delta_unavailable() {
        let current = snapshot(10, &[("career", 60.0), ("wealth", 40.0)]);

        let result = TrendAnalyzer::default()
            .analyze(&current, &MetricsHistory::new())
            .expect("trend");

        assert!(result.domains.iter().all(|trend| trend.delta == TrendDelta::Unavailable));
        assert_eq!(result.composite.delta, TrendDelta::Unavailable);
        assert_eq!(result.baseline_taken_at, None);
        assert_eq!(result.series_length, 1);
        let rolling = result.domain("career").expect("career").rolling;
        assert_eq!(rolling.value, 60.0);
        assert_eq!(rolling.samples, 1);
        assert!(rolling.partial);
    }

    #[test]
    fn identical_snapshots_are_unchanged_everywhere() {
        let scores = [("career", 60.0), ("wealth", 40.0)];
        let past = history(vec![snapshot(1, &scores)]);
        let current = snapshot(8, &scores);

        let result = TrendAnalyzer::default().analyze(&current, &past).expect("trend");

        for trend in &result.domains {
            assert_eq!(trend.delta.delta(), Some(0.0));
            assert_eq!(trend.delta.direction(), Some(Direction::Unchanged));
        }
        assert_eq!(result.composite.delta.direction(), Some(Direction::Unchanged));
    }

    #[test]
    fn directions_follow_sign_of_delta() {
        let past = history(vec![snapshot(1, &[("career", 50.0), ("wealth", 80.0), ("friends", 30.0)])]);
        let current = snapshot(8, &[("career", 75.0), ("wealth", 60.0), ("friends", 30.0)]);

        let result = TrendAnalyzer::default().analyze(&current, &past).expect("trend");

        let career = result.domain("career").expect("career");
        assert_eq!(career.delta.delta(), Some(25.0));
        assert_eq!(career.delta.direction(), Some(Direction::Improved));
        assert_eq!(career.delta.change_percent(), Some(50.0));
        assert_eq!(
            result.domain("wealth").and_then(|t| t.delta.direction()),
            Some(Direction::Declined)
        );
        assert_eq!(result.with_direction(Direction::Unchanged).count(), 1);
        assert_eq!(result.baseline_taken_at, Some(at(1)));
    }

    #[test]
    fn epsilon_absorbs_tiny_changes() {
        let past = history(vec![snapshot(1, &[("career", 50.0)])]);
        let current = snapshot(2, &[("career", 50.000_000_1)]);

        let result = TrendAnalyzer::default().analyze(&current, &past).expect("trend");
        assert_eq!(
            result.domain("career").and_then(|t| t.delta.direction()),
            Some(Direction::Unchanged)
        );

        let strict = TrendAnalyzer::new(TrendConfig {
            epsilon: 0.0,
            rolling_window: 3,
        });
        let result = strict.analyze(&current, &past).expect("trend");
        assert_eq!(
            result.domain("career").and_then(|t| t.delta.direction()),
            Some(Direction::Improved)
        );
    }

    #[test]
    fn zero_baseline_has_no_percent_change() {
        let past = history(vec![snapshot(1, &[("career", 0.0)])]);
        let current = snapshot(2, &[("career", 20.0)]);

        let result = TrendAnalyzer::default().analyze(&current, &past).expect("trend");
        let delta = result.domain("career").expect("career").delta;
        assert_eq!(delta.delta(), Some(20.0));
        assert_eq!(delta.change_percent(), None);
    }

    #[test]
    fn domain_missing_from_baseline_is_unavailable() {
        let past = history(vec![snapshot(1, &[("career", 50.0)])]);
        let current = snapshot(2, &[("career", 55.0), ("hobbies", 70.0)]);

        let result = TrendAnalyzer::default().analyze(&current, &past).expect("trend");
        assert!(result.domain("career").expect("career").delta.is_available());
        assert_eq!(
            result.domain("hobbies").expect("hobbies").delta,
            TrendDelta::Unavailable
        );
    }

    #[test]
    fn persisted_current_snapshot_is_not_counted_twice() {
        let first = snapshot(1, &[("career", 40.0)]);
        let current = snapshot(9, &[("career", 70.0)]);
        let stored = history(vec![first, current.clone()]);

        let result = TrendAnalyzer::default().analyze(&current, &stored).expect("trend");
        assert_eq!(result.series_length, 2);
        assert_eq!(result.baseline_taken_at, Some(at(1)));
        assert_eq!(result.domain("career").and_then(|t| t.delta.delta()), Some(30.0));

        let only_current = history(vec![current.clone()]);
        let result = TrendAnalyzer::default()
            .analyze(&current, &only_current)
            .expect("trend");
        assert_eq!(result.composite.delta, TrendDelta::Unavailable);
    }

    #[test]
    fn distinct_snapshot_at_the_same_time_is_the_baseline() {
        let stored = history(vec![
            snapshot(1, &[("career", 40.0)]),
            snapshot(2, &[("career", 80.0)]),
        ]);
        let current = snapshot(2, &[("career", 50.0)]);

        let result = TrendAnalyzer::default().analyze(&current, &stored).expect("trend");

        assert_eq!(result.series_length, 3);
        assert_eq!(result.baseline_taken_at, Some(at(2)));
        let career = result.domain("career").expect("career");
        assert_eq!(career.delta.delta(), Some(-30.0));
        assert_eq!(career.delta.direction(), Some(Direction::Declined));

        let series = TrendAnalyzer::default()
            .delta_series(&current, &stored)
            .expect("series");
        assert_eq!(series.composite.len(), 3);
    }

    #[test]
    fn rolling_average_uses_last_window_snapshots() {
        let past = history(vec![
            snapshot(1, &[("career", 10.0)]),
            snapshot(2, &[("career", 20.0)]),
            snapshot(3, &[("career", 30.0)]),
        ]);
        let current = snapshot(4, &[("career", 60.0)]);

        let result = TrendAnalyzer::default().analyze(&current, &past).expect("trend");
        let rolling = result.domain("career").expect("career").rolling;
        assert_eq!(rolling.value, 110.0 / 3.0);
        assert_eq!(rolling.samples, 3);
        assert!(!rolling.partial);
        assert_eq!(result.composite.rolling.value, 110.0 / 3.0);

        let short = history(vec![snapshot(1, &[("career", 10.0)])]);
        let result = TrendAnalyzer::default().analyze(&current, &short).expect("trend");
        let rolling = result.domain("career").expect("career").rolling;
        assert_eq!(rolling.value, 35.0);
        assert_eq!(rolling.samples, 2);
        assert!(rolling.partial);
    }

    #[test]
    fn current_older_than_history_is_rejected() {
        let past = history(vec![snapshot(9, &[("career", 50.0)])]);
        let current = snapshot(3, &[("career", 55.0)]);

        assert!(matches!(
            TrendAnalyzer::default().analyze(&current, &past),
            Err(EngineError::UnorderedHistory { index: 1, .. })
        ));
    }

    #[test]
    fn delta_series_tracks_each_step() {
        let past = history(vec![
            snapshot(1, &[("career", 40.0)]),
            snapshot(2, &[("career", 50.0), ("hobbies", 30.0)]),
        ]);
        let current = snapshot(3, &[("career", 45.0), ("hobbies", 60.0)]);

        let series = TrendAnalyzer::default()
            .delta_series(&current, &past)
            .expect("series");

        let career: Vec<_> = series.domains[0].points.iter().map(|p| p.delta).collect();
        assert_eq!(career, vec![None, Some(10.0), Some(-5.0)]);
        let hobbies = &series.domains[1];
        assert_eq!(hobbies.domain, "hobbies");
        assert_eq!(hobbies.points[0].score, None);
        assert_eq!(hobbies.points[2].delta, Some(30.0));
        assert_eq!(series.composite.len(), 3);
        assert_eq!(past.len(), 2);
    }
}
