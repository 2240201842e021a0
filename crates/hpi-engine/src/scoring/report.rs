use super::calculator::{CompositeIndex, ScoreBand};
use super::normalizer::NormalizedMetrics;
use super::radar::RadarChart;
use super::registry::MetricRegistry;
use super::snapshot::Snapshot;
use super::trend::{Direction, TrendDelta, TrendResult};
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Serialize)]
pub struct DomainReportEntry {
    pub domain: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    pub raw_average: f64,
    pub score: f64,
    pub band: ScoreBand,
    pub band_label: &'static str,
    pub marker: &'static str,
    /// Weight the domain carried in the composite.
    pub weight: f64,
    pub share: f64,
}

/// Everything one assessment produces, handed to dashboards and the recommendation layer.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentReport {
    pub registry_version: String,
    pub snapshot: Snapshot,
    pub composite: CompositeIndex,
    pub composite_band: ScoreBand,
    pub composite_band_label: &'static str,
    pub domains: Vec<DomainReportEntry>,
    pub metrics: NormalizedMetrics,
    pub trend: TrendResult,
    pub radar: RadarChart,
}

impl AssessmentReport {
    pub(crate) fn assemble(
        registry: &MetricRegistry,
        snapshot: Snapshot,
        composite: CompositeIndex,
        metrics: NormalizedMetrics,
        trend: TrendResult,
        radar: RadarChart,
    ) -> Self {
        let domains = snapshot
            .scores()
            .iter()
            .map(|entry| {
                let spec = registry.domain(&entry.domain);
                let band = ScoreBand::from_score(entry.score);
                let weight = composite.weight_for(&entry.domain);
                DomainReportEntry {
                    domain: entry.domain.clone(),
                    label: spec
                        .map(|spec| spec.label.clone())
                        .unwrap_or_else(|| entry.domain.clone()),
                    emoji: spec.and_then(|spec| spec.emoji.clone()),
                    raw_average: entry.raw_average,
                    score: entry.score,
                    band,
                    band_label: band.label(),
                    marker: band.marker(),
                    weight: weight.map(|w| w.weight).unwrap_or(0.0),
                    share: weight.map(|w| w.share).unwrap_or(0.0),
                }
            })
            .collect();

        let composite_band = composite.band();
        Self {
            registry_version: registry.version.clone(),
            snapshot,
            composite,
            composite_band,
            composite_band_label: composite_band.label(),
            domains,
            metrics,
            trend,
            radar,
        }
    }

    pub fn domain(&self, domain: &str) -> Option<&DomainReportEntry> {
        self.domains.iter().find(|entry| entry.domain == domain)
    }

    /// Lowest-scoring domains first; ties keep canonical order.
    pub fn focus_domains(&self, limit: usize) -> Vec<&DomainReportEntry> {
        let mut ranked: Vec<&DomainReportEntry> = self.domains.iter().collect();
        ranked.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));
        ranked.truncate(limit);
        ranked
    }

    pub fn insights(&self) -> AssessmentInsights {
        let strengths = self
            .domains
            .iter()
            .filter(|entry| entry.band == ScoreBand::Excellent)
            .map(|entry| entry.label.clone())
            .collect();

        let focus_areas = self
            .focus_domains(3)
            .into_iter()
            .filter(|entry| entry.score < ScoreBand::Good.threshold())
            .map(|entry| format!("{} ({:.1})", entry.label, entry.score))
            .collect();

        let mut observations = Vec::new();
        match self.trend.composite.delta {
            TrendDelta::Available {
                delta, direction, ..
            } => observations.push(format!(
                "HPI {} by {:.1} points to {:.1}",
                direction.label(),
                delta.abs(),
                self.composite.value
            )),
            TrendDelta::Unavailable => {
                observations.push("First assessment recorded; no trend yet".to_string())
            }
        }

        let declined: Vec<&str> = self
            .trend
            .with_direction(Direction::Declined)
            .filter_map(|trend| self.domain(&trend.domain))
            .map(|entry| entry.label.as_str())
            .collect();
        if !declined.is_empty() {
            observations.push(format!("Declined since last assessment: {}", declined.join(", ")));
        }

        let gap = self.composite.mean - self.composite.value;
        if gap >= 10.0 {
            observations.push(format!(
                "Weakest domains pull the index {gap:.1} points below the plain average"
            ));
        }

        if !self.metrics.warnings.is_empty() {
            observations.push(format!(
                "{} metric(s) could not be mapped to the registry",
                self.metrics.warnings.len()
            ));
        }

        AssessmentInsights {
            composite: self.composite.value,
            band: self.composite_band,
            band_label: self.composite_band_label,
            marker: self.composite_band.marker(),
            strengths,
            focus_areas,
            observations,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessmentInsights {
    pub composite: f64,
    pub band: ScoreBand,
    pub band_label: &'static str,
    pub marker: &'static str,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strengths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub focus_areas: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observations: Vec<String>,
}
