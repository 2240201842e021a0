use super::error::{EngineError, SchemaError, UnmappedMetricWarning};
use super::extractor::ExtractedAnswers;
use super::registry::MetricRegistry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Per-domain result of the normalizer: raw answer average and its 0-100 rescaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainScore {
    pub domain: String,
    pub raw_average: f64,
    pub score: f64,
}

/// Linear map of `value` from `min..=max` onto `0..=100`, clamped at both ends.
pub fn rescale(value: f64, min: f64, max: f64) -> f64 {
    ((value - min) / (max - min) * 100.0).clamp(0.0, 100.0)
}

/// Averages each domain's answer values (reverse-scored questions reflected first) and
/// rescales the average from the lowest to the highest answer value onto 0-100.
pub fn normalize_domain_scores(
    extracted: &ExtractedAnswers,
    registry: &MetricRegistry,
) -> Result<Vec<DomainScore>, EngineError> {
    let scale = registry.scale;
    let min = registry.answer_value(scale.min);
    let max = registry.answer_value(scale.max);

    extracted
        .domains
        .iter()
        .map(|entry| {
            let spec = registry
                .domain(&entry.domain)
                .ok_or_else(|| SchemaError::UnknownDomain {
                    domain: entry.domain.clone(),
                })?;
            if entry.answers.is_empty() {
                return Err(EngineError::InsufficientData);
            }

            let total: f64 = entry
                .answers
                .iter()
                .enumerate()
                .map(|(index, answer)| {
                    let value = if spec.is_reverse_scored(index + 1) {
                        scale.reflect(answer.value())
                    } else {
                        answer.value()
                    };
                    registry.answer_value(value)
                })
                .sum();

            let raw_average = total / entry.answers.len() as f64;
            let score = rescale(raw_average, min, max);
            debug!(domain = %entry.domain, raw_average, score, "domain normalized");

            Ok(DomainScore {
                domain: entry.domain.clone(),
                raw_average,
                score,
            })
        })
        .collect()
}

/// Free-form metric from the extended (PRO) section of a questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuxiliaryMetric {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl AuxiliaryMetric {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: None,
            current: None,
            target: None,
            previous: None,
            unit: None,
        }
    }

    pub fn in_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_values(mut self, current: f64, target: f64) -> Self {
        self.current = Some(current);
        self.target = Some(target);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingStatus {
    Mapped,
    Unmapped,
}

/// One metric value as supplied plus its rescaling, when bounds are known.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub raw: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized: Option<f64>,
    #[serde(default)]
    pub clamped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMetric {
    /// Canonical key, or the supplied name unchanged when unmapped.
    pub key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub status: MappingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<MetricValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<MetricValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<MetricValue>,
}

impl NormalizedMetric {
    /// Normalized distance still to cover before reaching the target.
    pub fn gap_to_target(&self) -> Option<f64> {
        let current = self.current.and_then(|value| value.normalized)?;
        let target = self.target.and_then(|value| value.normalized)?;
        Some(target - current)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMetrics {
    pub metrics: Vec<NormalizedMetric>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<UnmappedMetricWarning>,
}

impl NormalizedMetrics {
    pub fn for_domain<'a>(&'a self, domain: &'a str) -> impl Iterator<Item = &'a NormalizedMetric> {
        self.metrics
            .iter()
            .filter(move |metric| metric.domain.as_deref() == Some(domain))
    }
}

/// Resolves auxiliary metric names to canonical keys and rescales their values.
///
/// Out-of-bound values are clamped to the nearest bound and flagged; names missing from the
/// registry pass through unscaled with an [`UnmappedMetricWarning`].
pub fn normalize_metrics(metrics: &[AuxiliaryMetric], registry: &MetricRegistry) -> NormalizedMetrics {
    let mut normalized = NormalizedMetrics::default();

    for metric in metrics {
        let entry = match registry.resolve_metric(&metric.name) {
            Some(spec) => {
                let scale = |value: Option<f64>| {
                    finite(value).map(|raw| MetricValue {
                        raw,
                        normalized: Some(rescale(raw, spec.min, spec.max)),
                        clamped: raw < spec.min || raw > spec.max,
                    })
                };

                NormalizedMetric {
                    key: spec.key.clone(),
                    name: metric.name.clone(),
                    domain: Some(spec.domain.clone()),
                    label: Some(spec.label.clone()),
                    unit: metric.unit.clone().or_else(|| spec.unit.clone()),
                    status: MappingStatus::Mapped,
                    current: scale(metric.current),
                    target: scale(metric.target),
                    previous: scale(metric.previous),
                }
            }
            None => {
                let domain = metric.domain.as_deref().map(|identifier| {
                    registry
                        .resolve_domain(identifier)
                        .map(|spec| spec.key.clone())
                        .unwrap_or_else(|| identifier.to_string())
                });
                warn!(metric = %metric.name, domain = ?domain, "metric has no canonical mapping");
                normalized.warnings.push(UnmappedMetricWarning {
                    name: metric.name.clone(),
                    domain: domain.clone(),
                });

                let passthrough = |value: Option<f64>| {
                    finite(value).map(|raw| MetricValue {
                        raw,
                        normalized: None,
                        clamped: false,
                    })
                };

                NormalizedMetric {
                    key: metric.name.clone(),
                    name: metric.name.clone(),
                    domain,
                    label: None,
                    unit: metric.unit.clone(),
                    status: MappingStatus::Unmapped,
                    current: passthrough(metric.current),
                    target: passthrough(metric.target),
                    previous: passthrough(metric.previous),
                }
            }
        };

        normalized.metrics.push(entry);
    }

    normalized
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|raw| !raw.is_nan())
}
