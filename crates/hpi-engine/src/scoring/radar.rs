use super::error::{EngineError, SchemaError};
use super::registry::MetricRegistry;
use super::snapshot::Snapshot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarAxis {
    pub domain: String,
    pub label: String,
    pub short_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    pub score: f64,
}

/// Radial plot input: one axis per declared domain, in canonical order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarChart {
    pub axes: Vec<RadarAxis>,
}

impl RadarChart {
    /// Builds the chart for a snapshot. Every declared domain must be scored.
    pub fn from_snapshot(snapshot: &Snapshot, registry: &MetricRegistry) -> Result<Self, EngineError> {
        let axes = registry
            .domains()
            .iter()
            .map(|spec| {
                let score = snapshot
                    .score(&spec.key)
                    .ok_or_else(|| SchemaError::SnapshotMissingDomain {
                        domain: spec.key.clone(),
                    })?;
                Ok(RadarAxis {
                    domain: spec.key.clone(),
                    label: spec.label.clone(),
                    short_label: spec.short_label().to_string(),
                    emoji: spec.emoji.clone(),
                    score,
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        Ok(Self { axes })
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.axes.iter().map(|axis| axis.label.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.axes.iter().map(|axis| axis.score)
    }

    /// Axes with the first repeated at the end, closing the polygon.
    pub fn closed(&self) -> Vec<&RadarAxis> {
        self.axes.iter().chain(self.axes.first()).collect()
    }
}
