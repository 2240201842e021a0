use super::calculator::{composite_index, CompositeIndex};
use super::error::EngineError;
use super::normalizer::DomainScore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed assessment. Immutable once built; history stores these verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    taken_at: DateTime<Utc>,
    scores: Vec<DomainScore>,
    composite: f64,
}

impl Snapshot {
    pub fn new(taken_at: DateTime<Utc>, scores: Vec<DomainScore>, composite: &CompositeIndex) -> Self {
        Self {
            taken_at,
            scores,
            composite: composite.value,
        }
    }

    /// Builds a snapshot, deriving the composite from the supplied scores.
    pub fn from_scores(taken_at: DateTime<Utc>, scores: Vec<DomainScore>) -> Result<Self, EngineError> {
        let composite = composite_index(&scores)?;
        Ok(Self::new(taken_at, scores, &composite))
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Domain scores in canonical order.
    pub fn scores(&self) -> &[DomainScore] {
        &self.scores
    }

    pub fn domain_score(&self, domain: &str) -> Option<&DomainScore> {
        self.scores.iter().find(|entry| entry.domain == domain)
    }

    pub fn score(&self, domain: &str) -> Option<f64> {
        self.domain_score(domain).map(|entry| entry.score)
    }

    pub fn composite(&self) -> f64 {
        self.composite
    }
}

/// Snapshots of one person, ascending by timestamp.
///
/// Deserialization goes through the same ordering check as [`MetricsHistory::push`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Snapshot>", into = "Vec<Snapshot>")]
pub struct MetricsHistory {
    snapshots: Vec<Snapshot>,
}

impl MetricsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshots(snapshots: Vec<Snapshot>) -> Result<Self, EngineError> {
        let mut history = Self::new();
        for snapshot in snapshots {
            history.push(snapshot)?;
        }
        Ok(history)
    }

    /// Appends a snapshot, rejecting one older than the current last entry.
    pub fn push(&mut self, snapshot: Snapshot) -> Result<(), EngineError> {
        if let Some(last) = self.snapshots.last() {
            if snapshot.taken_at < last.taken_at {
                return Err(EngineError::UnorderedHistory {
                    index: self.snapshots.len(),
                    taken_at: snapshot.taken_at,
                });
            }
        }
        self.snapshots.push(snapshot);
        Ok(())
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl TryFrom<Vec<Snapshot>> for MetricsHistory {
    type Error = EngineError;

    fn try_from(snapshots: Vec<Snapshot>) -> Result<Self, Self::Error> {
        Self::from_snapshots(snapshots)
    }
}

impl From<MetricsHistory> for Vec<Snapshot> {
    fn from(history: MetricsHistory) -> Self {
        history.snapshots
    }
}
