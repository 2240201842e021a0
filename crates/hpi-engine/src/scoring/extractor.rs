use super::error::{EngineError, SchemaError, ValidationError};
use super::registry::{AnswerScale, MetricRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Loosely keyed answers as front-ends hand them over: domain identifier -> ratings in question
/// order, `None` marking an unanswered question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawAnswerSet {
    domains: BTreeMap<String, Vec<Option<i64>>>,
}

impl RawAnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        domain: impl Into<String>,
        answers: Vec<Option<i64>>,
    ) -> Option<Vec<Option<i64>>> {
        self.domains.insert(domain.into(), answers)
    }

    pub fn with_answers(mut self, domain: impl Into<String>, answers: &[i64]) -> Self {
        self.insert(domain, answers.iter().copied().map(Some).collect());
        self
    }

    pub fn get(&self, domain: &str) -> Option<&[Option<i64>]> {
        self.domains.get(domain).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Option<i64>])> {
        self.domains
            .iter()
            .map(|(domain, answers)| (domain.as_str(), answers.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl FromIterator<(String, Vec<i64>)> for RawAnswerSet {
    fn from_iter<T: IntoIterator<Item = (String, Vec<i64>)>>(iter: T) -> Self {
        let domains = iter
            .into_iter()
            .map(|(domain, answers)| (domain, answers.into_iter().map(Some).collect()))
            .collect();
        Self { domains }
    }
}

/// A validated rating inside the registry's answer scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Answer(u8);

impl Answer {
    pub fn new(value: i64, scale: AnswerScale) -> Option<Self> {
        if scale.contains(value) {
            u8::try_from(value).ok().map(Self)
        } else {
            None
        }
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

/// Validated answers of one domain, keyed by its canonical key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainAnswers {
    pub domain: String,
    pub answers: Vec<Answer>,
}

/// Extractor output: one entry per declared domain, in canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedAnswers {
    pub domains: Vec<DomainAnswers>,
}

impl ExtractedAnswers {
    pub fn get(&self, domain: &str) -> Option<&DomainAnswers> {
        self.domains.iter().find(|entry| entry.domain == domain)
    }
}

/// Validates a raw answer set against the registry and keys it canonically.
///
/// Unknown domains fail with [`SchemaError::UnknownDomain`]; a missing domain, a wrong answer
/// count, a blank or an out-of-range answer fail with the matching [`ValidationError`].
pub fn extract_answers(
    raw: &RawAnswerSet,
    registry: &MetricRegistry,
) -> Result<ExtractedAnswers, EngineError> {
    let declared = registry.domains();
    let mut slots: Vec<Option<&[Option<i64>]>> = vec![None; declared.len()];

    for (identifier, answers) in raw.iter() {
        let index = registry
            .resolve_domain_index(identifier)
            .ok_or_else(|| SchemaError::UnknownDomain {
                domain: identifier.to_string(),
            })?;

        if slots[index].replace(answers).is_some() {
            return Err(ValidationError::DuplicateDomain {
                domain: declared[index].key.clone(),
            }
            .into());
        }
    }

    let scale = registry.scale;
    let mut domains = Vec::with_capacity(declared.len());
    for (spec, slot) in declared.iter().zip(slots) {
        let raw_answers = slot.ok_or_else(|| ValidationError::MissingDomain {
            domain: spec.key.clone(),
        })?;

        if raw_answers.len() != spec.question_count {
            return Err(ValidationError::AnswerCount {
                domain: spec.key.clone(),
                expected: spec.question_count,
                actual: raw_answers.len(),
            }
            .into());
        }

        let mut answers = Vec::with_capacity(raw_answers.len());
        for (index, value) in raw_answers.iter().enumerate() {
            let question = index + 1;
            let value = value.ok_or_else(|| ValidationError::MissingAnswer {
                domain: spec.key.clone(),
                question,
            })?;
            let answer = Answer::new(value, scale).ok_or_else(|| ValidationError::OutOfRange {
                domain: spec.key.clone(),
                question,
                value,
                min: scale.min,
                max: scale.max,
            })?;
            answers.push(answer);
        }

        domains.push(DomainAnswers {
            domain: spec.key.clone(),
            answers,
        });
    }

    debug!(domains = domains.len(), "answer set extracted");
    Ok(ExtractedAnswers { domains })
}
