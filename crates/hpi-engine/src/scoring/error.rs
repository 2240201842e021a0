use chrono::{DateTime, Utc};

/// Malformed or out-of-range raw input. Question numbers are 1-based.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("domain `{domain}` is missing from the answer set")]
    MissingDomain { domain: String },
    #[error("domain `{domain}` was answered more than once")]
    DuplicateDomain { domain: String },
    #[error("domain `{domain}` expects {expected} answers but received {actual}")]
    AnswerCount {
        domain: String,
        expected: usize,
        actual: usize,
    },
    #[error("domain `{domain}` question {question} has no answer")]
    MissingAnswer { domain: String, question: usize },
    #[error("domain `{domain}` question {question}: answer {value} is outside {min}..={max}")]
    OutOfRange {
        domain: String,
        question: usize,
        value: i64,
        min: u8,
        max: u8,
    },
}

impl ValidationError {
    pub fn domain(&self) -> &str {
        match self {
            ValidationError::MissingDomain { domain }
            | ValidationError::DuplicateDomain { domain }
            | ValidationError::AnswerCount { domain, .. }
            | ValidationError::MissingAnswer { domain, .. }
            | ValidationError::OutOfRange { domain, .. } => domain,
        }
    }

    pub fn question(&self) -> Option<usize> {
        match self {
            ValidationError::MissingAnswer { question, .. }
            | ValidationError::OutOfRange { question, .. } => Some(*question),
            _ => None,
        }
    }
}

/// Domain or metric set that disagrees with the canonical registry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("registry declares no domains")]
    EmptyRegistry,
    #[error("`{domain}` is not a domain declared by the registry")]
    UnknownDomain { domain: String },
    #[error("registry declares domain `{domain}` more than once")]
    DuplicateDomain { domain: String },
    #[error("identifier `{identifier}` resolves to both `{first}` and `{second}`")]
    AmbiguousIdentifier {
        identifier: String,
        first: String,
        second: String,
    },
    #[error("domain `{domain}` declares {actual} questions; every domain must declare {expected}")]
    QuestionCountMismatch {
        domain: String,
        expected: usize,
        actual: usize,
    },
    #[error("domain `{domain}` marks question {question} as reverse-scored but has no such question")]
    ReverseQuestionOutOfRange { domain: String, question: usize },
    #[error("answer scale {min}..={max} must span at least two values")]
    InvalidAnswerScale { min: u8, max: u8 },
    #[error("answer values must be {expected} finite, strictly increasing numbers")]
    InvalidAnswerValues { expected: usize },
    #[error("metric `{metric}` has invalid bounds {min}..{max}")]
    InvalidMetricBounds { metric: String, min: f64, max: f64 },
    #[error("metric `{metric}` belongs to undeclared domain `{domain}`")]
    MetricDomain { metric: String, domain: String },
    #[error("alias `{alias}` points at undeclared metric `{target}`")]
    AliasTarget { alias: String, target: String },
    #[error("snapshot is missing declared domain `{domain}`")]
    SnapshotMissingDomain { domain: String },
}

/// Failure surfaced by any engine stage.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("cannot aggregate a composite index from zero domain scores")]
    InsufficientData,
    #[error("history snapshot {index} taken at {taken_at} precedes the snapshot before it")]
    UnorderedHistory {
        index: usize,
        taken_at: DateTime<Utc>,
    },
}

/// Non-fatal notice that an auxiliary metric name has no canonical form.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UnmappedMetricWarning {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl std::fmt::Display for UnmappedMetricWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.domain {
            Some(domain) => write!(
                f,
                "metric `{}` in domain `{}` has no canonical mapping",
                self.name, domain
            ),
            None => write!(f, "metric `{}` has no canonical mapping", self.name),
        }
    }
}
