//! Front-end formats converted into the strict [`RawAnswerSet`] representation.

mod csv_answers;
mod markdown;
mod metrics;

pub use csv_answers::CsvAnswerImporter;
pub use markdown::MarkdownAnswerImporter;
pub use metrics::MetricsImporter;

use crate::scoring::{MetricRegistry, RawAnswerSet};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum AnswerImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    InvalidQuestion { line: u64, domain: String },
    DuplicateQuestion { domain: String, question: usize },
    DuplicateSection { domain: String },
    UnsupportedFormat { path: PathBuf },
}

impl fmt::Display for AnswerImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerImportError::Io(err) => write!(f, "failed to read answers: {}", err),
            AnswerImportError::Csv(err) => write!(f, "invalid answer CSV data: {}", err),
            AnswerImportError::Json(err) => write!(f, "invalid answer JSON data: {}", err),
            AnswerImportError::InvalidQuestion { line, domain } => write!(
                f,
                "line {}: question numbers for `{}` run from 1 to {}",
                line,
                domain,
                csv_answers::MAX_QUESTION
            ),
            AnswerImportError::DuplicateQuestion { domain, question } => write!(
                f,
                "question {} of `{}` is answered more than once",
                question, domain
            ),
            AnswerImportError::DuplicateSection { domain } => {
                write!(f, "domain `{}` has more than one section", domain)
            }
            AnswerImportError::UnsupportedFormat { path } => write!(
                f,
                "cannot tell the answer format of {} (expected .csv, .md or .json)",
                path.display()
            ),
        }
    }
}

impl std::error::Error for AnswerImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnswerImportError::Io(err) => Some(err),
            AnswerImportError::Csv(err) => Some(err),
            AnswerImportError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AnswerImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for AnswerImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<serde_json::Error> for AnswerImportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerFormat {
    Csv,
    Markdown,
    Json,
}

impl AnswerFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Some(Self::Csv),
            "md" | "markdown" => Some(Self::Markdown),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Reads an answer file, picking the adapter from the file extension.
pub fn import_answers<P: AsRef<Path>>(
    path: P,
    registry: &MetricRegistry,
) -> Result<RawAnswerSet, AnswerImportError> {
    let path = path.as_ref();
    match AnswerFormat::from_path(path) {
        Some(AnswerFormat::Csv) => CsvAnswerImporter::from_path(path),
        Some(AnswerFormat::Markdown) => MarkdownAnswerImporter::from_path(path, registry),
        Some(AnswerFormat::Json) => {
            let file = std::fs::File::open(path)?;
            Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
        }
        None => Err(AnswerImportError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}
