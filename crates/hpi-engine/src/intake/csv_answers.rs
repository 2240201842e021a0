use super::AnswerImportError;
use crate::scoring::RawAnswerSet;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Highest question number accepted in a sheet.
pub const MAX_QUESTION: usize = 64;

/// Long-format answer sheets: one `domain,question,answer` row per rating.
pub struct CsvAnswerImporter;

impl CsvAnswerImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<RawAnswerSet, AnswerImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Blank answers become missing ratings; gaps in question numbering do too.
    pub fn from_reader<R: Read>(reader: R) -> Result<RawAnswerSet, AnswerImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut domains: BTreeMap<String, BTreeMap<usize, Option<i64>>> = BTreeMap::new();
        let mut rows = 0usize;

        for record in csv_reader.deserialize::<AnswerRow>() {
            let row = record?;
            rows += 1;
            let line = rows as u64 + 1;

            if row.question == 0 || row.question > MAX_QUESTION {
                return Err(AnswerImportError::InvalidQuestion {
                    line,
                    domain: row.domain,
                });
            }

            let answers = domains.entry(row.domain.clone()).or_default();
            if answers.insert(row.question, row.answer).is_some() {
                return Err(AnswerImportError::DuplicateQuestion {
                    domain: row.domain,
                    question: row.question,
                });
            }
        }

        let mut set = RawAnswerSet::new();
        for (domain, answers) in domains {
            let count = answers.keys().next_back().copied().unwrap_or(0);
            let ordered = (1..=count)
                .map(|question| answers.get(&question).copied().flatten())
                .collect();
            set.insert(domain, ordered);
        }

        debug!(rows, domains = set.len(), "answer CSV parsed");
        Ok(set)
    }
}

#[derive(Debug, Deserialize)]
struct AnswerRow {
    domain: String,
    question: usize,
    #[serde(default)]
    answer: Option<i64>,
}
