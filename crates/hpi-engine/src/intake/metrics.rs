use super::{AnswerFormat, AnswerImportError};
use crate::scoring::AuxiliaryMetric;
use std::io::Read;
use std::path::Path;

/// Loads extended-section metrics from CSV (`name,domain,current,target,previous,unit`) or a
/// JSON array.
pub struct MetricsImporter;

impl MetricsImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<AuxiliaryMetric>, AnswerImportError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        match AnswerFormat::from_path(path) {
            Some(AnswerFormat::Csv) => Self::from_csv_reader(file),
            Some(AnswerFormat::Json) => Ok(serde_json::from_reader(std::io::BufReader::new(file))?),
            _ => Err(AnswerImportError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Empty cells become absent values. Rows without a name are skipped.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Vec<AuxiliaryMetric>, AnswerImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut metrics = Vec::new();
        for record in csv_reader.deserialize::<AuxiliaryMetric>() {
            let mut metric = record?;
            if metric.name.is_empty() {
                continue;
            }
            metric.domain = metric.domain.filter(|domain| !domain.is_empty());
            metric.unit = metric.unit.filter(|unit| !unit.is_empty());
            metrics.push(metric);
        }
        Ok(metrics)
    }
}
