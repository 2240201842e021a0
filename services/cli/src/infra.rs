use chrono::{DateTime, NaiveDate, Utc};
use hpi_engine::error::AppError;
use hpi_engine::scoring::{DeltaSeries, MetricsHistory, RadarChart, Snapshot};
use serde::Serialize;
use std::fs;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Append-only JSON file holding one person's snapshots, oldest first.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty history.
    pub fn load(&self) -> Result<MetricsHistory, AppError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "history file missing; starting empty");
                return Ok(MetricsHistory::new());
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Appends a snapshot and rewrites the file through a sibling temp file.
    pub fn append(&self, snapshot: Snapshot) -> Result<MetricsHistory, AppError> {
        let mut history = self.load()?;
        let taken_at = snapshot.taken_at();
        history.push(snapshot)?;

        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let staging = self.path.with_extension("json.tmp");
        {
            let mut writer = io::BufWriter::new(fs::File::create(&staging)?);
            serde_json::to_writer_pretty(&mut writer, &history)?;
            writer.flush()?;
        }
        fs::rename(&staging, &self.path)?;

        info!(
            path = %self.path.display(),
            taken_at = %taken_at,
            snapshots = history.len(),
            "snapshot appended"
        );
        Ok(history)
    }
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("failed to parse '{raw}' as RFC 3339 or YYYY-MM-DD"))
}

pub(crate) fn write_json<T: Serialize>(out: &mut dyn Write, value: &T) -> Result<(), AppError> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct RadarRow<'a> {
    domain: &'a str,
    label: &'a str,
    short_label: &'a str,
    score: f64,
}

pub(crate) fn write_radar_csv(out: &mut dyn Write, chart: &RadarChart, closed: bool) -> Result<(), AppError> {
    let axes = if closed {
        chart.closed()
    } else {
        chart.axes.iter().collect()
    };

    let mut writer = csv::Writer::from_writer(out);
    for axis in axes {
        writer.serialize(RadarRow {
            domain: &axis.domain,
            label: &axis.label,
            short_label: &axis.short_label,
            score: axis.score,
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct SeriesRow<'a> {
    series: &'a str,
    taken_at: String,
    score: Option<f64>,
    delta: Option<f64>,
}

/// Long-format export: one row per series and snapshot, composite rows last.
pub(crate) fn write_series_csv(out: &mut dyn Write, series: &DeltaSeries) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    let domains = series
        .domains
        .iter()
        .map(|entry| (entry.domain.as_str(), &entry.points));
    for (name, points) in domains.chain(std::iter::once(("composite", &series.composite))) {
        for point in points {
            writer.serialize(SeriesRow {
                series: name,
                taken_at: point.taken_at.to_rfc3339(),
                score: point.score,
                delta: point.delta,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}
