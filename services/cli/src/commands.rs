use crate::cli::{Context, OutputFormat};
use crate::infra::{write_json, write_radar_csv, write_series_csv, HistoryStore};
use chrono::{DateTime, Utc};
use clap::Args;
use hpi_engine::error::AppError;
use hpi_engine::intake::{import_answers, MetricsImporter};
use hpi_engine::scoring::{
    AssessmentReport, DeltaSeries, MetricRegistry, MetricValue, MetricsHistory, RecommendationRequest,
    Snapshot, TrendDelta, TrendResult,
};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Answer file: `.csv` rows, a `.md` questionnaire report or a `.json` object
    pub(crate) answers: PathBuf,
    /// Extended-section metrics (`.csv` or `.json`)
    #[arg(long)]
    pub(crate) metrics: Option<PathBuf>,
    /// History file used for trends; the new snapshot is appended to it
    #[arg(long)]
    pub(crate) history: Option<PathBuf>,
    /// Compare against the history without appending to it
    #[arg(long, requires = "history")]
    pub(crate) dry_run: bool,
    /// Assessment time (RFC 3339 or YYYY-MM-DD), defaults to now
    #[arg(long, value_parser = crate::infra::parse_timestamp)]
    pub(crate) taken_at: Option<DateTime<Utc>>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub(crate) format: OutputFormat,
    /// Print the recommendation request for the N weakest domains instead of the report
    #[arg(long, value_name = "N")]
    pub(crate) request: Option<usize>,
}

#[derive(Args, Debug)]
pub(crate) struct TrendArgs {
    /// History file written by `hpi score --history`
    pub(crate) history: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub(crate) format: OutputFormat,
}

#[derive(Args, Debug)]
pub(crate) struct RadarArgs {
    /// History file written by `hpi score --history`
    pub(crate) history: PathBuf,
    /// Repeat the first axis at the end so plotted polygons close
    #[arg(long)]
    pub(crate) closed: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub(crate) format: OutputFormat,
}

#[derive(Args, Debug)]
pub(crate) struct RegistryArgs {
    /// Registry file to validate; the active registry is printed when omitted
    pub(crate) path: Option<PathBuf>,
}

pub(crate) fn run_score(context: &Context, args: ScoreArgs, out: &mut dyn Write) -> Result<(), AppError> {
    let ScoreArgs {
        answers,
        metrics,
        history,
        dry_run,
        taken_at,
        format,
        request,
    } = args;
    let engine = &context.engine;

    let raw = import_answers(&answers, engine.registry())?;
    let metrics = match metrics {
        Some(path) => MetricsImporter::from_path(path)?,
        None => Vec::new(),
    };
    let store = history.map(HistoryStore::new);
    let past = match &store {
        Some(store) => store.load()?,
        None => MetricsHistory::new(),
    };

    let report = engine.report(&raw, &metrics, taken_at.unwrap_or_else(Utc::now), &past)?;

    if let Some(store) = store.filter(|_| !dry_run) {
        store.append(report.snapshot.clone())?;
    }

    if let Some(limit) = request {
        let request = RecommendationRequest::from_report(&report, &past, limit);
        return write_json(out, &request);
    }

    match format {
        OutputFormat::Json => write_json(out, &report),
        OutputFormat::Csv => write_domains_csv(out, &report),
        OutputFormat::Text => render_report(out, &report),
    }
}

#[derive(Debug, Serialize)]
struct TrendOutput<'a> {
    trend: &'a TrendResult,
    series: &'a DeltaSeries,
}

pub(crate) fn run_trend(context: &Context, args: TrendArgs, out: &mut dyn Write) -> Result<(), AppError> {
    let (history, current) = load_latest(&args.history)?;
    let engine = &context.engine;

    let trend = engine.trend(&current, &history)?;
    let series = engine.delta_series(&current, &history)?;
    info!(
        snapshots = history.len(),
        rolling_window = engine.trend_config().rolling_window,
        "trend computed"
    );

    match args.format {
        OutputFormat::Json => write_json(
            out,
            &TrendOutput {
                trend: &trend,
                series: &series,
            },
        ),
        OutputFormat::Csv => write_series_csv(out, &series),
        OutputFormat::Text => render_trend(out, &trend, engine.registry()),
    }
}

pub(crate) fn run_radar(context: &Context, args: RadarArgs, out: &mut dyn Write) -> Result<(), AppError> {
    let (_, current) = load_latest(&args.history)?;
    let chart = context.engine.radar(&current)?;

    match args.format {
        OutputFormat::Csv => write_radar_csv(out, &chart, args.closed),
        OutputFormat::Json if args.closed => write_json(out, &chart.closed()),
        OutputFormat::Json => write_json(out, &chart),
        OutputFormat::Text => {
            for axis in &chart.axes {
                writeln!(out, "{:<16} {:>5.1}", axis.short_label, axis.score)?;
            }
            Ok(())
        }
    }
}

pub(crate) fn run_registry(context: &Context, args: RegistryArgs, out: &mut dyn Write) -> Result<(), AppError> {
    let Some(path) = args.path else {
        return write_json(out, context.engine.registry());
    };

    let registry = MetricRegistry::from_path(&path)?;
    writeln!(
        out,
        "{}: registry {} is valid ({} domains x {} questions, scale {}..={}, {} metrics)",
        path.display(),
        registry.version,
        registry.domains().len(),
        registry.question_count(),
        registry.scale.min,
        registry.scale.max,
        registry.metrics.len()
    )?;
    Ok(())
}

fn load_latest(path: &Path) -> Result<(MetricsHistory, Snapshot), AppError> {
    let history = HistoryStore::new(path).load()?;
    let current = history
        .last()
        .cloned()
        .ok_or_else(|| AppError::EmptyHistory {
            path: path.to_path_buf(),
        })?;
    Ok((history, current))
}

#[derive(Debug, Serialize)]
struct DomainRow<'a> {
    domain: &'a str,
    label: &'a str,
    raw_average: f64,
    score: f64,
    band: &'a str,
    weight: f64,
}

fn write_domains_csv(out: &mut dyn Write, report: &AssessmentReport) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    for entry in &report.domains {
        writer.serialize(DomainRow {
            domain: &entry.domain,
            label: &entry.label,
            raw_average: entry.raw_average,
            score: entry.score,
            band: entry.band_label,
            weight: entry.weight,
        })?;
    }
    writer.flush()?;
    Ok(())
}

fn describe_delta(delta: &TrendDelta) -> String {
    match (delta.direction(), delta.delta()) {
        (Some(direction), Some(value)) => format!("{} {:+.1}", direction.arrow(), value),
        _ => "new".to_string(),
    }
}

fn describe_value(value: Option<&MetricValue>) -> String {
    match value {
        Some(value) => format!("{}", value.raw),
        None => "-".to_string(),
    }
}

pub(crate) fn render_report(out: &mut dyn Write, report: &AssessmentReport) -> Result<(), AppError> {
    let insights = report.insights();
    writeln!(
        out,
        "HPI {:.1} {} {} (plain average {:.1})",
        report.composite.value, insights.marker, report.composite_band_label, report.composite.mean
    )?;
    writeln!(
        out,
        "Assessed {} with registry {}",
        report.snapshot.taken_at().format("%Y-%m-%d %H:%M UTC"),
        report.registry_version
    )?;
    writeln!(out)?;

    for entry in &report.domains {
        let trend = report
            .trend
            .domain(&entry.domain)
            .map(|trend| describe_delta(&trend.delta))
            .unwrap_or_default();
        writeln!(
            out,
            "  {} {:<24} {:>5.1}  {} {:<16} weight {:>2}  {}",
            entry.emoji.as_deref().unwrap_or(" "),
            entry.label,
            entry.score,
            entry.marker,
            entry.band_label,
            entry.weight,
            trend
        )?;
    }

    if !report.metrics.metrics.is_empty() {
        writeln!(out)?;
        writeln!(out, "Metrics:")?;
        for metric in &report.metrics.metrics {
            let gap = metric
                .gap_to_target()
                .map(|gap| format!(", gap {gap:.1}"))
                .unwrap_or_default();
            writeln!(
                out,
                "  {}: {} of {}{}{}",
                metric.label.as_deref().unwrap_or(&metric.name),
                describe_value(metric.current.as_ref()),
                describe_value(metric.target.as_ref()),
                metric.unit.as_deref().map(|unit| format!(" {unit}")).unwrap_or_default(),
                gap
            )?;
        }
    }

    writeln!(out)?;
    if !insights.strengths.is_empty() {
        writeln!(out, "Strengths: {}", insights.strengths.join(", "))?;
    }
    if !insights.focus_areas.is_empty() {
        writeln!(out, "Focus areas: {}", insights.focus_areas.join(", "))?;
    }
    for observation in &insights.observations {
        writeln!(out, "- {observation}")?;
    }
    Ok(())
}

fn render_trend(out: &mut dyn Write, trend: &TrendResult, registry: &MetricRegistry) -> Result<(), AppError> {
    match trend.baseline_taken_at {
        Some(baseline) => writeln!(
            out,
            "Snapshot {} against {} ({} in series)",
            trend.taken_at.format("%Y-%m-%d"),
            baseline.format("%Y-%m-%d"),
            trend.series_length
        )?,
        None => writeln!(
            out,
            "Snapshot {} is the first in its history",
            trend.taken_at.format("%Y-%m-%d")
        )?,
    }

    let rows = trend.domains.iter().map(|domain| {
        let label = registry
            .domain(&domain.domain)
            .map(|spec| spec.label.as_str())
            .unwrap_or(domain.domain.as_str());
        (label, domain.current, &domain.delta, &domain.rolling)
    });
    let composite = std::iter::once((
        "HPI",
        trend.composite.current,
        &trend.composite.delta,
        &trend.composite.rolling,
    ));

    for (label, current, delta, rolling) in rows.chain(composite) {
        let change = delta
            .change_percent()
            .map(|percent| format!(" ({percent:+.1}%)"))
            .unwrap_or_default();
        writeln!(
            out,
            "  {:<24} {:>5.1}  {:<8}{:<10} avg({}) {:>5.1}{}",
            label,
            current,
            describe_delta(delta),
            change,
            rolling.samples,
            rolling.value,
            if rolling.partial { "*" } else { "" }
        )?;
    }
    Ok(())
}
