use crate::commands::{run_radar, run_registry, run_score, run_trend, RadarArgs, RegistryArgs, ScoreArgs, TrendArgs};
use crate::demo::{run_demo, DemoArgs};
use clap::{Args, Parser, Subcommand, ValueEnum};
use hpi_engine::config::{parse_epsilon, parse_rolling_window, AppConfig};
use hpi_engine::error::AppError;
use hpi_engine::scoring::{EngineError, HpiEngine, MetricRegistry, TrendConfig};
use hpi_engine::telemetry;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "hpi",
    about = "Score life-balance questionnaires and track the Human Performance Index over time",
    version
)]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score an answer file and optionally append it to a history file
    Score(ScoreArgs),
    /// Compare the latest snapshot in a history file against the ones before it
    Trend(TrendArgs),
    /// Export radar-chart axes for the latest snapshot in a history file
    Radar(RadarArgs),
    /// Print or validate a domain and metric registry
    Registry(RegistryArgs),
    /// Walk through several synthetic weekly assessments (default command)
    Demo(DemoArgs),
}

/// Flags that override `HPI_*` environment configuration for one invocation.
#[derive(Args, Debug, Default)]
pub(crate) struct EngineArgs {
    /// JSON registry to use instead of the built-in one
    #[arg(long, global = true)]
    pub(crate) registry: Option<PathBuf>,
    /// Smallest score change that counts as improved or declined
    #[arg(long, global = true, value_parser = parse_epsilon_arg)]
    pub(crate) epsilon: Option<f64>,
    /// Number of snapshots in the rolling average
    #[arg(long, global = true, value_parser = parse_window_arg)]
    pub(crate) window: Option<usize>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

/// Everything a subcommand needs besides its own arguments.
pub(crate) struct Context {
    pub(crate) engine: HpiEngine,
}

impl Context {
    pub(crate) fn build(config: &AppConfig, overrides: &EngineArgs) -> Result<Self, AppError> {
        let registry = match overrides.registry.as_ref().or(config.scoring.registry_path.as_ref()) {
            Some(path) => MetricRegistry::from_path(path)?,
            None => MetricRegistry::standard(),
        };
        let trend = TrendConfig {
            epsilon: overrides.epsilon.unwrap_or(config.scoring.trend.epsilon),
            rolling_window: overrides.window.unwrap_or(config.scoring.trend.rolling_window),
        };
        Ok(Self {
            engine: HpiEngine::new(registry, trend).map_err(EngineError::from)?,
        })
    }
}

fn parse_epsilon_arg(raw: &str) -> Result<f64, String> {
    parse_epsilon(raw).map_err(|_| format!("'{raw}' is not a finite, non-negative number"))
}

fn parse_window_arg(raw: &str) -> Result<usize, String> {
    parse_rolling_window(raw).map_err(|_| format!("'{raw}' is not a positive integer"))
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(cli, &config, &mut out)
}

/// Parses `args` (program name first) and runs the command against `out` without installing
/// a tracing subscriber.
pub(crate) fn run_with_args<I, T>(args: I, out: &mut dyn Write) -> Result<(), AppError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let config = AppConfig::load()?;
    execute(cli, &config, out)
}

fn execute(cli: Cli, config: &AppConfig, out: &mut dyn Write) -> Result<(), AppError> {
    let context = Context::build(config, &cli.engine)?;
    let command = cli
        .command
        .unwrap_or_else(|| Command::Demo(DemoArgs::default()));

    match command {
        Command::Score(args) => run_score(&context, args, out),
        Command::Trend(args) => run_trend(&context, args, out),
        Command::Radar(args) => run_radar(&context, args, out),
        Command::Registry(args) => run_registry(&context, args, out),
        Command::Demo(args) => run_demo(&context, args, out),
    }
}
