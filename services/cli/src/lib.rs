mod cli;
mod commands;
mod demo;
mod infra;

pub use infra::HistoryStore;

use hpi_engine::error::AppError;
use std::ffi::OsString;
use std::io::Write;

/// Parses the process arguments, installs tracing and runs the selected command.
pub fn run() -> Result<(), AppError> {
    cli::run()
}

/// Runs a command line against `out` without touching the global subscriber.
pub fn run_with_args<I, T>(args: I, out: &mut dyn Write) -> Result<(), AppError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    cli::run_with_args(args, out)
}
