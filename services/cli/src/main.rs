use std::process::ExitCode;

fn main() -> ExitCode {
    match hpi_engine_cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("application error: {err}");
            if err.is_input_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
