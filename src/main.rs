//! Application entry point.
//!
//! Parses command-line arguments, layers configuration over them and
//! delegates execution to [`runner::run`].

use grantscope_progress::{cli, runner};
use std::io;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt;

fn init_logging(verbose: bool) {
    let max_level = if verbose { Level::DEBUG } else { Level::WARN };
    fmt()
        .with_writer(io::stderr)
        .with_max_level(max_level)
        .init();
}

fn main() -> ExitCode {
    let (parsed, matches) = match cli::parse_from(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(err) => err.exit(),
    };
    let merged = match cli::merge_with_config(&parsed, &matches) {
        Ok(merged) => merged.with_default_command(),
        Err(err) => {
            init_logging(parsed.verbose);
            tracing::error!(error = %err, "configuration merge failed");
            return ExitCode::FAILURE;
        }
    };
    init_logging(merged.verbose);
    match runner::run(&merged) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let chain = format!("{err:#}");
            tracing::error!(error = %chain, "runner failed");
            ExitCode::FAILURE
        }
    }
}
