use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

mod cli;
mod copier;
mod error;
mod logging;
mod records;

use cli::Cli;
use copier::copy_rows;

fn main() -> ExitCode {
    // Argument errors exit here, before any file is opened.
    let cli = Cli::parse();

    if let Err(err) = logging::init() {
        eprintln!("warning: logging unavailable: {err}");
    }

    match copy_rows(&cli.source, &cli.destination, cli.num_lines) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            debug!(kind = ?err.kind(), "copy failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
