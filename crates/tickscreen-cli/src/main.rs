mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;
use std::process::ExitCode;

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_format);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "run failed");
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run(cli: &Cli) -> Result<(), CliError> {
    let report = commands::run(cli).await?;

    match &report.path {
        Some(path) => tracing::info!(path = %path.display(), "report written"),
        None => output::render(&report.table)?,
    }
    if report.invalid > 0 {
        tracing::warn!(count = report.invalid, "some companies were left out; see the log above");
    }

    Ok(())
}
