mod ema;
mod momentum;
mod momentum_ema;
mod volume;

use std::path::PathBuf;
use std::sync::Arc;

use tickscreen_core::{
    CompanySource, CsvDirectoryProvider, EmaPeriods, ReqwestHttpClient, ScreenConfig, Screener,
    StrategyOutcome, Table, TimeSeriesProvider, YahooChartProvider,
};

use crate::cli::{Cli, Command, EmaPeriodArgs, SourceSelector};
use crate::error::CliError;

/// What a command hands back to `main` for rendering.
pub struct CommandReport {
    pub table: Table,
    pub invalid: usize,
    pub path: Option<PathBuf>,
}

impl<R> From<StrategyOutcome<R>> for CommandReport {
    fn from(outcome: StrategyOutcome<R>) -> Self {
        Self {
            table: outcome.table,
            invalid: outcome.invalid.len(),
            path: outcome.report_path,
        }
    }
}

pub async fn run(cli: &Cli) -> Result<CommandReport, CliError> {
    let config = screen_config(cli)?;
    let source = company_source(cli)?;
    let provider = build_provider(cli)?;
    let screener = Screener::from_source(provider, &source, config)?;
    let save = !cli.no_save;

    match &cli.command {
        Command::Momentum(args) => momentum::run(args, &screener, save).await,
        Command::MomentumEma(args) => momentum_ema::run(args, &screener, save).await,
        Command::Ema(args) => ema::run(args, &screener, save).await,
        Command::Volume(args) => volume::run(args, &screener, save).await,
    }
}

/// Settings file (or defaults) with command-line overrides applied.
fn screen_config(cli: &Cli) -> Result<ScreenConfig, CliError> {
    let mut config = match &cli.settings {
        Some(path) => ScreenConfig::from_file(path)?,
        None => ScreenConfig::default(),
    };

    if let Some(suffix) = &cli.exchange_suffix {
        config.exchange_suffix = Some(suffix.clone());
    }
    if let Some(path) = &cli.export_path {
        config.export_path = path.clone();
    }
    if let Some(workers) = cli.workers {
        config.worker_count = Some(workers);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.fetch_timeout_ms = timeout_ms;
    }

    config.validate()?;
    Ok(config)
}

fn company_source(cli: &Cli) -> Result<CompanySource, CliError> {
    match (&cli.config, cli.company.is_empty()) {
        (Some(path), _) => Ok(CompanySource::ByFile(path.clone())),
        (None, false) => Ok(CompanySource::ByList(cli.company.clone())),
        (None, true) => Err(CliError::Usage(
            "either --config <FILE> or at least one --company is required".to_owned(),
        )),
    }
}

fn build_provider(cli: &Cli) -> Result<Arc<dyn TimeSeriesProvider>, CliError> {
    match cli.source {
        SourceSelector::Yahoo => Ok(Arc::new(YahooChartProvider::new(Arc::new(
            ReqwestHttpClient::new(),
        )))),
        SourceSelector::Csv => {
            let dir = cli
                .data_dir
                .as_ref()
                .ok_or_else(|| CliError::Provider("--source csv requires --data-dir".to_owned()))?;
            if !dir.is_dir() {
                return Err(CliError::Provider(format!(
                    "data directory '{}' does not exist",
                    dir.display()
                )));
            }
            Ok(Arc::new(CsvDirectoryProvider::new(dir.clone())))
        }
    }
}

/// Command-line periods, falling back to the configured ones.
fn ema_periods(args: &EmaPeriodArgs, config: &ScreenConfig) -> Result<EmaPeriods, CliError> {
    Ok(EmaPeriods::new(
        args.ema_short.unwrap_or(config.ema_periods.short),
        args.ema_long.unwrap_or(config.ema_periods.long),
    )?)
}
