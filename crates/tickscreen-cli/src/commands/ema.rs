use tickscreen_core::{parse_run_date, Screener};

use crate::cli::EmaArgs;
use crate::error::CliError;

use super::{ema_periods, CommandReport};

pub async fn run(
    args: &EmaArgs,
    screener: &Screener,
    save: bool,
) -> Result<CommandReport, CliError> {
    let cutoff = parse_run_date(&args.cutoff)?;
    let periods = ema_periods(&args.periods, screener.config())?;

    let outcome = screener.ema_indicator(cutoff, periods, save).await?;
    Ok(outcome.into())
}
