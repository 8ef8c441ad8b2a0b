use tickscreen_core::{parse_run_date, Screener};

use crate::cli::MomentumEmaArgs;
use crate::error::CliError;

use super::{ema_periods, CommandReport};

pub async fn run(
    args: &MomentumEmaArgs,
    screener: &Screener,
    save: bool,
) -> Result<CommandReport, CliError> {
    let end = parse_run_date(&args.momentum.end_date)?;
    let top = args
        .momentum
        .top
        .unwrap_or(screener.config().top_company_count);
    let periods = ema_periods(&args.periods, screener.config())?;

    let outcome = screener
        .momentum_with_ema_strategy(end, top, periods, save)
        .await?;
    Ok(outcome.into())
}
