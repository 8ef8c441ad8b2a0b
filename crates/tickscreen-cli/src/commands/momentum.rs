use tickscreen_core::{parse_run_date, Screener};

use crate::cli::MomentumArgs;
use crate::error::CliError;

use super::CommandReport;

pub async fn run(
    args: &MomentumArgs,
    screener: &Screener,
    save: bool,
) -> Result<CommandReport, CliError> {
    let end = parse_run_date(&args.end_date)?;
    let top = args.top.unwrap_or(screener.config().top_company_count);

    let outcome = screener.momentum_strategy(end, top, save).await?;
    Ok(outcome.into())
}
