use tickscreen_core::{parse_run_date, Screener};

use crate::cli::VolumeArgs;
use crate::error::CliError;

use super::CommandReport;

pub async fn run(
    args: &VolumeArgs,
    screener: &Screener,
    save: bool,
) -> Result<CommandReport, CliError> {
    let end = parse_run_date(&args.end_date)?;
    let days = args.days.unwrap_or(screener.config().volume_window_days);

    let outcome = screener.volume_indicator(end, days, save).await?;
    Ok(outcome.into())
}
