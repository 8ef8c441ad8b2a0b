//! CLI argument definitions for tickscreen.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `momentum` | Rank the watchlist by trailing-year return |
//! | `momentum-ema` | Momentum ranking joined with the EMA crossover |
//! | `ema` | EMA crossover for every watchlist company |
//! | `volume` | Latest volume against the trailing mean |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | - | Watchlist file (`company:` list) |
//! | `--company` | - | Company names, instead of `--config` |
//! | `--settings` | - | Run settings file (YAML) |
//! | `--source` | `yahoo` | Price history provider |
//! | `--data-dir` | - | Directory of `<TICKER>.csv` files for `--source csv` |
//! | `--export-path` | `.` | Directory receiving report files |
//! | `--workers` | cores - 1 | Momentum worker pool size |
//! | `--no-save` | `false` | Print the table to stdout instead of writing a file |
//! | `--log-format` | `text` | Log format on stderr (text, json) |
//!
//! # Examples
//!
//! ```bash
//! tickscreen --config company_list.yaml momentum --end-date 01/06/2020 --top 10
//! tickscreen --company INFY --company TCS --exchange-suffix .NS --no-save ema
//! tickscreen --config company_list.yaml --source csv --data-dir ./prices volume --days 90
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Momentum, EMA crossover and volume screens over an equity watchlist.
#[derive(Debug, Parser)]
#[command(
    name = "tickscreen",
    author,
    version,
    about = "Momentum, EMA crossover and volume screens over an equity watchlist"
)]
pub struct Cli {
    /// Watchlist file with a `company:` list (YAML or JSON).
    #[arg(long, global = true, conflicts_with = "company")]
    pub config: Option<PathBuf>,

    /// Company name to screen; repeat for several.
    #[arg(long = "company", global = true)]
    pub company: Vec<String>,

    /// Suffix appended to every company to form its ticker (e.g. `.NS`).
    #[arg(long, global = true)]
    pub exchange_suffix: Option<String>,

    /// Run settings file; command-line options override it.
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Price history provider.
    #[arg(long, global = true, value_enum, default_value_t = SourceSelector::Yahoo)]
    pub source: SourceSelector,

    /// Directory of `<TICKER>.csv` files, required by `--source csv`.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Directory receiving report files.
    #[arg(long, global = true)]
    pub export_path: Option<PathBuf>,

    /// Momentum worker pool size.
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Budget for a single provider fetch in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Print the table as CSV on stdout instead of writing a report file.
    #[arg(long, global = true, default_value_t = false)]
    pub no_save: bool,

    /// Log format on stderr. `RUST_LOG` controls the level.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceSelector {
    /// Yahoo Finance chart API.
    Yahoo,
    /// Local CSV files.
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rank the watchlist by trailing-year annualized return.
    ///
    ///   tickscreen --config company_list.yaml momentum --end-date 01/06/2020
    Momentum(MomentumArgs),

    /// Momentum ranking joined with the EMA crossover of the top companies.
    ///
    ///   tickscreen --config company_list.yaml momentum-ema --top 10 --ema-short 20
    MomentumEma(MomentumEmaArgs),

    /// EMA crossover for every watchlist company.
    Ema(EmaArgs),

    /// Flag companies whose latest volume exceeds the trailing mean.
    Volume(VolumeArgs),
}

#[derive(Debug, Args)]
pub struct MomentumArgs {
    /// Last day of the lookback year: `today` or dd/mm/yyyy.
    #[arg(long, default_value = "today")]
    pub end_date: String,

    /// Number of companies kept after ranking.
    #[arg(long)]
    pub top: Option<usize>,
}

#[derive(Debug, Args)]
pub struct EmaPeriodArgs {
    /// Short EMA period.
    #[arg(long)]
    pub ema_short: Option<usize>,

    /// Long EMA period.
    #[arg(long)]
    pub ema_long: Option<usize>,
}

#[derive(Debug, Args)]
pub struct MomentumEmaArgs {
    #[command(flatten)]
    pub momentum: MomentumArgs,

    #[command(flatten)]
    pub periods: EmaPeriodArgs,
}

#[derive(Debug, Args)]
pub struct EmaArgs {
    /// Last day of history considered: `today` or dd/mm/yyyy.
    #[arg(long, default_value = "today")]
    pub cutoff: String,

    #[command(flatten)]
    pub periods: EmaPeriodArgs,
}

#[derive(Debug, Args)]
pub struct VolumeArgs {
    /// Last day of the window: `today` or dd/mm/yyyy.
    #[arg(long, default_value = "today")]
    pub end_date: String,

    /// Window length in calendar days.
    #[arg(long)]
    pub days: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_options_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "tickscreen",
            "momentum-ema",
            "--company",
            "INFY",
            "--company",
            "TCS",
            "--top",
            "5",
            "--ema-short",
            "20",
            "--no-save",
        ])
        .expect("valid arguments");

        assert_eq!(cli.company, vec!["INFY", "TCS"]);
        assert!(cli.no_save);
        match cli.command {
            Command::MomentumEma(args) => {
                assert_eq!(args.momentum.top, Some(5));
                assert_eq!(args.momentum.end_date, "today");
                assert_eq!(args.periods.ema_short, Some(20));
                assert_eq!(args.periods.ema_long, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn config_and_company_are_exclusive() {
        let result = Cli::try_parse_from([
            "tickscreen",
            "--config",
            "list.yaml",
            "--company",
            "INFY",
            "ema",
        ]);
        assert!(result.is_err());
    }
}
