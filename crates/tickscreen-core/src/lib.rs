//! # Tickscreen Core
//!
//! Indicator math and the screening pipeline behind the `tickscreen` CLI.
//!
//! ## Overview
//!
//! - **Indicators**: EMA with an SMA seed and annualized rate of return
//! - **Momentum ranking**: trailing-year evaluation fanned out over a worker pool
//! - **EMA crossover**: short/long EMA buy/sell signal per company
//! - **Volume indicator**: latest volume against the window mean
//! - **Reports**: 1:1 merge and CSV tables written to an export directory
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Providers (Yahoo chart API, CSV directory, in-memory) |
//! | [`config`] | Watchlist sources and run settings |
//! | [`domain`] | Symbols, companies, price series, date windows |
//! | [`ema_signal`] | EMA crossover per company |
//! | [`error`] | Core error types |
//! | [`evaluation`] | Per-company failure values |
//! | [`http_client`] | HTTP client abstraction |
//! | [`indicator`] | Pure indicator functions |
//! | [`momentum`] | Per-company momentum evaluation |
//! | [`pool`] | Bounded, order-preserving worker pool |
//! | [`provider`] | Time-series provider contract |
//! | [`ranker`] | Parallel evaluation and ranking |
//! | [`report`] | Merge and CSV tables |
//! | [`retry`] | Backoff policies for upstream calls |
//! | [`strategy`] | Strategy entry points |
//! | [`throttling`] | Request rate limiting |
//! | [`volume`] | Volume indicator |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tickscreen_core::{
//!     CompanySource, ReqwestHttpClient, ScreenConfig, Screener, YahooChartProvider,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = YahooChartProvider::new(Arc::new(ReqwestHttpClient::new()));
//!     let source = CompanySource::ByFile("company_list.yaml".into());
//!     let screener = Screener::from_source(Arc::new(provider), &source, ScreenConfig::default())?;
//!
//!     let end = tickscreen_core::parse_run_date("01/06/2020")?;
//!     let outcome = screener.momentum_strategy(end, 20, false).await?;
//!     print!("{}", outcome.table.to_csv_string()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Per-company problems never abort a run. They surface as
//! [`EvaluationError`] values, either inside a [`MomentumOutcome::Unusable`]
//! or in the `invalid` list of a [`StrategyOutcome`]. Only configuration
//! problems and report failures (including a duplicated company during the
//! merge) come back as [`CoreError`].

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ema_signal;
pub mod error;
pub mod evaluation;
pub mod http_client;
pub mod indicator;
pub mod momentum;
pub mod pool;
pub mod provider;
pub mod ranker;
pub mod report;
pub mod retry;
pub mod strategy;
pub mod throttling;
pub mod volume;

// Adapter implementations
pub use adapters::{CsvDirectoryProvider, InMemoryProvider, YahooChartProvider};

// Configuration
pub use config::{CompanySource, ConfigError, ScreenConfig};

// Domain models
pub use domain::{
    format_report_date, one_year_before, parse_run_date, Company, CompanySeries, DateWindow,
    PricePoint, Symbol, EARLIEST_HISTORY, SENTINEL_DATE,
};

// Error types
pub use error::{CoreError, ValidationError};
pub use evaluation::{EvaluationError, InvalidCompany};

// HTTP client types
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

// Indicators
pub use indicator::{annualized_return, exponential_moving_average, IndicatorError};

// Pipeline
pub use ema_signal::{Action, EmaJoiner, EmaPeriods, EmaRecord, EmaTable};
pub use momentum::{find_monthly_anchor, MomentumEvaluator, MomentumOutcome, MomentumRecord};
pub use pool::{WorkerPanic, WorkerPool};
pub use ranker::{rank_records, ParallelRanker, Ranking};
pub use volume::{VolumeRecord, VolumeScanner, VolumeTable};

// Provider contract
pub use provider::{FetchFuture, ProviderError, ProviderErrorKind, ProviderId, TimeSeriesProvider};

// Reports and strategies
pub use report::{merge_one_to_one, MergeSide, ReportError, ReportRow, Table};
pub use strategy::{Screener, StrategyOutcome};

// Retry and throttling
pub use retry::{Backoff, RetryConfig};
pub use throttling::{RequestThrottle, ThrottlePolicy};
