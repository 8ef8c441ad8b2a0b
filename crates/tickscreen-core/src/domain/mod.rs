//! # Domain Models
//!
//! Canonical domain types for tickscreen.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated provider ticker |
//! | [`Company`] | Watchlist entry (report key + ticker) |
//! | [`PricePoint`] | One daily close/volume observation |
//! | [`CompanySeries`] | Strictly date-ordered history of one ticker |
//! | [`DateWindow`] | Inclusive date range handed to a provider |
//!
//! Construction validates every invariant, so a malformed provider response
//! surfaces as a [`ValidationError`](crate::ValidationError) for that company.

mod calendar;
mod company;
mod series;
mod symbol;

pub use calendar::{
    format_report_date, one_year_before, parse_run_date, DateWindow, EARLIEST_HISTORY,
    SENTINEL_DATE,
};
pub use company::Company;
pub use series::{CompanySeries, PricePoint};
pub use symbol::Symbol;
