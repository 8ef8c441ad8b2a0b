use thiserror::Error;

use crate::config::ConfigError;
use crate::report::ReportError;

/// Validation and contract errors exposed by `tickscreen-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter or digit: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("date must match dd/mm/yyyy or be 'today': '{value}'")]
    InvalidDate { value: String },
    #[error("date window start {start} is after end {end}")]
    InvertedWindow { start: String, end: String },

    #[error("series dates must be strictly increasing (violation at index {index})")]
    UnorderedSeries { index: usize },

    #[error("field '{field}' must be greater than zero")]
    NonPositive { field: &'static str },
}

/// Top-level error type for core operations.
///
/// Only structural failures end up here. Per-company data problems are carried as
/// values inside strategy outcomes and never abort a run.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Report(#[from] ReportError),
}
