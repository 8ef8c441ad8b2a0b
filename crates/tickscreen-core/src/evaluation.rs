use std::fmt::{Display, Formatter};

use thiserror::Error;
use time::Date;

use crate::indicator::IndicatorError;
use crate::pool::WorkerPanic;
use crate::provider::ProviderError;

/// Why a single company could not be evaluated.
///
/// These never abort a run: the company is marked unusable (momentum) or
/// listed as invalid (EMA, volume) and the batch carries on.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvaluationError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    #[error("no usable close price on {date}")]
    MissingClose { date: Date },

    #[error("no usable volume in the requested window")]
    MissingVolume,

    #[error("{len} observations are not enough for a {required}-point lookback")]
    InsufficientLookback { len: usize, required: usize },

    #[error("{which} return is not a finite number")]
    NonFiniteReturn { which: &'static str },

    #[error(transparent)]
    WorkerPanic(#[from] WorkerPanic),
}

/// A company dropped from a table, kept for the run diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidCompany {
    pub company: String,
    pub reason: EvaluationError,
}

impl InvalidCompany {
    pub fn new(company: impl Into<String>, reason: EvaluationError) -> Self {
        Self {
            company: company.into(),
            reason,
        }
    }
}

impl Display for InvalidCompany {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.company, self.reason)
    }
}
