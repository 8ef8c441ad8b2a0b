use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Symbol, ValidationError};

/// One daily observation. Providers leave `close`/`volume` empty when the
/// upstream row has no value for that day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: Date,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

impl PricePoint {
    pub const fn new(date: Date, close: Option<f64>, volume: Option<u64>) -> Self {
        Self {
            date,
            close,
            volume,
        }
    }

    /// Close usable as a price: present and finite.
    pub fn usable_close(&self) -> Option<f64> {
        self.close.filter(|value| value.is_finite())
    }
}

/// Time-ordered price history of a single ticker.
///
/// Dates are strictly increasing; construction rejects anything else so a
/// malformed provider response fails that company instead of skewing results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySeries {
    symbol: Symbol,
    points: Vec<PricePoint>,
}

impl CompanySeries {
    pub fn new(symbol: Symbol, points: Vec<PricePoint>) -> Result<Self, ValidationError> {
        if let Some(index) = points
            .windows(2)
            .position(|pair| pair[0].date >= pair[1].date)
        {
            return Err(ValidationError::UnorderedSeries { index: index + 1 });
        }

        Ok(Self { symbol, points })
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Closing prices with missing or non-finite values removed, plus how
    /// many observations were dropped.
    pub fn clean_closes(&self) -> (Vec<f64>, usize) {
        let closes: Vec<f64> = self
            .points
            .iter()
            .filter_map(PricePoint::usable_close)
            .collect();
        let dropped = self.points.len() - closes.len();
        (closes, dropped)
    }
}
