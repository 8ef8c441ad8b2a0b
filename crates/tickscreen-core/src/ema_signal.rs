use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::Date;
use tracing::{info, warn};

use crate::evaluation::{EvaluationError, InvalidCompany};
use crate::indicator::{exponential_moving_average, DEFAULT_SMOOTHING};
use crate::momentum::{fetch_with_timeout, DEFAULT_FETCH_TIMEOUT};
use crate::provider::TimeSeriesProvider;
use crate::{Company, DateWindow, ValidationError};

/// Short/long EMA periods of the crossover signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmaPeriods {
    pub short: usize,
    pub long: usize,
}

impl EmaPeriods {
    pub fn new(short: usize, long: usize) -> Result<Self, ValidationError> {
        if short == 0 {
            return Err(ValidationError::NonPositive { field: "ema_short" });
        }
        if long == 0 {
            return Err(ValidationError::NonPositive { field: "ema_long" });
        }
        Ok(Self { short, long })
    }
}

impl Default for EmaPeriods {
    fn default() -> Self {
        Self {
            short: 50,
            long: 200,
        }
    }
}

impl Display for EmaPeriods {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.short, self.long)
    }
}

/// Crossover signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    /// `Buy` iff the short EMA is strictly above the long EMA.
    pub fn from_crossover(ema_short: f64, ema_long: f64) -> Self {
        if ema_short > ema_long {
            Self::Buy
        } else {
            Self::Sell
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmaRecord {
    pub company: String,
    pub ema_short: f64,
    pub ema_long: f64,
    pub action: Action,
}

/// EMA records of the companies that had enough history, and the rest.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmaTable {
    pub records: Vec<EmaRecord>,
    pub invalid: Vec<InvalidCompany>,
}

/// Computes the EMA crossover for a list of companies.
#[derive(Clone)]
pub struct EmaJoiner {
    provider: Arc<dyn TimeSeriesProvider>,
    periods: EmaPeriods,
    smoothing: f64,
    fetch_timeout: Duration,
}

impl EmaJoiner {
    pub fn new(provider: Arc<dyn TimeSeriesProvider>, periods: EmaPeriods) -> Self {
        Self {
            provider,
            periods,
            smoothing: DEFAULT_SMOOTHING,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_smoothing(mut self, smoothing: f64) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn periods(&self) -> EmaPeriods {
        self.periods
    }

    /// Evaluates every company against its full history up to `cutoff`.
    /// Companies are processed one after another.
    pub async fn join(&self, companies: &[Company], cutoff: Date) -> EmaTable {
        let mut table = EmaTable::default();

        for (idx, company) in companies.iter().enumerate() {
            info!(
                company = %company,
                progress = idx + 1,
                total = companies.len(),
                "retrieving full history"
            );
            match self.evaluate(company, cutoff).await {
                Ok(record) => table.records.push(record),
                Err(reason) => {
                    warn!(company = %company, error = %reason, "excluded from ema table");
                    table.invalid.push(InvalidCompany::new(company.name(), reason));
                }
            }
        }

        table
    }

    pub async fn evaluate(
        &self,
        company: &Company,
        cutoff: Date,
    ) -> Result<EmaRecord, EvaluationError> {
        let series = fetch_with_timeout(
            self.provider.as_ref(),
            company,
            DateWindow::full_history(cutoff),
            self.fetch_timeout,
        )
        .await?;

        let (closes, dropped) = series.clean_closes();
        if dropped > 0 {
            warn!(company = %company, dropped, "dropping missing close prices");
        }

        let ema_short = exponential_moving_average(&closes, self.periods.short, self.smoothing)?;
        let ema_long = exponential_moving_average(&closes, self.periods.long, self.smoothing)?;

        Ok(EmaRecord {
            company: company.name().to_owned(),
            ema_short,
            ema_long,
            action: Action::from_crossover(ema_short, ema_long),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryProvider;
    use crate::indicator::IndicatorError;
    use crate::{PricePoint, Symbol};
    use time::macros::date;

    fn rising(len: usize, missing_every: Option<usize>) -> Vec<PricePoint> {
        (0..len)
            .map(|i| {
                let close = match missing_every {
                    Some(n) if i % n == n - 1 => None,
                    _ => Some(10.0 + i as f64),
                };
                PricePoint::new(date!(2020 - 01 - 01) + time::Duration::days(i as i64), close, None)
            })
            .collect()
    }

    fn company(name: &str) -> Company {
        Company::new(name, None).expect("valid company")
    }

    #[test]
    fn action_requires_strict_crossover() {
        assert_eq!(Action::from_crossover(2.0, 1.0), Action::Buy);
        assert_eq!(Action::from_crossover(1.0, 1.0), Action::Sell);
        assert_eq!(Action::Buy.to_string(), "buy");
    }

    #[test]
    fn rejects_zero_periods() {
        assert_eq!(
            EmaPeriods::new(0, 200),
            Err(ValidationError::NonPositive { field: "ema_short" })
        );
        assert_eq!(EmaPeriods::default().to_string(), "50-200");
    }

    #[tokio::test]
    async fn short_history_is_listed_as_invalid() {
        let provider = InMemoryProvider::new()
            .with_series(Symbol::parse("LONG").expect("symbol"), rising(300, None))
            .with_series(Symbol::parse("SHORT").expect("symbol"), rising(120, None));
        let joiner = EmaJoiner::new(Arc::new(provider), EmaPeriods::default());

        let table = joiner
            .join(&[company("LONG"), company("SHORT")], date!(2021 - 12 - 31))
            .await;

        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].company, "LONG");
        assert_eq!(table.records[0].action, Action::Buy);
        assert_eq!(table.invalid.len(), 1);
        assert_eq!(table.invalid[0].company, "SHORT");
        assert_eq!(
            table.invalid[0].reason,
            EvaluationError::Indicator(IndicatorError::InsufficientData {
                len: 120,
                period: 200
            })
        );
    }

    #[tokio::test]
    async fn missing_closes_are_dropped_before_the_ema() {
        // 250 points with every 10th close missing leaves 225 usable closes.
        let provider = InMemoryProvider::new()
            .with_series(Symbol::parse("GAPPY").expect("symbol"), rising(250, Some(10)));
        let joiner = EmaJoiner::new(Arc::new(provider), EmaPeriods::default());

        let record = joiner
            .evaluate(&company("GAPPY"), date!(2021 - 12 - 31))
            .await
            .expect("enough history after cleaning");

        let closes: Vec<f64> = rising(250, Some(10)).iter().filter_map(|p| p.close).collect();
        assert_eq!(closes.len(), 225);
        assert_eq!(
            record.ema_long,
            exponential_moving_average(&closes, 200, DEFAULT_SMOOTHING).expect("ema")
        );
    }

    #[tokio::test]
    async fn cutoff_limits_the_history() {
        let provider = InMemoryProvider::new()
            .with_series(Symbol::parse("LONG").expect("symbol"), rising(300, None));
        let joiner = EmaJoiner::new(Arc::new(provider), EmaPeriods::default());

        // Only the first 100 days fall before the cutoff: enough for the
        // short period, not for the long one.
        let error = joiner
            .evaluate(&company("LONG"), date!(2020 - 04 - 09))
            .await
            .expect_err("too short before cutoff");
        assert_eq!(
            error,
            EvaluationError::Indicator(IndicatorError::InsufficientData {
                len: 100,
                period: 200
            })
        );
    }
}
