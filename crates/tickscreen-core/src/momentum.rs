//! Per-company momentum evaluation.
//!
//! One call fetches a trailing year of closes and derives two annualized
//! returns: the full year, and the last 30 trading points. Every failure is
//! folded into a [`MomentumOutcome::Unusable`] value so the caller can keep
//! the company for auditing while excluding it from ranking.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use time::Date;
use tracing::{debug, info};

use crate::evaluation::EvaluationError;
use crate::indicator::annualized_return;
use crate::provider::{ProviderError, TimeSeriesProvider};
use crate::{Company, CompanySeries, DateWindow, PricePoint, SENTINEL_DATE};

/// Number of trailing observations covered by the monthly return.
pub const MONTHLY_LOOKBACK: usize = 30;

/// Default budget for a single provider fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Yearly and monthly return figures of one company.
///
/// Numeric fields are `None` only on unusable records, whose dates are all
/// [`SENTINEL_DATE`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MomentumRecord {
    pub company: String,
    pub yearly_start_date: Date,
    pub yearly_start_close: Option<f64>,
    pub yearly_end_date: Date,
    pub yearly_end_close: Option<f64>,
    pub return_yearly: Option<f64>,
    pub monthly_start_date: Date,
    pub monthly_start_close: Option<f64>,
    pub monthly_end_date: Date,
    pub monthly_end_close: Option<f64>,
    pub return_monthly: Option<f64>,
}

impl MomentumRecord {
    /// Placeholder kept for a company that could not be evaluated.
    pub fn unusable(company: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            yearly_start_date: SENTINEL_DATE,
            yearly_start_close: None,
            yearly_end_date: SENTINEL_DATE,
            yearly_end_close: None,
            return_yearly: None,
            monthly_start_date: SENTINEL_DATE,
            monthly_start_close: None,
            monthly_end_date: SENTINEL_DATE,
            monthly_end_close: None,
            return_monthly: None,
        }
    }

    /// `true` when every numeric field is present and finite.
    pub fn is_usable(&self) -> bool {
        [
            self.yearly_start_close,
            self.yearly_end_close,
            self.return_yearly,
            self.monthly_start_close,
            self.monthly_end_close,
            self.return_monthly,
        ]
        .iter()
        .all(|value| value.is_some_and(f64::is_finite))
    }
}

/// Result of evaluating one company.
#[derive(Debug, Clone, PartialEq)]
pub enum MomentumOutcome {
    Usable(MomentumRecord),
    Unusable {
        record: MomentumRecord,
        reason: EvaluationError,
    },
}

impl MomentumOutcome {
    pub fn unusable(company: impl Into<String>, reason: EvaluationError) -> Self {
        Self::Unusable {
            record: MomentumRecord::unusable(company),
            reason,
        }
    }

    pub fn record(&self) -> &MomentumRecord {
        match self {
            Self::Usable(record) | Self::Unusable { record, .. } => record,
        }
    }

    pub fn reason(&self) -> Option<&EvaluationError> {
        match self {
            Self::Usable(_) => None,
            Self::Unusable { reason, .. } => Some(reason),
        }
    }

    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Usable(_))
    }
}

/// Start point of the monthly return: the 30th observation from the end.
///
/// When that observation has no usable close, the nearest earlier one with a
/// usable close is taken instead. Fewer than [`MONTHLY_LOOKBACK`] observations
/// is an error.
pub fn find_monthly_anchor(series: &CompanySeries) -> Result<(Date, f64), EvaluationError> {
    let points = series.points();
    if points.len() < MONTHLY_LOOKBACK {
        return Err(EvaluationError::InsufficientLookback {
            len: points.len(),
            required: MONTHLY_LOOKBACK,
        });
    }

    let anchor_index = points.len() - MONTHLY_LOOKBACK;
    points[..=anchor_index]
        .iter()
        .rev()
        .find_map(|point| point.usable_close().map(|close| (point.date, close)))
        .ok_or(EvaluationError::MissingClose {
            date: points[anchor_index].date,
        })
}

/// Fetches a trailing year for one company and computes its momentum record.
#[derive(Clone)]
pub struct MomentumEvaluator {
    provider: Arc<dyn TimeSeriesProvider>,
    fetch_timeout: Duration,
}

impl MomentumEvaluator {
    pub fn new(provider: Arc<dyn TimeSeriesProvider>) -> Self {
        Self {
            provider,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Evaluates `company` over the year ending at `end`. Never fails: errors
    /// come back as [`MomentumOutcome::Unusable`].
    pub async fn evaluate(&self, company: &Company, end: Date) -> MomentumOutcome {
        info!(company = %company, "retrieving momentum data");

        let window = DateWindow::trailing_year(end);
        let result = match fetch_with_timeout(
            self.provider.as_ref(),
            company,
            window,
            self.fetch_timeout,
        )
        .await
        {
            Ok(series) => momentum_record(company.name(), &series),
            Err(error) => Err(error.into()),
        };

        match result {
            Ok(record) => MomentumOutcome::Usable(record),
            Err(reason) => {
                debug!(company = %company, error = %reason, "momentum data is not usable");
                MomentumOutcome::unusable(company.name(), reason)
            }
        }
    }
}

/// Fetches one series, failing with a timeout error once the provider's
/// upstream work exceeds `budget`. Rate-limit queueing is not counted.
pub(crate) async fn fetch_with_timeout(
    provider: &dyn TimeSeriesProvider,
    company: &Company,
    window: DateWindow,
    budget: Duration,
) -> Result<CompanySeries, ProviderError> {
    provider.fetch_within(company.symbol(), window, budget).await
}

fn momentum_record(
    company: &str,
    series: &CompanySeries,
) -> Result<MomentumRecord, EvaluationError> {
    let (first, first_close) = endpoint_close(series.first(), series)?;
    let (last, last_close) = endpoint_close(series.last(), series)?;

    let return_yearly = annualized_return(first_close, last_close, 1.0)?;
    if !return_yearly.is_finite() {
        return Err(EvaluationError::NonFiniteReturn { which: "yearly" });
    }

    let (anchor_date, anchor_close) = find_monthly_anchor(series)?;
    let monthly_years = (last.date - anchor_date).whole_days() as f64 / MONTHLY_LOOKBACK as f64;
    let return_monthly = annualized_return(anchor_close, last_close, monthly_years)?;
    if !return_monthly.is_finite() {
        return Err(EvaluationError::NonFiniteReturn { which: "monthly" });
    }

    Ok(MomentumRecord {
        company: company.to_owned(),
        yearly_start_date: first.date,
        yearly_start_close: Some(first_close),
        yearly_end_date: last.date,
        yearly_end_close: Some(last_close),
        return_yearly: Some(return_yearly),
        monthly_start_date: anchor_date,
        monthly_start_close: Some(anchor_close),
        monthly_end_date: last.date,
        monthly_end_close: Some(last_close),
        return_monthly: Some(return_monthly),
    })
}

fn endpoint_close<'a>(
    point: Option<&'a PricePoint>,
    series: &CompanySeries,
) -> Result<(&'a PricePoint, f64), EvaluationError> {
    let point = point.ok_or(EvaluationError::InsufficientLookback {
        len: series.len(),
        required: MONTHLY_LOOKBACK,
    })?;
    let close = point
        .usable_close()
        .ok_or(EvaluationError::MissingClose { date: point.date })?;
    Ok((point, close))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryProvider;
    use crate::provider::ProviderErrorKind;
    use crate::Symbol;
    use time::macros::date;

    const END: Date = date!(2024 - 03 - 31);

    fn daily(start: Date, closes: &[Option<f64>]) -> Vec<PricePoint> {
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                PricePoint::new(start + time::Duration::days(i as i64), *close, Some(1_000))
            })
            .collect()
    }

    fn company(name: &str) -> Company {
        Company::new(name, None).expect("valid company")
    }

    fn evaluator(provider: InMemoryProvider) -> MomentumEvaluator {
        MomentumEvaluator::new(Arc::new(provider))
    }

    #[tokio::test]
    async fn computes_yearly_and_monthly_returns() {
        let mut closes: Vec<Option<f64>> = (0..40).map(|i| Some(100.0 + i as f64)).collect();
        closes[39] = Some(150.0);
        let points = daily(date!(2024 - 01 - 01), &closes);
        let provider = InMemoryProvider::new()
            .with_series(Symbol::parse("ACME").expect("symbol"), points);

        let outcome = evaluator(provider).evaluate(&company("ACME"), END).await;
        let record = match outcome {
            MomentumOutcome::Usable(record) => record,
            other => panic!("expected usable outcome, got {other:?}"),
        };

        assert!((record.return_yearly.expect("yearly") - 0.5).abs() < 1e-12);
        assert_eq!(record.monthly_start_date, date!(2024 - 01 - 11));
        assert_eq!(record.monthly_start_close, Some(110.0));
        let expected_monthly = (150.0_f64 / 110.0).powf(30.0 / 29.0) - 1.0;
        assert!((record.return_monthly.expect("monthly") - expected_monthly).abs() < 1e-12);
        assert!(record.is_usable());
    }

    #[tokio::test]
    async fn short_history_is_unusable_with_sentinel_dates() {
        let closes: Vec<Option<f64>> = (0..29).map(|i| Some(10.0 + i as f64)).collect();
        let provider = InMemoryProvider::new().with_series(
            Symbol::parse("TINY").expect("symbol"),
            daily(date!(2024 - 02 - 01), &closes),
        );

        let outcome = evaluator(provider).evaluate(&company("TINY"), END).await;

        assert!(!outcome.is_usable());
        assert_eq!(
            outcome.reason(),
            Some(&EvaluationError::InsufficientLookback {
                len: 29,
                required: MONTHLY_LOOKBACK
            })
        );
        assert_eq!(outcome.record(), &MomentumRecord::unusable("TINY"));
        assert_eq!(outcome.record().yearly_start_date, SENTINEL_DATE);
    }

    #[test]
    fn anchor_walks_back_to_the_nearest_usable_close() {
        let mut closes: Vec<Option<f64>> = (0..35).map(|i| Some(i as f64 + 1.0)).collect();
        closes[5] = None;
        closes[4] = Some(f64::NAN);
        let series = CompanySeries::new(
            Symbol::parse("GAP").expect("symbol"),
            daily(date!(2024 - 01 - 01), &closes),
        )
        .expect("ordered series");

        let (date, close) = find_monthly_anchor(&series).expect("anchor");
        assert_eq!(date, date!(2024 - 01 - 04));
        assert_eq!(close, 4.0);
    }

    #[tokio::test]
    async fn provider_failure_is_contained() {
        let provider = InMemoryProvider::new()
            .with_failure(Symbol::parse("GONE").expect("symbol"), ProviderErrorKind::NotFound);

        let outcome = evaluator(provider).evaluate(&company("GONE"), END).await;

        match outcome.reason() {
            Some(EvaluationError::Provider(error)) => {
                assert_eq!(error.kind(), ProviderErrorKind::NotFound);
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_fetch_times_out() {
        let symbol = Symbol::parse("SLOW").expect("symbol");
        let closes: Vec<Option<f64>> = (0..40).map(|_| Some(1.0)).collect();
        let provider = InMemoryProvider::new()
            .with_series(symbol.clone(), daily(date!(2024 - 01 - 01), &closes))
            .with_latency(symbol, Duration::from_millis(200));

        let outcome = evaluator(provider)
            .with_fetch_timeout(Duration::from_millis(10))
            .evaluate(&company("SLOW"), END)
            .await;

        match outcome.reason() {
            Some(EvaluationError::Provider(error)) => {
                assert_eq!(error.kind(), ProviderErrorKind::Timeout);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn zero_start_price_is_unusable() {
        let mut closes: Vec<Option<f64>> = (0..40).map(|_| Some(5.0)).collect();
        closes[0] = Some(0.0);
        let provider = InMemoryProvider::new().with_series(
            Symbol::parse("ZERO").expect("symbol"),
            daily(date!(2024 - 01 - 01), &closes),
        );

        let outcome = evaluator(provider).evaluate(&company("ZERO"), END).await;
        assert_eq!(
            outcome.reason(),
            Some(&EvaluationError::Indicator(
                crate::indicator::IndicatorError::DivisionByZero
            ))
        );
    }
}
