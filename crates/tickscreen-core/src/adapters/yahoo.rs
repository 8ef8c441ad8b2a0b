use std::sync::Arc;
use std::time::Duration as StdDuration;

use serde::Deserialize;
use time::{Date, Duration, OffsetDateTime};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::provider::{FetchFuture, ProviderError, ProviderId, TimeSeriesProvider};
use crate::retry::RetryConfig;
use crate::throttling::{RequestThrottle, ThrottlePolicy};
use crate::{CompanySeries, DateWindow, PricePoint, Symbol};

const CHART_ENDPOINT: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Daily history from the Yahoo Finance chart API.
///
/// Calls share one [`RequestThrottle`] so a wide worker pool stays inside the
/// upstream budget; retryable statuses and transport errors are retried with
/// the configured backoff. A fetch budget passed to
/// [`fetch_within`](TimeSeriesProvider::fetch_within) is charged only for
/// time spent in HTTP attempts, never for throttle waits or backoff sleeps.
#[derive(Clone)]
pub struct YahooChartProvider {
    http_client: Arc<dyn HttpClient>,
    throttle: RequestThrottle,
    retry: RetryConfig,
    request_timeout_ms: u64,
}

impl YahooChartProvider {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            throttle: RequestThrottle::new(&ThrottlePolicy::yahoo_default()),
            retry: RetryConfig::default(),
            request_timeout_ms: 10_000,
        }
    }

    pub fn with_throttle(mut self, policy: &ThrottlePolicy) -> Self {
        self.throttle = RequestThrottle::new(policy);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    fn endpoint(symbol: &Symbol, window: DateWindow) -> String {
        // period2 is exclusive upstream; push it past the last requested day.
        let period1 = unix_midnight(window.start());
        let period2 = unix_midnight(window.end().saturating_add(Duration::days(1)));
        format!(
            "{CHART_ENDPOINT}/{}?period1={period1}&period2={period2}&interval=1d&events=history",
            urlencoding::encode(symbol.as_str()),
        )
    }

    async fn fetch_history(
        &self,
        symbol: &Symbol,
        window: DateWindow,
        budget: Option<StdDuration>,
    ) -> Result<CompanySeries, ProviderError> {
        let endpoint = Self::endpoint(symbol, window);
        let response = self.execute_with_retry(&endpoint, symbol, budget).await?;

        if response.status == 404 {
            return Err(ProviderError::not_found(symbol));
        }
        if !response.is_success() {
            return Err(ProviderError::unavailable(format!(
                "yahoo returned status {} for '{symbol}'",
                response.status
            )));
        }

        let points = parse_chart(&response.body, symbol)?;
        let in_window: Vec<PricePoint> = points
            .into_iter()
            .filter(|point| window.contains(point.date))
            .collect();
        if in_window.is_empty() {
            return Err(ProviderError::insufficient_history(symbol, window));
        }

        Ok(CompanySeries::new(symbol.clone(), in_window)?)
    }

    async fn execute_with_retry(
        &self,
        endpoint: &str,
        symbol: &Symbol,
        budget: Option<StdDuration>,
    ) -> Result<HttpResponse, ProviderError> {
        let mut attempt = 0;
        let mut spent = StdDuration::ZERO;
        loop {
            self.throttle.acquire().await;

            let mut attempt_timeout = StdDuration::from_millis(self.request_timeout_ms);
            if let Some(budget) = budget {
                attempt_timeout = attempt_timeout.min(budget.saturating_sub(spent));
            }
            let request = HttpRequest::get(endpoint)
                .with_header("referer", "https://finance.yahoo.com/")
                .with_timeout_ms(attempt_timeout.as_millis() as u64);

            let started = Instant::now();
            let outcome =
                tokio::time::timeout(attempt_timeout, self.http_client.execute(request)).await;
            spent += started.elapsed();

            let retry_reason = match outcome {
                Err(_) => format!("no response within {}ms", attempt_timeout.as_millis()),
                Ok(Ok(response)) if self.retry.should_retry_status(response.status) => {
                    format!("status {}", response.status)
                }
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(error)) if error.retryable() => error.message().to_owned(),
                Ok(Err(error)) => {
                    return Err(ProviderError::unavailable(format!(
                        "yahoo transport error: {}",
                        error.message()
                    )));
                }
            };

            if let Some(budget) = budget {
                if spent >= budget {
                    return Err(ProviderError::timeout(symbol, budget.as_millis()));
                }
            }
            if attempt >= self.retry.max_retries {
                return Err(ProviderError::unavailable(format!(
                    "yahoo request failed after {} attempts: {retry_reason}",
                    attempt + 1
                )));
            }

            let delay = self.retry.delay_for_attempt(attempt);
            warn!(
                endpoint,
                attempt,
                delay_ms = delay.as_millis() as u64,
                reason = %retry_reason,
                "retrying yahoo request"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl TimeSeriesProvider for YahooChartProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn fetch<'a>(&'a self, symbol: &'a Symbol, window: DateWindow) -> FetchFuture<'a> {
        Box::pin(self.fetch_history(symbol, window, None))
    }

    fn fetch_within<'a>(
        &'a self,
        symbol: &'a Symbol,
        window: DateWindow,
        budget: StdDuration,
    ) -> FetchFuture<'a> {
        Box::pin(self.fetch_history(symbol, window, Some(budget)))
    }
}

fn unix_midnight(day: Date) -> i64 {
    day.midnight().assume_utc().unix_timestamp()
}

fn parse_chart(body: &str, symbol: &Symbol) -> Result<Vec<PricePoint>, ProviderError> {
    let chart: YahooChartResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::malformed(format!("failed to parse yahoo chart: {e}")))?;

    if let Some(error) = chart.chart.error {
        if error.code.eq_ignore_ascii_case("not found") {
            return Err(ProviderError::not_found(symbol));
        }
        return Err(ProviderError::unavailable(format!(
            "yahoo chart API error: {} ({})",
            error.description, error.code
        )));
    }

    let result = chart
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| ProviderError::not_found(symbol))?;

    let Some(timestamps) = result.timestamp else {
        debug!(%symbol, "yahoo chart carries no timestamps");
        return Ok(Vec::new());
    };
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let offset = result.meta.map(|meta| meta.gmtoffset).unwrap_or(0);

    timestamps
        .iter()
        .enumerate()
        .map(|(i, &ts)| {
            // Exchange-local trading day, not the UTC day of the bar timestamp.
            let date = OffsetDateTime::from_unix_timestamp(ts + offset)
                .map_err(|e| ProviderError::malformed(format!("invalid timestamp {ts}: {e}")))?
                .date();
            let close = quote.close.get(i).copied().flatten();
            let volume = quote
                .volume
                .get(i)
                .copied()
                .flatten()
                .and_then(|v| u64::try_from(v).ok());
            Ok(PricePoint::new(date, close, volume))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Deserialize)]
struct YahooChartData {
    #[serde(default)]
    result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    error: Option<YahooChartError>,
}

#[derive(Debug, Deserialize)]
struct YahooChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooChartResult {
    #[serde(default)]
    meta: Option<YahooChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: YahooChartIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct YahooChartIndicators {
    quote: Vec<YahooChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<i64>>,
}
