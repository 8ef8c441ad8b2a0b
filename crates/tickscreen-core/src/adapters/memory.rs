use std::collections::HashMap;
use std::time::Duration;

use crate::provider::{
    FetchFuture, ProviderError, ProviderErrorKind, ProviderId, TimeSeriesProvider,
};
use crate::{CompanySeries, DateWindow, PricePoint, Symbol};

/// Deterministic provider backed by in-process series.
///
/// Points are stored as given and validated on every fetch, so tests can feed
/// unordered data and observe the resulting per-company failure. Failures and
/// per-ticker latency can be injected to exercise isolation and scheduling.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    series: HashMap<Symbol, Vec<PricePoint>>,
    failures: HashMap<Symbol, ProviderErrorKind>,
    latency: HashMap<Symbol, Duration>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, symbol: Symbol, points: Vec<PricePoint>) -> Self {
        self.series.insert(symbol, points);
        self
    }

    pub fn with_failure(mut self, symbol: Symbol, kind: ProviderErrorKind) -> Self {
        self.failures.insert(symbol, kind);
        self
    }

    pub fn with_latency(mut self, symbol: Symbol, latency: Duration) -> Self {
        self.latency.insert(symbol, latency);
        self
    }

    fn lookup(&self, symbol: &Symbol, window: DateWindow) -> Result<CompanySeries, ProviderError> {
        if let Some(kind) = self.failures.get(symbol) {
            return Err(injected_failure(*kind, symbol, window));
        }

        let points = self
            .series
            .get(symbol)
            .ok_or_else(|| ProviderError::not_found(symbol))?;

        let in_window: Vec<PricePoint> = points
            .iter()
            .copied()
            .filter(|point| window.contains(point.date))
            .collect();
        if in_window.is_empty() {
            return Err(ProviderError::insufficient_history(symbol, window));
        }

        Ok(CompanySeries::new(symbol.clone(), in_window)?)
    }
}

impl TimeSeriesProvider for InMemoryProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Memory
    }

    fn fetch<'a>(&'a self, symbol: &'a Symbol, window: DateWindow) -> FetchFuture<'a> {
        Box::pin(async move {
            if let Some(latency) = self.latency.get(symbol) {
                tokio::time::sleep(*latency).await;
            }
            self.lookup(symbol, window)
        })
    }
}

fn injected_failure(kind: ProviderErrorKind, symbol: &Symbol, window: DateWindow) -> ProviderError {
    match kind {
        ProviderErrorKind::NotFound => ProviderError::not_found(symbol),
        ProviderErrorKind::InsufficientHistory => {
            ProviderError::insufficient_history(symbol, window)
        }
        ProviderErrorKind::Unavailable => {
            ProviderError::unavailable(format!("injected outage for '{symbol}'"))
        }
        ProviderErrorKind::Malformed => {
            ProviderError::malformed(format!("injected malformed payload for '{symbol}'"))
        }
        ProviderErrorKind::Timeout => ProviderError::timeout(symbol, 0),
    }
}
