use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{CompanySeries, DateWindow, Symbol, ValidationError};

/// Identifier of a time-series provider, carried by the `screen_run` span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Yahoo,
    Csv,
    Memory,
}

impl ProviderId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yahoo => "yahoo",
            Self::Csv => "csv",
            Self::Memory => "memory",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Ticker is unknown to the provider.
    NotFound,
    /// Ticker exists but has no observations in the requested window.
    InsufficientHistory,
    /// Transport or upstream failure.
    Unavailable,
    /// Response could not be turned into a valid series.
    Malformed,
    /// The fetch did not complete within the configured budget.
    Timeout,
}

/// Structured provider error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    kind: ProviderErrorKind,
    message: String,
    retryable: bool,
}

impl ProviderError {
    pub fn not_found(symbol: &Symbol) -> Self {
        Self {
            kind: ProviderErrorKind::NotFound,
            message: format!("ticker '{symbol}' was not found"),
            retryable: false,
        }
    }

    pub fn insufficient_history(symbol: &Symbol, window: DateWindow) -> Self {
        Self {
            kind: ProviderErrorKind::InsufficientHistory,
            message: format!("ticker '{symbol}' has no observations in {window}"),
            retryable: false,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Malformed,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn timeout(symbol: &Symbol, budget_ms: u128) -> Self {
        Self {
            kind: ProviderErrorKind::Timeout,
            message: format!("fetch for '{symbol}' exceeded {budget_ms}ms"),
            retryable: true,
        }
    }

    pub const fn kind(&self) -> ProviderErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ProviderErrorKind::NotFound => "provider.not_found",
            ProviderErrorKind::InsufficientHistory => "provider.insufficient_history",
            ProviderErrorKind::Unavailable => "provider.unavailable",
            ProviderErrorKind::Malformed => "provider.malformed",
            ProviderErrorKind::Timeout => "provider.timeout",
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for ProviderError {}

impl From<ValidationError> for ProviderError {
    fn from(error: ValidationError) -> Self {
        Self::malformed(error.to_string())
    }
}

/// Boxed future returned by [`TimeSeriesProvider::fetch`].
pub type FetchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CompanySeries, ProviderError>> + Send + 'a>>;

/// Source of daily price history.
///
/// Implementations must be `Send + Sync`: one provider instance is shared by
/// every worker of a run.
pub trait TimeSeriesProvider: Send + Sync {
    /// Returns the provider identifier.
    fn id(&self) -> ProviderId;

    /// Fetches the ordered daily series of `symbol` within `window` (inclusive).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if:
    /// - the ticker is unknown ([`ProviderErrorKind::NotFound`])
    /// - the window holds no observations ([`ProviderErrorKind::InsufficientHistory`])
    /// - the upstream is unreachable or returns an unparsable payload
    fn fetch<'a>(&'a self, symbol: &'a Symbol, window: DateWindow) -> FetchFuture<'a>;

    /// Like [`fetch`](Self::fetch), but fails with [`ProviderErrorKind::Timeout`]
    /// once the upstream work of this fetch exceeds `budget`.
    ///
    /// The default bounds the whole fetch. Providers that queue calls behind a
    /// shared rate limiter override it so that waiting for a permit is not
    /// charged to the budget.
    fn fetch_within<'a>(
        &'a self,
        symbol: &'a Symbol,
        window: DateWindow,
        budget: Duration,
    ) -> FetchFuture<'a> {
        Box::pin(async move {
            tokio::time::timeout(budget, self.fetch(symbol, window))
                .await
                .map_err(|_| ProviderError::timeout(symbol, budget.as_millis()))?
        })
    }
}
