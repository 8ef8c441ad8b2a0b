use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use time::macros::format_description;
use time::Date;

use crate::provider::{FetchFuture, ProviderError, ProviderId, TimeSeriesProvider};
use crate::{CompanySeries, DateWindow, PricePoint, Symbol};

/// Offline provider reading `<root>/<TICKER>.csv` files.
///
/// Each file carries a `date,close,volume` header with ISO dates. Empty
/// `close`/`volume` cells become missing values rather than errors.
#[derive(Debug, Clone)]
pub struct CsvDirectoryProvider {
    root: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    close: Option<f64>,
    volume: Option<u64>,
}

impl CsvDirectoryProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, symbol: &Symbol) -> PathBuf {
        self.root.join(format!("{}.csv", symbol.as_str()))
    }

    async fn load(
        &self,
        symbol: &Symbol,
        window: DateWindow,
    ) -> Result<CompanySeries, ProviderError> {
        let path = self.path_for(symbol);
        let body = match tokio::fs::read_to_string(&path).await {
            Ok(body) => body,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return Err(ProviderError::not_found(symbol));
            }
            Err(error) => {
                return Err(ProviderError::unavailable(format!(
                    "failed to read '{}': {error}",
                    path.display()
                )));
            }
        };

        let points = parse_points(&body).map_err(|message| {
            ProviderError::malformed(format!("{}: {message}", path.display()))
        })?;

        let in_window: Vec<PricePoint> = points
            .into_iter()
            .filter(|point| window.contains(point.date))
            .collect();
        if in_window.is_empty() {
            return Err(ProviderError::insufficient_history(symbol, window));
        }

        Ok(CompanySeries::new(symbol.clone(), in_window)?)
    }
}

impl TimeSeriesProvider for CsvDirectoryProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Csv
    }

    fn fetch<'a>(&'a self, symbol: &'a Symbol, window: DateWindow) -> FetchFuture<'a> {
        Box::pin(self.load(symbol, window))
    }
}

fn parse_points(body: &str) -> Result<Vec<PricePoint>, String> {
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let mut points = Vec::new();

    for (line, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row.map_err(|error| format!("row {}: {error}", line + 1))?;
        let date = Date::parse(row.date.trim(), format_description!("[year]-[month]-[day]"))
            .map_err(|_| format!("row {}: invalid date '{}'", line + 1, row.date))?;
        points.push(PricePoint::new(date, row.close, row.volume));
    }

    Ok(points)
}
