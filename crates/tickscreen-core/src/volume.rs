use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use time::Date;
use tracing::{info, warn};

use crate::evaluation::{EvaluationError, InvalidCompany};
use crate::momentum::{fetch_with_timeout, DEFAULT_FETCH_TIMEOUT};
use crate::provider::TimeSeriesProvider;
use crate::{Company, DateWindow};

/// Default calendar-day window of the volume indicator.
pub const DEFAULT_VOLUME_WINDOW_DAYS: u32 = 90;

/// Latest volume of a company against its mean over the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeRecord {
    pub company: String,
    pub current_date: Date,
    pub start_date: Date,
    pub current_volume: u64,
    pub mean_volume: f64,
    pub close_price: Option<f64>,
    /// Latest volume is strictly above the window mean.
    pub action: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VolumeTable {
    pub records: Vec<VolumeRecord>,
    pub invalid: Vec<InvalidCompany>,
}

/// Flags companies trading above their recent average volume.
#[derive(Clone)]
pub struct VolumeScanner {
    provider: Arc<dyn TimeSeriesProvider>,
    window_days: u32,
    fetch_timeout: Duration,
}

impl VolumeScanner {
    pub fn new(provider: Arc<dyn TimeSeriesProvider>, window_days: u32) -> Self {
        Self {
            provider,
            window_days,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    pub async fn scan(&self, companies: &[Company], end: Date) -> VolumeTable {
        let mut table = VolumeTable::default();

        for (idx, company) in companies.iter().enumerate() {
            info!(
                company = %company,
                progress = idx + 1,
                total = companies.len(),
                "retrieving volume data"
            );
            match self.evaluate(company, end).await {
                Ok(record) => table.records.push(record),
                Err(reason) => {
                    warn!(company = %company, error = %reason, "excluded from volume table");
                    table.invalid.push(InvalidCompany::new(company.name(), reason));
                }
            }
        }

        table
    }

    /// The latest observation must carry a volume; the mean skips days
    /// without one.
    pub async fn evaluate(
        &self,
        company: &Company,
        end: Date,
    ) -> Result<VolumeRecord, EvaluationError> {
        let series = fetch_with_timeout(
            self.provider.as_ref(),
            company,
            DateWindow::trailing_days(end, self.window_days),
            self.fetch_timeout,
        )
        .await?;

        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return Err(EvaluationError::MissingVolume);
        };
        let current_volume = last.volume.ok_or(EvaluationError::MissingVolume)?;

        let volumes: Vec<u64> = series.points().iter().filter_map(|p| p.volume).collect();
        let mean_volume = volumes.iter().map(|&v| v as f64).sum::<f64>() / volumes.len() as f64;

        Ok(VolumeRecord {
            company: company.name().to_owned(),
            current_date: last.date,
            start_date: first.date,
            current_volume,
            mean_volume,
            close_price: last.usable_close(),
            action: current_volume as f64 > mean_volume,
        })
    }
}
