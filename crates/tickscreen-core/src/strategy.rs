use std::path::PathBuf;
use std::sync::Arc;

use time::Date;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{CompanySource, ConfigError, ScreenConfig};
use crate::ema_signal::{EmaJoiner, EmaPeriods, EmaRecord};
use crate::evaluation::InvalidCompany;
use crate::momentum::{MomentumEvaluator, MomentumRecord};
use crate::provider::{ProviderId, TimeSeriesProvider};
use crate::ranker::ParallelRanker;
use crate::report::{self, merge_one_to_one, ReportRow, Table};
use crate::volume::{VolumeRecord, VolumeScanner};
use crate::{Company, CoreError, ValidationError};

/// Everything a strategy run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutcome<R> {
    /// Id attached to every log event of the run.
    pub run_id: Uuid,
    pub rows: Vec<R>,
    pub table: Table,
    /// Companies left out of `rows`, with the reason.
    pub invalid: Vec<InvalidCompany>,
    /// Set when the table was written to the export directory.
    pub report_path: Option<PathBuf>,
}

/// Strategy entry points over one watchlist and one provider.
#[derive(Clone)]
pub struct Screener {
    provider: Arc<dyn TimeSeriesProvider>,
    companies: Vec<Company>,
    config: ScreenConfig,
}

impl Screener {
    pub fn new(
        provider: Arc<dyn TimeSeriesProvider>,
        companies: Vec<Company>,
        config: ScreenConfig,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        if companies.is_empty() {
            return Err(ConfigError::EmptyWatchlist.into());
        }
        Ok(Self {
            provider,
            companies,
            config,
        })
    }

    /// Resolves `source` (using the configured exchange suffix) and builds a screener.
    pub fn from_source(
        provider: Arc<dyn TimeSeriesProvider>,
        source: &CompanySource,
        config: ScreenConfig,
    ) -> Result<Self, CoreError> {
        let companies = source.resolve(config.exchange_suffix.as_deref())?;
        Self::new(provider, companies, config)
    }

    pub fn companies(&self) -> &[Company] {
        &self.companies
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    /// Provider serving this screener, recorded on every `screen_run` span.
    pub fn provider_id(&self) -> ProviderId {
        self.provider.id()
    }

    /// Ranks the watchlist by yearly return over the year ending at `end`.
    pub async fn momentum_strategy(
        &self,
        end: Date,
        top_company_count: usize,
        save: bool,
    ) -> Result<StrategyOutcome<MomentumRecord>, CoreError> {
        ensure_positive(top_company_count, "top_company_count")?;
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "screen_run",
            %run_id,
            strategy = "momentum",
            provider = %self.provider_id()
        );

        async {
            let ranking = self.ranker().rank(&self.companies, end, top_company_count).await;
            let table = Table::momentum(&ranking.ranked);
            let file_name = report::momentum_file_name(end, top_company_count);
            self.finish(run_id, ranking.ranked.clone(), table, ranking.unusable(), save, &file_name)
        }
        .instrument(span)
        .await
    }

    /// Momentum ranking joined 1:1 with the EMA crossover of the top companies.
    pub async fn momentum_with_ema_strategy(
        &self,
        end: Date,
        top_company_count: usize,
        periods: EmaPeriods,
        save: bool,
    ) -> Result<StrategyOutcome<ReportRow>, CoreError> {
        ensure_positive(top_company_count, "top_company_count")?;
        let periods = EmaPeriods::new(periods.short, periods.long)?;
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "screen_run",
            %run_id,
            strategy = "momentum_ema",
            provider = %self.provider_id()
        );

        async {
            info!("performing momentum strategy");
            let ranking = self.ranker().rank(&self.companies, end, top_company_count).await;

            let top = self.companies_named(&ranking.ranked);
            info!(companies = top.len(), cutoff = %end, "performing ema task on top companies");
            let ema = self.ema_joiner(periods).join(&top, end).await;

            let rows = merge_one_to_one(&ranking.ranked, &ema.records)?;
            let table = Table::report(&rows, periods);
            let mut invalid = ranking.unusable();
            invalid.extend(ema.invalid);

            let file_name = report::momentum_ema_file_name(end, periods, top_company_count);
            self.finish(run_id, rows, table, invalid, save, &file_name)
        }
        .instrument(span)
        .await
    }

    /// EMA crossover of every watchlist company, using history up to `cutoff`.
    pub async fn ema_indicator(
        &self,
        cutoff: Date,
        periods: EmaPeriods,
        save: bool,
    ) -> Result<StrategyOutcome<EmaRecord>, CoreError> {
        let periods = EmaPeriods::new(periods.short, periods.long)?;
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "screen_run",
            %run_id,
            strategy = "ema",
            provider = %self.provider_id()
        );

        async {
            let ema = self.ema_joiner(periods).join(&self.companies, cutoff).await;
            let table = Table::ema(&ema.records, periods);
            let file_name = report::ema_file_name(cutoff);
            self.finish(run_id, ema.records, table, ema.invalid, save, &file_name)
        }
        .instrument(span)
        .await
    }

    /// Latest volume against the mean of the trailing `window_days`.
    pub async fn volume_indicator(
        &self,
        end: Date,
        window_days: u32,
        save: bool,
    ) -> Result<StrategyOutcome<VolumeRecord>, CoreError> {
        if window_days == 0 {
            return Err(ValidationError::NonPositive {
                field: "volume_window_days",
            }
            .into());
        }
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "screen_run",
            %run_id,
            strategy = "volume",
            provider = %self.provider_id()
        );

        async {
            let scanner = VolumeScanner::new(Arc::clone(&self.provider), window_days)
                .with_fetch_timeout(self.config.fetch_timeout());
            let volume = scanner.scan(&self.companies, end).await;
            let table = Table::volume(&volume.records);
            let file_name = report::volume_file_name(end, window_days);
            self.finish(run_id, volume.records, table, volume.invalid, save, &file_name)
        }
        .instrument(span)
        .await
    }

    fn ranker(&self) -> ParallelRanker {
        let evaluator = MomentumEvaluator::new(Arc::clone(&self.provider))
            .with_fetch_timeout(self.config.fetch_timeout());
        ParallelRanker::new(evaluator, self.config.worker_pool())
    }

    fn ema_joiner(&self, periods: EmaPeriods) -> EmaJoiner {
        EmaJoiner::new(Arc::clone(&self.provider), periods)
            .with_smoothing(self.config.smoothing)
            .with_fetch_timeout(self.config.fetch_timeout())
    }

    /// Watchlist entries for the ranked records, in ranking order.
    fn companies_named(&self, records: &[MomentumRecord]) -> Vec<Company> {
        records
            .iter()
            .filter_map(|record| {
                self.companies
                    .iter()
                    .find(|company| company.name() == record.company)
                    .cloned()
            })
            .collect()
    }

    fn finish<R>(
        &self,
        run_id: Uuid,
        rows: Vec<R>,
        table: Table,
        invalid: Vec<InvalidCompany>,
        save: bool,
        file_name: &str,
    ) -> Result<StrategyOutcome<R>, CoreError> {
        for entry in &invalid {
            warn!(
                company = %entry.company,
                reason = %entry.reason,
                "company left out of the report"
            );
        }

        let report_path = if save {
            let path = table.write_csv(&self.config.export_path, file_name)?;
            info!(path = %path.display(), rows = table.len(), "report saved");
            Some(path)
        } else {
            None
        };

        info!(rows = table.len(), invalid = invalid.len(), "run complete");
        Ok(StrategyOutcome {
            run_id,
            rows,
            table,
            invalid,
            report_path,
        })
    }
}

fn ensure_positive(value: usize, field: &'static str) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::NonPositive { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryProvider;
    use crate::{PricePoint, Symbol};
    use time::macros::date;

    fn series(len: usize, start: f64, step: f64) -> Vec<PricePoint> {
        (0..len)
            .map(|i| {
                PricePoint::new(
                    date!(2023 - 01 - 01) + time::Duration::days(i as i64),
                    Some(start + step * i as f64),
                    Some(1_000 + i as u64),
                )
            })
            .collect()
    }

    fn screener(provider: InMemoryProvider, names: &[&str], config: ScreenConfig) -> Screener {
        let companies = names
            .iter()
            .map(|name| Company::new(name, None).expect("valid company"))
            .collect();
        Screener::new(Arc::new(provider), companies, config).expect("screener")
    }

    #[test]
    fn rejects_empty_watchlist_and_bad_settings() {
        let provider: Arc<dyn TimeSeriesProvider> = Arc::new(InMemoryProvider::new());
        assert!(matches!(
            Screener::new(Arc::clone(&provider), Vec::new(), ScreenConfig::default()),
            Err(CoreError::Config(ConfigError::EmptyWatchlist))
        ));

        let config = ScreenConfig {
            smoothing: 0.0,
            ..ScreenConfig::default()
        };
        let companies = vec![Company::new("A", None).expect("valid company")];
        assert!(matches!(
            Screener::new(provider, companies, config),
            Err(CoreError::Config(ConfigError::InvalidSetting { field: "smoothing", .. }))
        ));
    }

    #[tokio::test]
    async fn momentum_with_ema_saves_the_joined_report() {
        let dir = tempfile::tempdir().expect("tempdir");
        let provider = InMemoryProvider::new()
            .with_series(Symbol::parse("UP").expect("symbol"), series(365, 100.0, 0.5))
            .with_series(Symbol::parse("FLAT").expect("symbol"), series(365, 100.0, 0.0))
            .with_series(Symbol::parse("SHORT").expect("symbol"), series(10, 100.0, 1.0));
        let config = ScreenConfig {
            export_path: dir.path().to_path_buf(),
            worker_count: Some(2),
            ..ScreenConfig::default()
        };
        let screener = screener(provider, &["UP", "FLAT", "SHORT"], config);

        let outcome = screener
            .momentum_with_ema_strategy(date!(2023 - 12 - 31), 5, EmaPeriods::default(), true)
            .await
            .expect("run");

        let order: Vec<&str> = outcome.rows.iter().map(|r| r.momentum.company.as_str()).collect();
        assert_eq!(order, vec!["UP", "FLAT"]);
        assert_eq!(outcome.invalid.len(), 1);
        assert_eq!(outcome.invalid[0].company, "SHORT");
        assert_eq!(
            outcome.report_path,
            Some(dir.path().join("momentum_ema50-200_31-12-2023_top_5.csv"))
        );
    }

    #[tokio::test]
    async fn duplicate_watchlist_entries_fail_the_merge() {
        let provider = InMemoryProvider::new()
            .with_series(Symbol::parse("DUP").expect("symbol"), series(365, 100.0, 0.5));
        let screener = screener(provider, &["DUP", "DUP"], ScreenConfig::default());

        let error = screener
            .momentum_with_ema_strategy(date!(2023 - 12 - 31), 5, EmaPeriods::default(), false)
            .await
            .expect_err("duplicate key");
        assert!(matches!(
            error,
            CoreError::Report(report::ReportError::MergeCardinality { .. })
        ));
    }

    #[tokio::test]
    async fn unsaved_runs_leave_no_file() {
        let provider = InMemoryProvider::new()
            .with_series(Symbol::parse("UP").expect("symbol"), series(60, 10.0, 1.0));
        let screener = screener(provider, &["UP"], ScreenConfig::default());

        let outcome = screener
            .volume_indicator(date!(2023 - 03 - 01), 30, false)
            .await
            .expect("run");

        assert_eq!(outcome.rows.len(), 1);
        assert!(outcome.rows[0].action);
        assert_eq!(outcome.report_path, None);
        assert_eq!(screener.provider_id(), ProviderId::Memory);
        assert!(screener.volume_indicator(date!(2023 - 03 - 01), 0, false).await.is_err());
    }
}
