use std::cmp::Ordering;

use time::Date;
use tracing::{info, warn};

use crate::evaluation::{EvaluationError, InvalidCompany};
use crate::momentum::{MomentumEvaluator, MomentumOutcome, MomentumRecord};
use crate::pool::WorkerPool;
use crate::Company;

/// Default number of companies kept after ranking.
pub const DEFAULT_TOP_COMPANY_COUNT: usize = 20;

/// Ranked momentum records plus every per-company outcome, in watchlist order.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub ranked: Vec<MomentumRecord>,
    pub outcomes: Vec<MomentumOutcome>,
}

impl Ranking {
    /// Companies that could not be evaluated, with the reason.
    pub fn unusable(&self) -> Vec<InvalidCompany> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                MomentumOutcome::Usable(_) => None,
                MomentumOutcome::Unusable { record, reason } => {
                    Some(InvalidCompany::new(record.company.clone(), reason.clone()))
                }
            })
            .collect()
    }
}

/// Fans momentum evaluation out over a [`WorkerPool`] and ranks the results.
#[derive(Clone)]
pub struct ParallelRanker {
    evaluator: MomentumEvaluator,
    pool: WorkerPool,
}

impl ParallelRanker {
    pub fn new(evaluator: MomentumEvaluator, pool: WorkerPool) -> Self {
        Self { evaluator, pool }
    }

    pub fn pool(&self) -> WorkerPool {
        self.pool
    }

    /// Evaluates every company for the year ending at `end` and keeps the
    /// `top_n` usable records with the highest yearly return.
    pub async fn rank(&self, companies: &[Company], end: Date, top_n: usize) -> Ranking {
        info!(
            companies = companies.len(),
            workers = self.pool.size(),
            "evaluating momentum"
        );

        let evaluator = self.evaluator.clone();
        let results = self
            .pool
            .run(companies.to_vec(), move |company: Company| {
                let evaluator = evaluator.clone();
                async move { evaluator.evaluate(&company, end).await }
            })
            .await;

        let outcomes: Vec<MomentumOutcome> = results
            .into_iter()
            .zip(companies)
            .map(|(result, company)| {
                result.unwrap_or_else(|panic| {
                    warn!(company = %company, error = %panic, "momentum worker panicked");
                    MomentumOutcome::unusable(company.name(), EvaluationError::WorkerPanic(panic))
                })
            })
            .collect();

        let ranked = rank_records(outcomes.iter().map(MomentumOutcome::record).cloned(), top_n);
        let unusable = outcomes.len() - outcomes.iter().filter(|o| o.is_usable()).count();
        info!(ranked = ranked.len(), unusable, "momentum ranking complete");

        Ranking { ranked, outcomes }
    }
}

/// Drops unusable records, sorts by yearly return descending (ties by company
/// name ascending) and keeps the first `top_n`.
///
/// The result depends only on the set of records, not on their input order.
pub fn rank_records(
    records: impl IntoIterator<Item = MomentumRecord>,
    top_n: usize,
) -> Vec<MomentumRecord> {
    let mut usable: Vec<MomentumRecord> = records
        .into_iter()
        .filter(MomentumRecord::is_usable)
        .collect();
    usable.sort_by(compare_by_yearly_return);
    usable.truncate(top_n);
    usable
}

fn compare_by_yearly_return(a: &MomentumRecord, b: &MomentumRecord) -> Ordering {
    let a_return = a.return_yearly.unwrap_or(f64::NEG_INFINITY);
    let b_return = b.return_yearly.unwrap_or(f64::NEG_INFINITY);
    b_return
        .total_cmp(&a_return)
        .then_with(|| a.company.cmp(&b.company))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn record(company: &str, yearly: Option<f64>) -> MomentumRecord {
        let day = date!(2024 - 01 - 01);
        MomentumRecord {
            company: company.to_owned(),
            yearly_start_date: day,
            yearly_start_close: Some(100.0),
            yearly_end_date: day,
            yearly_end_close: Some(110.0),
            return_yearly: yearly,
            monthly_start_date: day,
            monthly_start_close: Some(105.0),
            monthly_end_date: day,
            monthly_end_close: Some(110.0),
            return_monthly: Some(0.1),
        }
    }

    fn names(records: &[MomentumRecord]) -> Vec<&str> {
        records.iter().map(|r| r.company.as_str()).collect()
    }

    #[test]
    fn sorts_descending_and_truncates() {
        let ranked = rank_records(
            vec![
                record("LOW", Some(0.05)),
                record("HIGH", Some(0.40)),
                record("MID", Some(0.20)),
            ],
            2,
        );
        assert_eq!(names(&ranked), vec!["HIGH", "MID"]);
    }

    #[test]
    fn ties_break_on_company_name() {
        let ranked = rank_records(
            vec![record("ZETA", Some(0.1)), record("ALPHA", Some(0.1))],
            DEFAULT_TOP_COMPANY_COUNT,
        );
        assert_eq!(names(&ranked), vec!["ALPHA", "ZETA"]);
    }

    #[test]
    fn unusable_records_are_dropped() {
        let ranked = rank_records(
            vec![
                record("OK", Some(0.1)),
                record("MISSING", None),
                MomentumRecord::unusable("BROKEN"),
            ],
            10,
        );
        assert_eq!(names(&ranked), vec!["OK"]);
    }

    #[test]
    fn input_order_does_not_matter() {
        let records = vec![
            record("A", Some(0.3)),
            record("B", Some(0.1)),
            record("C", Some(0.3)),
            record("D", Some(-0.2)),
        ];
        let mut reversed = records.clone();
        reversed.reverse();

        assert_eq!(rank_records(records, 3), rank_records(reversed, 3));
    }
}
