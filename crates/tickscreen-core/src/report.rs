//! # Report Assembly
//!
//! Flattens strategy records into comma-separated tables and writes them to
//! the export directory.
//!
//! | File | Produced by |
//! |------|-------------|
//! | `momentum_result_{date}_top_{n}.csv` | momentum ranking |
//! | `momentum_ema{short}-{long}_{date}_top_{n}.csv` | momentum joined with EMA |
//! | `ema_indicator_{date}.csv` | EMA crossover over the watchlist |
//! | `VolumeIndicator{days}Days_detailed_{date}.csv` | volume indicator |
//!
//! Dates in file names and cells use `dd-mm-yyyy`. Absent values are written
//! as empty cells.

use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::Date;

use crate::ema_signal::{EmaPeriods, EmaRecord};
use crate::momentum::MomentumRecord;
use crate::volume::VolumeRecord;
use crate::{format_report_date, SENTINEL_DATE};

/// Side of a merge on which a key was duplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeSide {
    Momentum,
    Ema,
}

impl Display for MergeSide {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Momentum => "momentum",
            Self::Ema => "ema",
        })
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("company '{company}' appears more than once in the {side} table")]
    MergeCardinality { company: String, side: MergeSide },

    #[error("failed to write report '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// One company's momentum record joined with its EMA record.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub momentum: MomentumRecord,
    pub ema: EmaRecord,
}

/// Inner join on company name, keeping the order of `momentum`.
///
/// Each company may appear at most once per side; a duplicate on either side
/// is a [`ReportError::MergeCardinality`], never silently collapsed.
pub fn merge_one_to_one(
    momentum: &[MomentumRecord],
    ema: &[EmaRecord],
) -> Result<Vec<ReportRow>, ReportError> {
    ensure_unique(momentum.iter().map(|r| r.company.as_str()), MergeSide::Momentum)?;
    ensure_unique(ema.iter().map(|r| r.company.as_str()), MergeSide::Ema)?;

    let by_company: HashMap<&str, &EmaRecord> =
        ema.iter().map(|r| (r.company.as_str(), r)).collect();

    Ok(momentum
        .iter()
        .filter_map(|record| {
            by_company.get(record.company.as_str()).map(|ema| ReportRow {
                momentum: record.clone(),
                ema: (*ema).clone(),
            })
        })
        .collect())
}

fn ensure_unique<'a>(
    companies: impl Iterator<Item = &'a str>,
    side: MergeSide,
) -> Result<(), ReportError> {
    let mut seen = HashSet::new();
    for company in companies {
        if !seen.insert(company) {
            return Err(ReportError::MergeCardinality {
                company: company.to_owned(),
                side,
            });
        }
    }
    Ok(())
}

/// Header plus rows of string cells, ready to be written as CSV.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

const MOMENTUM_COLUMNS: [&str; 11] = [
    "company",
    "yearly_start_date",
    "yearly_start_date_close",
    "yearly_end_date",
    "yearly_end_date_close",
    "return_yearly",
    "monthly_start_date",
    "monthly_start_date_close",
    "monthly_end_date",
    "monthly_end_date_close",
    "return_monthly",
];

impl Table {
    pub fn momentum(records: &[MomentumRecord]) -> Self {
        Self {
            header: MOMENTUM_COLUMNS.iter().map(|c| (*c).to_owned()).collect(),
            rows: records.iter().map(momentum_cells).collect(),
        }
    }

    pub fn ema(records: &[EmaRecord], periods: EmaPeriods) -> Self {
        let mut header = vec!["company".to_owned()];
        header.extend(ema_columns(periods));
        Self {
            header,
            rows: records
                .iter()
                .map(|r| {
                    let mut cells = vec![r.company.clone()];
                    cells.extend(ema_cells(r));
                    cells
                })
                .collect(),
        }
    }

    pub fn report(rows: &[ReportRow], periods: EmaPeriods) -> Self {
        let mut header: Vec<String> = MOMENTUM_COLUMNS.iter().map(|c| (*c).to_owned()).collect();
        header.extend(ema_columns(periods));
        Self {
            header,
            rows: rows
                .iter()
                .map(|row| {
                    let mut cells = momentum_cells(&row.momentum);
                    cells.extend(ema_cells(&row.ema));
                    cells
                })
                .collect(),
        }
    }

    pub fn volume(records: &[VolumeRecord]) -> Self {
        Self {
            header: [
                "company",
                "current date",
                "start date",
                "current volume",
                "mean volume",
                "close price",
                "action",
            ]
            .iter()
            .map(|c| (*c).to_owned())
            .collect(),
            rows: records
                .iter()
                .map(|r| {
                    vec![
                        r.company.clone(),
                        date_cell(r.current_date),
                        date_cell(r.start_date),
                        r.current_volume.to_string(),
                        r.mean_volume.to_string(),
                        number_cell(r.close_price),
                        r.action.to_string(),
                    ]
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn write_to<W: std::io::Write>(&self, sink: W) -> Result<(), ReportError> {
        let mut writer = csv::Writer::from_writer(sink);
        writer.write_record(&self.header)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String, ReportError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Writes the table to `dir/file_name`, creating `dir` if needed.
    pub fn write_csv(&self, dir: &Path, file_name: &str) -> Result<PathBuf, ReportError> {
        std::fs::create_dir_all(dir).map_err(|source| ReportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(file_name);
        let file = std::fs::File::create(&path).map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;
        self.write_to(file)?;
        Ok(path)
    }
}

fn ema_columns(periods: EmaPeriods) -> [String; 3] {
    [
        format!("ema{}", periods.short),
        format!("ema{}", periods.long),
        "action".to_owned(),
    ]
}

fn ema_cells(record: &EmaRecord) -> [String; 3] {
    [
        record.ema_short.to_string(),
        record.ema_long.to_string(),
        record.action.to_string(),
    ]
}

fn momentum_cells(record: &MomentumRecord) -> Vec<String> {
    vec![
        record.company.clone(),
        date_cell(record.yearly_start_date),
        number_cell(record.yearly_start_close),
        date_cell(record.yearly_end_date),
        number_cell(record.yearly_end_close),
        number_cell(record.return_yearly),
        date_cell(record.monthly_start_date),
        number_cell(record.monthly_start_close),
        date_cell(record.monthly_end_date),
        number_cell(record.monthly_end_close),
        number_cell(record.return_monthly),
    ]
}

fn date_cell(day: Date) -> String {
    if day == SENTINEL_DATE {
        String::new()
    } else {
        format_report_date(day)
    }
}

fn number_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn momentum_file_name(run_date: Date, top_n: usize) -> String {
    format!("momentum_result_{}_top_{top_n}.csv", format_report_date(run_date))
}

pub fn momentum_ema_file_name(run_date: Date, periods: EmaPeriods, top_n: usize) -> String {
    format!(
        "momentum_ema{}-{}_{}_top_{top_n}.csv",
        periods.short,
        periods.long,
        format_report_date(run_date)
    )
}

pub fn ema_file_name(run_date: Date) -> String {
    format!("ema_indicator_{}.csv", format_report_date(run_date))
}

pub fn volume_file_name(run_date: Date, days: u32) -> String {
    format!(
        "VolumeIndicator{days}Days_detailed_{}.csv",
        format_report_date(run_date)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ema_signal::Action;
    use time::macros::date;

    fn momentum(company: &str) -> MomentumRecord {
        MomentumRecord {
            company: company.to_owned(),
            yearly_start_date: date!(2023 - 06 - 01),
            yearly_start_close: Some(100.0),
            yearly_end_date: date!(2024 - 05 - 31),
            yearly_end_close: Some(121.0),
            return_yearly: Some(0.21),
            monthly_start_date: date!(2024 - 04 - 19),
            monthly_start_close: Some(110.0),
            monthly_end_date: date!(2024 - 05 - 31),
            monthly_end_close: Some(121.0),
            return_monthly: Some(0.5),
        }
    }

    fn ema(company: &str) -> EmaRecord {
        EmaRecord {
            company: company.to_owned(),
            ema_short: 12.5,
            ema_long: 10.0,
            action: Action::Buy,
        }
    }

    #[test]
    fn merge_keeps_momentum_order() {
        let rows = merge_one_to_one(
            &[momentum("B"), momentum("A"), momentum("C")],
            &[ema("A"), ema("C"), ema("B")],
        )
        .expect("unique keys");

        let order: Vec<&str> = rows.iter().map(|r| r.momentum.company.as_str()).collect();
        assert_eq!(order, vec!["B", "A", "C"]);
    }

    #[test]
    fn merge_drops_companies_without_ema() {
        let rows = merge_one_to_one(&[momentum("A"), momentum("B")], &[ema("B")]).expect("merge");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ema.company, "B");
    }

    #[test]
    fn duplicate_keys_fail_the_merge() {
        let error = merge_one_to_one(&[momentum("A"), momentum("A")], &[ema("A")])
            .expect_err("duplicate momentum key");
        assert!(matches!(
            error,
            ReportError::MergeCardinality {
                ref company,
                side: MergeSide::Momentum,
            } if company == "A"
        ));

        let error = merge_one_to_one(&[momentum("A")], &[ema("A"), ema("A")])
            .expect_err("duplicate ema key");
        assert!(matches!(error, ReportError::MergeCardinality { side: MergeSide::Ema, .. }));
    }

    #[test]
    fn renders_momentum_rows() {
        let table = Table::momentum(&[momentum("ACME"), MomentumRecord::unusable("DEAD")]);
        let csv = table.to_csv_string().expect("csv");
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], MOMENTUM_COLUMNS.join(","));
        assert_eq!(
            lines[1],
            "ACME,01-06-2023,100,31-05-2024,121,0.21,19-04-2024,110,31-05-2024,121,0.5"
        );
        assert_eq!(lines[2], "DEAD,,,,,,,,,,");
    }

    #[test]
    fn report_header_names_the_ema_periods() {
        let rows = merge_one_to_one(&[momentum("A")], &[ema("A")]).expect("merge");
        let table = Table::report(&rows, EmaPeriods::default());

        assert_eq!(&table.header[11..], ["ema50", "ema200", "action"]);
        assert_eq!(&table.rows[0][11..], ["12.5", "10", "buy"]);
    }

    #[test]
    fn writes_into_a_fresh_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("reports");
        let table = Table::ema(&[ema("A")], EmaPeriods::default());

        let path = table
            .write_csv(&target, &ema_file_name(date!(2020 - 06 - 01)))
            .expect("write");

        assert_eq!(path, target.join("ema_indicator_01-06-2020.csv"));
        let body = std::fs::read_to_string(path).expect("read back");
        assert_eq!(body, "company,ema50,ema200,action\nA,12.5,10,buy\n");
    }

    #[test]
    fn file_names_follow_the_report_layout() {
        let day = date!(2020 - 06 - 01);
        assert_eq!(momentum_file_name(day, 20), "momentum_result_01-06-2020_top_20.csv");
        assert_eq!(
            momentum_ema_file_name(day, EmaPeriods::default(), 5),
            "momentum_ema50-200_01-06-2020_top_5.csv"
        );
        assert_eq!(volume_file_name(day, 90), "VolumeIndicator90Days_detailed_01-06-2020.csv");
    }
}
