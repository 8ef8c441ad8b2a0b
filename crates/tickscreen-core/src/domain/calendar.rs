use std::fmt::{Display, Formatter};

use time::macros::{date, format_description};
use time::{Date, Duration, Month, OffsetDateTime};

use crate::ValidationError;

/// Date stamped on every field of an unusable record.
pub const SENTINEL_DATE: Date = date!(1000 - 01 - 01);

/// Lower bound used when the complete price history of a company is requested.
pub const EARLIEST_HISTORY: Date = date!(1970 - 01 - 01);

/// Inclusive calendar window `[start, end]` handed to a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateWindow {
    start: Date,
    end: Date,
}

impl DateWindow {
    pub fn new(start: Date, end: Date) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedWindow {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// One calendar year ending at `end`, the momentum lookback.
    pub fn trailing_year(end: Date) -> Self {
        Self {
            start: one_year_before(end),
            end,
        }
    }

    /// `days` calendar days ending at `end`.
    pub fn trailing_days(end: Date, days: u32) -> Self {
        let start = end
            .checked_sub(Duration::days(i64::from(days)))
            .unwrap_or(Date::MIN);
        Self { start, end }
    }

    /// Everything the provider has up to `end`.
    pub fn full_history(end: Date) -> Self {
        Self {
            start: EARLIEST_HISTORY.min(end),
            end,
        }
    }

    pub const fn start(&self) -> Date {
        self.start
    }

    pub const fn end(&self) -> Date {
        self.end
    }

    pub fn contains(&self, day: Date) -> bool {
        self.start <= day && day <= self.end
    }
}

impl Display for DateWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Same calendar day one year earlier; 29 February falls back to the 28th.
pub fn one_year_before(day: Date) -> Date {
    let year = day.year() - 1;
    day.replace_year(year)
        .or_else(|_| Date::from_calendar_date(year, Month::February, 28))
        .unwrap_or(Date::MIN)
}

/// Parse a run date given as `today` or `dd/mm/yyyy`.
pub fn parse_run_date(input: &str) -> Result<Date, ValidationError> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("today") {
        return Ok(OffsetDateTime::now_utc().date());
    }

    Date::parse(trimmed, format_description!("[day]/[month]/[year]")).map_err(|_| {
        ValidationError::InvalidDate {
            value: input.to_owned(),
        }
    })
}

/// `dd-mm-yyyy`, the date layout used in report cells and file names.
pub fn format_report_date(day: Date) -> String {
    day.format(format_description!("[day]-[month]-[year]"))
        .unwrap_or_else(|_| day.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_day_first_dates() {
        let parsed = parse_run_date("01/06/2020").expect("must parse");
        assert_eq!(parsed, date!(2020 - 06 - 01));
    }

    #[test]
    fn rejects_iso_dates() {
        let err = parse_run_date("2020-06-01").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidDate { .. }));
    }

    #[test]
    fn leap_day_rolls_back_to_end_of_february() {
        assert_eq!(one_year_before(date!(2024 - 02 - 29)), date!(2023 - 02 - 28));
        assert_eq!(one_year_before(date!(2024 - 06 - 15)), date!(2023 - 06 - 15));
    }

    #[test]
    fn formats_report_dates_day_first() {
        assert_eq!(format_report_date(date!(2020 - 06 - 01)), "01-06-2020");
        assert_eq!(format_report_date(SENTINEL_DATE), "01-01-1000");
    }

    #[test]
    fn rejects_inverted_window() {
        let err = DateWindow::new(date!(2024 - 02 - 01), date!(2024 - 01 - 01))
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::InvertedWindow { .. }));
    }
}
