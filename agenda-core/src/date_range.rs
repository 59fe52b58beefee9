//! Date range bounding a fetch window.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::error::{AgendaError, AgendaResult};

/// Inclusive range of instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> AgendaResult<Self> {
        if end < start {
            return Err(AgendaError::Validation(format!(
                "Range end {} is before its start {}",
                end.to_rfc3339(),
                start.to_rfc3339()
            )));
        }
        Ok(DateRange { start, end })
    }

    /// Whole days from the start of `from` to the end of `to`.
    pub fn from_dates(from: NaiveDate, to: NaiveDate) -> AgendaResult<Self> {
        DateRange::new(start_of_day(from), end_of_day(to))
    }

    /// ±`days` around `now`.
    pub fn around(now: DateTime<Utc>, days: i64) -> Self {
        DateRange {
            start: now - Duration::days(days),
            end: now + Duration::days(days),
        }
    }

    /// Parse command-line bounds.
    /// - `from`: YYYY-MM-DD, defaults to `days` before now
    /// - `to`: YYYY-MM-DD, defaults to `days` after now
    pub fn from_args(from: Option<&str>, to: Option<&str>, days: i64) -> AgendaResult<Self> {
        let default = DateRange::around(Utc::now(), days);

        let start = match from {
            Some(s) => start_of_day(parse_date(s)?),
            None => default.start,
        };
        let end = match to {
            Some(s) => end_of_day(parse_date(s)?),
            None => default.end,
        };

        DateRange::new(start, end)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

fn parse_date(s: &str) -> AgendaResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
        AgendaError::Validation(format!("Invalid date format '{}'. Expected YYYY-MM-DD", s))
    })
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + Duration::days(1) - Duration::milliseconds(1)
}
