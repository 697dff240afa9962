//! Billing period selection
//!
//! A period is a pair of calendar dates in the hub's time zone. It starts at
//! local midnight of the first date and ends at the last second of the last
//! date; both ends are converted to UTC for history lookups.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::PeriodError;

/// Calendar date range and the UTC instants bounding it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    /// First day of the period (local calendar)
    pub start_date: NaiveDate,
    /// Last day of the period, inclusive (local calendar)
    pub end_date: NaiveDate,
    /// Local midnight at the start of `start_date`
    pub start: DateTime<Utc>,
    /// Local 23:59:59 at the end of `end_date`
    pub end: DateTime<Utc>,
}

impl Period {
    /// The whole calendar month `month` of `year`
    pub fn month(year: i32, month: u32, tz: Tz) -> Result<Self, PeriodError> {
        let last = last_day_of_month(year, month)?;
        let start_date =
            NaiveDate::from_ymd_opt(year, month, 1).ok_or(PeriodError::InvalidYear { year })?;
        let end_date =
            NaiveDate::from_ymd_opt(year, month, last).ok_or(PeriodError::InvalidYear { year })?;
        Self::from_naive(start_date, end_date, tz)
    }

    /// The month containing `now` in `tz`
    pub fn current_month(now: DateTime<Utc>, tz: Tz) -> Result<Self, PeriodError> {
        let local = now.with_timezone(&tz);
        Self::month(local.year(), local.month(), tz)
    }

    /// Inclusive range between two `YYYY-MM-DD` strings
    pub fn from_dates(start: &str, end: &str, tz: Tz) -> Result<Self, PeriodError> {
        Self::from_naive(parse_date(start)?, parse_date(end)?, tz)
    }

    /// Inclusive range between two dates
    pub fn from_naive(
        start_date: NaiveDate,
        end_date: NaiveDate,
        tz: Tz,
    ) -> Result<Self, PeriodError> {
        if end_date < start_date {
            return Err(PeriodError::EndBeforeStart {
                start: start_date.to_string(),
                end: end_date.to_string(),
            });
        }

        let start = local_to_utc(tz, start_date.and_time(chrono::NaiveTime::MIN));
        let end = local_to_utc(tz, end_of_day(end_date));

        Ok(Self {
            start_date,
            end_date,
            start,
            end,
        })
    }

    /// Start date as YYYYMMDD, used in file names
    pub fn start_stamp(&self) -> String {
        self.start_date.format("%Y%m%d").to_string()
    }

    /// End date as YYYYMMDD, used in file names
    pub fn end_stamp(&self) -> String {
        self.end_date.format("%Y%m%d").to_string()
    }
}

/// Number of days in `month` of `year` (28-31)
pub fn last_day_of_month(year: i32, month: u32) -> Result<u32, PeriodError> {
    if !(1..=12).contains(&month) {
        return Err(PeriodError::InvalidMonth { month });
    }
    let (next_year, next_month) = if month == 12 {
        let next_year = year.checked_add(1).ok_or(PeriodError::InvalidYear { year })?;
        (next_year, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map(|last| last.day())
        .ok_or(PeriodError::InvalidYear { year })
}

/// Parse a strict `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Result<NaiveDate, PeriodError> {
    let invalid = || PeriodError::InvalidDate {
        value: value.to_string(),
    };

    let bytes = value.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shaped {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN) + (Duration::days(1) - Duration::seconds(1))
}

/// Map a local wall-clock time to UTC
///
/// Ambiguous times (clocks going back) take the earlier instant. Times that
/// fall into a DST gap are moved forward by the gap's usual hour.
fn local_to_utc(tz: Tz, local: NaiveDateTime) -> DateTime<Utc> {
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| {
            local
                .checked_add_signed(Duration::hours(1))
                .and_then(|shifted| tz.from_local_datetime(&shifted).earliest())
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&local))
}
