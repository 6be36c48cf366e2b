//! Reference timezone resolution.
//!
//! Calendar dates and times of day are always read in one organization-wide
//! zone, never in the zone of the machine doing the evaluation.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown timezone: {0}")]
pub struct UnknownTimezone(pub String);

/// Parses an IANA zone name such as `Asia/Kolkata`.
pub fn parse_zone(name: &str) -> Result<Tz, UnknownTimezone> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| UnknownTimezone(name.to_string()))
}

/// The calendar date of `instant` in `zone`.
pub fn local_date(instant: DateTime<Utc>, zone: Tz) -> NaiveDate {
    instant.with_timezone(&zone).date_naive()
}

/// The wall-clock reading of `instant` in `zone`.
pub fn local_datetime(instant: DateTime<Utc>, zone: Tz) -> NaiveDateTime {
    instant.with_timezone(&zone).naive_local()
}

/// The first instant of `date` in `zone`.
///
/// When midnight falls in a DST gap the earliest existing time that day is used.
pub fn day_start(date: NaiveDate, zone: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..24 * 4)
        .map(|quarter| midnight + chrono::Duration::minutes(quarter * 15))
        .find_map(|probe| zone.from_local_datetime(&probe).earliest())
        .map_or_else(|| midnight.and_utc(), |dt| dt.with_timezone(&Utc))
}
