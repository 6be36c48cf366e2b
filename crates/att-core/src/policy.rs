//! Late-arrival and early-departure classification.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::AttendanceEvent;
use crate::session::Session;
use crate::types::SubjectKey;
use crate::zone::{local_date, local_datetime};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("invalid time of day: {0} (expected HH:MM or HH:MM:SS)")]
    InvalidTimeOfDay(String),
}

/// Organization-wide working hours, read on every evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Check-ins after this time of day are late.
    pub work_start: NaiveTime,
    /// Check-outs before this time of day are early.
    pub work_end: NaiveTime,
}

impl PolicyConfig {
    pub fn new(work_start: &str, work_end: &str) -> Result<Self, PolicyError> {
        Ok(Self {
            work_start: parse_time_of_day(work_start)?,
            work_end: parse_time_of_day(work_end)?,
        })
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            work_start: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN),
            work_end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Parses `HH:MM` or `HH:MM:SS` (fractional seconds allowed).
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, PolicyError> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| PolicyError::InvalidTimeOfDay(s.to_string()))
}

/// Advisory flags for one subject-day. Never treated as errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PolicyFlags {
    pub is_late_login: bool,
    pub is_early_logout: bool,
}

/// Classifies a subject-day against the configured working hours.
///
/// `first_check_in` is the earliest check-in event of the day, which may
/// precede the first session's start when a later check-in replaced it.
/// `sessions` are the sessions starting on the day, in order. Both flags
/// compare times of day in `zone`. An open last session is never an early
/// logout.
pub fn evaluate(
    first_check_in: Option<DateTime<Utc>>,
    sessions: &[Session],
    policy: &PolicyConfig,
    zone: Tz,
) -> PolicyFlags {
    let is_late_login =
        first_check_in.is_some_and(|ts| local_datetime(ts, zone).time() > policy.work_start);

    let is_early_logout = sessions
        .last()
        .and_then(|last| last.end)
        .is_some_and(|end| local_datetime(end, zone).time() < policy.work_end);

    PolicyFlags {
        is_late_login,
        is_early_logout,
    }
}

/// The earliest parseable check-in by `subject` whose date in `zone` is `date`.
pub fn first_check_in(
    subject: &SubjectKey,
    date: NaiveDate,
    events: &[AttendanceEvent],
    zone: Tz,
) -> Option<DateTime<Utc>> {
    events
        .iter()
        .filter(|e| &e.subject_key == subject && e.kind.is_check_in())
        .filter_map(AttendanceEvent::instant)
        .filter(|ts| local_date(*ts, zone) == date)
        .min()
}
