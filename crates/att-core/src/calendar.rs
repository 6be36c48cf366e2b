//! Monthly presence grid.
//!
//! Presence only needs a check-in on the date; whether it was ever paired with
//! a check-out does not matter.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::AttendanceEvent;
use crate::types::SubjectKey;
use crate::zone::local_date;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("invalid month: {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },
}

/// Display classification of a monthly percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceBucket {
    High,
    Medium,
    Low,
}

impl PresenceBucket {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Percentage floors for the `high` and `medium` buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceThresholds {
    pub high: u32,
    pub medium: u32,
}

impl Default for PresenceThresholds {
    fn default() -> Self {
        Self {
            high: 85,
            medium: 60,
        }
    }
}

impl PresenceThresholds {
    pub const fn bucket(&self, percentage: u32) -> PresenceBucket {
        if percentage >= self.high {
            PresenceBucket::High
        } else if percentage >= self.medium {
            PresenceBucket::Medium
        } else {
            PresenceBucket::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayPresence {
    pub date: NaiveDate,
    pub present: bool,
}

/// One subject's presence over a calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyPresenceSummary {
    pub subject_key: SubjectKey,
    pub year: i32,
    pub month: u32,
    pub days: Vec<DayPresence>,
    pub present_days: u32,
    pub total_days_in_month: u32,
    /// Rounded to the nearest whole percent, halves rounding up.
    pub percentage: u32,
    pub bucket: PresenceBucket,
}

/// Every date of the given month, in order.
pub fn month_dates(year: i32, month: u32) -> Result<Vec<NaiveDate>, CalendarError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or(CalendarError::InvalidMonth { year, month })?;
    Ok(first.iter_days().take_while(|d| d.month() == month).collect())
}

/// Dates (in `zone`) on which `subject` checked in at least once.
pub fn presence_dates(subject: &SubjectKey, events: &[AttendanceEvent], zone: Tz) -> BTreeSet<NaiveDate> {
    events
        .iter()
        .filter(|e| &e.subject_key == subject && e.kind.is_check_in())
        .filter_map(AttendanceEvent::instant)
        .map(|ts| local_date(ts, zone))
        .collect()
}

/// Summarizes one subject's month. A subject with no events is 0% present.
pub fn summarize_month(
    subject: &SubjectKey,
    events: &[AttendanceEvent],
    year: i32,
    month: u32,
    zone: Tz,
    thresholds: &PresenceThresholds,
) -> Result<MonthlyPresenceSummary, CalendarError> {
    let dates = month_dates(year, month)?;
    let present = presence_dates(subject, events, zone);
    Ok(fold_month(subject.clone(), year, month, &dates, &present, thresholds))
}

/// Summaries for every subject appearing in `events`, ordered by subject key.
pub fn presence_grid(
    events: &[AttendanceEvent],
    year: i32,
    month: u32,
    zone: Tz,
    thresholds: &PresenceThresholds,
) -> Result<Vec<MonthlyPresenceSummary>, CalendarError> {
    let dates = month_dates(year, month)?;

    let mut by_subject: BTreeMap<&SubjectKey, BTreeSet<NaiveDate>> = BTreeMap::new();
    for event in events {
        let entry = by_subject.entry(&event.subject_key).or_default();
        if event.kind.is_check_in() {
            if let Some(ts) = event.instant() {
                entry.insert(local_date(ts, zone));
            }
        }
    }

    Ok(by_subject
        .into_iter()
        .map(|(subject, present)| fold_month(subject.clone(), year, month, &dates, &present, thresholds))
        .collect())
}

fn fold_month(
    subject_key: SubjectKey,
    year: i32,
    month: u32,
    dates: &[NaiveDate],
    present: &BTreeSet<NaiveDate>,
    thresholds: &PresenceThresholds,
) -> MonthlyPresenceSummary {
    let days: Vec<DayPresence> = dates
        .iter()
        .map(|&date| DayPresence {
            date,
            present: present.contains(&date),
        })
        .collect();

    // A month has at most 31 days.
    let total_days_in_month = u32::try_from(days.len()).unwrap_or(u32::MAX);
    let present_days = u32::try_from(days.iter().filter(|d| d.present).count()).unwrap_or(0);
    let percentage = rounded_percentage(present_days, total_days_in_month);

    MonthlyPresenceSummary {
        subject_key,
        year,
        month,
        days,
        present_days,
        total_days_in_month,
        percentage,
        bucket: thresholds.bucket(percentage),
    }
}

/// `round(part / whole * 100)` in integer arithmetic, halves rounding up.
const fn rounded_percentage(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part * 200 + whole) / (2 * whole)
}
