//! `att month`: presence grid for a calendar month.

use std::fmt::Write;

use anyhow::{Context, Result};
use att_core::{
    MonthlyPresenceSummary, PresenceThresholds, day_start, month_dates, presence_grid, summarize_month,
};
use att_db::Database;
use chrono_tz::Tz;

use super::util::subject_key;

/// Formats summaries as one grid row per subject. `#` marks a present day.
pub fn format_month(summaries: &[MonthlyPresenceSummary], year: i32, month: u32, zone: Tz) -> String {
    let mut output = String::new();
    writeln!(output, "PRESENCE: {year}-{month:02} ({zone})").unwrap();
    if summaries.is_empty() {
        writeln!(output, "No events recorded this month.").unwrap();
        return output;
    }

    for summary in summaries {
        let grid: String = summary
            .days
            .iter()
            .map(|day| if day.present { '#' } else { '.' })
            .collect();
        writeln!(
            output,
            "{:<24} {grid} {:>2}/{:<2} {:>3}% {}",
            summary.subject_key.as_str(),
            summary.present_days,
            summary.total_days_in_month,
            summary.percentage,
            summary.bucket.as_str()
        )
        .unwrap();
    }
    output
}

/// Loads the month's events and builds the summaries.
pub fn build_summaries(
    db: &Database,
    year: i32,
    month: u32,
    subject: Option<&str>,
    zone: Tz,
    thresholds: &PresenceThresholds,
) -> Result<Vec<MonthlyPresenceSummary>> {
    let dates = month_dates(year, month)?;
    let (Some(first), Some(last)) = (dates.first(), dates.last()) else {
        return Ok(Vec::new());
    };
    let end = last.succ_opt().context("month end out of range")?;
    let events = db
        .list_events_in_range(day_start(*first, zone), day_start(end, zone))
        .context("failed to load events")?;

    let summaries = match subject {
        Some(raw) => vec![summarize_month(&subject_key(raw)?, &events, year, month, zone, thresholds)?],
        None => presence_grid(&events, year, month, zone, thresholds)?,
    };
    Ok(summaries)
}

pub fn run(
    db: &Database,
    year: i32,
    month: u32,
    subject: Option<&str>,
    json: bool,
    zone: Tz,
    thresholds: &PresenceThresholds,
) -> Result<()> {
    let summaries = build_summaries(db, year, month, subject, zone, thresholds)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        print!("{}", format_month(&summaries, year, month, zone));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use att_core::{AttendanceEvent, EventId, EventKind, SubjectKey};
    use chrono::{DateTime, TimeZone, Utc};
    use insta::assert_snapshot;

    fn june(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap()
    }

    fn check_in(id: &str, subject: &str, ts: DateTime<Utc>) -> AttendanceEvent {
        AttendanceEvent::new(
            EventId::new(id).unwrap(),
            SubjectKey::new(subject).unwrap(),
            EventKind::CheckIn,
            ts,
        )
    }

    fn seeded_db() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        let mut events: Vec<_> = [2, 5, 9, 16, 23]
            .iter()
            .map(|&day| check_in(&format!("a{day}"), "ana", june(day, 9)))
            .collect();
        events.extend((1..=26).map(|day| check_in(&format!("b{day}"), "bo", june(day, 8))));
        // Outside the month.
        events.push(check_in("c1", "cy", Utc.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap()));
        db.insert_events(&events).unwrap();
        db
    }

    #[test]
    fn test_month_grid() {
        let db = seeded_db();
        let summaries =
            build_summaries(&db, 2025, 6, None, chrono_tz::UTC, &PresenceThresholds::default()).unwrap();
        assert_eq!(summaries.len(), 2);

        assert_snapshot!(format_month(&summaries, 2025, 6, chrono_tz::UTC), @r"
        PRESENCE: 2025-06 (UTC)
        ana                      .#..#...#......#......#.......  5/30  17% low
        bo                       ##########################.... 26/30  87% high
        ");
    }

    #[test]
    fn test_month_single_subject_without_events() {
        let db = seeded_db();
        let summaries = build_summaries(
            &db,
            2025,
            6,
            Some("cy"),
            chrono_tz::UTC,
            &PresenceThresholds::default(),
        )
        .unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].present_days, 0);
        assert_eq!(summaries[0].percentage, 0);
    }

    #[test]
    fn test_month_rejects_invalid_month() {
        let db = seeded_db();
        let err = build_summaries(&db, 2025, 0, None, chrono_tz::UTC, &PresenceThresholds::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid month: 2025-00");
    }

    #[test]
    fn test_month_empty() {
        assert_snapshot!(format_month(&[], 2025, 2, chrono_tz::UTC), @r"
        PRESENCE: 2025-02 (UTC)
        No events recorded this month.
        ");
    }
}
