//! `att day`: one subject's attendance for one date.

use std::fmt::Write;

use anyhow::{Context, Result};
use att_core::{Clock, DailyRecord, EvaluationSettings, Session, daily_record, format_duration, local_date, local_datetime};
use att_db::Database;
use chrono::NaiveDate;
use chrono_tz::Tz;

use super::util::subject_key;

const fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn format_session(session: &Session, date: NaiveDate, zone: Tz) -> String {
    let start = local_datetime(session.start, zone).format("%H:%M:%S");
    match session.end {
        None => format!("{start} - open"),
        Some(end) => {
            let local_end = local_datetime(end, zone);
            let end_text = if local_end.date() == date {
                local_end.format("%H:%M:%S").to_string()
            } else {
                local_end.format("%Y-%m-%d %H:%M:%S").to_string()
            };
            format!("{start} - {end_text}  ({})", format_duration(session.duration_ms))
        }
    }
}

/// Formats a daily record for the terminal.
pub fn format_day(record: &DailyRecord, zone: Tz) -> String {
    let mut output = String::new();
    writeln!(output, "DAY: {} on {} ({zone})", record.subject_key, record.date).unwrap();
    writeln!(output, "Total worked: {}", format_duration(record.total_duration_ms)).unwrap();
    writeln!(output, "Active now:   {}", yes_no(record.is_active_now)).unwrap();
    writeln!(output, "Late login:   {}", yes_no(record.is_late_login)).unwrap();
    writeln!(output, "Early logout: {}", yes_no(record.is_early_logout)).unwrap();

    if record.sessions.is_empty() {
        writeln!(output, "No sessions.").unwrap();
        return output;
    }
    writeln!(output, "Sessions:").unwrap();
    for session in &record.sessions {
        writeln!(output, "  {}", format_session(session, record.date, zone)).unwrap();
    }
    output
}

/// Loads a subject's events and the stored policy, then aggregates `date`.
pub fn build_record(
    db: &Database,
    subject: &str,
    date: Option<NaiveDate>,
    zone: Tz,
    clock: &dyn Clock,
) -> Result<DailyRecord> {
    let key = subject_key(subject)?;
    let date = date.unwrap_or_else(|| local_date(clock.now(), zone));
    let events = db
        .list_subject_events(&key)
        .context("failed to load events")?;
    let settings = EvaluationSettings {
        policy: db.load_policy().context("failed to load policy")?,
        zone,
    };
    Ok(daily_record(&key, date, &events, &settings, clock))
}

pub fn run(
    db: &Database,
    subject: &str,
    date: Option<NaiveDate>,
    json: bool,
    zone: Tz,
    clock: &dyn Clock,
) -> Result<()> {
    let record = build_record(db, subject, date, zone, clock)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print!("{}", format_day(&record, zone));
    }
    Ok(())
}
