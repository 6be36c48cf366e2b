//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::Context;
use att_core::{AttendanceEvent, EventId, SubjectKey, local_datetime};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde_json::{Value, json};

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(minute|hour|day|week)s?\s+ago$").unwrap());

/// Conservative bounds for relative time parsing (~1000 years in minutes).
const MAX_RELATIVE_MINUTES: i64 = 1000 * 365 * 24 * 60;

/// Parse a datetime string as either ISO 8601 or relative time.
///
/// Supports:
/// - ISO 8601: "2026-01-15T10:30:00Z"
/// - Relative: "2 hours ago", "30 minutes ago", "1 day ago", "1 week ago"
pub fn parse_datetime(s: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    // Try ISO 8601 first
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Try relative time: "N hours/minutes/days/weeks ago"
    let Some(caps) = RELATIVE_TIME_RE.captures(s.trim()) else {
        anyhow::bail!(
            "Invalid datetime: {s}. Use ISO 8601 (e.g., 2026-01-15T10:30:00Z) or relative (e.g., '2 hours ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let (max_for_unit, minutes_per_unit) = match &caps[2] {
        "minute" => (MAX_RELATIVE_MINUTES, 1),
        "hour" => (MAX_RELATIVE_MINUTES / 60, 60),
        "day" => (MAX_RELATIVE_MINUTES / (60 * 24), 60 * 24),
        "week" => (MAX_RELATIVE_MINUTES / (60 * 24 * 7), 60 * 24 * 7),
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > max_for_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    let duration = Duration::minutes(n * minutes_per_unit);
    Ok(now - duration)
}

/// Resolves an optional `--at` value against `now`.
pub fn resolve_at(at: Option<&str>, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    at.map_or(Ok(now), |s| parse_datetime(s, now))
}

pub fn subject_key(s: &str) -> anyhow::Result<SubjectKey> {
    SubjectKey::new(s).with_context(|| format!("invalid subject key: {s:?}"))
}

/// A fresh random event id.
pub fn new_event_id() -> anyhow::Result<EventId> {
    EventId::new(uuid::Uuid::new_v4().to_string()).context("failed to generate event id")
}

/// Metadata describing the machine recording an event.
pub fn device_metadata() -> Value {
    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());
    json!({
        "platform": std::env::consts::OS,
        "hostname": hostname,
    })
}

/// `YYYY-MM-DD HH:MM:SS` in `zone`.
pub fn format_local(instant: DateTime<Utc>, zone: Tz) -> String {
    local_datetime(instant, zone).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// The event's local time, or its raw timestamp if unparseable.
pub fn format_event_time(event: &AttendanceEvent, zone: Tz) -> String {
    event
        .instant()
        .map_or_else(|| event.timestamp.raw().to_string(), |ts| format_local(ts, zone))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let parsed = parse_datetime("2025-01-15T10:30:00+02:00", now()).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 15, 8, 30, 0).unwrap());
    }

    #[test]
    fn parses_relative_times() {
        assert_eq!(
            parse_datetime("2 hours ago", now()).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap()
        );
        assert_eq!(
            parse_datetime("1 minute ago", now()).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 15, 11, 59, 0).unwrap()
        );
        assert_eq!(
            parse_datetime("1 week ago", now()).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 8, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn rejects_garbage_and_huge_values() {
        assert!(parse_datetime("yesterday", now()).is_err());
        assert!(parse_datetime("999999999 weeks ago", now()).is_err());
    }

    #[test]
    fn missing_at_means_now() {
        assert_eq!(resolve_at(None, now()).unwrap(), now());
    }

    #[test]
    fn blank_subject_is_rejected() {
        let err = subject_key("  ").unwrap_err();
        assert!(err.to_string().contains("invalid subject key"));
    }

    #[test]
    fn event_ids_are_unique() {
        assert_ne!(new_event_id().unwrap(), new_event_id().unwrap());
    }

    #[test]
    fn device_metadata_names_the_platform() {
        let device = device_metadata();
        assert_eq!(device["platform"], std::env::consts::OS);
        assert!(device["hostname"].is_string());
    }

    #[test]
    fn event_time_is_local_or_raw() {
        let event = AttendanceEvent::new(
            EventId::new("1").unwrap(),
            SubjectKey::new("ana").unwrap(),
            att_core::EventKind::CheckIn,
            now(),
        );
        assert_eq!(
            format_event_time(&event, chrono_tz::Asia::Kolkata),
            "2025-01-15 17:30:00"
        );

        let raw = AttendanceEvent::new(
            EventId::new("2").unwrap(),
            SubjectKey::new("ana").unwrap(),
            att_core::EventKind::CheckIn,
            att_core::EventTimestamp::parse("noonish"),
        );
        assert_eq!(format_event_time(&raw, chrono_tz::UTC), "noonish");
    }
}
