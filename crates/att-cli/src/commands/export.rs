//! `att export`: events as CSV with a fixed column order.

use std::io::{self, Write};

use anyhow::{Context, Result};
use att_core::{AttendanceEvent, EXPORT_COLUMNS, ExportRow, ProxyDirectory, day_start, export_rows};
use att_db::Database;
use chrono::NaiveDate;
use chrono_tz::Tz;
use csv::Writer;

/// Writes the header and one record per row.
///
/// The header comes from the serialized field names of [`ExportRow`], or from
/// [`EXPORT_COLUMNS`] when there are no rows.
pub fn write_csv<W: Write>(writer: W, rows: &[ExportRow]) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);

    if rows.is_empty() {
        wtr.write_record(EXPORT_COLUMNS)?;
    }
    for row in rows {
        wtr.serialize(row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Events between `from` and `to` inclusive, as dates in `zone`.
///
/// With no bounds every event is returned, unparseable ones included.
fn load_events(db: &Database, from: Option<NaiveDate>, to: Option<NaiveDate>, zone: Tz) -> Result<Vec<AttendanceEvent>> {
    let start = from.map(|d| day_start(d, zone));
    let end = match to {
        Some(d) => Some(day_start(d.succ_opt().context("export end date out of range")?, zone)),
        None => None,
    };
    match (start, end) {
        (Some(start), Some(end)) => Ok(db.list_events_in_range(start, end)?),
        (None, None) => Ok(db.list_events()?),
        _ => Ok(db
            .list_events()?
            .into_iter()
            .filter(|e| {
                e.instant()
                    .is_some_and(|ts| start.is_none_or(|from| ts >= from) && end.is_none_or(|until| ts < until))
            })
            .collect()),
    }
}

pub fn run(db: &Database, from: Option<NaiveDate>, to: Option<NaiveDate>, zone: Tz) -> Result<()> {
    let events = load_events(db, from, to, zone).context("failed to load events")?;
    let proxies = ProxyDirectory::new(db.list_proxies().context("failed to load proxies")?);
    let rows = export_rows(&events, zone, &proxies);
    tracing::debug!(rows = rows.len(), "exporting events");
    write_csv(io::stdout().lock(), &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use att_core::{EventId, EventKind, EventTimestamp, ProxyRelation, SubjectKey};
    use chrono::{TimeZone, Utc};
    use insta::assert_snapshot;

    fn seeded_db() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        let mut ana_in = AttendanceEvent::new(
            EventId::new("1").unwrap(),
            SubjectKey::new("ana@example.com").unwrap(),
            EventKind::CheckIn,
            Utc.with_ymd_and_hms(2025, 1, 15, 3, 30, 0).unwrap(),
        );
        ana_in.subject_name = "Ana, Silva".to_string();
        ana_in.address = Some("12 Main St".to_string());
        ana_in.device = serde_json::json!({"platform": "android"});

        let mut ana_out = AttendanceEvent::new(
            EventId::new("2").unwrap(),
            SubjectKey::new("ana@example.com").unwrap(),
            EventKind::CheckOut,
            Utc.with_ymd_and_hms(2025, 1, 16, 12, 30, 0).unwrap(),
        );
        ana_out.subject_name = "Ana, Silva".to_string();

        let worker = AttendanceEvent::new(
            EventId::new("3").unwrap(),
            SubjectKey::new("w-1").unwrap(),
            EventKind::CheckIn,
            EventTimestamp::parse("16/01/2025 09:00"),
        );

        db.insert_events(&[ana_in, ana_out, worker]).unwrap();
        db.add_proxy(&ProxyRelation {
            proxy_subject: SubjectKey::new("w-1").unwrap(),
            delegating_subject: SubjectKey::new("ana@example.com").unwrap(),
            label: "Ana helper".to_string(),
        })
        .unwrap();
        db
    }

    fn export(db: &Database, from: Option<NaiveDate>, to: Option<NaiveDate>) -> String {
        let zone = chrono_tz::Asia::Kolkata;
        let events = load_events(db, from, to, zone).unwrap();
        let proxies = ProxyDirectory::new(db.list_proxies().unwrap());
        let mut out = Vec::new();
        write_csv(&mut out, &export_rows(&events, zone, &proxies)).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_export_all_events() {
        assert_snapshot!(export(&seeded_db(), None, None), @r#"
        Name,Email,Date,Time,Type,Address,Platform
        "Ana, Silva",ana@example.com,2025-01-15,09:00:00,Check In,12 Main St,android
        "Ana, Silva",ana@example.com,2025-01-16,18:00:00,Check Out,,
        Ana helper,w-1,16/01/2025 09:00,,Check In,,
        "#);
    }

    #[test]
    fn test_export_date_range_uses_reference_zone() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_snapshot!(export(&seeded_db(), Some(day), Some(day)), @r#"
        Name,Email,Date,Time,Type,Address,Platform
        "Ana, Silva",ana@example.com,2025-01-15,09:00:00,Check In,12 Main St,android
        "#);
    }

    #[test]
    fn test_export_open_ended_range_skips_unparseable() {
        let from = NaiveDate::from_ymd_opt(2025, 1, 16).unwrap();
        let output = export(&seeded_db(), Some(from), None);
        assert_eq!(output.lines().count(), 2);
        assert!(output.contains("Check Out"));
    }

    #[test]
    fn test_export_empty_has_header() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(export(&db, None, None), "Name,Email,Date,Time,Type,Address,Platform\n");
    }
}
