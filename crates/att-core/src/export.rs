//! Flat tabular view of raw events.

use chrono_tz::Tz;
use serde::Serialize;

use crate::event::AttendanceEvent;
use crate::proxy::ProxyDirectory;
use crate::zone::local_datetime;

/// Column order of every export.
pub const EXPORT_COLUMNS: [&str; 7] = ["Name", "Email", "Date", "Time", "Type", "Address", "Platform"];

/// One exported event. Field order matches [`EXPORT_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Platform")]
    pub platform: String,
}

impl ExportRow {
    /// Date and time are resolved in `zone`. An unparseable timestamp is passed
    /// through verbatim in `date` and leaves `time` empty.
    pub fn from_event(event: &AttendanceEvent, zone: Tz, proxies: &ProxyDirectory) -> Self {
        let (date, time) = event.instant().map_or_else(
            || (event.timestamp.raw().to_string(), String::new()),
            |ts| {
                let local = local_datetime(ts, zone);
                (
                    local.format("%Y-%m-%d").to_string(),
                    local.format("%H:%M:%S").to_string(),
                )
            },
        );

        Self {
            name: proxies
                .display_name(&event.subject_key, &event.subject_name)
                .to_string(),
            email: event.subject_key.to_string(),
            date,
            time,
            kind: event.kind.label().to_string(),
            address: event.address.clone().unwrap_or_default(),
            platform: event.platform().unwrap_or_default().to_string(),
        }
    }
}

/// Rows for `events`, parseable ones in chronological `(timestamp, id)` order
/// followed by unparseable ones in input order.
pub fn export_rows(events: &[AttendanceEvent], zone: Tz, proxies: &ProxyDirectory) -> Vec<ExportRow> {
    let mut dated: Vec<&AttendanceEvent> = events.iter().filter(|e| e.instant().is_some()).collect();
    dated.sort_by(|a, b| a.instant().cmp(&b.instant()).then_with(|| a.id.cmp(&b.id)));

    dated
        .into_iter()
        .chain(events.iter().filter(|e| e.instant().is_none()))
        .map(|event| ExportRow::from_event(event, zone, proxies))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_type::EventKind;
    use crate::proxy::ProxyRelation;
    use crate::session::test_support::*;

    #[test]
    fn serialized_field_names_follow_export_columns() {
        let row = ExportRow::from_event(&check_in("1", "ana", hm(9, 0)), chrono_tz::UTC, &ProxyDirectory::default());
        let value = serde_json::to_value(&row).unwrap();
        let serde_json::Value::Object(fields) = value else {
            panic!("expected an object");
        };
        let mut names: Vec<&str> = fields.keys().map(String::as_str).collect();
        let mut expected = EXPORT_COLUMNS.to_vec();
        names.sort_unstable();
        expected.sort_unstable();
        assert_eq!(names, expected);
    }

    #[test]
    fn row_fields_follow_column_contract() {
        let mut event = check_in("1", "ana@example.com", hm(4, 5));
        event.subject_name = "Ana".to_string();
        event.address = Some("12 Main St".to_string());
        event.device = serde_json::json!({"platform": "ios", "model": "x"});

        let row = ExportRow::from_event(&event, chrono_tz::Asia::Kolkata, &ProxyDirectory::default());
        assert_eq!(
            row,
            ExportRow {
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                date: "2025-01-15".to_string(),
                time: "09:35:00".to_string(),
                kind: "Check In".to_string(),
                address: "12 Main St".to_string(),
                platform: "ios".to_string(),
            }
        );
    }

    #[test]
    fn unparseable_timestamp_passes_through() {
        let event = raw_event("1", "ana", EventKind::CheckOut, "yesterday-ish");
        let row = ExportRow::from_event(&event, chrono_tz::UTC, &ProxyDirectory::default());
        assert_eq!(row.date, "yesterday-ish");
        assert_eq!(row.time, "");
        assert_eq!(row.kind, "Check Out");
        assert_eq!(row.platform, "");
    }

    #[test]
    fn proxy_label_replaces_name() {
        let directory = ProxyDirectory::new([ProxyRelation {
            proxy_subject: subject("w-1"),
            delegating_subject: subject("ana"),
            label: "Ana helper".to_string(),
        }]);
        let row = ExportRow::from_event(&check_in("1", "w-1", hm(9, 0)), chrono_tz::UTC, &directory);
        assert_eq!(row.name, "Ana helper");
        assert_eq!(row.email, "w-1");
    }

    #[test]
    fn rows_are_chronological_with_unparseable_last() {
        let events = vec![
            raw_event("z", "ana", EventKind::CheckIn, "garbage"),
            check_out("b", "ana", hm(17, 0)),
            check_in("a", "bo", hm(9, 0)),
        ];
        let rows = export_rows(&events, chrono_tz::UTC, &ProxyDirectory::default());
        let order: Vec<(&str, &str)> = rows.iter().map(|r| (r.email.as_str(), r.date.as_str())).collect();
        assert_eq!(
            order,
            vec![("bo", "2025-01-15"), ("ana", "2025-01-15"), ("ana", "garbage")]
        );
    }
}
