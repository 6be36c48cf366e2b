//! Immutable attendance events as produced by check-in/check-out actions.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::event_type::EventKind;
use crate::types::{EventId, SubjectKey};

/// Naive layouts accepted when a timestamp carries no offset.
///
/// These are read as UTC by convention, never as local time.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A stored timestamp: the raw value plus its UTC interpretation, if any.
///
/// Unparseable values are kept so they can still be displayed; events carrying
/// them are skipped by every numeric aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTimestamp {
    raw: String,
    instant: Option<DateTime<Utc>>,
}

impl EventTimestamp {
    /// Interprets a stored timestamp string.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let instant = parse_instant(raw.trim());
        Self { raw, instant }
    }

    /// Builds a timestamp from an instant, rendering it as RFC 3339 with millis.
    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        Self {
            raw: instant.to_rfc3339_opts(SecondsFormat::Millis, true),
            instant: Some(instant),
        }
    }

    /// The UTC instant, or `None` if the raw value could not be parsed.
    pub const fn instant(&self) -> Option<DateTime<Utc>> {
        self.instant
    }

    /// The value exactly as it was stored.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl From<DateTime<Utc>> for EventTimestamp {
    fn from(instant: DateTime<Utc>) -> Self {
        Self::from_instant(instant)
    }
}

impl fmt::Display for EventTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for EventTimestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for EventTimestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(raw))
    }
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// A latitude/longitude pair captured by the recording device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// A single check-in or check-out, immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    /// Globally unique identifier.
    pub id: EventId,
    /// The subject this event belongs to.
    pub subject_key: SubjectKey,
    /// Display name captured at recording time.
    #[serde(default)]
    pub subject_name: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub timestamp: EventTimestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Opaque device metadata (platform, host, user agent...).
    #[serde(default)]
    pub device: serde_json::Value,
    /// Set when another subject recorded this event through a bulk action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegated_by: Option<SubjectKey>,
}

impl AttendanceEvent {
    /// Creates an event with no location, address, device or delegation data.
    pub fn new(
        id: EventId,
        subject_key: SubjectKey,
        kind: EventKind,
        timestamp: impl Into<EventTimestamp>,
    ) -> Self {
        Self {
            id,
            subject_name: subject_key.to_string(),
            subject_key,
            kind,
            timestamp: timestamp.into(),
            location: None,
            address: None,
            device: serde_json::Value::Null,
            delegated_by: None,
        }
    }

    /// The event's UTC instant, if its timestamp is parseable.
    pub const fn instant(&self) -> Option<DateTime<Utc>> {
        self.timestamp.instant()
    }

    /// The `platform` entry of the device metadata, if present.
    pub fn platform(&self) -> Option<&str> {
        self.device.get("platform").and_then(serde_json::Value::as_str)
    }
}

/// Orders the events with usable timestamps by `(timestamp, id)` ascending.
///
/// Events whose timestamp cannot be parsed are left out.
pub(crate) fn chronological<'a, I>(events: I) -> Vec<(DateTime<Utc>, &'a AttendanceEvent)>
where
    I: IntoIterator<Item = &'a AttendanceEvent>,
{
    let mut ordered: Vec<_> = events
        .into_iter()
        .filter_map(|event| match event.instant() {
            Some(ts) => Some((ts, event)),
            None => {
                tracing::warn!(
                    event_id = %event.id,
                    timestamp = event.timestamp.raw(),
                    "skipping event with unparseable timestamp"
                );
                None
            }
        })
        .collect();
    ordered.sort_by(|(a_ts, a), (b_ts, b)| a_ts.cmp(b_ts).then_with(|| a.id.cmp(&b.id)));
    ordered
}
