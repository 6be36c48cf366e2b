//! `att check-in` / `att check-out`.

use anyhow::{Context, Result};
use att_core::{AttendanceEvent, EventKind, EventTimestamp, GeoPoint};
use att_db::Database;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::util::{device_metadata, new_event_id, resolve_at, subject_key};
use crate::RecordArgs;

/// Builds the event a single check-in/out records.
pub fn build_event(
    kind: EventKind,
    args: &RecordArgs,
    now: DateTime<Utc>,
    device: Value,
) -> Result<AttendanceEvent> {
    let subject_key = subject_key(&args.subject)?;
    let at = resolve_at(args.at.as_deref(), now)?;
    let mut event = AttendanceEvent::new(new_event_id()?, subject_key, kind, EventTimestamp::from_instant(at));
    if let Some(name) = args.name.as_deref().filter(|n| !n.trim().is_empty()) {
        event.subject_name = name.to_string();
    }
    event.location = args.lat.zip(args.lng).map(|(lat, lng)| GeoPoint { lat, lng });
    event.address.clone_from(&args.address);
    event.device = device;
    Ok(event)
}

pub fn run(db: &mut Database, kind: EventKind, args: &RecordArgs) -> Result<()> {
    let event = build_event(kind, args, Utc::now(), device_metadata())?;
    db.insert_events(std::slice::from_ref(&event))
        .context("failed to store event")?;
    tracing::info!(
        event_id = %event.id,
        subject = %event.subject_key,
        kind = event.kind.as_str(),
        timestamp = event.timestamp.raw(),
        "recorded event"
    );
    println!("{} {} at {}", event.kind.label(), event.subject_name, event.timestamp);
    Ok(())
}
