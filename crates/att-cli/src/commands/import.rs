//! Import command for loading events into the local `SQLite` store.
//!
//! Input is JSON Lines, one event per line, in the same shape events are
//! serialized with:
//!
//! ```json
//! {"id":"e1","subject_key":"ana","subject_name":"Ana","type":"check_in","timestamp":"2025-01-15T09:00:00Z"}
//! ```

use std::io::{self, BufRead};

use anyhow::{Context, Result};
use att_core::AttendanceEvent;
use att_db::Database;

pub fn run(db: &mut Database) -> Result<usize> {
    let stdin = io::stdin();
    let events = parse_events(stdin.lock())?;
    let inserted = db.insert_events(&events).context("failed to store events")?;
    tracing::info!(read = events.len(), inserted, "imported events");
    println!("Imported {inserted} of {} events", events.len());
    Ok(inserted)
}

fn parse_events<R: BufRead>(reader: R) -> Result<Vec<AttendanceEvent>> {
    let mut events = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut event: AttendanceEvent =
            serde_json::from_str(trimmed).with_context(|| format!("invalid event on line {}", idx + 1))?;
        if event.subject_name.trim().is_empty() {
            event.subject_name = event.subject_key.to_string();
        }
        if event.instant().is_none() {
            tracing::warn!(
                line = idx + 1,
                event_id = %event.id,
                timestamp = event.timestamp.raw(),
                "importing event with unparseable timestamp"
            );
        }
        events.push(event);
    }
    Ok(events)
}
