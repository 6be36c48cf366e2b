//! `att status`: who is working right now.

use std::fmt::Write;

use anyhow::{Context, Result};
use att_core::{SubjectStatus, resolve_all, resolve_status};
use att_db::Database;
use chrono_tz::Tz;

use super::util::{format_event_time, subject_key};

/// Formats statuses as an aligned table.
pub fn format_status(statuses: &[SubjectStatus], zone: Tz) -> String {
    let mut output = String::new();
    if statuses.is_empty() {
        writeln!(output, "No events recorded.").unwrap();
        return output;
    }

    writeln!(output, "{:<24} {:<12} LAST EVENT", "SUBJECT", "STATUS").unwrap();
    for status in statuses {
        let last = status.latest_event.as_ref().map_or_else(
            || "-".to_string(),
            |event| format!("{} at {}", event.kind.label(), format_event_time(event, zone)),
        );
        writeln!(
            output,
            "{:<24} {:<12} {last}",
            status.subject_key.as_str(),
            status.status.as_str()
        )
        .unwrap();
    }
    output
}

pub fn run(db: &Database, subject: Option<&str>, json: bool, zone: Tz) -> Result<()> {
    let statuses = match subject {
        Some(raw) => {
            let key = subject_key(raw)?;
            let events = db
                .list_subject_events(&key)
                .context("failed to load events")?;
            vec![resolve_status(&key, &events)]
        }
        None => resolve_all(&db.list_events().context("failed to load events")?),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
    } else {
        print!("{}", format_status(&statuses, zone));
    }
    Ok(())
}
