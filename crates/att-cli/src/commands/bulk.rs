//! `att bulk check-in|check-out`: one actor acting for many subjects.

use std::collections::HashMap;

use anyhow::{Context, Result};
use att_core::{AttendanceEvent, DelegatedAction, EventKind, EventTimestamp, GeoPoint, ProxyDirectory};
use att_db::Database;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::util::{device_metadata, new_event_id, resolve_at, subject_key};
use crate::BulkArgs;

/// Builds one event per target. Names come from proxy labels, then from the
/// subject's last recorded name, then from the key itself.
pub fn build_events(
    db: &Database,
    kind: EventKind,
    args: &BulkArgs,
    now: DateTime<Utc>,
    device: Value,
) -> Result<Vec<AttendanceEvent>> {
    let action = DelegatedAction {
        actor: subject_key(&args.actor)?,
        kind,
        timestamp: EventTimestamp::from_instant(resolve_at(args.at.as_deref(), now)?),
        location: args.lat.zip(args.lng).map(|(lat, lng)| GeoPoint { lat, lng }),
        address: args.address.clone(),
        device,
    };

    let proxies = ProxyDirectory::new(db.list_proxies()?);
    let known_names: HashMap<_, _> = db
        .list_subjects()?
        .into_iter()
        .map(|s| (s.subject_key, s.subject_name))
        .collect();

    let mut targets = Vec::with_capacity(args.subjects.len());
    for raw in &args.subjects {
        let key = subject_key(raw)?;
        let fallback = known_names.get(&key).map_or(key.as_str(), String::as_str);
        let name = proxies.display_name(&key, fallback).to_string();
        targets.push((key, name));
    }

    action.events_for(targets, new_event_id)
}

pub fn run(db: &mut Database, kind: EventKind, args: &BulkArgs) -> Result<()> {
    let events = build_events(db, kind, args, Utc::now(), device_metadata())?;
    let inserted = db.insert_events(&events).context("failed to store bulk events")?;
    tracing::info!(actor = %args.actor, kind = kind.as_str(), inserted, "recorded bulk action");
    for event in &events {
        println!("{} {} ({})", kind.label(), event.subject_name, event.subject_key);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use att_core::{EventId, ProxyRelation, SubjectKey, WorkStatus, resolve_status};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap()
    }

    fn args(subjects: &[&str]) -> BulkArgs {
        BulkArgs {
            actor: "lead@example.com".to_string(),
            subjects: subjects.iter().map(|s| (*s).to_string()).collect(),
            at: None,
            lat: None,
            lng: None,
            address: Some("Site 4".to_string()),
        }
    }

    #[test]
    fn each_target_gets_a_marked_event() {
        let db = Database::open_in_memory().unwrap();
        let events = build_events(&db, EventKind::CheckIn, &args(&["w-1", "w-2"]), now(), Value::Null).unwrap();

        assert_eq!(events.len(), 2);
        assert_ne!(events[0].id, events[1].id);
        for event in &events {
            assert_eq!(event.delegated_by.as_ref().map(SubjectKey::as_str), Some("lead@example.com"));
            assert_eq!(event.instant(), Some(now()));
            assert_eq!(event.address.as_deref(), Some("Site 4"));
        }
    }

    #[test]
    fn names_prefer_proxy_labels_then_known_names() {
        let mut db = Database::open_in_memory().unwrap();
        db.add_proxy(&ProxyRelation {
            proxy_subject: SubjectKey::new("w-1").unwrap(),
            delegating_subject: SubjectKey::new("lead@example.com").unwrap(),
            label: "Lead helper".to_string(),
        })
        .unwrap();
        let mut earlier = AttendanceEvent::new(
            EventId::new("old").unwrap(),
            SubjectKey::new("w-2").unwrap(),
            EventKind::CheckOut,
            now() - chrono::Duration::days(1),
        );
        earlier.subject_name = "Worker Two".to_string();
        db.insert_events(&[earlier]).unwrap();

        let events = build_events(&db, EventKind::CheckIn, &args(&["w-1", "w-2", "w-3"]), now(), Value::Null).unwrap();
        let names: Vec<&str> = events.iter().map(|e| e.subject_name.as_str()).collect();
        assert_eq!(names, vec!["Lead helper", "Worker Two", "w-3"]);
    }

    #[test]
    fn run_makes_every_target_working() {
        let mut db = Database::open_in_memory().unwrap();
        run(&mut db, EventKind::CheckIn, &args(&["w-1", "w-2"])).unwrap();
        let events = db.list_events().unwrap();
        for key in ["w-1", "w-2"] {
            let status = resolve_status(&SubjectKey::new(key).unwrap(), &events);
            assert_eq!(status.status, WorkStatus::Working);
        }
        let actor = resolve_status(&SubjectKey::new("lead@example.com").unwrap(), &events);
        assert_eq!(actor.status, WorkStatus::NotWorking);
    }
}
