//! Current working status from the most recent event alone.

use std::fmt;

use serde::Serialize;

use crate::event::AttendanceEvent;
use crate::types::SubjectKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkStatus {
    #[serde(rename = "Working")]
    Working,
    #[serde(rename = "Not working")]
    NotWorking,
}

impl WorkStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Working => "Working",
            Self::NotWorking => "Not working",
        }
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectStatus {
    pub subject_key: SubjectKey,
    pub status: WorkStatus,
    pub latest_event: Option<AttendanceEvent>,
}

/// The subject's latest event by `(timestamp, id)`, ignoring unparseable ones.
pub fn latest_event<'a>(subject: &SubjectKey, events: &'a [AttendanceEvent]) -> Option<&'a AttendanceEvent> {
    events
        .iter()
        .filter(|e| &e.subject_key == subject)
        .filter_map(|e| e.instant().map(|ts| (ts, e)))
        .max_by(|(a_ts, a), (b_ts, b)| a_ts.cmp(b_ts).then_with(|| a.id.cmp(&b.id)))
        .map(|(_, e)| e)
}

/// Working iff the latest event is a check-in. Input order does not matter.
pub fn resolve_status(subject: &SubjectKey, events: &[AttendanceEvent]) -> SubjectStatus {
    let latest = latest_event(subject, events);
    let status = match latest {
        Some(event) if event.kind.is_check_in() => WorkStatus::Working,
        _ => WorkStatus::NotWorking,
    };
    SubjectStatus {
        subject_key: subject.clone(),
        status,
        latest_event: latest.cloned(),
    }
}

/// Status of every subject present in `events`, ordered by subject key.
pub fn resolve_all(events: &[AttendanceEvent]) -> Vec<SubjectStatus> {
    let mut subjects: Vec<&SubjectKey> = events.iter().map(|e| &e.subject_key).collect();
    subjects.sort();
    subjects.dedup();
    subjects
        .into_iter()
        .map(|subject| resolve_status(subject, events))
        .collect()
}
