//! Session reconstruction from a subject's check-in/check-out log.
//!
//! # Pairing rules
//!
//! Events are replayed in `(timestamp, id)` order while tracking a single
//! pending start:
//!
//! 1. A check-in always becomes the pending start. If one was already pending
//!    it is replaced and the earlier interval is discarded.
//! 2. A check-out closes the pending start into a session. With nothing
//!    pending, the check-out is dropped.
//! 3. A start still pending after the last event is reported as one open
//!    session.
//!
//! Events with unparseable timestamps take no part in pairing.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::event::{AttendanceEvent, chronological};
use crate::event_type::EventKind;
use crate::types::SubjectKey;

/// A reconstructed work interval. Derived on every pass and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub subject_key: SubjectKey,
    pub start: DateTime<Utc>,
    /// `None` while the subject has not checked out.
    pub end: Option<DateTime<Utc>>,
    /// Closed span in milliseconds; 0 for an open session.
    pub duration_ms: i64,
}

impl Session {
    fn closed(subject_key: SubjectKey, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            subject_key,
            start,
            end: Some(end),
            duration_ms: (end - start).num_milliseconds(),
        }
    }

    fn open(subject_key: SubjectKey, start: DateTime<Utc>) -> Self {
        Self {
            subject_key,
            start,
            end: None,
            duration_ms: 0,
        }
    }

    pub const fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Elapsed time as of `now`: the closed span, or `now - start` while open.
    ///
    /// Never negative, even if `now` precedes the start.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> i64 {
        match self.end {
            Some(_) => self.duration_ms,
            None => (now - self.start).num_milliseconds().max(0),
        }
    }
}

/// Rebuilds the ordered sessions of one subject.
///
/// `events` may be in any order and may contain other subjects' events, which
/// are ignored. The result is deterministic for a given set of events.
pub fn reconstruct_sessions(subject: &SubjectKey, events: &[AttendanceEvent]) -> Vec<Session> {
    let ordered = chronological(events.iter().filter(|e| &e.subject_key == subject));

    let mut sessions = Vec::new();
    let mut open_start: Option<DateTime<Utc>> = None;

    for (ts, event) in ordered {
        match event.kind {
            EventKind::CheckIn => {
                if let Some(previous) = open_start.replace(ts) {
                    tracing::debug!(
                        subject = %subject,
                        event_id = %event.id,
                        discarded_start = %previous,
                        "check-in replaced a pending start"
                    );
                }
            }
            EventKind::CheckOut => match open_start.take() {
                Some(start) => sessions.push(Session::closed(subject.clone(), start, ts)),
                None => {
                    tracing::debug!(
                        subject = %subject,
                        event_id = %event.id,
                        "dropping check-out without a pending check-in"
                    );
                }
            },
        }
    }

    if let Some(start) = open_start {
        sessions.push(Session::open(subject.clone(), start));
    }

    sessions
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use proptest::prelude::*;

    use crate::event::{AttendanceEvent, EventTimestamp};
    use crate::event_type::EventKind;
    use crate::types::{EventId, SubjectKey};

    /// 2025-01-15 00:00 UTC plus the given minutes.
    pub fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0)
            .single()
            .expect("valid test timestamp")
            + Duration::minutes(minutes)
    }

    /// 2025-01-15 at the given wall time (UTC).
    pub fn hm(hour: i64, minute: i64) -> DateTime<Utc> {
        at(hour * 60 + minute)
    }

    pub fn subject(key: &str) -> SubjectKey {
        SubjectKey::new(key).expect("valid subject")
    }

    pub fn event(id: &str, key: &str, kind: EventKind, ts: DateTime<Utc>) -> AttendanceEvent {
        AttendanceEvent::new(EventId::new(id).expect("valid id"), subject(key), kind, ts)
    }

    pub fn check_in(id: &str, key: &str, ts: DateTime<Utc>) -> AttendanceEvent {
        event(id, key, EventKind::CheckIn, ts)
    }

    pub fn check_out(id: &str, key: &str, ts: DateTime<Utc>) -> AttendanceEvent {
        event(id, key, EventKind::CheckOut, ts)
    }

    pub fn raw_event(id: &str, key: &str, kind: EventKind, raw: &str) -> AttendanceEvent {
        AttendanceEvent::new(
            EventId::new(id).expect("valid id"),
            subject(key),
            kind,
            EventTimestamp::parse(raw),
        )
    }

    /// Arbitrary logs for one subject. Timestamps fall on eight half-hour slots
    /// so ties are common, and random id prefixes shuffle the tie order.
    pub fn event_log(key: &'static str) -> impl Strategy<Value = Vec<AttendanceEvent>> {
        proptest::collection::vec((any::<bool>(), 0..8i64, 0..10_000u32), 0..16).prop_map(move |specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (is_check_in, slot, tag))| {
                    let kind = if is_check_in { EventKind::CheckIn } else { EventKind::CheckOut };
                    event(&format!("{tag:04}-{i}"), key, kind, at(slot * 30))
                })
                .collect()
        })
    }
}
