//! Bulk check-in/out performed by one actor on behalf of many subjects.

use serde_json::Value;

use crate::event::{AttendanceEvent, EventTimestamp, GeoPoint};
use crate::event_type::EventKind;
use crate::types::{EventId, SubjectKey};

/// The shared part of a bulk action. Every target gets an identical copy.
#[derive(Debug, Clone)]
pub struct DelegatedAction {
    pub actor: SubjectKey,
    pub kind: EventKind,
    pub timestamp: EventTimestamp,
    pub location: Option<GeoPoint>,
    pub address: Option<String>,
    pub device: Value,
}

impl DelegatedAction {
    /// One event per `(subject, display name)` target, each marked with the actor.
    ///
    /// `next_id` supplies a fresh unique id per event. Its first error aborts.
    pub fn events_for<I, E>(
        &self,
        targets: I,
        mut next_id: impl FnMut() -> Result<EventId, E>,
    ) -> Result<Vec<AttendanceEvent>, E>
    where
        I: IntoIterator<Item = (SubjectKey, String)>,
    {
        targets
            .into_iter()
            .map(|(subject_key, subject_name)| {
                Ok(AttendanceEvent {
                    id: next_id()?,
                    subject_key,
                    subject_name,
                    kind: self.kind,
                    timestamp: self.timestamp.clone(),
                    location: self.location,
                    address: self.address.clone(),
                    device: self.device.clone(),
                    delegated_by: Some(self.actor.clone()),
                })
            })
            .collect()
    }
}
