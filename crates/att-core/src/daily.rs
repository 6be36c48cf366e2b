//! Per-subject, per-date working time and policy flags.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::clock::Clock;
use crate::event::AttendanceEvent;
use crate::policy::{PolicyConfig, evaluate, first_check_in};
use crate::session::{Session, reconstruct_sessions};
use crate::types::SubjectKey;
use crate::zone::local_date;

/// The settings every evaluation pass reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationSettings {
    pub policy: PolicyConfig,
    /// Reference timezone for dates and times of day.
    pub zone: Tz,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::default(),
            zone: chrono_tz::UTC,
        }
    }
}

/// One subject's attendance on one calendar date. Recomputed on every pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyRecord {
    pub subject_key: SubjectKey,
    pub date: NaiveDate,
    /// Sessions starting on `date`, in order.
    pub sessions: Vec<Session>,
    pub total_duration_ms: i64,
    pub is_active_now: bool,
    pub is_late_login: bool,
    pub is_early_logout: bool,
}

fn aggregate_day(
    subject: &SubjectKey,
    date: NaiveDate,
    sessions: &[Session],
    first_check_in: Option<DateTime<Utc>>,
    settings: &EvaluationSettings,
    clock: &dyn Clock,
) -> DailyRecord {
    let day_sessions: Vec<Session> = sessions
        .iter()
        .filter(|s| local_date(s.start, settings.zone) == date)
        .cloned()
        .collect();

    let closed_ms: i64 = day_sessions
        .iter()
        .filter(|s| !s.is_open())
        .map(|s| s.duration_ms)
        .sum();

    let now = clock.now();
    let is_today = local_date(now, settings.zone) == date;
    let mut open = day_sessions.iter().filter(|s| s.is_open());
    let live = match (open.next(), open.next()) {
        (Some(session), None) if is_today => Some(session.elapsed_ms(now)),
        _ => None,
    };

    let flags = evaluate(first_check_in, &day_sessions, &settings.policy, settings.zone);

    DailyRecord {
        subject_key: subject.clone(),
        date,
        total_duration_ms: closed_ms + live.unwrap_or(0),
        is_active_now: live.is_some(),
        is_late_login: flags.is_late_login,
        is_early_logout: flags.is_early_logout,
        sessions: day_sessions,
    }
}

/// Builds the record for `date` from a subject's raw events.
///
/// Closed sessions starting on `date` are summed. When exactly one of them is
/// open and `date` is today, `now - start` is added and the record is active.
/// An open session on any other date adds nothing. Lateness is read from the
/// day's first check-in event, even one a later check-in replaced.
pub fn daily_record(
    subject: &SubjectKey,
    date: NaiveDate,
    events: &[AttendanceEvent],
    settings: &EvaluationSettings,
    clock: &dyn Clock,
) -> DailyRecord {
    let sessions = reconstruct_sessions(subject, events);
    let first = first_check_in(subject, date, events, settings.zone);
    aggregate_day(subject, date, &sessions, first, settings, clock)
}
