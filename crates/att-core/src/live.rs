//! Periodic re-evaluation of one subject's current day.
//!
//! The monitor is a cancelable tokio task. Each tick fetches a fresh snapshot
//! from the [`EventSource`] on the blocking pool, aggregates today's record
//! against the injected [`Clock`] and publishes it on a watch channel. When a
//! fetch fails the previous snapshot is evaluated instead and the error is
//! reported in the published state. There is no retry beyond the next tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::daily::{DailyRecord, EvaluationSettings, daily_record};
use crate::event::AttendanceEvent;
use crate::policy::PolicyConfig;
use crate::types::SubjectKey;
use crate::zone::local_date;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventSourceError {
    #[error("event store unavailable: {0}")]
    Unavailable(String),

    #[error("event fetch task failed: {0}")]
    Task(String),
}

/// Read access to stored attendance data.
pub trait EventSource: Send + Sync {
    /// Every event recorded for `subject`, in no particular order.
    fn fetch_subject_events(&self, subject: &SubjectKey) -> Result<Vec<AttendanceEvent>, EventSourceError>;

    /// The policy in force. Read on every pass so administrative changes apply
    /// without a restart.
    fn fetch_policy(&self) -> Result<PolicyConfig, EventSourceError> {
        Ok(PolicyConfig::default())
    }
}

impl<S: EventSource + ?Sized> EventSource for Arc<S> {
    fn fetch_subject_events(&self, subject: &SubjectKey) -> Result<Vec<AttendanceEvent>, EventSourceError> {
        (**self).fetch_subject_events(subject)
    }

    fn fetch_policy(&self) -> Result<PolicyConfig, EventSourceError> {
        (**self).fetch_policy()
    }
}

#[derive(Debug, Clone)]
pub struct LiveMonitorConfig {
    pub subject: SubjectKey,
    pub zone: Tz,
    pub refresh_interval: Duration,
}

/// What the monitor last published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveState {
    pub subject_key: SubjectKey,
    /// `None` until a fetch has succeeded at least once.
    pub record: Option<DailyRecord>,
    /// Error from the most recent fetch, cleared by the next success.
    pub last_error: Option<String>,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub passes: u64,
}

impl LiveState {
    fn pending(subject_key: SubjectKey) -> Self {
        Self {
            subject_key,
            record: None,
            last_error: None,
            evaluated_at: None,
            passes: 0,
        }
    }
}

struct Snapshot {
    events: Vec<AttendanceEvent>,
    policy: PolicyConfig,
}

/// Starts the monitor. The task ends when `cancel` fires.
pub fn spawn_live_monitor<S, C>(
    source: Arc<S>,
    clock: Arc<C>,
    config: LiveMonitorConfig,
    cancel: CancellationToken,
) -> (watch::Receiver<LiveState>, JoinHandle<()>)
where
    S: EventSource + ?Sized + 'static,
    C: Clock + ?Sized + 'static,
{
    let (tx, rx) = watch::channel(LiveState::pending(config.subject.clone()));
    let handle = tokio::spawn(run_live_monitor(source, clock, config, tx, cancel));
    (rx, handle)
}

async fn run_live_monitor<S, C>(
    source: Arc<S>,
    clock: Arc<C>,
    config: LiveMonitorConfig,
    tx: watch::Sender<LiveState>,
    cancel: CancellationToken,
) where
    S: EventSource + ?Sized + 'static,
    C: Clock + ?Sized + 'static,
{
    let mut ticker = time::interval(config.refresh_interval);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    let mut snapshot: Option<Snapshot> = None;
    let mut passes: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let last_error = match fetch_snapshot(Arc::clone(&source), config.subject.clone()).await {
                    Ok(fresh) => {
                        snapshot = Some(fresh);
                        None
                    }
                    Err(e) => {
                        warn!(subject = %config.subject, error = %e, "live refresh failed, keeping previous snapshot");
                        Some(e.to_string())
                    }
                };

                passes += 1;
                let now = clock.now();
                let record = snapshot.as_ref().map(|snap| {
                    let settings = EvaluationSettings { policy: snap.policy, zone: config.zone };
                    daily_record(&config.subject, local_date(now, config.zone), &snap.events, &settings, &clock)
                });
                debug!(subject = %config.subject, passes, "live state published");

                let state = LiveState {
                    subject_key: config.subject.clone(),
                    record,
                    last_error,
                    evaluated_at: Some(now),
                    passes,
                };
                if tx.send(state).is_err() {
                    debug!(subject = %config.subject, "no live state receivers left, stopping");
                    return;
                }
            }
            () = cancel.cancelled() => {
                debug!(subject = %config.subject, "live monitor cancelled");
                return;
            }
        }
    }
}

async fn fetch_snapshot<S>(source: Arc<S>, subject: SubjectKey) -> Result<Snapshot, EventSourceError>
where
    S: EventSource + ?Sized + 'static,
{
    tokio::task::spawn_blocking(move || {
        let events = source.fetch_subject_events(&subject)?;
        let policy = source.fetch_policy()?;
        Ok::<_, EventSourceError>(Snapshot { events, policy })
    })
    .await
    .map_err(|e| EventSourceError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::session::test_support::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct FlakySource {
        events: Mutex<Vec<AttendanceEvent>>,
        failing: AtomicBool,
    }

    impl FlakySource {
        fn with(events: Vec<AttendanceEvent>) -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(events),
                failing: AtomicBool::new(false),
            })
        }
    }

    impl EventSource for FlakySource {
        fn fetch_subject_events(&self, subject: &SubjectKey) -> Result<Vec<AttendanceEvent>, EventSourceError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(EventSourceError::Unavailable("connection reset".to_string()));
            }
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| &e.subject_key == subject)
                .cloned()
                .collect())
        }
    }

    fn config() -> LiveMonitorConfig {
        LiveMonitorConfig {
            subject: subject("ana"),
            zone: chrono_tz::UTC,
            refresh_interval: Duration::from_secs(10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_live_total_and_tracks_the_clock() {
        let source = FlakySource::with(vec![check_in("1", "ana", hm(10, 15))]);
        let clock = Arc::new(ManualClock::new(hm(14, 15)));
        let cancel = CancellationToken::new();

        let (mut rx, handle) = spawn_live_monitor(source, Arc::clone(&clock), config(), cancel.clone());

        rx.changed().await.unwrap();
        let state = rx.borrow_and_update().clone();
        let record = state.record.unwrap();
        assert!(record.is_active_now);
        assert!(record.is_late_login);
        assert_eq!(record.total_duration_ms, 4 * 3_600_000);
        assert_eq!(state.passes, 1);

        clock.advance(chrono::Duration::hours(1));
        rx.changed().await.unwrap();
        let record = rx.borrow_and_update().record.clone().unwrap();
        assert_eq!(record.total_duration_ms, 5 * 3_600_000);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_keeps_previous_snapshot() {
        let source = FlakySource::with(vec![check_in("1", "ana", hm(9, 0))]);
        let clock = Arc::new(ManualClock::new(hm(10, 0)));
        let cancel = CancellationToken::new();

        let (mut rx, handle) = spawn_live_monitor(Arc::clone(&source), Arc::clone(&clock), config(), cancel.clone());
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().last_error.is_none());

        source.failing.store(true, Ordering::SeqCst);
        source.events.lock().unwrap().clear();
        clock.advance(chrono::Duration::minutes(30));

        rx.changed().await.unwrap();
        let state = rx.borrow_and_update().clone();
        assert_eq!(
            state.last_error.as_deref(),
            Some("event store unavailable: connection reset")
        );
        let record = state.record.unwrap();
        assert!(record.is_active_now);
        assert_eq!(record.total_duration_ms, 90 * 60_000);

        source.failing.store(false, Ordering::SeqCst);
        rx.changed().await.unwrap();
        let state = rx.borrow_and_update().clone();
        assert!(state.last_error.is_none());
        assert_eq!(state.record.unwrap().total_duration_ms, 0);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failure_before_any_snapshot_publishes_no_record() {
        let source = FlakySource::with(Vec::new());
        source.failing.store(true, Ordering::SeqCst);
        let clock = Arc::new(ManualClock::new(hm(10, 0)));
        let cancel = CancellationToken::new();

        let (mut rx, handle) = spawn_live_monitor(source, clock, config(), cancel.clone());
        rx.changed().await.unwrap();
        let state = rx.borrow_and_update().clone();
        assert!(state.record.is_none());
        assert!(state.last_error.is_some());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_task() {
        let source = FlakySource::with(Vec::new());
        let clock = Arc::new(ManualClock::new(hm(10, 0)));
        let cancel = CancellationToken::new();

        let (rx, handle) = spawn_live_monitor(source, clock, config(), cancel.clone());
        cancel.cancel();
        handle.await.unwrap();
        drop(rx);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_receiver_stops_the_task() {
        let source = FlakySource::with(Vec::new());
        let clock = Arc::new(ManualClock::new(hm(10, 0)));

        let (rx, handle) = spawn_live_monitor(source, clock, config(), CancellationToken::new());
        drop(rx);
        handle.await.unwrap();
    }
}
