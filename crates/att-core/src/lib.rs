//! Core domain logic for attendance tracking.
//!
//! This crate contains the fundamental types and logic for:
//! - Session reconstruction: pairing check-ins with check-outs
//! - Daily aggregation: working time, live time and policy flags per date
//! - Monthly presence: per-date presence grids and percentage buckets
//! - Status: working / not working from the latest event
//! - Live monitoring: periodic re-evaluation against an injectable clock

pub mod calendar;
pub mod clock;
pub mod daily;
pub mod delegation;
pub mod duration;
pub mod event;
pub mod event_type;
pub mod export;
pub mod live;
pub mod policy;
pub mod proxy;
pub mod session;
pub mod status;
pub mod types;
pub mod zone;

pub use calendar::{
    CalendarError, DayPresence, MonthlyPresenceSummary, PresenceBucket, PresenceThresholds, month_dates,
    presence_grid, summarize_month,
};
pub use clock::{Clock, FixedClock, ManualClock, SystemClock};
pub use daily::{DailyRecord, EvaluationSettings, daily_record};
pub use delegation::DelegatedAction;
pub use duration::{HoursMinutesSeconds, format_duration};
pub use event::{AttendanceEvent, EventTimestamp, GeoPoint};
pub use event_type::EventKind;
pub use export::{EXPORT_COLUMNS, ExportRow, export_rows};
pub use live::{EventSource, EventSourceError, LiveMonitorConfig, LiveState, spawn_live_monitor};
pub use policy::{PolicyConfig, PolicyError, PolicyFlags, evaluate, first_check_in};
pub use proxy::{ProxyDirectory, ProxyRelation};
pub use session::{Session, reconstruct_sessions};
pub use status::{SubjectStatus, WorkStatus, latest_event, resolve_all, resolve_status};
pub use types::{EventId, SubjectKey, ValidationError};
pub use zone::{UnknownTimezone, day_start, local_date, local_datetime, parse_zone};
