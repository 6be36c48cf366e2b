//! Storage layer for the attendance engine.
//!
//! Provides persistence for attendance events, proxy relations and the working
//! hours policy using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! [`SharedDatabase`] serializes access behind a mutex so the store can be read
//! from the blocking pool by the live monitor.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Events keep two timestamp columns:
//! - `timestamp`: the value exactly as recorded, which may be unparseable
//! - `instant`: the parsed UTC instant in RFC 3339 with millis
//!   (e.g. `2025-01-15T10:30:00.000Z`), or NULL when `timestamp` is unparseable
//!
//! Range queries and ordering use `instant`, whose fixed layout makes
//! lexicographic order match chronological order.
//!
//! ## Device Metadata
//!
//! The `device` column stores opaque JSON. Only its `platform` entry is read.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use att_core::policy::parse_time_of_day;
use att_core::{
    AttendanceEvent, EventId, EventKind, EventSource, EventSourceError, EventTimestamp, GeoPoint,
    PolicyConfig, PolicyError, ProxyRelation, SubjectKey,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;
use tracing::debug;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored event row could not be turned back into an event.
    #[error("invalid event data for {event_id}: {message}")]
    InvalidEventData { event_id: String, message: String },
    /// A proxy row holds an invalid subject key.
    #[error("invalid proxy relation for {proxy_subject}: {message}")]
    InvalidProxy { proxy_subject: String, message: String },
    /// The stored policy holds an invalid time of day.
    #[error("invalid stored policy: {0}")]
    InvalidPolicy(#[from] PolicyError),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A subject seen in the event log, with its most recently recorded name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectRecord {
    pub subject_key: SubjectKey,
    pub subject_name: String,
}

const EVENT_COLUMNS: &str =
    "id, subject_key, subject_name, kind, timestamp, lat, lng, address, device, delegated_by";

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Events table: append-only check-in/check-out log
            -- timestamp: raw recorded value
            -- instant: normalized UTC instant, NULL if timestamp is unparseable
            -- kind: 'check_in' or 'check_out'
            -- device: opaque JSON metadata
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                subject_key TEXT NOT NULL,
                subject_name TEXT NOT NULL,
                kind TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                instant TEXT,
                lat REAL,
                lng REAL,
                address TEXT,
                device TEXT NOT NULL DEFAULT 'null',
                delegated_by TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_events_subject ON events(subject_key);
            CREATE INDEX IF NOT EXISTS idx_events_instant ON events(instant);

            CREATE TABLE IF NOT EXISTS proxy_subjects (
                proxy_subject TEXT PRIMARY KEY,
                delegating_subject TEXT NOT NULL,
                label TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_proxy_subjects_delegating
                ON proxy_subjects(delegating_subject);

            CREATE TABLE IF NOT EXISTS policy (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                work_start TEXT NOT NULL,
                work_end TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Inserts a batch of events, ignoring duplicates by ID.
    ///
    /// Returns the number of rows actually inserted.
    pub fn insert_events(&mut self, events: &[AttendanceEvent]) -> Result<usize, DbError> {
        if events.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR IGNORE INTO events
                (id, subject_key, subject_name, kind, timestamp, instant, lat, lng, address, device, delegated_by)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )?;
            for event in events {
                let device = event.device.to_string();
                inserted += stmt.execute(params![
                    event.id.as_str(),
                    event.subject_key.as_str(),
                    event.subject_name,
                    event.kind.as_str(),
                    event.timestamp.raw(),
                    event.instant().map(format_timestamp),
                    event.location.as_ref().map(|p| p.lat),
                    event.location.as_ref().map(|p| p.lng),
                    event.address,
                    device,
                    event.delegated_by.as_ref().map(SubjectKey::as_str),
                ])?;
            }
        }
        tx.commit()?;
        debug!(inserted, offered = events.len(), "inserted events");
        Ok(inserted)
    }

    /// Lists all events ordered by instant then ID. Unparseable timestamps sort first.
    pub fn list_events(&self) -> Result<Vec<AttendanceEvent>, DbError> {
        self.query_events(
            &format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY instant ASC, id ASC"),
            params![],
        )
    }

    /// Lists every event recorded for one subject, unparseable ones included.
    pub fn list_subject_events(&self, subject: &SubjectKey) -> Result<Vec<AttendanceEvent>, DbError> {
        self.query_events(
            &format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE subject_key = ? ORDER BY instant ASC, id ASC"
            ),
            [subject.as_str()],
        )
    }

    /// Lists events within a time range.
    ///
    /// The range is inclusive of `start` and exclusive of `end`. Events with
    /// unparseable timestamps never match.
    pub fn list_events_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AttendanceEvent>, DbError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let start = format_timestamp(start);
        let end = format_timestamp(end);
        self.query_events(
            &format!(
                "
                SELECT {EVENT_COLUMNS} FROM events
                WHERE instant >= ? AND instant < ?
                ORDER BY instant ASC, id ASC
                "
            ),
            [start, end],
        )
    }

    /// Lists distinct subjects ordered by key, each with the name on its latest event.
    pub fn list_subjects(&self) -> Result<Vec<SubjectRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT e.subject_key, e.subject_name
            FROM events e
            WHERE e.id = (
                SELECT latest.id FROM events latest
                WHERE latest.subject_key = e.subject_key
                ORDER BY latest.instant DESC, latest.id DESC
                LIMIT 1
            )
            ORDER BY e.subject_key ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        let mut subjects = Vec::new();
        for row in rows {
            let (key, subject_name) = row?;
            let subject_key = SubjectKey::new(key.clone()).map_err(|e| DbError::InvalidEventData {
                event_id: key,
                message: e.to_string(),
            })?;
            subjects.push(SubjectRecord {
                subject_key,
                subject_name,
            });
        }
        Ok(subjects)
    }

    /// Registers a proxy, replacing any earlier relation for the same proxy subject.
    pub fn add_proxy(&mut self, relation: &ProxyRelation) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO proxy_subjects (proxy_subject, delegating_subject, label)
            VALUES (?, ?, ?)
            ON CONFLICT(proxy_subject) DO UPDATE SET
                delegating_subject = excluded.delegating_subject,
                label = excluded.label
            ",
            params![
                relation.proxy_subject.as_str(),
                relation.delegating_subject.as_str(),
                relation.label,
            ],
        )?;
        Ok(())
    }

    /// Lists proxy relations ordered by proxy subject.
    pub fn list_proxies(&self) -> Result<Vec<ProxyRelation>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT proxy_subject, delegating_subject, label
            FROM proxy_subjects
            ORDER BY proxy_subject ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut relations = Vec::new();
        for row in rows {
            let (proxy, delegating, label) = row?;
            let invalid = |message: String| DbError::InvalidProxy {
                proxy_subject: proxy.clone(),
                message,
            };
            relations.push(ProxyRelation {
                proxy_subject: SubjectKey::new(proxy.clone()).map_err(|e| invalid(e.to_string()))?,
                delegating_subject: SubjectKey::new(delegating).map_err(|e| invalid(e.to_string()))?,
                label,
            });
        }
        Ok(relations)
    }

    /// Loads the working hours policy, falling back to the defaults if none was saved.
    pub fn load_policy(&self) -> Result<PolicyConfig, DbError> {
        let stored: Option<(String, String)> = self
            .conn
            .query_row("SELECT work_start, work_end FROM policy WHERE id = 1", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()?;
        match stored {
            Some((start, end)) => Ok(PolicyConfig {
                work_start: parse_time_of_day(&start)?,
                work_end: parse_time_of_day(&end)?,
            }),
            None => Ok(PolicyConfig::default()),
        }
    }

    /// Replaces the working hours policy.
    pub fn save_policy(&mut self, policy: &PolicyConfig) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO policy (id, work_start, work_end) VALUES (1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                work_start = excluded.work_start,
                work_end = excluded.work_end
            ",
            params![
                policy.work_start.format("%H:%M:%S").to_string(),
                policy.work_end.format("%H:%M:%S").to_string(),
            ],
        )?;
        debug!(work_start = %policy.work_start, work_end = %policy.work_end, "saved policy");
        Ok(())
    }

    fn query_events<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<AttendanceEvent>, DbError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, StoredEvent::from_row)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?.into_event()?);
        }
        Ok(events)
    }
}

/// An `events` row before validation.
struct StoredEvent {
    id: String,
    subject_key: String,
    subject_name: String,
    kind: String,
    timestamp: String,
    lat: Option<f64>,
    lng: Option<f64>,
    address: Option<String>,
    device: String,
    delegated_by: Option<String>,
}

impl StoredEvent {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            subject_key: row.get(1)?,
            subject_name: row.get(2)?,
            kind: row.get(3)?,
            timestamp: row.get(4)?,
            lat: row.get(5)?,
            lng: row.get(6)?,
            address: row.get(7)?,
            device: row.get(8)?,
            delegated_by: row.get(9)?,
        })
    }

    fn into_event(self) -> Result<AttendanceEvent, DbError> {
        let event_id = self.id.clone();
        let invalid = |message: String| DbError::InvalidEventData {
            event_id: event_id.clone(),
            message,
        };

        let id = EventId::new(self.id).map_err(|e| invalid(e.to_string()))?;
        let subject_key = SubjectKey::new(self.subject_key).map_err(|e| invalid(e.to_string()))?;
        let kind: EventKind = self.kind.parse().map_err(|e: att_core::ValidationError| invalid(e.to_string()))?;
        let device = serde_json::from_str(&self.device).map_err(|e| invalid(format!("device: {e}")))?;
        let delegated_by = self
            .delegated_by
            .map(SubjectKey::new)
            .transpose()
            .map_err(|e| invalid(e.to_string()))?;
        let location = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            _ => None,
        };

        Ok(AttendanceEvent {
            id,
            subject_key,
            subject_name: self.subject_name,
            kind,
            timestamp: EventTimestamp::parse(self.timestamp),
            location,
            address: self.address,
            device,
            delegated_by,
        })
    }
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A [`Database`] shared across threads.
#[derive(Clone)]
pub struct SharedDatabase {
    inner: Arc<Mutex<Database>>,
}

impl SharedDatabase {
    pub fn new(db: Database) -> Self {
        Self {
            inner: Arc::new(Mutex::new(db)),
        }
    }

    /// Runs `f` with exclusive access to the database.
    pub fn with<T>(&self, f: impl FnOnce(&mut Database) -> T) -> T {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

impl EventSource for SharedDatabase {
    fn fetch_subject_events(&self, subject: &SubjectKey) -> Result<Vec<AttendanceEvent>, EventSourceError> {
        self.with(|db| db.list_subject_events(subject))
            .map_err(|e| EventSourceError::Unavailable(e.to_string()))
    }

    fn fetch_policy(&self) -> Result<PolicyConfig, EventSourceError> {
        self.with(|db| db.load_policy())
            .map_err(|e| EventSourceError::Unavailable(e.to_string()))
    }
}
