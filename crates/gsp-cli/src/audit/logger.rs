//! Audit logger trait and the SQLite implementation

use crate::audit::schema;
use crate::audit::types::{AuditEvent, EventType};
use crate::error::{CliError, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Outcome of walking the hash chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub events: usize,
    /// First event whose link or hash does not match
    pub first_broken: Option<i64>,
}

impl IntegrityReport {
    pub fn is_valid(&self) -> bool {
        self.first_broken.is_none()
    }
}

#[async_trait]
pub trait AuditLogger: Send + Sync {
    /// Append an event; returns its id
    async fn log_event(&self, event: AuditEvent) -> Result<i64>;

    /// Most recent events, newest first
    async fn recent_events(&self, limit: usize) -> Result<Vec<AuditEvent>>;

    async fn verify_integrity(&self) -> Result<IntegrityReport>;

    fn machine_id(&self) -> &str;
}

/// Audit trail in a local SQLite file
pub struct LocalAuditLogger {
    db: Arc<Mutex<Connection>>,
    machine_id: String,
}

impl LocalAuditLogger {
    pub fn new(db_path: PathBuf, machine_id: String) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&db_path).map_err(|e| {
            CliError::audit(format!("Failed to open audit database {}: {}", db_path.display(), e))
        })?;
        schema::init_schema(&conn)?;
        debug!(path = %db_path.display(), "Opened audit database");

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            machine_id,
        })
    }

    #[cfg(test)]
    pub fn new_in_memory(machine_id: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init_schema(&conn)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            machine_id: machine_id.to_string(),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|e| CliError::audit(format!("Failed to acquire database lock: {}", e)))
    }

    fn last_event_hash(conn: &Connection) -> Result<Option<String>> {
        let hash = conn
            .query_row(
                "SELECT event_hash FROM audit_events ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(hash.flatten())
    }

    fn load_events(conn: &Connection, sql: &str, limit: i64) -> Result<Vec<AuditEvent>> {
        let mut stmt = conn.prepare(sql)?;
        let events = stmt
            .query_map(params![limit], event_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(events)
    }
}

const SELECT_EVENTS: &str = "SELECT id, timestamp, event_type, object, details, machine_id, event_hash, previous_hash FROM audit_events";

fn conversion_error(column: usize, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<AuditEvent> {
    let timestamp = chrono::DateTime::parse_from_rfc3339(&row.get::<_, String>(1)?)
        .map_err(|e| conversion_error(1, e))?
        .with_timezone(&chrono::Utc);

    let event_type: EventType = row
        .get::<_, String>(2)?
        .parse()
        .map_err(|e: String| conversion_error(2, std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

    let details = serde_json::from_str(&row.get::<_, String>(4)?).map_err(|e| conversion_error(4, e))?;

    Ok(AuditEvent {
        id: Some(row.get(0)?),
        timestamp,
        event_type,
        object: row.get(3)?,
        details,
        machine_id: row.get(5)?,
        event_hash: row.get(6)?,
        previous_hash: row.get(7)?,
    })
}

#[async_trait]
impl AuditLogger for LocalAuditLogger {
    async fn log_event(&self, mut event: AuditEvent) -> Result<i64> {
        let conn = self.conn()?;

        event.previous_hash = Self::last_event_hash(&conn)?;
        let details = serde_json::to_string(&event.details)?;

        conn.execute(
            "INSERT INTO audit_events (timestamp, event_type, object, details, machine_id, previous_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.timestamp.to_rfc3339(),
                event.event_type.as_str(),
                event.object,
                details,
                event.machine_id,
                event.previous_hash,
            ],
        )?;

        let id = conn.last_insert_rowid();
        event.id = Some(id);
        conn.execute(
            "UPDATE audit_events SET event_hash = ?1 WHERE id = ?2",
            params![event.compute_hash(), id],
        )?;

        debug!(id, event_type = %event.event_type, "Audit event recorded");
        Ok(id)
    }

    async fn recent_events(&self, limit: usize) -> Result<Vec<AuditEvent>> {
        let conn = self.conn()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        Self::load_events(&conn, &format!("{} ORDER BY id DESC LIMIT ?1", SELECT_EVENTS), limit)
    }

    async fn verify_integrity(&self) -> Result<IntegrityReport> {
        let conn = self.conn()?;
        // LIMIT -1 is unbounded in SQLite.
        let events = Self::load_events(&conn, &format!("{} ORDER BY id ASC LIMIT ?1", SELECT_EVENTS), -1)?;

        let mut previous: Option<&String> = None;
        for event in &events {
            let linked = event.previous_hash.as_ref() == previous;
            let hashed = event.event_hash.as_deref() == Some(event.compute_hash().as_str());
            if !linked || !hashed {
                return Ok(IntegrityReport {
                    events: events.len(),
                    first_broken: event.id,
                });
            }
            previous = event.event_hash.as_ref();
        }

        Ok(IntegrityReport {
            events: events.len(),
            first_broken: None,
        })
    }

    fn machine_id(&self) -> &str {
        &self.machine_id
    }
}
