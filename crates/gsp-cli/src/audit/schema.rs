//! SQLite schema of the audit trail

use crate::error::Result;
use rusqlite::Connection;

/// Create tables and indexes (idempotent)
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS audit_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            object TEXT,
            details TEXT NOT NULL,
            machine_id TEXT NOT NULL,
            event_hash TEXT,
            previous_hash TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_events_timestamp ON audit_events(timestamp);
        CREATE INDEX IF NOT EXISTS idx_events_type ON audit_events(event_type);
        CREATE INDEX IF NOT EXISTS idx_events_object ON audit_events(object);
        "#,
    )?;
    Ok(())
}
