//! Local audit trail of provisioning and pipe operations
//!
//! Events are stored in `.gsp/audit.db` (SQLite) and hash-chained so that
//! edits to past events are detectable with `gsp audit verify`. The file is
//! local and editable; it documents what this machine did, nothing more.

pub mod logger;
pub mod machine_id;
pub mod middleware;
pub mod schema;
pub mod types;

pub use logger::{AuditLogger, IntegrityReport, LocalAuditLogger};
pub use machine_id::get_machine_id;
pub use middleware::execute_with_audit;
pub use types::{AuditEvent, EventType};

use std::path::{Path, PathBuf};

/// Directory holding the audit database and machine id.
pub const STATE_DIR: &str = ".gsp";

/// Audit database inside [`STATE_DIR`].
pub const AUDIT_DB_FILE: &str = "audit.db";

/// State directory next to the manifest
pub fn state_dir(manifest_path: &Path) -> PathBuf {
    manifest_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join(STATE_DIR)
}

/// Open the audit logger for the project the manifest belongs to
pub fn open_for_manifest(manifest_path: &Path) -> crate::error::Result<LocalAuditLogger> {
    let dir = state_dir(manifest_path);
    let machine_id = get_machine_id(&dir)?;
    LocalAuditLogger::new(dir.join(AUDIT_DB_FILE), machine_id)
}
