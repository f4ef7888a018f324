//! Stable per-checkout machine identifier
//!
//! Format: `<sanitised hostname>-<8 hex chars>`, persisted in
//! `.gsp/machine-id`.

use crate::error::{CliError, Result};
use std::fs;
use std::path::Path;
use uuid::Uuid;

const MACHINE_ID_FILE: &str = "machine-id";

/// Read the machine id from `state_dir`, creating it on first use
pub fn get_machine_id(state_dir: &Path) -> Result<String> {
    let id_file = state_dir.join(MACHINE_ID_FILE);

    if let Ok(existing) = fs::read_to_string(&id_file) {
        let existing = existing.trim();
        if !existing.is_empty() {
            return Ok(existing.to_string());
        }
    }

    let machine_id = generate_machine_id()?;
    fs::create_dir_all(state_dir)?;
    fs::write(&id_file, &machine_id)?;
    Ok(machine_id)
}

fn generate_machine_id() -> Result<String> {
    let hostname = hostname::get()
        .map_err(|e| CliError::audit(format!("Failed to get hostname: {}", e)))?
        .to_string_lossy()
        .into_owned();

    let suffix = &Uuid::new_v4().simple().to_string()[..8];
    let host = sanitize_hostname(&hostname);
    if host.is_empty() {
        Ok(format!("host-{}", suffix))
    } else {
        Ok(format!("{}-{}", host, suffix))
    }
}

fn sanitize_hostname(hostname: &str) -> String {
    hostname
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(32)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_hostname() {
        assert_eq!(sanitize_hostname("build-01.corp"), "build-01corp");
        assert_eq!(sanitize_hostname("héllo world"), "hlloworld");
        assert_eq!(sanitize_hostname(&"x".repeat(40)).len(), 32);
    }

    #[test]
    fn test_machine_id_persisted() {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join(".gsp");

        let first = get_machine_id(&state).unwrap();
        let suffix = first.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));

        assert_eq!(get_machine_id(&state).unwrap(), first);
        assert!(state.join("machine-id").exists());
    }
}
