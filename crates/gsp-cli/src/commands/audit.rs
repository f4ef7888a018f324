//! `gsp audit` command implementation

use crate::audit::{self, AuditEvent, AuditLogger, AUDIT_DB_FILE};
use crate::error::{CliError, Result};
use crate::AuditCommand;
use colored::Colorize;
use std::path::Path;

/// Execute audit command
pub async fn run(manifest_path: &Path, command: &AuditCommand) -> Result<()> {
    match command {
        AuditCommand::List { limit } => list(manifest_path, *limit).await,
        AuditCommand::Verify => verify(manifest_path).await,
    }
}

fn audit_db_exists(manifest_path: &Path) -> bool {
    audit::state_dir(manifest_path).join(AUDIT_DB_FILE).exists()
}

/// List audit events, oldest first
async fn list(manifest_path: &Path, limit: usize) -> Result<()> {
    if !audit_db_exists(manifest_path) {
        println!("{} No audit trail found. Run 'gsp init' first.", "→".cyan());
        return Ok(());
    }

    let logger = audit::open_for_manifest(manifest_path)?;
    let events = logger.recent_events(limit).await?;

    if events.is_empty() {
        println!("{} No audit events found", "→".cyan());
        return Ok(());
    }

    println!("{} Showing {} most recent events:", "→".cyan(), events.len());
    println!();
    for event in events.iter().rev() {
        print_event(event);
    }
    Ok(())
}

fn print_event(event: &AuditEvent) {
    let id = event.id.map(|id| format!("#{}", id)).unwrap_or_default();
    println!(
        "{} {} {}",
        id.bright_black(),
        event.event_type.as_str().bold(),
        event.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string().dimmed()
    );

    if let Some(object) = &event.object {
        println!("  {} {}", "Object:".cyan(), object);
    }

    if let Some(details) = event.details.as_object() {
        for (key, value) in details {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => continue,
                _ => value.to_string(),
            };
            if value.len() < 100 {
                println!("  {} {}", format!("{}:", key).dimmed(), value);
            }
        }
    }
    println!();
}

/// Verify audit trail integrity
async fn verify(manifest_path: &Path) -> Result<()> {
    if !audit_db_exists(manifest_path) {
        return Err(CliError::audit(format!(
            "No audit trail found in {}. Run 'gsp init' first.",
            audit::state_dir(manifest_path).display()
        )));
    }

    println!("{} Verifying audit trail integrity...", "→".cyan());
    let logger = audit::open_for_manifest(manifest_path)?;
    let report = logger.verify_integrity().await?;

    match report.first_broken {
        None => {
            println!("{} Audit trail verified successfully", "✓".green().bold());
            println!("  {} {} events, hash chain is intact", "→".cyan(), report.events);
            Ok(())
        }
        Some(id) => {
            println!("{} Audit trail verification FAILED", "✗".red().bold());
            println!("  {} Hash chain breaks at event #{}", "→".yellow(), id);
            println!("  {} Possible tampering or data corruption", "→".yellow());
            Err(CliError::audit(format!("hash chain broken at event #{}", id)))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::audit::EventType;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_verify_without_trail_fails() {
        let dir = TempDir::new().unwrap();
        let err = verify(&dir.path().join("gsp.yml")).await.unwrap_err();
        assert!(matches!(err, CliError::Audit(_)));
    }

    #[tokio::test]
    async fn test_list_and_verify() {
        let dir = TempDir::new().unwrap();
        let manifest_path = dir.path().join("gsp.yml");
        let logger = audit::open_for_manifest(&manifest_path).unwrap();
        logger
            .log_event(AuditEvent::new(
                EventType::PipePaused,
                Some("ORDERS_DB.PUBLIC.gcs_to_snowflake_pipe".to_string()),
                json!({}),
                logger.machine_id(),
            ))
            .await
            .unwrap();

        list(&manifest_path, 20).await.unwrap();
        verify(&manifest_path).await.unwrap();
    }
}
