//! `gsp pipe` command implementation

use crate::audit::middleware::record;
use crate::audit::{self, AuditLogger, EventType};
use crate::commands::{connect, load_manifest};
use crate::config::Config;
use crate::ddl;
use crate::error::Result;
use crate::manifest::PipelineManifest;
use crate::snowflake::SqlExecutor;
use crate::PipeCommand;
use colored::Colorize;
use serde_json::json;
use std::path::Path;
use tracing::info;

pub async fn run(manifest_path: &Path, command: &PipeCommand) -> Result<()> {
    let manifest = load_manifest(manifest_path)?;
    let config = Config::load()?;
    let sql = connect(&config, &manifest)?;
    let audit = audit::open_for_manifest(manifest_path)?;

    let message = execute(&sql, &audit, &manifest, command).await?;
    println!("{} {}", "✓".green().bold(), message);
    Ok(())
}

/// Run one pipe operation; returns a confirmation line
pub(crate) async fn execute(
    sql: &dyn SqlExecutor,
    audit: &dyn AuditLogger,
    manifest: &PipelineManifest,
    command: &PipeCommand,
) -> Result<String> {
    let pipe = manifest.pipe_fqn();

    let (statement, event_type, details, message) = match command {
        PipeCommand::Pause => (
            ddl::set_pipe_paused(&pipe, true),
            EventType::PipePaused,
            json!({}),
            format!("Paused {}", pipe),
        ),
        PipeCommand::Resume => (
            ddl::set_pipe_paused(&pipe, false),
            EventType::PipeResumed,
            json!({}),
            format!("Resumed {}", pipe),
        ),
        PipeCommand::Refresh { prefix } => (
            ddl::refresh_pipe(&pipe, prefix.as_deref()),
            EventType::PipeRefreshed,
            json!({"prefix": prefix}),
            format!("Queued unloaded files from the last 7 days for {}", pipe),
        ),
    };

    sql.execute(&statement).await?;
    info!(pipe = %pipe, event = %event_type, "Pipe operation applied");
    record(audit, event_type, Some(pipe), details).await;

    Ok(message)
}
