//! `gsp status` command implementation
//!
//! Shows `SYSTEM$PIPE_STATUS` and the landing table's row count.

use crate::commands::{connect, load_manifest, new_table, print_json};
use crate::config::Config;
use crate::error::Result;
use crate::manifest::PipelineManifest;
use crate::monitor::{self, PipeStatus};
use crate::snowflake::SqlExecutor;
use crate::OutputFormat;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Serialize)]
pub(crate) struct StatusReport {
    pub pipe: String,
    pub status: PipeStatus,
    /// `None` when the count query failed
    pub table_rows: Option<u64>,
}

pub async fn run(manifest_path: &Path, format: OutputFormat) -> Result<()> {
    let manifest = load_manifest(manifest_path)?;
    let config = Config::load()?;
    let sql = connect(&config, &manifest)?;

    let report = collect(&sql, &manifest).await?;
    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Table => {
            print_report(&report, &manifest);
            Ok(())
        }
    }
}

pub(crate) async fn collect(sql: &dyn SqlExecutor, manifest: &PipelineManifest) -> Result<StatusReport> {
    let status = monitor::fetch_pipe_status(sql, manifest).await?;
    let table_rows = match monitor::count_rows(sql, manifest).await {
        Ok(rows) => Some(rows),
        Err(e) => {
            warn!(error = %e, table = %manifest.table_fqn(), "Could not count rows");
            None
        }
    };

    Ok(StatusReport {
        pipe: manifest.pipe_fqn(),
        status,
        table_rows,
    })
}

fn print_report(report: &StatusReport, manifest: &PipelineManifest) {
    let status = &report.status;
    let state = status.execution_state.to_string();
    let state = if status.is_running() {
        state.green().bold()
    } else {
        state.yellow().bold()
    };
    println!("{} {} {}", "Pipe:".bold(), report.pipe, state);

    let mut table = new_table();
    table.set_header(vec!["Field", "Value"]);
    let optional = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    table.add_row(vec!["Pending files".to_string(), status.pending_file_count.to_string()]);
    table.add_row(vec![
        "Outstanding messages".to_string(),
        status.num_outstanding_messages_on_channel.to_string(),
    ]);
    table.add_row(vec!["Last ingested".to_string(), optional(&status.last_ingested_timestamp)]);
    table.add_row(vec!["Last file".to_string(), optional(&status.last_ingested_file_path)]);
    table.add_row(vec!["Channel".to_string(), optional(&status.notification_channel_name)]);
    table.add_row(vec![
        "Last message received".to_string(),
        optional(&status.last_received_message_timestamp),
    ]);
    table.add_row(vec![
        manifest.table_fqn(),
        report
            .table_rows
            .map(|n| format!("{} rows", n))
            .unwrap_or_else(|| "unavailable".to_string()),
    ]);
    println!("{}", table);

    if let Some(problem) = status.problem() {
        println!("  {} {}", "!".red().bold(), problem);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::monitor::ExecutionState;
    use crate::snowflake::fake::{scalar, FakeSnowflake};

    fn manifest() -> PipelineManifest {
        PipelineManifest::new("orders-ingest", "acme-data").unwrap()
    }

    #[tokio::test]
    async fn test_collect() {
        let sf = FakeSnowflake::new()
            .on(
                "SYSTEM$PIPE_STATUS",
                vec![scalar("STATUS", r#"{"executionState":"PAUSED","pendingFileCount":2}"#)],
            )
            .on("COUNT(*)", vec![scalar("COUNT(*)", "125")]);

        let report = collect(&sf, &manifest()).await.unwrap();
        assert_eq!(report.status.execution_state, ExecutionState::Paused);
        assert_eq!(report.status.pending_file_count, 2);
        assert_eq!(report.table_rows, Some(125));
    }

    #[tokio::test]
    async fn test_missing_table_is_not_fatal() {
        let sf = FakeSnowflake::new().on(
            "SYSTEM$PIPE_STATUS",
            vec![scalar("STATUS", r#"{"executionState":"RUNNING"}"#)],
        );

        let report = collect(&sf, &manifest()).await.unwrap();
        assert!(report.status.is_running());
        assert_eq!(report.table_rows, None);
    }
}
