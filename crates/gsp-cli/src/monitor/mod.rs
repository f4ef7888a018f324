//! Monitoring surface of the pipeline
//!
//! Typed views over `SYSTEM$PIPE_STATUS`, `COPY_HISTORY` and
//! `DESC INTEGRATION`, plus the queries that fetch them.

pub mod copy_history;
pub mod integration;
pub mod pipe_status;

pub use copy_history::{CopyHistory, CopyHistoryEntry, HistorySummary, LoadStatus};
pub use integration::IntegrationDescription;
pub use pipe_status::{ExecutionState, PipeStatus};

use crate::ddl;
use crate::error::{CliError, Result};
use crate::manifest::PipelineManifest;
use crate::snowflake::SqlExecutor;
use gsp_common::names::Identifier;
use tracing::debug;

/// Fetch and parse the pipe's status
pub async fn fetch_pipe_status(sql: &dyn SqlExecutor, manifest: &PipelineManifest) -> Result<PipeStatus> {
    let rs = sql.execute(&ddl::pipe_status(&manifest.pipe_fqn())).await?;
    let json = rs.first_value().ok_or_else(|| {
        CliError::snowflake("", format!("SYSTEM$PIPE_STATUS returned no value for {}", manifest.pipe_fqn()))
    })?;
    debug!(status = %json, "Pipe status");
    PipeStatus::parse(json)
}

/// Fetch the landing table's load history for the last `hours`
pub async fn fetch_copy_history(
    sql: &dyn SqlExecutor,
    manifest: &PipelineManifest,
    hours: u32,
) -> Result<CopyHistory> {
    let query = ddl::copy_history(&manifest.snowflake.database, &manifest.table_fqn(), hours);
    let rs = sql.execute(&query).await?;
    CopyHistory::from_result_set(&rs)
}

/// Describe a storage or notification integration
pub async fn describe_integration(sql: &dyn SqlExecutor, name: &Identifier) -> Result<IntegrationDescription> {
    let rs = sql.execute(&ddl::desc_integration(name)).await?;
    Ok(IntegrationDescription::from_result_set(name.canonical(), &rs))
}

/// Current row count of the landing table
pub async fn count_rows(sql: &dyn SqlExecutor, manifest: &PipelineManifest) -> Result<u64> {
    let rs = sql.execute(&ddl::count_rows(&manifest.table_fqn())).await?;
    rs.first_value()
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| CliError::snowflake("", "COUNT(*) returned no number"))
}
