//! `gsp teardown` command implementation
//!
//! Drops the Snowflake objects of the pipeline. GCP resources (bucket,
//! topic, subscription) are left in place.

use crate::audit::middleware::record;
use crate::audit::{self, AuditLogger, EventType};
use crate::commands::{confirm, connect, load_manifest};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::gcp::{CommandRunner, ProcessRunner};
use crate::plan::{PlanFormat, ProvisioningPlan};
use crate::snowflake::SqlExecutor;
use colored::Colorize;
use serde_json::json;
use std::path::Path;

pub async fn run(manifest_path: &Path, include_table: bool, yes: bool) -> Result<()> {
    let manifest = load_manifest(manifest_path)?;
    let config = Config::load()?;
    let plan = ProvisioningPlan::teardown(&manifest, include_table);

    println!("{} The following objects will be dropped:", "→".cyan());
    print!("{}", plan.render(PlanFormat::Sql, &config.gcloud_bin)?);
    if include_table {
        println!(
            "  {} {} and all loaded rows will be dropped",
            "!".red().bold(),
            manifest.table_fqn()
        );
    }

    if !yes && !confirm("Drop these objects?")? {
        return Err(CliError::Aborted);
    }

    let sql = connect(&config, &manifest)?;
    let audit = audit::open_for_manifest(manifest_path)?;
    let runner = ProcessRunner::new(config.gcloud_bin.clone());
    let dropped = teardown(&sql, &runner, &audit, &plan).await?;

    println!("{} Dropped {} objects", "✓".green().bold(), dropped);
    Ok(())
}

/// Apply the teardown plan, recording each dropped object
pub(crate) async fn teardown(
    sql: &dyn SqlExecutor,
    runner: &dyn CommandRunner,
    audit: &dyn AuditLogger,
    plan: &ProvisioningPlan,
) -> Result<usize> {
    for step in &plan.steps {
        step.apply(sql, runner).await?;
        record(
            audit,
            EventType::Teardown,
            Some(step.name.clone()),
            json!({"kind": step.kind.as_str()}),
        )
        .await;
    }
    Ok(plan.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::audit::LocalAuditLogger;
    use crate::gcp::runner::fake::RecordingRunner;
    use crate::manifest::PipelineManifest;
    use crate::snowflake::fake::FakeSnowflake;
    use crate::snowflake::ResultSet;

    #[tokio::test]
    async fn test_teardown_keeps_table_by_default() {
        let manifest = PipelineManifest::new("orders-ingest", "acme-data").unwrap();
        let sf = FakeSnowflake::new().on("DROP", vec![ResultSet::default()]);
        let audit = LocalAuditLogger::new_in_memory("m").unwrap();

        let dropped = teardown(&sf, &RecordingRunner::new(), &audit, &ProvisioningPlan::teardown(&manifest, false))
            .await
            .unwrap();

        assert_eq!(dropped, 4);
        let executed = sf.executed();
        assert!(executed[0].starts_with("DROP PIPE IF EXISTS"));
        assert!(!executed.iter().any(|s| s.starts_with("DROP TABLE")));
        assert_eq!(audit.recent_events(10).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_teardown_with_table() {
        let manifest = PipelineManifest::new("orders-ingest", "acme-data").unwrap();
        let sf = FakeSnowflake::new().on("DROP", vec![ResultSet::default()]);
        let audit = LocalAuditLogger::new_in_memory("m").unwrap();

        teardown(&sf, &RecordingRunner::new(), &audit, &ProvisioningPlan::teardown(&manifest, true))
            .await
            .unwrap();

        assert_eq!(
            sf.executed().last().map(String::as_str),
            Some("DROP TABLE IF EXISTS ORDERS_DB.PUBLIC.orders_data_lz")
        );
    }
}
