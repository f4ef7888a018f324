//! `gsp provision` command implementation
//!
//! Applies the plan up to the notification integration, grants the
//! integrations' service accounts access on the GCP side, then creates the
//! pipe. Every applied step is recorded in the audit trail.

use crate::audit::middleware::record;
use crate::audit::{self, execute_with_audit, AuditLogger, EventType};
use crate::commands::plan::create_mode;
use crate::commands::{confirm, connect, load_manifest};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::gcp::{CommandRunner, ProcessRunner};
use crate::manifest::PipelineManifest;
use crate::monitor;
use crate::plan::{iam_grants, PlanFormat, ProvisioningPlan, Step};
use crate::progress::create_step_bar;
use crate::snowflake::SqlExecutor;
use colored::Colorize;
use serde_json::json;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct ProvisionOptions {
    pub dry_run: bool,
    pub replace: bool,
    pub skip_gcp: bool,
    pub yes: bool,
}

/// What a provisioning run did
#[derive(Debug)]
pub(crate) struct ProvisionOutcome {
    pub steps_applied: usize,
    pub storage_account: Option<String>,
    pub pubsub_account: Option<String>,
    pub grants: Vec<Step>,
    pub grants_applied: bool,
}

pub async fn run(manifest_path: &Path, options: ProvisionOptions) -> Result<()> {
    let manifest = load_manifest(manifest_path)?;
    let config = Config::load()?;

    let mut plan = ProvisioningPlan::from_manifest(&manifest, create_mode(options.replace))?;
    if options.skip_gcp {
        plan = plan.without_gcloud();
    }

    if options.dry_run {
        print!("{}", plan.render(PlanFormat::Sql, &config.gcloud_bin)?);
        return Ok(());
    }

    println!(
        "{} Provisioning {} ({} steps) in {}",
        "→".cyan(),
        manifest.project.name.bold(),
        plan.len(),
        config.require_snowflake_url()?
    );
    if options.replace {
        println!(
            "  {} --replace recreates existing objects; the pipe loses its load history",
            "!".yellow().bold()
        );
    }
    if !options.yes && !confirm("Continue?")? {
        return Err(CliError::Aborted);
    }

    let sql = connect(&config, &manifest)?;
    let runner = ProcessRunner::new(config.gcloud_bin.clone());
    let audit = audit::open_for_manifest(manifest_path)?;

    let outcome = execute_with_audit(
        &audit,
        EventType::ProvisionStart,
        EventType::ProvisionSuccess,
        EventType::ProvisionFailure,
        Some(manifest.project.name.clone()),
        json!({
            "steps": plan.len(),
            "replace": options.replace,
            "skip_gcp": options.skip_gcp,
        }),
        || provision(&sql, &runner, &audit, &manifest, &plan, options.skip_gcp),
    )
    .await?;

    print_outcome(&outcome, &config.gcloud_bin);
    Ok(())
}

/// Apply `plan` in two phases with the IAM grants between them
///
/// The pipe subscribes through the notification integration, whose service
/// account needs the subscriber grant first. With `skip_gcp` the grants are
/// only reported and the pipe is created anyway.
pub(crate) async fn provision(
    sql: &dyn SqlExecutor,
    runner: &dyn CommandRunner,
    audit: &dyn AuditLogger,
    manifest: &PipelineManifest,
    plan: &ProvisioningPlan,
    skip_gcp: bool,
) -> Result<ProvisionOutcome> {
    let (setup, pipe) = plan.phases();
    let mut applied = apply_steps(sql, runner, audit, setup, 0).await?;

    let storage = monitor::describe_integration(sql, &manifest.snowflake.storage_integration).await?;
    let pubsub = monitor::describe_integration(sql, &manifest.snowflake.notification_integration).await?;
    let storage_account = storage.storage_service_account().map(str::to_string);
    let pubsub_account = pubsub.pubsub_service_account().map(str::to_string);

    let grants = iam_grants(manifest, storage_account.as_deref(), pubsub_account.as_deref());
    if !skip_gcp {
        applied += apply_steps(sql, runner, audit, &grants, applied).await?;
    }
    apply_steps(sql, runner, audit, pipe, applied).await?;

    info!(steps = plan.len(), grants = grants.len(), "Provisioning finished");
    Ok(ProvisionOutcome {
        steps_applied: plan.len(),
        storage_account,
        pubsub_account,
        grants,
        grants_applied: !skip_gcp,
    })
}

/// Apply `steps` in order; audit indexes continue from `offset`
async fn apply_steps(
    sql: &dyn SqlExecutor,
    runner: &dyn CommandRunner,
    audit: &dyn AuditLogger,
    steps: &[Step],
    offset: usize,
) -> Result<usize> {
    let bar = create_step_bar(steps.len() as u64);
    for (index, step) in steps.iter().enumerate() {
        bar.set_message(format!("{} {}", step.kind, step.name));
        if let Err(e) = step.apply(sql, runner).await {
            bar.abandon_with_message(format!("failed: {} {}", step.kind, step.name));
            return Err(e);
        }
        record(
            audit,
            EventType::StepApplied,
            Some(step.name.clone()),
            json!({"kind": step.kind.as_str(), "index": offset + index + 1}),
        )
        .await;
        bar.inc(1);
    }
    bar.finish_and_clear();
    Ok(steps.len())
}

fn print_outcome(outcome: &ProvisionOutcome, gcloud_bin: &str) {
    println!("{} Applied {} steps", "✓".green().bold(), outcome.steps_applied);

    for (label, account) in [
        ("Storage integration", &outcome.storage_account),
        ("Notification integration", &outcome.pubsub_account),
    ] {
        match account {
            Some(sa) => println!("  {} {}: {}", "→".cyan(), label, sa),
            None => println!(
                "  {} {}: no service account reported, grants skipped",
                "!".yellow().bold(),
                label
            ),
        }
    }

    if outcome.grants_applied {
        println!("{} Granted {} IAM bindings", "✓".green().bold(), outcome.grants.len());
    } else if !outcome.grants.is_empty() {
        println!();
        println!("Run these on the GCP side to finish:");
        for grant in &outcome.grants {
            println!("  {}", grant.describe(gcloud_bin));
        }
    }

    println!();
    println!("Check the deployment with: gsp verify");
}
