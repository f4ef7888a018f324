//! `gsp verify` command implementation
//!
//! Runs the acceptance checks against the deployed pipeline and records the
//! run in the audit trail.

use crate::audit::middleware::record;
use crate::audit::{self, EventType};
use crate::commands::{connect, load_manifest, new_table, print_json};
use crate::config::Config;
use crate::csvcheck::{self, ValidateOptions};
use crate::error::{CliError, Result};
use crate::manifest::PipelineManifest;
use crate::progress::create_spinner;
use crate::verify::{run_checks, CheckStatus, VerifyOptions, VerifyReport};
use crate::OutputFormat;
use colored::Colorize;
use comfy_table::{Cell, Color};
use gsp_common::checksum::sha256_file;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct VerifyArgs {
    pub file: Option<String>,
    pub expect_rows: Option<u64>,
    pub local: Option<PathBuf>,
    pub malformed: Option<String>,
    pub timeout_secs: u64,
    pub interval_secs: u64,
    pub hours: u32,
}

pub async fn run(manifest_path: &Path, args: VerifyArgs, format: OutputFormat) -> Result<()> {
    let manifest = load_manifest(manifest_path)?;
    let local_sha256 = args.local.as_deref().map(sha256_file).transpose()?;
    if let Some(digest) = &local_sha256 {
        debug!(sha256 = %digest, "Fingerprinted local file");
    }
    let options = verify_options(&manifest, args)?;
    let config = Config::load()?;
    let sql = connect(&config, &manifest)?;

    let spinner = create_spinner("Running acceptance checks");
    let report = run_checks(&sql, &manifest, &options).await;
    spinner.finish_and_clear();
    let report = report?;

    let audit = audit::open_for_manifest(manifest_path)?;
    record(
        &audit,
        EventType::VerifyRun,
        Some(manifest.project.name.clone()),
        json!({
            "passed": report.passed(),
            "failed": report.failed_names(),
            "file": options.file,
            "local_sha256": local_sha256,
            "malformed": options.malformed,
        }),
    )
    .await;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report),
    }

    if report.passed() {
        Ok(())
    } else {
        Err(CliError::VerificationFailed(report.failed_names().join(", ")))
    }
}

/// Resolve CLI arguments; `--local` is counted for the expected row count
fn verify_options(manifest: &PipelineManifest, args: VerifyArgs) -> Result<VerifyOptions> {
    let expected_rows = match (&args.local, args.expect_rows) {
        (Some(local), _) => Some(count_local_rows(manifest, local)?),
        (None, rows) => rows,
    };

    Ok(VerifyOptions {
        file: args.file,
        expected_rows,
        malformed: args.malformed,
        timeout: Duration::from_secs(args.timeout_secs),
        interval: Duration::from_secs(args.interval_secs.max(1)),
        history_hours: args.hours,
    })
}

fn count_local_rows(manifest: &PipelineManifest, local: &Path) -> Result<u64> {
    let options = ValidateOptions::from_file_format(&manifest.snowflake.file_format)?;
    let report = csvcheck::validate_file(local, &manifest.landing_schema(), &options)?;
    if !report.is_valid() {
        return Err(CliError::validation(format!(
            "{} has {} invalid rows; run 'gsp validate {}' for details",
            local.display(),
            report.total_errors,
            local.display()
        )));
    }
    Ok(report.rows_checked)
}

fn print_report(report: &VerifyReport) {
    let mut table = new_table();
    table.set_header(vec!["Check", "Result", "Detail"]);
    for outcome in &report.outcomes {
        let color = match outcome.status {
            CheckStatus::Pass => Color::Green,
            CheckStatus::Fail => Color::Red,
            CheckStatus::Skipped => Color::Grey,
        };
        table.add_row(vec![
            Cell::new(outcome.name),
            Cell::new(outcome.status.to_string()).fg(color),
            Cell::new(&outcome.detail),
        ]);
    }
    println!("{}", table);

    let summary = format!(
        "{} passed, {} failed, {} skipped",
        report.count(CheckStatus::Pass),
        report.count(CheckStatus::Fail),
        report.count(CheckStatus::Skipped)
    );
    if report.passed() {
        println!("{} {}", "✓".green().bold(), summary);
    } else {
        println!("{} {}", "✗".red().bold(), summary);
    }
}
