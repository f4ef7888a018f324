//! `gsp validate` command implementation
//!
//! Checks landing files locally before upload. Uses the manifest's file
//! format when a manifest is present, CSV defaults otherwise.

use crate::commands::print_json;
use crate::csvcheck::{self, ValidateOptions, ValidationReport};
use crate::error::{CliError, Result};
use crate::manifest::PipelineManifest;
use crate::OutputFormat;
use colored::Colorize;
use gsp_common::types::LandingSchema;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Serialize)]
struct FileReport<'a> {
    file: &'a Path,
    #[serde(flatten)]
    report: &'a ValidationReport,
}

pub async fn run(manifest_path: &Path, path: &Path, format: OutputFormat) -> Result<()> {
    let (schema, options) = schema_and_options(manifest_path)?;
    let results = csvcheck::validate_path(path, &schema, &options)?;

    if results.is_empty() {
        return Err(CliError::validation(format!("no *.csv files under {}", path.display())));
    }

    match format {
        OutputFormat::Json => {
            let reports: Vec<FileReport<'_>> = results
                .iter()
                .map(|(file, report)| FileReport { file, report })
                .collect();
            print_json(&reports)?;
        }
        OutputFormat::Table => print_results(&results),
    }

    let invalid = results.iter().filter(|(_, r)| !r.is_valid()).count();
    if invalid > 0 {
        return Err(CliError::validation(format!(
            "{} of {} files do not match the landing schema",
            invalid,
            results.len()
        )));
    }
    Ok(())
}

fn schema_and_options(manifest_path: &Path) -> Result<(LandingSchema, ValidateOptions)> {
    if !manifest_path.exists() {
        debug!(path = %manifest_path.display(), "No manifest, using default CSV options");
        return Ok((LandingSchema::orders(), ValidateOptions::default()));
    }
    let manifest = PipelineManifest::load(manifest_path)?;
    let options = ValidateOptions::from_file_format(&manifest.snowflake.file_format)?;
    Ok((manifest.landing_schema(), options))
}

fn print_results(results: &[(PathBuf, ValidationReport)]) {
    for (file, report) in results {
        if report.is_valid() {
            println!(
                "{} {} ({} rows)",
                "✓".green().bold(),
                file.display(),
                report.rows_checked
            );
            continue;
        }

        println!(
            "{} {} ({} of {} rows invalid)",
            "✗".red().bold(),
            file.display(),
            report.rows_checked - report.valid_rows,
            report.rows_checked
        );
        for error in &report.errors {
            match &error.column {
                Some(column) => println!("  line {}: {}: {}", error.line, column.cyan(), error.message),
                None => println!("  line {}: {}", error.line, error.message),
            }
        }
        let hidden = report.total_errors.saturating_sub(report.errors.len() as u64);
        if hidden > 0 {
            println!("  {} more errors not shown", hidden);
        }
    }
}
