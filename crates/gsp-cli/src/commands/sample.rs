//! `gsp sample` command implementation
//!
//! Writes a landing file to upload when exercising a deployed pipeline.

use crate::error::{CliError, Result};
use crate::manifest::PipelineManifest;
use crate::progress::format_bytes;
use crate::sample::{sample_orders, write_malformed, write_orders};
use chrono::Utc;
use colored::Colorize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub async fn run(manifest_path: &Path, out: &Path, rows: usize, first_id: i64, malformed: bool) -> Result<()> {
    if rows == 0 {
        return Err(CliError::validation("--rows must be at least 1"));
    }

    // Sample files are headerless regardless of skip_header.
    let delimiter = if manifest_path.exists() {
        PipelineManifest::load(manifest_path)?
            .snowflake
            .file_format
            .delimiter_byte()?
    } else {
        b','
    };

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let records = sample_orders(rows, first_id, Utc::now().date_naive());
    let writer = BufWriter::new(File::create(out)?);
    if malformed {
        write_malformed(writer, &records, delimiter)?;
    } else {
        write_orders(writer, &records, delimiter)?;
    }

    let kind = if malformed { "malformed" } else { "well-formed" };
    let size = std::fs::metadata(out)?.len();
    println!(
        "{} Wrote {} {} rows ({}) to {}",
        "✓".green().bold(),
        rows,
        kind,
        format_bytes(size),
        out.display()
    );
    if !malformed {
        println!(
            "  {} After uploading, check it with: gsp verify --file <object path> --local {}",
            "→".cyan(),
            out.display()
        );
    }
    Ok(())
}
