//! Local validation of landing files
//!
//! Checks CSV files against the landing schema before they are uploaded,
//! with the same rules the pipe's `COPY INTO` applies: the column count must
//! match, INT and DATE fields must parse, VARCHAR fields must fit.

use crate::error::{CliError, Result};
use crate::manifest::FileFormat;
use gsp_common::types::LandingSchema;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Errors kept per file; the rest are only counted.
pub const DEFAULT_MAX_ERRORS: usize = 50;

#[derive(Debug, Clone, Copy)]
pub struct ValidateOptions {
    pub skip_header: u32,
    pub delimiter: u8,
    pub max_errors: usize,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            skip_header: 0,
            delimiter: b',',
            max_errors: DEFAULT_MAX_ERRORS,
        }
    }
}

impl ValidateOptions {
    /// Options matching the pipe's file format
    pub fn from_file_format(format: &FileFormat) -> Result<Self> {
        Ok(Self {
            skip_header: format.skip_header,
            delimiter: format.delimiter_byte()?,
            ..Self::default()
        })
    }
}

/// A problem with one row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// 1-based line in the file
    pub line: u64,
    /// Offending column, when the problem is a single field
    pub column: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub rows_checked: u64,
    pub valid_rows: u64,
    pub errors: Vec<RowError>,
    /// All errors, including those beyond the kept ones
    pub total_errors: u64,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.total_errors == 0
    }

    fn push(&mut self, error: RowError, max_errors: usize) {
        self.total_errors += 1;
        if self.errors.len() < max_errors {
            self.errors.push(error);
        }
    }
}

/// Validate CSV data from a reader
pub fn validate_csv<R: Read>(
    reader: R,
    schema: &LandingSchema,
    options: &ValidateOptions,
) -> Result<ValidationReport> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(options.delimiter)
        .from_reader(reader);

    let mut report = ValidationReport::default();
    let mut record = csv::StringRecord::new();
    let mut skipped = 0u32;

    while csv_reader.read_record(&mut record)? {
        if skipped < options.skip_header {
            skipped += 1;
            continue;
        }

        let line = record.position().map(|p| p.line()).unwrap_or(0);
        report.rows_checked += 1;

        if record.len() != schema.width() {
            report.push(
                RowError {
                    line,
                    column: None,
                    message: format!(
                        "expected {} columns, found {}",
                        schema.width(),
                        record.len()
                    ),
                },
                options.max_errors,
            );
            continue;
        }

        let mut row_ok = true;
        for (field, column) in record.iter().zip(&schema.columns) {
            if let Err(message) = column.sql_type.check_value(field) {
                row_ok = false;
                report.push(
                    RowError {
                        line,
                        column: Some(column.name.clone()),
                        message,
                    },
                    options.max_errors,
                );
            }
        }

        if row_ok {
            report.valid_rows += 1;
        }
    }

    Ok(report)
}

/// Validate one file
pub fn validate_file(
    path: &Path,
    schema: &LandingSchema,
    options: &ValidateOptions,
) -> Result<ValidationReport> {
    let file = std::fs::File::open(path)
        .map_err(|e| CliError::validation(format!("Cannot open {}: {}", path.display(), e)))?;
    debug!(path = %path.display(), "Validating landing file");
    validate_csv(file, schema, options)
}

/// Validate a file, or every `*.csv` under a directory
pub fn validate_path(
    path: &Path,
    schema: &LandingSchema,
    options: &ValidateOptions,
) -> Result<Vec<(PathBuf, ValidationReport)>> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.display().to_string()));
    }

    if path.is_file() {
        return Ok(vec![(path.to_path_buf(), validate_file(path, schema, options)?)]);
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();

    files
        .into_iter()
        .map(|file| {
            let report = validate_file(&file, schema, options)?;
            Ok((file, report))
        })
        .collect()
}
