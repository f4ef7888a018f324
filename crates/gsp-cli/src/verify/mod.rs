//! Acceptance checks against a deployed pipeline
//!
//! Each check inspects the live deployment through the monitoring surface
//! and reports an outcome; a failing check never aborts the run. Checks that
//! need an uploaded file are skipped when no file is given.

pub mod checks;

use crate::error::Result;
use crate::manifest::PipelineManifest;
use crate::snowflake::SqlExecutor;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::info;

/// Default wait for a file to show up in the load history.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Default delay between load history polls.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Load history window searched by the checks.
pub const DEFAULT_HISTORY_HOURS: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Pass => f.write_str("PASS"),
            CheckStatus::Fail => f.write_str("FAIL"),
            CheckStatus::Skipped => f.write_str("SKIP"),
        }
    }
}

/// Result of one check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub status: CheckStatus,
    pub detail: String,
}

impl CheckOutcome {
    pub fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: CheckStatus::Pass,
            detail: detail.into(),
        }
    }

    pub fn fail(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: CheckStatus::Fail,
            detail: detail.into(),
        }
    }

    pub fn skipped(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            detail: detail.into(),
        }
    }
}

/// Inputs of a verification run
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Object path of a well-formed file uploaded to the bucket
    pub file: Option<String>,
    /// Rows that file must load
    pub expected_rows: Option<u64>,
    /// Object path of an uploaded file the pipe must reject
    pub malformed: Option<String>,
    pub timeout: Duration,
    pub interval: Duration,
    pub history_hours: u32,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            file: None,
            expected_rows: None,
            malformed: None,
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_INTERVAL,
            history_hours: DEFAULT_HISTORY_HOURS,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyReport {
    pub outcomes: Vec<CheckOutcome>,
}

impl VerifyReport {
    /// No check failed
    pub fn passed(&self) -> bool {
        !self.outcomes.iter().any(|o| o.status == CheckStatus::Fail)
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn failed_names(&self) -> Vec<&'static str> {
        self.outcomes
            .iter()
            .filter(|o| o.status == CheckStatus::Fail)
            .map(|o| o.name)
            .collect()
    }
}

/// Run every check in order
pub async fn run_checks(
    sql: &dyn SqlExecutor,
    manifest: &PipelineManifest,
    options: &VerifyOptions,
) -> Result<VerifyReport> {
    let mut report = VerifyReport::default();

    report.outcomes.push(checks::integration_identity(sql, manifest).await);
    report.outcomes.push(checks::notification_identity(sql, manifest).await);
    report.outcomes.push(checks::pipe_running(sql, manifest).await);
    report.outcomes.push(checks::ingestion(sql, manifest, options).await);
    report.outcomes.push(checks::no_duplicate_loads(sql, manifest, options.history_hours).await);
    report.outcomes.push(checks::malformed_rejected(sql, manifest, options).await);

    info!(
        passed = report.count(CheckStatus::Pass),
        failed = report.count(CheckStatus::Fail),
        skipped = report.count(CheckStatus::Skipped),
        "Verification finished"
    );

    Ok(report)
}
