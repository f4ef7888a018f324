//! Individual acceptance checks

use super::{CheckOutcome, VerifyOptions};
use crate::manifest::PipelineManifest;
use crate::monitor::{self, CopyHistory, CopyHistoryEntry, LoadStatus};
use crate::snowflake::SqlExecutor;
use tokio::time::Instant;
use tracing::debug;

/// The storage integration exposes the service account Snowflake reads with
pub async fn integration_identity(sql: &dyn SqlExecutor, manifest: &PipelineManifest) -> CheckOutcome {
    const NAME: &str = "integration_identity";
    let integration = &manifest.snowflake.storage_integration;

    match monitor::describe_integration(sql, integration).await {
        Ok(desc) => match desc.storage_service_account() {
            Some(sa) => CheckOutcome::pass(NAME, format!("{} uses {}", integration, sa)),
            None => CheckOutcome::fail(
                NAME,
                format!("{} has no STORAGE_GCP_SERVICE_ACCOUNT", integration),
            ),
        },
        Err(e) => CheckOutcome::fail(NAME, e.to_string()),
    }
}

/// The notification integration exposes its Pub/Sub service account
pub async fn notification_identity(sql: &dyn SqlExecutor, manifest: &PipelineManifest) -> CheckOutcome {
    const NAME: &str = "notification_identity";
    let integration = &manifest.snowflake.notification_integration;

    match monitor::describe_integration(sql, integration).await {
        Ok(desc) => match desc.pubsub_service_account() {
            Some(sa) => CheckOutcome::pass(NAME, format!("{} uses {}", integration, sa)),
            None => CheckOutcome::fail(
                NAME,
                format!("{} has no GCP_PUBSUB_SERVICE_ACCOUNT", integration),
            ),
        },
        Err(e) => CheckOutcome::fail(NAME, e.to_string()),
    }
}

/// The pipe reports `RUNNING`
pub async fn pipe_running(sql: &dyn SqlExecutor, manifest: &PipelineManifest) -> CheckOutcome {
    const NAME: &str = "pipe_running";

    match monitor::fetch_pipe_status(sql, manifest).await {
        Ok(status) if status.is_running() => CheckOutcome::pass(
            NAME,
            format!("{} pending file(s)", status.pending_file_count),
        ),
        Ok(status) => {
            let mut detail = format!("execution state is {}", status.execution_state);
            if let Some(problem) = status.problem() {
                detail.push_str(&format!(": {}", problem));
            }
            CheckOutcome::fail(NAME, detail)
        }
        Err(e) => CheckOutcome::fail(NAME, e.to_string()),
    }
}

/// Poll the load history until `accept` decides on the file's entries
///
/// `accept` returns `None` while the file is not settled yet.
async fn poll_history<F>(
    sql: &dyn SqlExecutor,
    manifest: &PipelineManifest,
    file: &str,
    options: &VerifyOptions,
    mut accept: F,
) -> std::result::Result<CheckOutcome, String>
where
    F: FnMut(&[&CopyHistoryEntry]) -> Option<CheckOutcome>,
{
    let deadline = Instant::now() + options.timeout;

    loop {
        let history: CopyHistory = monitor::fetch_copy_history(sql, manifest, options.history_hours)
            .await
            .map_err(|e| e.to_string())?;
        let entries: Vec<&CopyHistoryEntry> = history.for_file(file).collect();
        debug!(file = %file, entries = entries.len(), "Polled load history");

        if let Some(outcome) = accept(&entries) {
            return Ok(outcome);
        }

        if Instant::now() + options.interval > deadline {
            return Err(format!(
                "{} did not settle in COPY_HISTORY within {}s",
                file,
                options.timeout.as_secs()
            ));
        }
        tokio::time::sleep(options.interval).await;
    }
}

/// A well-formed file loads once with the expected row count
pub async fn ingestion(
    sql: &dyn SqlExecutor,
    manifest: &PipelineManifest,
    options: &VerifyOptions,
) -> CheckOutcome {
    const NAME: &str = "ingestion";

    let Some(file) = options.file.as_deref() else {
        return CheckOutcome::skipped(NAME, "no --file given");
    };
    let expected = options.expected_rows;

    // History is newest first; a re-upload after a failed attempt settles
    // on its own entry.
    let result = poll_history(sql, manifest, file, options, |entries| {
        let entry = entries.first()?;
        match entry.status {
            LoadStatus::LoadFailed | LoadStatus::PartiallyLoaded => Some(CheckOutcome::fail(
                NAME,
                format!(
                    "{} is {}: {}",
                    entry.file_name,
                    entry.status,
                    entry.first_error_message.as_deref().unwrap_or("no error message")
                ),
            )),
            LoadStatus::Loaded => Some(match expected {
                Some(rows) if entry.row_count != rows => CheckOutcome::fail(
                    NAME,
                    format!("{} loaded {} rows, expected {}", entry.file_name, entry.row_count, rows),
                ),
                _ => CheckOutcome::pass(NAME, format!("{} loaded {} rows", entry.file_name, entry.row_count)),
            }),
            LoadStatus::LoadSkipped | LoadStatus::Unknown(_) => None,
        }
    })
    .await;

    result.unwrap_or_else(|detail| CheckOutcome::fail(NAME, detail))
}

/// No file path was loaded twice with the same row count
pub async fn no_duplicate_loads(sql: &dyn SqlExecutor, manifest: &PipelineManifest, hours: u32) -> CheckOutcome {
    const NAME: &str = "no_duplicate_loads";

    match monitor::fetch_copy_history(sql, manifest, hours).await {
        Ok(history) => {
            let duplicates = history.duplicate_loads();
            if duplicates.is_empty() {
                CheckOutcome::pass(
                    NAME,
                    format!("{} load(s) in the last {}h, none repeated", history.successful_loads().count(), hours),
                )
            } else {
                let files: Vec<String> = duplicates
                    .iter()
                    .map(|(file, n)| format!("{} ({}x)", file, n))
                    .collect();
                CheckOutcome::fail(
                    NAME,
                    format!(
                        "same path loaded more than once with equal row counts (contents may differ): {}",
                        files.join(", ")
                    ),
                )
            }
        }
        Err(e) => CheckOutcome::fail(NAME, e.to_string()),
    }
}

/// A malformed file loads zero rows and records an error
pub async fn malformed_rejected(
    sql: &dyn SqlExecutor,
    manifest: &PipelineManifest,
    options: &VerifyOptions,
) -> CheckOutcome {
    const NAME: &str = "malformed_rejected";

    let Some(file) = options.malformed.as_deref() else {
        return CheckOutcome::skipped(NAME, "no --malformed given");
    };

    let result = poll_history(sql, manifest, file, options, |entries| {
        let entry = entries.first()?;
        let rejected = match entry.status {
            LoadStatus::LoadFailed => true,
            LoadStatus::PartiallyLoaded => entry.row_count == 0,
            _ => false,
        };
        let error = entry.first_error_message.as_deref().unwrap_or_default();

        Some(if rejected && entry.row_count == 0 && !error.is_empty() {
            CheckOutcome::pass(NAME, format!("{} rejected: {}", entry.file_name, error))
        } else {
            CheckOutcome::fail(
                NAME,
                format!(
                    "{} is {} with {} row(s) loaded",
                    entry.file_name, entry.status, entry.row_count
                ),
            )
        })
    })
    .await;

    result.unwrap_or_else(|detail| CheckOutcome::fail(NAME, detail))
}
