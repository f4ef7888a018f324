//! Wraps an operation with start / success / failure audit events

use crate::audit::logger::AuditLogger;
use crate::audit::types::{AuditEvent, EventType};
use crate::error::Result;
use serde_json::{json, Value as JsonValue};
use std::future::Future;
use std::time::Instant;
use tracing::warn;

/// Run `operation`, recording a start event and then its outcome
///
/// Failing to record the outcome is logged but never masks the
/// operation's own result.
pub async fn execute_with_audit<F, Fut, T>(
    audit: &dyn AuditLogger,
    start: EventType,
    success: EventType,
    failure: EventType,
    object: Option<String>,
    start_details: JsonValue,
    operation: F,
) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    audit
        .log_event(AuditEvent::new(start, object.clone(), start_details, audit.machine_id()))
        .await?;

    let started = Instant::now();
    let result = operation().await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let outcome = match &result {
        Ok(_) => AuditEvent::new(
            success,
            object,
            json!({"status": "success", "elapsed_ms": elapsed_ms}),
            audit.machine_id(),
        ),
        Err(e) => AuditEvent::new(
            failure,
            object,
            json!({"status": "failure", "error": e.to_string(), "elapsed_ms": elapsed_ms}),
            audit.machine_id(),
        ),
    };

    if let Err(e) = audit.log_event(outcome).await {
        warn!(error = %e, "Failed to record audit outcome");
    }

    result
}

/// Record a single event, logging instead of failing
pub async fn record(audit: &dyn AuditLogger, event_type: EventType, object: Option<String>, details: JsonValue) {
    let event = AuditEvent::new(event_type, object, details, audit.machine_id());
    if let Err(e) = audit.log_event(event).await {
        warn!(error = %e, event_type = %event_type, "Failed to record audit event");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::audit::logger::LocalAuditLogger;
    use crate::error::CliError;

    #[tokio::test]
    async fn test_success_records_two_events() {
        let logger = LocalAuditLogger::new_in_memory("m").unwrap();
        let value = execute_with_audit(
            &logger,
            EventType::ProvisionStart,
            EventType::ProvisionSuccess,
            EventType::ProvisionFailure,
            Some("orders-ingest".to_string()),
            json!({"steps": 8}),
            || async { Ok(8) },
        )
        .await
        .unwrap();
        assert_eq!(value, 8);

        let events = logger.recent_events(10).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::ProvisionSuccess);
        assert_eq!(events[1].details["steps"], 8);
    }

    #[tokio::test]
    async fn test_failure_records_error() {
        let logger = LocalAuditLogger::new_in_memory("m").unwrap();
        let result: Result<()> = execute_with_audit(
            &logger,
            EventType::ProvisionStart,
            EventType::ProvisionSuccess,
            EventType::ProvisionFailure,
            None,
            json!({}),
            || async { Err(CliError::snowflake("003001", "Insufficient privileges")) },
        )
        .await;
        assert!(result.is_err());

        let events = logger.recent_events(1).await.unwrap();
        assert_eq!(events[0].event_type, EventType::ProvisionFailure);
        assert!(events[0].details["error"].as_str().unwrap().contains("Insufficient privileges"));
        assert!(logger.verify_integrity().await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn test_record() {
        let logger = LocalAuditLogger::new_in_memory("m").unwrap();
        record(&logger, EventType::PipePaused, Some("p".to_string()), json!({})).await;
        assert_eq!(logger.recent_events(5).await.unwrap().len(), 1);
    }
}
