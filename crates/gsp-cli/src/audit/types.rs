//! Audit event types

use chrono::{DateTime, Utc};
use gsp_common::checksum::sha256_hex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ProvisionStart,
    /// One plan step applied
    StepApplied,
    ProvisionSuccess,
    ProvisionFailure,
    PipePaused,
    PipeResumed,
    PipeRefreshed,
    VerifyRun,
    Teardown,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ProvisionStart => "provision_start",
            EventType::StepApplied => "step_applied",
            EventType::ProvisionSuccess => "provision_success",
            EventType::ProvisionFailure => "provision_failure",
            EventType::PipePaused => "pipe_paused",
            EventType::PipeResumed => "pipe_resumed",
            EventType::PipeRefreshed => "pipe_refreshed",
            EventType::VerifyRun => "verify_run",
            EventType::Teardown => "teardown",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(JsonValue::String(s.to_string()))
            .map_err(|_| format!("unknown audit event type '{}'", s))
    }
}

/// One row of the audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Assigned by the database
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    pub timestamp: DateTime<Utc>,

    pub event_type: EventType,

    /// Object acted on, e.g. `ORDERS_DB.PUBLIC.gcs_to_snowflake_pipe`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,

    pub details: JsonValue,

    pub machine_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_hash: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<String>,
}

impl AuditEvent {
    pub fn new(
        event_type: EventType,
        object: Option<String>,
        details: JsonValue,
        machine_id: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            timestamp: Utc::now(),
            event_type,
            object,
            details,
            machine_id: machine_id.into(),
            event_hash: None,
            previous_hash: None,
        }
    }

    /// Chain hash over id, timestamp, type, object and the previous hash
    pub fn compute_hash(&self) -> String {
        let data = format!(
            "{}|{}|{}|{}|{}",
            self.id.unwrap_or(0),
            self.timestamp.to_rfc3339(),
            self.event_type.as_str(),
            self.object.as_deref().unwrap_or_default(),
            self.previous_hash.as_deref().unwrap_or_default()
        );
        sha256_hex(data.as_bytes())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_type_round_trip() {
        assert_eq!(EventType::PipeRefreshed.as_str(), "pipe_refreshed");
        assert_eq!("step_applied".parse::<EventType>().unwrap(), EventType::StepApplied);
        assert!("download_start".parse::<EventType>().is_err());
    }

    #[test]
    fn test_hash_depends_on_chain() {
        let mut event = AuditEvent::new(
            EventType::StepApplied,
            Some("ORDERS_DB.PUBLIC.orders_data_lz".to_string()),
            json!({"kind": "table"}),
            "host-1234abcd",
        );
        event.id = Some(1);
        let first = event.compute_hash();
        assert_eq!(first.len(), 64);
        assert_eq!(first, event.compute_hash());

        event.previous_hash = Some("00".repeat(32));
        assert_ne!(first, event.compute_hash());
    }
}
