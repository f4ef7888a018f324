//! `SYSTEM$PIPE_STATUS` output

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipe execution state as reported by Snowflake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExecutionState {
    Running,
    Paused,
    /// `STOPPED_*`: the pipe will not resume on its own
    Stopped(String),
    /// `STALLED_*`: Snowflake is retrying after an error
    Stalled(String),
    Other(String),
}

impl From<String> for ExecutionState {
    fn from(s: String) -> Self {
        let upper = s.to_ascii_uppercase();
        match upper.as_str() {
            "RUNNING" => ExecutionState::Running,
            "PAUSED" => ExecutionState::Paused,
            _ if upper.starts_with("STOPPED_") => ExecutionState::Stopped(upper),
            _ if upper.starts_with("STALLED_") => ExecutionState::Stalled(upper),
            _ => ExecutionState::Other(s),
        }
    }
}

impl From<ExecutionState> for String {
    fn from(state: ExecutionState) -> Self {
        state.to_string()
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionState::Running => f.write_str("RUNNING"),
            ExecutionState::Paused => f.write_str("PAUSED"),
            ExecutionState::Stopped(s) | ExecutionState::Stalled(s) | ExecutionState::Other(s) => {
                f.write_str(s)
            }
        }
    }
}

/// Parsed `SYSTEM$PIPE_STATUS` document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipeStatus {
    pub execution_state: ExecutionState,

    #[serde(default)]
    pub pending_file_count: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_ingested_timestamp: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_ingested_file_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_channel_name: Option<String>,

    #[serde(default)]
    pub num_outstanding_messages_on_channel: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_received_message_timestamp: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_forwarded_message_timestamp: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
}

impl PipeStatus {
    /// Parse the JSON string returned by `SYSTEM$PIPE_STATUS`
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            CliError::snowflake("", format!("Unexpected SYSTEM$PIPE_STATUS output ({}): {}", e, json))
        })
    }

    pub fn is_running(&self) -> bool {
        self.execution_state == ExecutionState::Running
    }

    /// Human-readable problem, if Snowflake reported one
    pub fn problem(&self) -> Option<&str> {
        self.error.as_deref().or(self.fault.as_deref())
    }
}
