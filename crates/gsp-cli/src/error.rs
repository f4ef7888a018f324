//! Error types for the GSP CLI
//!
//! Every variant is user-facing: the message says what went wrong and what
//! to try next.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Comprehensive error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your GSP_* environment variables or config file.")]
    Config(String),

    /// Pipeline manifest (gsp.yml) has invalid format or content
    #[error("Invalid manifest (gsp.yml): {0}. Run 'gsp init' to create a valid manifest.")]
    InvalidManifest(String),

    /// Required file is missing
    #[error("File not found: '{0}'. Verify the file path exists and you have read permissions.")]
    FileNotFound(String),

    /// Manifest already present
    #[error("Project already initialized: {0}. Use --force to overwrite.")]
    AlreadyInitialized(String),

    /// Snowflake rejected a statement or the SQL API returned an error body
    #[error("Snowflake error {code}: {message}")]
    Snowflake { code: String, message: String },

    /// Statement did not finish before the client deadline
    #[error("Statement {handle} did not complete within {secs}s. Raise GSP_STATEMENT_TIMEOUT_SECS or check the warehouse.")]
    StatementTimeout { handle: String, secs: u64 },

    /// A gcloud invocation exited unsuccessfully
    #[error("gcloud command failed ({status}): {command}\n{stderr}")]
    Gcloud {
        command: String,
        status: String,
        stderr: String,
    },

    /// Landing file does not match the table schema
    #[error("Validation failed: {0}")]
    Validation(String),

    /// One or more acceptance checks failed
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    /// A rendered statement did not parse
    #[error("Generated SQL is invalid: {0}")]
    InvalidSql(String),

    /// Audit trail operation failed
    #[error("Audit trail error: {0}")]
    Audit(String),

    /// Operator declined a confirmation prompt
    #[error("Aborted by user")]
    Aborted,

    /// Naming or schema problem reported by the common crate
    #[error(transparent)]
    Common(#[from] gsp_common::GspError),

    /// Audit database operation failed (rusqlite)
    #[error("Audit database error: {0}")]
    AuditDb(#[from] rusqlite::Error),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("Network request failed: {0}. Check your network connection and Snowflake account URL.")]
    Http(#[from] reqwest::Error),

    /// YAML parsing failed
    #[error("Failed to parse YAML: {0}. Check the file syntax at the indicated line/column.")]
    YamlParse(#[from] serde_yaml::Error),

    /// TOML parsing failed
    #[error("Failed to parse config file: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// CSV reading failed
    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid manifest error
    pub fn invalid_manifest(msg: impl Into<String>) -> Self {
        Self::InvalidManifest(msg.into())
    }

    /// Create a Snowflake error
    pub fn snowflake(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Snowflake {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create an audit error
    pub fn audit(msg: impl Into<String>) -> Self {
        Self::Audit(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_actionable() {
        let err = CliError::invalid_manifest("snowflake.pipe is missing");
        assert!(err.to_string().contains("gsp init"));

        let err = CliError::StatementTimeout {
            handle: "01b2-abc".to_string(),
            secs: 60,
        };
        assert!(err.to_string().contains("GSP_STATEMENT_TIMEOUT_SECS"));
    }

    #[test]
    fn test_snowflake_error_display() {
        let err = CliError::snowflake("002003", "Object 'SNOW_STAGE' does not exist");
        assert_eq!(
            err.to_string(),
            "Snowflake error 002003: Object 'SNOW_STAGE' does not exist"
        );
    }
}
