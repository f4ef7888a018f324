//! Error types for GSP

use thiserror::Error;

/// Result type alias for GSP operations
pub type Result<T> = std::result::Result<T, GspError>;

/// Main error type for GSP
#[derive(Error, Debug)]
pub enum GspError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid identifier '{name}': {reason}")]
    InvalidIdentifier { name: String, reason: String },

    #[error("Invalid storage location '{location}': {reason}")]
    InvalidLocation { location: String, reason: String },

    #[error("Invalid bucket name '{name}': {reason}")]
    InvalidBucket { name: String, reason: String },

    #[error("Invalid Pub/Sub resource id '{name}': {reason}")]
    InvalidPubSubId { name: String, reason: String },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl GspError {
    pub(crate) fn identifier(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn location(location: &str, reason: impl Into<String>) -> Self {
        Self::InvalidLocation {
            location: location.to_string(),
            reason: reason.into(),
        }
    }
}
