//! Snowflake SQL API access

pub mod client;
pub mod endpoints;
pub mod types;

pub use client::SnowflakeClient;
pub use types::ResultSet;

use crate::error::Result;
use async_trait::async_trait;

/// Executes one SQL statement and returns its rows
///
/// Implemented by [`SnowflakeClient`]; monitoring, provisioning and
/// verification only depend on this trait.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<ResultSet>;
}
