//! GSP Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, naming rules, and error handling for the GCS → Pub/Sub →
//! Snowpipe provisioning toolkit.
//!
//! # Overview
//!
//! - **Error Handling**: [`GspError`] and the crate [`Result`] alias
//! - **Landing schema**: the `orders_data_lz` table as a value ([`types::LandingSchema`])
//! - **Names**: validated Snowflake identifiers and GCS locations ([`names`])
//! - **Checksums**: SHA-256 fingerprints for files headed to the bucket
//! - **Logging**: tracing subscriber setup shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use gsp_common::names::GcsLocation;
//! use gsp_common::types::LandingSchema;
//!
//! fn describe() -> gsp_common::Result<()> {
//!     let location: GcsLocation = "gcs://snowpipe-orders/orders/".parse()?;
//!     let schema = LandingSchema::orders();
//!     println!("{} columns land from {}", schema.width(), location);
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod names;
pub mod types;

// Re-export commonly used types
pub use error::{GspError, Result};
