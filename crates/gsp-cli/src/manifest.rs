//! Pipeline manifest handling (gsp.yml)
//!
//! The manifest names every object the pipeline is made of: the bucket and
//! Pub/Sub resources on the GCP side, and the table, integrations, stage and
//! pipe on the Snowflake side.

use crate::error::{CliError, Result};
use gsp_common::names::{self, GcsLocation, Identifier};
use gsp_common::types::{LandingSchema, DEFAULT_LANDING_TABLE};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// GSP pipeline manifest (gsp.yml)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineManifest {
    pub project: ProjectMetadata,
    pub gcp: GcpSection,
    pub snowflake: SnowflakeSection,
}

/// Project metadata section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectMetadata {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// GCP resources: bucket, notification topic and subscription
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GcpSection {
    pub project_id: String,
    pub bucket: String,

    /// Path inside the bucket that the stage and notifications are scoped to
    #[serde(default)]
    pub prefix: String,

    pub topic: String,
    pub subscription: String,
}

/// Snowflake objects
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnowflakeSection {
    pub database: Identifier,
    pub schema: Identifier,
    pub table: Identifier,
    pub storage_integration: Identifier,
    pub notification_integration: Identifier,
    pub stage: Identifier,
    pub pipe: Identifier,

    #[serde(default)]
    pub file_format: FileFormat,
}

/// CSV file format options of the pipe's COPY statement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileFormat {
    #[serde(rename = "type", default = "default_format_type")]
    pub format_type: String,

    #[serde(default)]
    pub skip_header: u32,

    #[serde(default = "default_delimiter")]
    pub field_delimiter: String,
}

fn default_format_type() -> String {
    "CSV".to_string()
}

fn default_delimiter() -> String {
    ",".to_string()
}

impl Default for FileFormat {
    fn default() -> Self {
        Self {
            format_type: default_format_type(),
            skip_header: 0,
            field_delimiter: default_delimiter(),
        }
    }
}

impl FileFormat {
    /// Delimiter as a single byte for the csv reader
    pub fn delimiter_byte(&self) -> Result<u8> {
        match self.field_delimiter.as_bytes() {
            [b] => Ok(*b),
            _ => Err(CliError::invalid_manifest(format!(
                "snowflake.file_format.field_delimiter must be a single ASCII character, got '{}'",
                self.field_delimiter
            ))),
        }
    }
}

impl PipelineManifest {
    /// Starter manifest mirroring the reference deployment
    pub fn new(name: impl Into<String>, gcp_project: impl Into<String>) -> Result<Self> {
        Ok(Self {
            project: ProjectMetadata {
                name: name.into(),
                description: None,
            },
            gcp: GcpSection {
                project_id: gcp_project.into(),
                bucket: "snowpipe-orders".to_string(),
                prefix: String::new(),
                topic: "snowpipe-orders-topic".to_string(),
                subscription: "snowpipe-orders-sub".to_string(),
            },
            snowflake: SnowflakeSection {
                database: Identifier::new("ORDERS_DB")?,
                schema: Identifier::new("PUBLIC")?,
                table: Identifier::new(DEFAULT_LANDING_TABLE)?,
                storage_integration: Identifier::new("gcs_bucket_read_int")?,
                notification_integration: Identifier::new("notification_from_pubsub_int")?,
                stage: Identifier::new("snow_stage")?,
                pipe: Identifier::new("gcs_to_snowflake_pipe")?,
                file_format: FileFormat::default(),
            },
        })
    }

    /// Load and validate a manifest
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CliError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let manifest: PipelineManifest = serde_yaml::from_str(&content)
            .map_err(|e| CliError::invalid_manifest(format!("Failed to parse YAML: {}", e)))?;
        manifest.validate()?;

        Ok(manifest)
    }

    /// Save manifest to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the fields that serde cannot check on its own
    ///
    /// Snowflake identifiers are validated while deserializing.
    pub fn validate(&self) -> Result<()> {
        if self.project.name.trim().is_empty() {
            return Err(CliError::invalid_manifest("project.name cannot be empty"));
        }
        if self.gcp.project_id.trim().is_empty() {
            return Err(CliError::invalid_manifest("gcp.project_id cannot be empty"));
        }

        names::validate_bucket_name(&self.gcp.bucket)
            .map_err(|e| CliError::invalid_manifest(format!("gcp.bucket: {}", e)))?;
        names::validate_pubsub_id(&self.gcp.topic)
            .map_err(|e| CliError::invalid_manifest(format!("gcp.topic: {}", e)))?;
        names::validate_pubsub_id(&self.gcp.subscription)
            .map_err(|e| CliError::invalid_manifest(format!("gcp.subscription: {}", e)))?;

        if self.gcp.prefix.starts_with('/') {
            return Err(CliError::invalid_manifest(
                "gcp.prefix is relative to the bucket and cannot start with '/'",
            ));
        }

        if !self
            .snowflake
            .file_format
            .format_type
            .eq_ignore_ascii_case("CSV")
        {
            return Err(CliError::invalid_manifest(format!(
                "snowflake.file_format.type '{}' is not supported; only CSV landing files are",
                self.snowflake.file_format.format_type
            )));
        }
        self.snowflake.file_format.delimiter_byte()?;

        Ok(())
    }

    /// The bucket path the stage points at and the integration allows
    pub fn location(&self) -> Result<GcsLocation> {
        Ok(GcsLocation::new(self.gcp.bucket.clone(), &self.gcp.prefix)?)
    }

    /// `gcs://bucket/prefix/` URL used by the stage
    pub fn stage_url(&self) -> Result<String> {
        Ok(self.location()?.snowflake_url())
    }

    /// `projects/<project>/subscriptions/<subscription>`
    pub fn subscription_path(&self) -> String {
        format!(
            "projects/{}/subscriptions/{}",
            self.gcp.project_id, self.gcp.subscription
        )
    }

    /// `projects/<project>/topics/<topic>`
    pub fn topic_path(&self) -> String {
        format!("projects/{}/topics/{}", self.gcp.project_id, self.gcp.topic)
    }

    fn qualified(&self, name: &Identifier) -> String {
        Identifier::qualify(&[&self.snowflake.database, &self.snowflake.schema, name])
    }

    /// `DATABASE.SCHEMA.TABLE`
    pub fn table_fqn(&self) -> String {
        self.qualified(&self.snowflake.table)
    }

    /// `DATABASE.SCHEMA.STAGE`
    pub fn stage_fqn(&self) -> String {
        self.qualified(&self.snowflake.stage)
    }

    /// `DATABASE.SCHEMA.PIPE`
    pub fn pipe_fqn(&self) -> String {
        self.qualified(&self.snowflake.pipe)
    }

    /// Landing schema of the target table
    pub fn landing_schema(&self) -> LandingSchema {
        LandingSchema::orders()
    }
}
