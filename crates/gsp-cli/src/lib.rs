//! GSP CLI Library
//!
//! Provisioning and verification for a GCS → Pub/Sub → Snowpipe ingestion
//! pipeline.
//!
//! # Overview
//!
//! - **Project setup**: write a starter pipeline manifest (`gsp init`)
//! - **Provisioning**: render and apply Snowflake DDL and gcloud commands
//!   (`gsp plan`, `gsp provision`, `gsp teardown`)
//! - **Monitoring**: integrations, pipe status and load history
//!   (`gsp describe`, `gsp status`, `gsp history`)
//! - **Verification**: local CSV checks and acceptance checks against the
//!   live pipeline (`gsp validate`, `gsp verify`, `gsp sample`)
//! - **Operations**: pause, resume and refresh the pipe (`gsp pipe`)
//! - **Audit**: local hash-chained record of what was applied (`gsp audit`)

pub mod audit;
pub mod commands;
pub mod config;
pub mod csvcheck;
pub mod ddl;
pub mod error;
pub mod gcp;
pub mod gitignore;
pub mod manifest;
pub mod monitor;
pub mod plan;
pub mod progress;
pub mod sample;
pub mod snowflake;
pub mod verify;

pub use error::{CliError, Result};
pub use manifest::PipelineManifest;

use crate::config::DEFAULT_MANIFEST_FILE;
use crate::plan::PlanFormat;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// GSP - GCS to Snowpipe pipeline toolkit
#[derive(Parser, Debug)]
#[command(name = "gsp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Pipeline manifest
    #[arg(long, short = 'm', env = "GSP_MANIFEST", default_value = DEFAULT_MANIFEST_FILE, global = true)]
    pub manifest: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print the full CLI reference as Markdown
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

/// Table or JSON output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a starter gsp.yml
    Init {
        /// Project directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Project name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,

        /// GCP project that owns the bucket and Pub/Sub resources
        #[arg(long, default_value = "my-gcp-project")]
        gcp_project: String,

        /// Bucket name
        #[arg(long)]
        bucket: Option<String>,

        /// Overwrite an existing gsp.yml
        #[arg(short, long)]
        force: bool,
    },

    /// Print the provisioning plan
    Plan {
        #[arg(short, long, value_enum, default_value_t = PlanFormat::Sql)]
        format: PlanFormat,

        /// Use CREATE OR REPLACE instead of CREATE ... IF NOT EXISTS
        #[arg(long)]
        replace: bool,

        /// Show the teardown plan instead
        #[arg(long)]
        teardown: bool,

        /// With --teardown, also drop the landing table
        #[arg(long, requires = "teardown")]
        include_table: bool,
    },

    /// Create the pipeline objects and grant access
    Provision {
        /// Print the plan without executing it
        #[arg(long)]
        dry_run: bool,

        /// Recreate existing objects (pipes lose their load history)
        #[arg(long)]
        replace: bool,

        /// Only run the Snowflake steps; print gcloud commands instead
        #[arg(long)]
        skip_gcp: bool,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show integration properties and service accounts
    Describe {
        /// Integration name (defaults to both integrations in the manifest)
        #[arg(long)]
        integration: Option<String>,
    },

    /// Show the pipe status
    Status {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Show the landing table's load history
    History {
        /// History window in hours
        #[arg(long, default_value = "24")]
        hours: u32,

        /// Only entries for this object path
        #[arg(long)]
        file: Option<String>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Check CSV file(s) against the landing schema
    Validate {
        /// File or directory of *.csv files
        path: PathBuf,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Run acceptance checks against the deployed pipeline
    Verify {
        /// Object path of an uploaded well-formed file
        #[arg(long)]
        file: Option<String>,

        /// Rows the file must load
        #[arg(long, requires = "file", conflicts_with = "local")]
        expect_rows: Option<u64>,

        /// Local copy of the file; its rows are counted
        #[arg(long, requires = "file")]
        local: Option<PathBuf>,

        /// Object path of an uploaded file the pipe must reject
        #[arg(long)]
        malformed: Option<String>,

        /// Seconds to wait for files to appear in the load history
        #[arg(long, default_value = "300")]
        timeout: u64,

        /// Seconds between load history polls
        #[arg(long, default_value = "10")]
        interval: u64,

        /// Load history window in hours
        #[arg(long, default_value = "24")]
        hours: u32,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Pause, resume or refresh the pipe
    Pipe {
        #[command(subcommand)]
        command: PipeCommand,
    },

    /// Drop the Snowflake objects of the pipeline
    Teardown {
        /// Also drop the landing table and its data
        #[arg(long)]
        include_table: bool,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Write a sample landing file
    Sample {
        /// Output file
        out: PathBuf,

        /// Number of rows
        #[arg(long, default_value = "100")]
        rows: usize,

        /// First order_id
        #[arg(long, default_value = "1")]
        first_id: i64,

        /// Write a file with the wrong column count
        #[arg(long)]
        malformed: bool,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Local audit trail
    Audit {
        #[command(subcommand)]
        command: AuditCommand,
    },
}

/// Pipe operations
#[derive(Subcommand, Debug)]
pub enum PipeCommand {
    /// Stop processing notifications
    Pause,

    /// Resume processing notifications
    Resume,

    /// Queue staged files from the last 7 days that were never loaded
    Refresh {
        /// Only files under this path (relative to the stage)
        #[arg(long)]
        prefix: Option<String>,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Get configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Show all configuration
    Show,
}

/// Audit trail subcommands
#[derive(Subcommand, Debug)]
pub enum AuditCommand {
    /// List audit events
    List {
        /// Limit number of events to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Verify audit trail integrity
    Verify,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_verify() {
        let cli = Cli::try_parse_from([
            "gsp", "verify", "--file", "orders/a.csv", "--expect-rows", "25", "--timeout", "60",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Verify { file, expect_rows, timeout, .. }) => {
                assert_eq!(file.as_deref(), Some("orders/a.csv"));
                assert_eq!(expect_rows, Some(25));
                assert_eq!(timeout, 60);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_expect_rows_conflicts_with_local() {
        let result = Cli::try_parse_from([
            "gsp", "verify", "--file", "a.csv", "--expect-rows", "1", "--local", "a.csv",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_include_table_requires_teardown() {
        assert!(Cli::try_parse_from(["gsp", "plan", "--include-table"]).is_err());
        assert!(Cli::try_parse_from(["gsp", "plan", "--teardown", "--include-table"]).is_ok());
    }
}
