//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function. Commands that
//! talk to Snowflake split into `run` (wiring: config, client, audit trail)
//! and an inner function over the [`crate::snowflake::SqlExecutor`] seam.

pub mod audit;
pub mod config;
pub mod describe;
pub mod history;
pub mod init;
pub mod pipe;
pub mod plan;
pub mod provision;
pub mod sample;
pub mod status;
pub mod teardown;
pub mod validate;
pub mod verify;

use crate::config::Config;
use crate::error::Result;
use crate::manifest::PipelineManifest;
use crate::snowflake::SnowflakeClient;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::debug;

/// Load the manifest a command operates on
pub(crate) fn load_manifest(path: &Path) -> Result<PipelineManifest> {
    let manifest = PipelineManifest::load(path)?;
    debug!(path = %path.display(), project = %manifest.project.name, "Loaded manifest");
    Ok(manifest)
}

/// SQL API client with the manifest's database and schema as context
pub(crate) fn connect(config: &Config, manifest: &PipelineManifest) -> Result<SnowflakeClient> {
    Ok(SnowflakeClient::from_config(config)?.with_context(
        manifest.snowflake.database.as_str(),
        manifest.snowflake.schema.as_str(),
    ))
}

/// Ask a yes/no question on the terminal; anything but y/yes is no
pub(crate) fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N]: ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

pub(crate) fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).apply_modifier(UTF8_ROUND_CORNERS);
    table
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
        assert!(!is_yes("yeah"));
    }
}
