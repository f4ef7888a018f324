//! `gsp init` command implementation
//!
//! Writes a starter manifest and creates the local state directory.

use crate::audit;
use crate::config::DEFAULT_MANIFEST_FILE;
use crate::error::{CliError, Result};
use crate::gitignore;
use crate::manifest::PipelineManifest;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Initialize a new pipeline project
pub async fn run(
    path: PathBuf,
    name: Option<String>,
    gcp_project: String,
    bucket: Option<String>,
    force: bool,
) -> Result<()> {
    let manifest_path = init_project(&path, name, gcp_project, bucket, force)?;
    let manifest = PipelineManifest::load(&manifest_path)?;

    println!("{} Initialized pipeline project: {}", "✓".green().bold(), manifest.project.name);
    println!("  Created: {}", DEFAULT_MANIFEST_FILE);
    println!("  Created: {}/ (audit trail)", audit::STATE_DIR);
    println!();
    println!("Next steps:");
    println!("  1. Edit {} with your bucket, project and Snowflake names", DEFAULT_MANIFEST_FILE);
    println!("  2. Review the plan:  gsp plan");
    println!("  3. Apply it:         gsp provision");

    Ok(())
}

/// Create the project files; returns the manifest path
fn init_project(
    project_dir: &Path,
    name: Option<String>,
    gcp_project: String,
    bucket: Option<String>,
    force: bool,
) -> Result<PathBuf> {
    if !project_dir.exists() {
        fs::create_dir_all(project_dir)?;
    }

    let manifest_path = project_dir.join(DEFAULT_MANIFEST_FILE);
    if manifest_path.exists() && !force {
        return Err(CliError::AlreadyInitialized(format!(
            "{} already exists",
            manifest_path.display()
        )));
    }

    let project_name = name.unwrap_or_else(|| default_project_name(project_dir));

    let mut manifest = PipelineManifest::new(project_name, gcp_project)?;
    if let Some(bucket) = bucket {
        manifest.gcp.bucket = bucket;
    }
    manifest.validate()?;
    manifest.save(&manifest_path)?;

    // Creates .gsp/, the machine id and the audit database.
    audit::open_for_manifest(&manifest_path)?;
    gitignore::update_gitignore(project_dir)?;

    info!(path = %manifest_path.display(), "Initialized project");
    Ok(manifest_path)
}

fn default_project_name(project_dir: &Path) -> String {
    project_dir
        .canonicalize()
        .ok()
        .as_deref()
        .unwrap_or(project_dir)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("orders-ingest")
        .to_string()
}
