//! `gsp plan` command implementation
//!
//! Prints the provisioning (or teardown) plan without touching anything.

use crate::commands::load_manifest;
use crate::config::Config;
use crate::ddl::CreateMode;
use crate::error::Result;
use crate::plan::{PlanFormat, ProvisioningPlan};
use std::path::Path;

pub async fn run(
    manifest_path: &Path,
    format: PlanFormat,
    replace: bool,
    teardown: bool,
    include_table: bool,
) -> Result<()> {
    let manifest = load_manifest(manifest_path)?;
    let config = Config::load()?;

    let plan = if teardown {
        ProvisioningPlan::teardown(&manifest, include_table)
    } else {
        ProvisioningPlan::from_manifest(&manifest, create_mode(replace))?
    };

    print!("{}", plan.render(format, &config.gcloud_bin)?);
    Ok(())
}

pub(crate) fn create_mode(replace: bool) -> CreateMode {
    if replace {
        CreateMode::OrReplace
    } else {
        CreateMode::IfNotExists
    }
}
