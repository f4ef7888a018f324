//! `gsp describe` command implementation

use crate::commands::{connect, load_manifest, new_table};
use crate::config::Config;
use crate::error::Result;
use crate::monitor::{self, IntegrationDescription};
use crate::snowflake::SqlExecutor;
use colored::Colorize;
use comfy_table::Cell;
use gsp_common::names::Identifier;
use std::path::Path;

/// Describe one integration, or both integrations of the manifest
pub async fn run(manifest_path: &Path, integration: Option<String>) -> Result<()> {
    let manifest = load_manifest(manifest_path)?;
    let config = Config::load()?;
    let sql = connect(&config, &manifest)?;

    let names = match integration {
        Some(name) => vec![Identifier::new(name)?],
        None => vec![
            manifest.snowflake.storage_integration.clone(),
            manifest.snowflake.notification_integration.clone(),
        ],
    };

    for description in describe_all(&sql, &names).await? {
        print_description(&description);
    }
    Ok(())
}

async fn describe_all(sql: &dyn SqlExecutor, names: &[Identifier]) -> Result<Vec<IntegrationDescription>> {
    let mut descriptions = Vec::with_capacity(names.len());
    for name in names {
        descriptions.push(monitor::describe_integration(sql, name).await?);
    }
    Ok(descriptions)
}

fn print_description(description: &IntegrationDescription) {
    println!("{} {}", "Integration:".bold(), description.name);

    let mut table = new_table();
    table.set_header(vec!["Property", "Value"]);
    for property in &description.properties {
        table.add_row(vec![
            Cell::new(&property.property),
            Cell::new(property.value.as_deref().unwrap_or("")),
        ]);
    }
    println!("{}", table);

    match description.service_account() {
        Some(sa) => println!("  {} Service account: {}", "→".cyan(), sa.green()),
        None => println!("  {} No service account reported", "!".yellow().bold()),
    }
    println!();
}
