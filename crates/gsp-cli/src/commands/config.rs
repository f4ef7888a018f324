//! `gsp config` command implementation
//!
//! Shows the effective configuration (defaults < config file < environment).
//! The token is always masked.

use crate::config::Config;
use crate::error::{CliError, Result};
use colored::Colorize;

const KEYS: [(&str, &str); 7] = [
    ("snowflake_url", "GSP_SNOWFLAKE_URL / GSP_SNOWFLAKE_ACCOUNT"),
    ("token", "GSP_SNOWFLAKE_TOKEN"),
    ("token_type", "GSP_SNOWFLAKE_TOKEN_TYPE"),
    ("role", "GSP_SNOWFLAKE_ROLE"),
    ("warehouse", "GSP_SNOWFLAKE_WAREHOUSE"),
    ("statement_timeout_secs", "GSP_STATEMENT_TIMEOUT_SECS"),
    ("gcloud_bin", "GSP_GCLOUD_BIN"),
];

/// Get configuration value
pub async fn get(key: &str) -> Result<()> {
    let config = Config::load()?;
    println!("{}", value_of(&config, key)?);
    Ok(())
}

/// Show all configuration
pub async fn show() -> Result<()> {
    let config = Config::load()?;

    println!("{}", "GSP Configuration:".cyan().bold());
    println!();
    for (key, _) in KEYS {
        println!("{:<24} {}", format!("{}:", key), value_of(&config, key)?);
    }
    println!(
        "{:<24} {}",
        "config_file:",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string())
    );
    println!();
    println!("{}", "Environment Variables:".cyan());
    for (key, env) in KEYS {
        println!("  {:<24} {}", key, env);
    }

    Ok(())
}

fn value_of(config: &Config, key: &str) -> Result<String> {
    let unset = || "(not set)".to_string();
    Ok(match key {
        "snowflake_url" => config.snowflake_url.clone().unwrap_or_else(unset),
        "token" => config.masked_token(),
        "token_type" => config.token_type.header_value().to_string(),
        "role" => config.role.clone().unwrap_or_else(unset),
        "warehouse" => config.warehouse.clone().unwrap_or_else(unset),
        "statement_timeout_secs" => config.statement_timeout_secs.to_string(),
        "gcloud_bin" => config.gcloud_bin.clone(),
        _ => {
            let known: Vec<&str> = KEYS.iter().map(|(k, _)| *k).collect();
            return Err(CliError::config(format!(
                "Unknown config key '{}' (known keys: {})",
                key,
                known.join(", ")
            )));
        }
    })
}
