//! Configuration management for the GSP CLI
//!
//! Connection settings for the Snowflake SQL API and the gcloud binary.
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. TOML file (`GSP_CONFIG`, else `<config_dir>/gsp/config.toml` if present)
//! 3. `GSP_*` environment variables (a `.env` file is loaded by `main`)

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ============================================================================
// CLI Configuration Constants
// ============================================================================

/// Default per-statement timeout sent to Snowflake and used as the client deadline.
pub const DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 60;

/// Default gcloud executable.
pub const DEFAULT_GCLOUD_BIN: &str = "gcloud";

/// Default pipeline manifest file name.
pub const DEFAULT_MANIFEST_FILE: &str = "gsp.yml";

/// Authentication scheme of the bearer token sent to the SQL API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    #[default]
    KeypairJwt,
    Oauth,
    ProgrammaticAccessToken,
}

impl TokenType {
    /// Value of the `X-Snowflake-Authorization-Token-Type` header
    pub fn header_value(&self) -> &'static str {
        match self {
            TokenType::KeypairJwt => "KEYPAIR_JWT",
            TokenType::Oauth => "OAUTH",
            TokenType::ProgrammaticAccessToken => "PROGRAMMATIC_ACCESS_TOKEN",
        }
    }
}

impl FromStr for TokenType {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "KEYPAIR_JWT" | "JWT" => Ok(TokenType::KeypairJwt),
            "OAUTH" => Ok(TokenType::Oauth),
            "PROGRAMMATIC_ACCESS_TOKEN" | "PAT" => Ok(TokenType::ProgrammaticAccessToken),
            _ => Err(CliError::config(format!(
                "Unknown token type '{}' (expected KEYPAIR_JWT, OAUTH or PROGRAMMATIC_ACCESS_TOKEN)",
                s
            ))),
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_value())
    }
}

/// Shape of the optional TOML config file; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    snowflake_url: Option<String>,
    snowflake_account: Option<String>,
    token: Option<String>,
    token_type: Option<String>,
    role: Option<String>,
    warehouse: Option<String>,
    statement_timeout_secs: Option<u64>,
    gcloud_bin: Option<String>,
}

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Snowflake account, e.g. `https://xy12345.snowflakecomputing.com`
    pub snowflake_url: Option<String>,

    /// Bearer token for the SQL API
    pub token: Option<String>,

    pub token_type: TokenType,

    pub role: Option<String>,

    pub warehouse: Option<String>,

    pub statement_timeout_secs: u64,

    pub gcloud_bin: String,

    /// Config file that was merged, if any
    pub config_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snowflake_url: None,
            token: None,
            token_type: TokenType::default(),
            role: None,
            warehouse: None,
            statement_timeout_secs: DEFAULT_STATEMENT_TIMEOUT_SECS,
            gcloud_bin: DEFAULT_GCLOUD_BIN.to_string(),
            config_file: None,
        }
    }
}

impl Config {
    /// Load defaults, then the config file, then the environment
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::config_file_path() {
            if path.exists() {
                config.merge_file(&path)?;
            } else if std::env::var_os("GSP_CONFIG").is_some() {
                return Err(CliError::FileNotFound(path.display().to_string()));
            }
        }

        config.merge_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Config file location: `GSP_CONFIG` or the platform config directory
    pub fn config_file_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os("GSP_CONFIG") {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("gsp").join("config.toml"))
    }

    /// Merge a TOML config file over the current values
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        let file: FileConfig = toml::from_str(&content)?;

        if let Some(url) = file.snowflake_url {
            self.snowflake_url = Some(url);
        } else if let Some(account) = file.snowflake_account {
            self.snowflake_url = Some(account_url(&account));
        }
        if file.token.is_some() {
            self.token = file.token;
        }
        if let Some(token_type) = file.token_type {
            self.token_type = token_type.parse()?;
        }
        if file.role.is_some() {
            self.role = file.role;
        }
        if file.warehouse.is_some() {
            self.warehouse = file.warehouse;
        }
        if let Some(secs) = file.statement_timeout_secs {
            self.statement_timeout_secs = secs;
        }
        if let Some(bin) = file.gcloud_bin {
            self.gcloud_bin = bin;
        }

        self.config_file = Some(path.to_path_buf());
        Ok(())
    }

    /// Merge `GSP_*` variables using the given lookup
    pub fn merge_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = var("GSP_SNOWFLAKE_URL") {
            self.snowflake_url = Some(url);
        } else if let Some(account) = var("GSP_SNOWFLAKE_ACCOUNT") {
            self.snowflake_url = Some(account_url(&account));
        }
        if let Some(token) = var("GSP_SNOWFLAKE_TOKEN") {
            self.token = Some(token);
        }
        if let Some(token_type) = var("GSP_SNOWFLAKE_TOKEN_TYPE") {
            self.token_type = token_type.parse()?;
        }
        if let Some(role) = var("GSP_SNOWFLAKE_ROLE") {
            self.role = Some(role);
        }
        if let Some(warehouse) = var("GSP_SNOWFLAKE_WAREHOUSE") {
            self.warehouse = Some(warehouse);
        }
        if let Some(secs) = var("GSP_STATEMENT_TIMEOUT_SECS") {
            self.statement_timeout_secs = secs.parse().map_err(|_| {
                CliError::config(format!("GSP_STATEMENT_TIMEOUT_SECS must be a number, got '{}'", secs))
            })?;
        }
        if let Some(bin) = var("GSP_GCLOUD_BIN") {
            self.gcloud_bin = bin;
        }
        Ok(())
    }

    /// Account URL, required by every command that talks to Snowflake
    pub fn require_snowflake_url(&self) -> Result<&str> {
        self.snowflake_url.as_deref().ok_or_else(|| {
            CliError::config("Snowflake account is not set (GSP_SNOWFLAKE_URL or GSP_SNOWFLAKE_ACCOUNT)")
        })
    }

    /// Bearer token, required by every command that talks to Snowflake
    pub fn require_token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| CliError::config("Snowflake token is not set (GSP_SNOWFLAKE_TOKEN)"))
    }

    /// Token with all but the last four characters masked, for display
    pub fn masked_token(&self) -> String {
        match self.token.as_deref() {
            None => "(not set)".to_string(),
            Some(t) if t.chars().count() <= 4 => "****".to_string(),
            Some(t) => {
                let tail: String = t.chars().skip(t.chars().count() - 4).collect();
                format!("****{}", tail)
            }
        }
    }
}

/// `https://<account>.snowflakecomputing.com` for an account identifier
pub fn account_url(account: &str) -> String {
    format!("https://{}.snowflakecomputing.com", account.trim().to_ascii_lowercase())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.statement_timeout_secs, DEFAULT_STATEMENT_TIMEOUT_SECS);
        assert_eq!(config.gcloud_bin, "gcloud");
        assert_eq!(config.token_type, TokenType::KeypairJwt);
        assert!(config.require_snowflake_url().is_err());
        assert!(config.require_token().is_err());
    }

    #[test]
    fn test_env_account_builds_url() {
        let mut config = Config::default();
        config
            .merge_env(env(&[("GSP_SNOWFLAKE_ACCOUNT", "XY12345.us-central1.gcp")]))
            .unwrap();
        assert_eq!(
            config.require_snowflake_url().unwrap(),
            "https://xy12345.us-central1.gcp.snowflakecomputing.com"
        );
    }

    #[test]
    fn test_env_url_wins_over_account() {
        let mut config = Config::default();
        config
            .merge_env(env(&[
                ("GSP_SNOWFLAKE_URL", "http://127.0.0.1:9000"),
                ("GSP_SNOWFLAKE_ACCOUNT", "ignored"),
                ("GSP_SNOWFLAKE_TOKEN_TYPE", "oauth"),
                ("GSP_STATEMENT_TIMEOUT_SECS", "5"),
            ]))
            .unwrap();
        assert_eq!(config.snowflake_url.as_deref(), Some("http://127.0.0.1:9000"));
        assert_eq!(config.token_type, TokenType::Oauth);
        assert_eq!(config.statement_timeout_secs, 5);
    }

    #[test]
    fn test_env_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config
            .merge_env(env(&[("GSP_STATEMENT_TIMEOUT_SECS", "soon")]))
            .is_err());
        assert!(config
            .merge_env(env(&[("GSP_SNOWFLAKE_TOKEN_TYPE", "basic")]))
            .is_err());
    }

    #[test]
    fn test_file_then_env_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "snowflake_account = \"acme\"\nwarehouse = \"LOAD_WH\"\nrole = \"SYSADMIN\"\ntoken_type = \"PAT\""
        )
        .unwrap();

        let mut config = Config::default();
        config.merge_file(file.path()).unwrap();
        config
            .merge_env(env(&[("GSP_SNOWFLAKE_WAREHOUSE", "ADHOC_WH")]))
            .unwrap();

        assert_eq!(config.snowflake_url.as_deref(), Some("https://acme.snowflakecomputing.com"));
        assert_eq!(config.role.as_deref(), Some("SYSADMIN"));
        assert_eq!(config.warehouse.as_deref(), Some("ADHOC_WH"));
        assert_eq!(config.token_type, TokenType::ProgrammaticAccessToken);
        assert_eq!(config.config_file.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_file_rejects_unknown_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server_url = \"http://localhost\"").unwrap();
        let mut config = Config::default();
        assert!(matches!(config.merge_file(file.path()), Err(CliError::TomlParse(_))));
    }

    #[test]
    fn test_masked_token() {
        let mut config = Config::default();
        assert_eq!(config.masked_token(), "(not set)");
        config.token = Some("abc".to_string());
        assert_eq!(config.masked_token(), "****");
        config.token = Some("secret-token-1234".to_string());
        assert_eq!(config.masked_token(), "****1234");
    }
}
