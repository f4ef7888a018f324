//! Names of cloud and warehouse objects
//!
//! The provisioning DDL interpolates names straight into SQL text and gcloud
//! arguments, so every name is validated before it gets that far:
//!
//! - [`Identifier`]: unquoted Snowflake identifier
//! - [`GcsLocation`]: `gcs://bucket/prefix/` storage path
//! - [`validate_bucket_name`] / [`validate_pubsub_id`]: GCP naming rules

use crate::error::{GspError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use url::Url;

#[allow(clippy::expect_used)]
fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("static pattern compiles")
}

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^[A-Za-z_][A-Za-z0-9_$]*$"));

static BUCKET_RE: LazyLock<Regex> = LazyLock::new(|| pattern(r"^[a-z0-9][a-z0-9._-]*[a-z0-9]$"));

static PUBSUB_ID_RE: LazyLock<Regex> = LazyLock::new(|| pattern(r"^[A-Za-z][A-Za-z0-9._~+%-]*$"));

static IPV4_RE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^\d{1,3}(\.\d{1,3}){3}$"));

/// Maximum length of a Snowflake identifier.
pub const MAX_IDENTIFIER_LEN: usize = 255;

/// A validated, unquoted Snowflake identifier
///
/// Unquoted identifiers resolve case-insensitively (Snowflake stores them
/// uppercase), so equality ignores ASCII case while `Display` keeps the
/// spelling the operator wrote.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(GspError::identifier(&name, "identifier cannot be empty"));
        }
        if name.len() > MAX_IDENTIFIER_LEN {
            return Err(GspError::identifier(
                &name,
                format!("longer than {} characters", MAX_IDENTIFIER_LEN),
            ));
        }
        if !IDENTIFIER_RE.is_match(&name) {
            return Err(GspError::identifier(
                &name,
                "must start with a letter or underscore and contain only letters, digits, '_' or '$'",
            ));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Uppercase form, as Snowflake reports the object in metadata views
    pub fn canonical(&self) -> String {
        self.0.to_ascii_uppercase()
    }

    /// Join identifiers into a dotted, fully-qualified name
    pub fn qualify(parts: &[&Identifier]) -> String {
        parts
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl std::hash::Hash for Identifier {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identifier {
    type Err = GspError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = GspError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.0
    }
}

/// Validate a GCS bucket name
pub fn validate_bucket_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| GspError::InvalidBucket {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let max_len = if name.contains('.') { 222 } else { 63 };
    if name.len() < 3 || name.len() > max_len {
        return Err(invalid(&format!("must be 3-{} characters", max_len)));
    }
    if !BUCKET_RE.is_match(name) {
        return Err(invalid(
            "use lowercase letters, digits, '-', '_' or '.', starting and ending with a letter or digit",
        ));
    }
    if name.split('.').any(|component| component.len() > 63) {
        return Err(invalid("each dot-separated component must be at most 63 characters"));
    }
    if IPV4_RE.is_match(name) {
        return Err(invalid("cannot be an IP address"));
    }
    if name.starts_with("goog") || name.contains("google") {
        return Err(invalid("cannot start with 'goog' or contain 'google'"));
    }
    Ok(())
}

/// Validate a Pub/Sub topic or subscription ID
pub fn validate_pubsub_id(name: &str) -> Result<()> {
    let invalid = |reason: &str| GspError::InvalidPubSubId {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.len() < 3 || name.len() > 255 {
        return Err(invalid("must be 3-255 characters"));
    }
    if !PUBSUB_ID_RE.is_match(name) {
        return Err(invalid(
            "must start with a letter and contain only letters, digits, '-', '_', '.', '~', '+' or '%'",
        ));
    }
    if name.to_ascii_lowercase().starts_with("goog") {
        return Err(invalid("cannot start with 'goog'"));
    }
    Ok(())
}

/// A location inside a GCS bucket
///
/// Parses `gcs://bucket/prefix/` (Snowflake's spelling) and `gs://bucket/prefix/`
/// (gcloud's). The prefix never starts with `/` and, when non-empty, always
/// ends with one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcsLocation {
    pub bucket: String,
    pub prefix: String,
}

impl GcsLocation {
    pub fn new(bucket: impl Into<String>, prefix: impl AsRef<str>) -> Result<Self> {
        let bucket = bucket.into();
        validate_bucket_name(&bucket)?;
        Ok(Self {
            bucket,
            prefix: normalize_prefix(prefix.as_ref()),
        })
    }

    /// `gcs://bucket/prefix/` for Snowflake stage and integration DDL
    pub fn snowflake_url(&self) -> String {
        format!("gcs://{}/{}", self.bucket, self.prefix)
    }

    /// `gs://bucket` for gcloud bucket-level commands
    pub fn bucket_url(&self) -> String {
        format!("gs://{}", self.bucket)
    }

    /// Object path relative to the bucket for a file under this prefix
    pub fn object_path(&self, file_name: &str) -> String {
        format!("{}{}", self.prefix, file_name.trim_start_matches('/'))
    }
}

impl fmt::Display for GcsLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.snowflake_url())
    }
}

impl FromStr for GcsLocation {
    type Err = GspError;

    fn from_str(s: &str) -> Result<Self> {
        let url = Url::parse(s).map_err(|e| GspError::location(s, e.to_string()))?;

        if url.scheme() != "gcs" && url.scheme() != "gs" {
            return Err(GspError::location(
                s,
                format!("scheme must be gcs:// or gs://, got {}://", url.scheme()),
            ));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(GspError::location(s, "query strings and fragments are not allowed"));
        }

        let bucket = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| GspError::location(s, "missing bucket name"))?;

        Self::new(bucket, url.path())
    }
}

/// Strip leading slashes, collapse empty segments, and terminate with `/`
pub fn normalize_prefix(prefix: &str) -> String {
    let segments: Vec<&str> = prefix.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        String::new()
    } else {
        format!("{}/", segments.join("/"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_identifier_validation() {
        assert!(Identifier::new("gcs_bucket_read_int").is_ok());
        assert!(Identifier::new("_staging$1").is_ok());
        assert!(Identifier::new("").is_err());
        assert!(Identifier::new("1table").is_err());
        assert!(Identifier::new("orders-lz").is_err());
        assert!(Identifier::new("orders; DROP TABLE x").is_err());
        assert!(Identifier::new("a".repeat(256)).is_err());
    }

    #[test]
    fn test_identifier_case_insensitive_eq() {
        let a = Identifier::new("snow_stage").unwrap();
        let b = Identifier::new("SNOW_STAGE").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.canonical(), "SNOW_STAGE");
        assert_eq!(a.to_string(), "snow_stage");
    }

    #[test]
    fn test_identifier_qualify() {
        let db = Identifier::new("ORDERS_DB").unwrap();
        let schema = Identifier::new("PUBLIC").unwrap();
        let table = Identifier::new("orders_data_lz").unwrap();
        assert_eq!(Identifier::qualify(&[&db, &schema, &table]), "ORDERS_DB.PUBLIC.orders_data_lz");
    }

    #[test]
    fn test_identifier_serde() {
        let id: Identifier = serde_json::from_str("\"snow_stage\"").unwrap();
        assert_eq!(id.as_str(), "snow_stage");
        assert!(serde_json::from_str::<Identifier>("\"bad name\"").is_err());
    }

    #[test]
    fn test_bucket_names() {
        assert!(validate_bucket_name("snowpipe-orders").is_ok());
        assert!(validate_bucket_name("data.example.com").is_ok());
        assert!(validate_bucket_name("ab").is_err());
        assert!(validate_bucket_name("Uppercase").is_err());
        assert!(validate_bucket_name("-leading").is_err());
        assert!(validate_bucket_name("192.168.1.10").is_err());
        assert!(validate_bucket_name("google-data").is_err());
        assert!(validate_bucket_name("my-google-bucket").is_err());
    }

    #[test]
    fn test_pubsub_ids() {
        assert!(validate_pubsub_id("snowpipe-orders-topic").is_ok());
        assert!(validate_pubsub_id("sub_1.v2").is_ok());
        assert!(validate_pubsub_id("1topic").is_err());
        assert!(validate_pubsub_id("ab").is_err());
        assert!(validate_pubsub_id("goog-topic").is_err());
    }

    #[test]
    fn test_parse_gcs_location() {
        let loc: GcsLocation = "gcs://snowpipe-orders/orders/2024/".parse().unwrap();
        assert_eq!(loc.bucket, "snowpipe-orders");
        assert_eq!(loc.prefix, "orders/2024/");
        assert_eq!(loc.to_string(), "gcs://snowpipe-orders/orders/2024/");
        assert_eq!(loc.bucket_url(), "gs://snowpipe-orders");
    }

    #[test]
    fn test_parse_gs_location_without_prefix() {
        let loc: GcsLocation = "gs://snowpipe-orders".parse().unwrap();
        assert_eq!(loc.prefix, "");
        assert_eq!(loc.snowflake_url(), "gcs://snowpipe-orders/");
        assert_eq!(loc.object_path("a.csv"), "a.csv");
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert!("s3://bucket/path".parse::<GcsLocation>().is_err());
        assert!("gcs://".parse::<GcsLocation>().is_err());
        assert!("gcs://bucket/path?x=1".parse::<GcsLocation>().is_err());
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix("orders"), "orders/");
        assert_eq!(normalize_prefix("/orders//2024/"), "orders/2024/");
    }

    proptest! {
        #[test]
        fn prop_normalized_prefix_is_stable(prefix in "[a-z/]{0,20}") {
            let once = normalize_prefix(&prefix);
            prop_assert_eq!(normalize_prefix(&once), once.clone());
            prop_assert!(!once.starts_with('/'));
            prop_assert!(once.is_empty() || once.ends_with('/'));
        }
    }
}
