//! Snowflake statement rendering
//!
//! Builds the provisioning DDL, the monitoring queries and the pipe
//! operations as SQL text. Identifiers arrive pre-validated
//! ([`Identifier`]); free-form values (URLs, subscription paths, prefixes)
//! go through [`quote_literal`].

use crate::error::{CliError, Result};
use crate::manifest::FileFormat;
use gsp_common::names::{GcsLocation, Identifier};
use gsp_common::types::LandingSchema;
use serde::{Deserialize, Serialize};
use sqlparser::dialect::SnowflakeDialect;
use sqlparser::parser::Parser;

/// Columns selected from `COPY_HISTORY`, in the order `monitor` reads them.
pub const COPY_HISTORY_COLUMNS: [&str; 8] = [
    "FILE_NAME",
    "LAST_LOAD_TIME",
    "STATUS",
    "ROW_COUNT",
    "ROW_PARSED",
    "ERROR_COUNT",
    "FIRST_ERROR_MESSAGE",
    "PIPE_NAME",
];

/// How CREATE statements treat an existing object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateMode {
    /// `CREATE <kind> IF NOT EXISTS`: re-running provisioning is a no-op
    #[default]
    IfNotExists,
    /// `CREATE OR REPLACE <kind>`: recreate objects (pipes lose load history)
    OrReplace,
}

impl CreateMode {
    fn create(&self, kind: &str, name: &str) -> String {
        match self {
            CreateMode::IfNotExists => format!("CREATE {} IF NOT EXISTS {}", kind, name),
            CreateMode::OrReplace => format!("CREATE OR REPLACE {} {}", kind, name),
        }
    }
}

/// Quote a value as a Snowflake string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

/// `CREATE TABLE` for the landing table
pub fn create_table(table_fqn: &str, schema: &LandingSchema, mode: CreateMode) -> String {
    format!("{} ({})", mode.create("TABLE", table_fqn), schema.column_definitions())
}

/// `CREATE STORAGE INTEGRATION` allowing reads from exactly one GCS location
pub fn create_storage_integration(
    name: &Identifier,
    allowed: &GcsLocation,
    mode: CreateMode,
) -> String {
    format!(
        "{}\n  TYPE = EXTERNAL_STAGE\n  STORAGE_PROVIDER = 'GCS'\n  ENABLED = TRUE\n  STORAGE_ALLOWED_LOCATIONS = ({})",
        mode.create("STORAGE INTEGRATION", name.as_str()),
        quote_literal(&allowed.snowflake_url())
    )
}

/// `CREATE STAGE` over the location, authorised by the storage integration
pub fn create_stage(
    stage_fqn: &str,
    location: &GcsLocation,
    integration: &Identifier,
    mode: CreateMode,
) -> String {
    format!(
        "{}\n  URL = {}\n  STORAGE_INTEGRATION = {}",
        mode.create("STAGE", stage_fqn),
        quote_literal(&location.snowflake_url()),
        integration
    )
}

/// `CREATE NOTIFICATION INTEGRATION` bound to a Pub/Sub subscription
pub fn create_notification_integration(
    name: &Identifier,
    subscription_path: &str,
    mode: CreateMode,
) -> String {
    format!(
        "{}\n  TYPE = QUEUE\n  NOTIFICATION_PROVIDER = GCP_PUBSUB\n  ENABLED = TRUE\n  GCP_PUBSUB_SUBSCRIPTION_NAME = {}",
        mode.create("NOTIFICATION INTEGRATION", name.as_str()),
        quote_literal(subscription_path)
    )
}

/// Render the `FILE_FORMAT = (...)` clause
pub fn file_format_clause(format: &FileFormat) -> String {
    let mut clause = format!("TYPE = {}", quote_literal(&format.format_type.to_ascii_uppercase()));
    if format.skip_header > 0 {
        clause.push_str(&format!(" SKIP_HEADER = {}", format.skip_header));
    }
    if format.field_delimiter != "," {
        clause.push_str(&format!(
            " FIELD_DELIMITER = {}",
            quote_literal(&format.field_delimiter)
        ));
    }
    format!("FILE_FORMAT = ({})", clause)
}

/// `CREATE PIPE ... AUTO_INGEST = TRUE ... AS COPY INTO`
pub fn create_pipe(
    pipe_fqn: &str,
    integration: &Identifier,
    table_fqn: &str,
    stage_fqn: &str,
    format: &FileFormat,
    mode: CreateMode,
) -> String {
    format!(
        "{}\n  AUTO_INGEST = TRUE\n  INTEGRATION = {}\n  AS\n  COPY INTO {}\n  FROM @{}\n  {}",
        mode.create("PIPE", pipe_fqn),
        // The pipe references the integration by its stored (uppercase) name.
        quote_literal(&integration.canonical()),
        table_fqn,
        stage_fqn,
        file_format_clause(format)
    )
}

/// `DESC INTEGRATION` (works for storage and notification integrations)
pub fn desc_integration(name: &Identifier) -> String {
    format!("DESC INTEGRATION {}", name)
}

/// `SYSTEM$PIPE_STATUS` for a pipe
pub fn pipe_status(pipe_fqn: &str) -> String {
    format!("SELECT SYSTEM$PIPE_STATUS({})", quote_literal(pipe_fqn))
}

/// `COPY_HISTORY` for the landing table over the last `hours`
pub fn copy_history(database: &Identifier, table_fqn: &str, hours: u32) -> String {
    format!(
        "SELECT {} FROM TABLE({}.INFORMATION_SCHEMA.COPY_HISTORY(TABLE_NAME => {}, START_TIME => DATEADD(HOURS, -{}, CURRENT_TIMESTAMP()))) ORDER BY LAST_LOAD_TIME DESC",
        COPY_HISTORY_COLUMNS.join(", "),
        database,
        quote_literal(table_fqn),
        hours.max(1)
    )
}

/// Row count of the landing table
pub fn count_rows(table_fqn: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", table_fqn)
}

/// Pause or resume a pipe
pub fn set_pipe_paused(pipe_fqn: &str, paused: bool) -> String {
    format!(
        "ALTER PIPE {} SET PIPE_EXECUTION_PAUSED = {}",
        pipe_fqn,
        if paused { "TRUE" } else { "FALSE" }
    )
}

/// Queue files already staged (within the last 7 days) that were never loaded
pub fn refresh_pipe(pipe_fqn: &str, prefix: Option<&str>) -> String {
    match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => format!("ALTER PIPE {} REFRESH PREFIX = {}", pipe_fqn, quote_literal(prefix)),
        None => format!("ALTER PIPE {} REFRESH", pipe_fqn),
    }
}

/// `DROP <kind> IF EXISTS`
pub fn drop_object(kind: &str, name: &str) -> String {
    format!("DROP {} IF EXISTS {}", kind, name)
}

/// Syntax-check a statement with the Snowflake dialect
///
/// Only standard statements (tables, selects) are covered by the parser;
/// integration, stage and pipe DDL is not checked.
pub fn check_sql(sql: &str) -> Result<()> {
    Parser::parse_sql(&SnowflakeDialect {}, sql)
        .map(|_| ())
        .map_err(|e| CliError::InvalidSql(format!("{}: {}", e, sql)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn id(name: &str) -> Identifier {
        Identifier::new(name).unwrap()
    }

    fn location() -> GcsLocation {
        "gcs://snowpipe-orders/orders/".parse().unwrap()
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("plain"), "'plain'");
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_literal(r"a\b"), r"'a\\b'");
    }

    #[test]
    fn test_create_table() {
        let sql = create_table("ORDERS_DB.PUBLIC.orders_data_lz", &LandingSchema::orders(), CreateMode::IfNotExists);
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS ORDERS_DB.PUBLIC.orders_data_lz (order_id INT, product VARCHAR(20), quantity INT, order_status VARCHAR(30), order_date DATE)"
        );
        check_sql(&sql).unwrap();

        let replace = create_table("orders_data_lz", &LandingSchema::orders(), CreateMode::OrReplace);
        assert!(replace.starts_with("CREATE OR REPLACE TABLE orders_data_lz ("));
        check_sql(&replace).unwrap();
    }

    #[test]
    fn test_create_storage_integration() {
        let sql = create_storage_integration(&id("gcs_bucket_read_int"), &location(), CreateMode::IfNotExists);
        assert!(sql.starts_with("CREATE STORAGE INTEGRATION IF NOT EXISTS gcs_bucket_read_int"));
        assert!(sql.contains("STORAGE_PROVIDER = 'GCS'"));
        assert!(sql.contains("STORAGE_ALLOWED_LOCATIONS = ('gcs://snowpipe-orders/orders/')"));
    }

    #[test]
    fn test_create_stage() {
        let sql = create_stage("DB.SC.snow_stage", &location(), &id("gcs_bucket_read_int"), CreateMode::OrReplace);
        assert_eq!(
            sql,
            "CREATE OR REPLACE STAGE DB.SC.snow_stage\n  URL = 'gcs://snowpipe-orders/orders/'\n  STORAGE_INTEGRATION = gcs_bucket_read_int"
        );
    }

    #[test]
    fn test_create_notification_integration() {
        let sql = create_notification_integration(
            &id("notification_from_pubsub_int"),
            "projects/acme/subscriptions/snowpipe-orders-sub",
            CreateMode::IfNotExists,
        );
        assert!(sql.contains("NOTIFICATION_PROVIDER = GCP_PUBSUB"));
        assert!(sql.contains("GCP_PUBSUB_SUBSCRIPTION_NAME = 'projects/acme/subscriptions/snowpipe-orders-sub'"));
    }

    #[test]
    fn test_create_pipe() {
        let sql = create_pipe(
            "DB.SC.gcs_to_snowflake_pipe",
            &id("notification_from_pubsub_int"),
            "DB.SC.orders_data_lz",
            "DB.SC.snow_stage",
            &FileFormat::default(),
            CreateMode::IfNotExists,
        );
        assert!(sql.contains("AUTO_INGEST = TRUE"));
        assert!(sql.contains("INTEGRATION = 'NOTIFICATION_FROM_PUBSUB_INT'"));
        assert!(sql.contains("COPY INTO DB.SC.orders_data_lz\n  FROM @DB.SC.snow_stage"));
        assert!(sql.ends_with("FILE_FORMAT = (TYPE = 'CSV')"));
    }

    #[test]
    fn test_file_format_options() {
        let format = FileFormat {
            format_type: "csv".to_string(),
            skip_header: 1,
            field_delimiter: "|".to_string(),
        };
        assert_eq!(
            file_format_clause(&format),
            "FILE_FORMAT = (TYPE = 'CSV' SKIP_HEADER = 1 FIELD_DELIMITER = '|')"
        );
    }

    #[test]
    fn test_monitoring_queries() {
        assert_eq!(
            pipe_status("DB.SC.p"),
            "SELECT SYSTEM$PIPE_STATUS('DB.SC.p')"
        );
        assert_eq!(desc_integration(&id("gcs_bucket_read_int")), "DESC INTEGRATION gcs_bucket_read_int");

        let history = copy_history(&id("DB"), "DB.SC.orders_data_lz", 0);
        assert!(history.contains("FROM TABLE(DB.INFORMATION_SCHEMA.COPY_HISTORY(TABLE_NAME => 'DB.SC.orders_data_lz'"));
        assert!(history.contains("DATEADD(HOURS, -1, CURRENT_TIMESTAMP())"));
        assert!(history.starts_with("SELECT FILE_NAME, LAST_LOAD_TIME, STATUS"));

        check_sql(&count_rows("DB.SC.orders_data_lz")).unwrap();
    }

    #[test]
    fn test_pipe_operations() {
        assert_eq!(set_pipe_paused("p", true), "ALTER PIPE p SET PIPE_EXECUTION_PAUSED = TRUE");
        assert_eq!(set_pipe_paused("p", false), "ALTER PIPE p SET PIPE_EXECUTION_PAUSED = FALSE");
        assert_eq!(refresh_pipe("p", None), "ALTER PIPE p REFRESH");
        assert_eq!(refresh_pipe("p", Some("")), "ALTER PIPE p REFRESH");
        assert_eq!(refresh_pipe("p", Some("2024/01/")), "ALTER PIPE p REFRESH PREFIX = '2024/01/'");
        assert_eq!(drop_object("PIPE", "p"), "DROP PIPE IF EXISTS p");
    }

    #[test]
    fn test_check_sql_rejects_garbage() {
        assert!(matches!(check_sql("CREATE TABLE ("), Err(CliError::InvalidSql(_))));
    }
}
