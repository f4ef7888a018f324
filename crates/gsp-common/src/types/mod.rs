//! Landing-zone schema and record types
//!
//! The `orders_data_lz` table is modelled as a value so that the same
//! definition renders the `CREATE TABLE` statement and drives local CSV
//! validation. Rows are append-only: the pipeline never updates or deletes.

use crate::error::{GspError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Date layout accepted for `DATE` columns in landing files.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Default landing table name.
pub const DEFAULT_LANDING_TABLE: &str = "orders_data_lz";

/// Column type in the landing table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlType {
    Int,
    /// Bounded string with a maximum length in characters
    Varchar(u32),
    Date,
}

impl SqlType {
    /// Check a raw CSV field against this type.
    ///
    /// Empty fields load as NULL (Snowflake's `EMPTY_FIELD_AS_NULL` default)
    /// and are accepted for every type.
    pub fn check_value(&self, raw: &str) -> std::result::Result<(), String> {
        if raw.is_empty() {
            return Ok(());
        }

        match self {
            SqlType::Int => check_number(raw.trim())
                .ok_or_else(|| format!("'{}' is not an integer of at most {} digits", raw, INT_PRECISION)),
            SqlType::Varchar(max) => {
                let len = raw.chars().count();
                if len > *max as usize {
                    Err(format!("value is {} characters, limit is {}", len, max))
                } else {
                    Ok(())
                }
            }
            SqlType::Date => NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
                .map(|_| ())
                .map_err(|_| format!("'{}' is not a date (expected YYYY-MM-DD)", raw)),
        }
    }
}

/// `INT` is an alias for `NUMBER(38, 0)`
pub const INT_PRECISION: usize = 38;

fn check_number(value: &str) -> Option<()> {
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    (digits.trim_start_matches('0').len() <= INT_PRECISION).then_some(())
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Int => f.write_str("INT"),
            SqlType::Varchar(n) => write!(f, "VARCHAR({})", n),
            SqlType::Date => f.write_str("DATE"),
        }
    }
}

/// A single column of the landing table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: SqlType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
        }
    }
}

/// Ordered column list of the landing table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandingSchema {
    pub columns: Vec<ColumnSpec>,
}

impl LandingSchema {
    /// The order-event landing schema
    pub fn orders() -> Self {
        Self {
            columns: vec![
                ColumnSpec::new("order_id", SqlType::Int),
                ColumnSpec::new("product", SqlType::Varchar(20)),
                ColumnSpec::new("quantity", SqlType::Int),
                ColumnSpec::new("order_status", SqlType::Varchar(30)),
                ColumnSpec::new("order_date", SqlType::Date),
            ],
        }
    }

    /// Build a custom schema; column names must be non-empty and unique
    pub fn new(columns: Vec<ColumnSpec>) -> Result<Self> {
        if columns.is_empty() {
            return Err(GspError::Schema("schema has no columns".to_string()));
        }

        for (i, column) in columns.iter().enumerate() {
            if column.name.trim().is_empty() {
                return Err(GspError::Schema(format!("column {} has an empty name", i + 1)));
            }
            if columns[..i]
                .iter()
                .any(|c| c.name.eq_ignore_ascii_case(&column.name))
            {
                return Err(GspError::Schema(format!(
                    "column '{}' is defined twice",
                    column.name
                )));
            }
        }

        Ok(Self { columns })
    }

    /// Number of columns a landing file row must carry
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Column definitions as they appear inside `CREATE TABLE (...)`
    pub fn column_definitions(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.sql_type))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for LandingSchema {
    fn default() -> Self {
        Self::orders()
    }
}

/// One ingested order event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: i64,
    pub product: String,
    pub quantity: i64,
    pub order_status: String,
    pub order_date: NaiveDate,
}

impl OrderRecord {
    /// Fields in landing-table column order
    pub fn to_fields(&self) -> [String; 5] {
        [
            self.order_id.to_string(),
            self.product.clone(),
            self.quantity.to_string(),
            self.order_status.clone(),
            self.order_date.format(DATE_FORMAT).to_string(),
        ]
    }

    /// Parse a record from fields in landing-table column order
    pub fn from_fields(fields: &[&str]) -> Result<Self> {
        let [order_id, product, quantity, order_status, order_date] = fields else {
            return Err(GspError::Parse(format!(
                "expected 5 fields, got {}",
                fields.len()
            )));
        };

        Ok(Self {
            order_id: order_id
                .trim()
                .parse()
                .map_err(|_| GspError::Parse(format!("invalid order_id '{}'", order_id)))?,
            product: (*product).to_string(),
            quantity: quantity
                .trim()
                .parse()
                .map_err(|_| GspError::Parse(format!("invalid quantity '{}'", quantity)))?,
            order_status: (*order_status).to_string(),
            order_date: NaiveDate::parse_from_str(order_date.trim(), DATE_FORMAT)
                .map_err(|_| GspError::Parse(format!("invalid order_date '{}'", order_date)))?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_schema_definition() {
        let schema = LandingSchema::orders();
        assert_eq!(schema.width(), 5);
        assert_eq!(
            schema.column_definitions(),
            "order_id INT, product VARCHAR(20), quantity INT, order_status VARCHAR(30), order_date DATE"
        );
    }

    #[test]
    fn test_check_value() {
        assert!(SqlType::Int.check_value("42").is_ok());
        assert!(SqlType::Int.check_value("-7").is_ok());
        assert!(SqlType::Int.check_value("4.2").is_err());
        assert!(SqlType::Varchar(5).check_value("abcde").is_ok());
        assert!(SqlType::Varchar(5).check_value("abcdef").is_err());
        assert!(SqlType::Date.check_value("2024-02-29").is_ok());
        assert!(SqlType::Date.check_value("2023-02-29").is_err());
        assert!(SqlType::Date.check_value("").is_ok());
    }

    #[test]
    fn test_int_allows_number_38_digits() {
        let max = "9".repeat(38);
        assert!(SqlType::Int.check_value("12345678901234567890").is_ok());
        assert!(SqlType::Int.check_value(&max).is_ok());
        assert!(SqlType::Int.check_value(&format!("-{}", max)).is_ok());
        assert!(SqlType::Int.check_value(&format!("000{}", max)).is_ok());
        assert!(SqlType::Int.check_value(" +42 ").is_ok());

        let err = SqlType::Int.check_value(&"9".repeat(39)).unwrap_err();
        assert!(err.contains("at most 38 digits"));
        assert!(SqlType::Int.check_value("-").is_err());
        assert!(SqlType::Int.check_value("1e5").is_err());
        assert!(SqlType::Int.check_value("--1").is_err());
    }

    #[test]
    fn test_varchar_counts_characters_not_bytes() {
        assert!(SqlType::Varchar(4).check_value("café").is_ok());
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let result = LandingSchema::new(vec![
            ColumnSpec::new("id", SqlType::Int),
            ColumnSpec::new("ID", SqlType::Int),
        ]);
        assert!(matches!(result, Err(GspError::Schema(_))));
        assert!(LandingSchema::new(vec![]).is_err());
    }

    #[test]
    fn test_order_record_fields() {
        let record = OrderRecord::from_fields(&["17", "widget", "3", "shipped", "2024-01-05"]).unwrap();
        assert_eq!(record.order_id, 17);
        assert_eq!(record.order_date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(record.to_fields()[4], "2024-01-05");

        assert!(OrderRecord::from_fields(&["17", "widget", "3"]).is_err());
        assert!(OrderRecord::from_fields(&["x", "widget", "3", "shipped", "2024-01-05"]).is_err());
    }
}
