//! Snowflake SQL API request and response types

use serde::{Deserialize, Serialize};

/// Body of `POST /api/v2/statements`
#[derive(Debug, Clone, Serialize)]
pub struct StatementRequest {
    pub statement: String,
    pub timeout: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Successful (200) or accepted (202) statement response
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StatementResponse {
    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub statement_handle: Option<String>,

    #[serde(default)]
    pub statement_status_url: Option<String>,

    #[serde(default)]
    pub result_set_meta_data: Option<ResultSetMetaData>,

    #[serde(default)]
    pub data: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResultSetMetaData {
    #[serde(default)]
    pub num_rows: u64,

    #[serde(default)]
    pub row_type: Vec<ColumnMeta>,

    #[serde(default)]
    pub partition_info: Vec<PartitionInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMeta {
    pub name: String,

    #[serde(rename = "type", default)]
    pub column_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionInfo {
    #[serde(default)]
    pub row_count: u64,
}

/// Error body returned with 4xx/5xx statuses
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub sql_state: Option<String>,

    #[serde(default)]
    pub statement_handle: Option<String>,
}

/// Tabular result of one statement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    /// Position of a column, ignoring case
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Value of a named column in a row
    pub fn value<'a>(&self, row: &'a [Option<String>], column: &str) -> Option<&'a str> {
        self.column_index(column)
            .and_then(|i| row.get(i))
            .and_then(|v| v.as_deref())
    }

    /// First column of the first row
    pub fn first_value(&self) -> Option<&str> {
        self.rows.first().and_then(|r| r.first()).and_then(|v| v.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_success_response() {
        let body = json!({
            "resultSetMetaData": {
                "numRows": 1,
                "format": "jsonv2",
                "rowType": [{"name": "COUNT(*)", "type": "fixed", "nullable": false}],
                "partitionInfo": [{"rowCount": 1, "uncompressedSize": 12}]
            },
            "data": [["42"]],
            "code": "090001",
            "statementHandle": "01b2c3d4-0000-0001-0000-000000000001",
            "message": "Statement executed successfully."
        });

        let response: StatementResponse = serde_json::from_value(body).unwrap();
        let meta = response.result_set_meta_data.unwrap();
        assert_eq!(meta.num_rows, 1);
        assert_eq!(meta.row_type[0].name, "COUNT(*)");
        assert_eq!(meta.partition_info.len(), 1);
        assert_eq!(response.data, vec![vec![Some("42".to_string())]]);
    }

    #[test]
    fn test_parse_null_cells() {
        let body = json!({"data": [["a", null]]});
        let response: StatementResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.data[0][1], None);
    }

    #[test]
    fn test_request_omits_unset_context() {
        let request = StatementRequest {
            statement: "SELECT 1".to_string(),
            timeout: 60,
            database: Some("ORDERS_DB".to_string()),
            schema: None,
            warehouse: None,
            role: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["database"], "ORDERS_DB");
        assert!(value.get("schema").is_none());
        assert!(value.get("role").is_none());
    }

    #[test]
    fn test_result_set_lookup() {
        let rs = ResultSet::new(
            vec!["property".to_string(), "property_value".to_string()],
            vec![vec![Some("ENABLED".to_string()), Some("true".to_string())]],
        );
        assert_eq!(rs.column_index("PROPERTY_VALUE"), Some(1));
        assert_eq!(rs.value(&rs.rows[0], "Property_Value"), Some("true"));
        assert_eq!(rs.value(&rs.rows[0], "missing"), None);
        assert_eq!(rs.first_value(), Some("ENABLED"));
    }
}
