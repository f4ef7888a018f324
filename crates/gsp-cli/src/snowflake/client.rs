//! HTTP client for the Snowflake SQL API
//!
//! Statements are submitted with `POST /api/v2/statements`. A `202` means the
//! statement is still running; the client then polls the statement handle
//! until it finishes or the configured statement timeout elapses.

use crate::config::{Config, TokenType};
use crate::error::{CliError, Result};
use crate::snowflake::{endpoints, types::*, SqlExecutor};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Delay between status polls of a running statement.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Extra HTTP timeout on top of the statement timeout.
const HTTP_GRACE_SECS: u64 = 30;

const TOKEN_TYPE_HEADER: &str = "x-snowflake-authorization-token-type";

/// SQL API client bound to one account and session context
pub struct SnowflakeClient {
    client: Client,
    base_url: String,
    token: String,
    token_type: TokenType,
    role: Option<String>,
    warehouse: Option<String>,
    database: Option<String>,
    schema: Option<String>,
    statement_timeout_secs: u64,
    poll_interval: Duration,
}

impl SnowflakeClient {
    /// Create a client for `base_url` authenticating with `token`
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, token_type: TokenType) -> Result<Self> {
        let statement_timeout_secs = crate::config::DEFAULT_STATEMENT_TIMEOUT_SECS;
        Ok(Self {
            client: build_http_client(statement_timeout_secs)?,
            base_url: base_url.into(),
            token: token.into(),
            token_type,
            role: None,
            warehouse: None,
            database: None,
            schema: None,
            statement_timeout_secs,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Create from the effective configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut client = Self::new(
            config.require_snowflake_url()?,
            config.require_token()?,
            config.token_type,
        )?
        .with_statement_timeout(config.statement_timeout_secs)?;
        client.role = config.role.clone();
        client.warehouse = config.warehouse.clone();
        Ok(client)
    }

    /// Default database and schema for unqualified names
    pub fn with_context(mut self, database: impl Into<String>, schema: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self.schema = Some(schema.into());
        self
    }

    pub fn with_statement_timeout(mut self, secs: u64) -> Result<Self> {
        self.statement_timeout_secs = secs;
        self.client = build_http_client(secs)?;
        Ok(self)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| CliError::config("Snowflake token contains characters not allowed in an HTTP header"))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(TOKEN_TYPE_HEADER, HeaderValue::from_static(self.token_type.header_value()));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("gsp/", env!("CARGO_PKG_VERSION"))),
        );
        Ok(headers)
    }

    /// Submit a statement and wait for its result
    pub async fn execute_statement(&self, sql: &str) -> Result<ResultSet> {
        let request_id = Uuid::new_v4().to_string();
        let url = endpoints::statements_url(&self.base_url, &request_id);

        let request = StatementRequest {
            statement: sql.to_string(),
            timeout: self.statement_timeout_secs,
            database: self.database.clone(),
            schema: self.schema.clone(),
            warehouse: self.warehouse.clone(),
            role: self.role.clone(),
        };

        debug!(request_id = %request_id, sql = %sql, "Submitting statement");

        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        let mut body = match response.status() {
            StatusCode::OK => response.json::<StatementResponse>().await?,
            StatusCode::ACCEPTED => {
                let accepted: StatementResponse = response.json().await?;
                let handle = accepted.statement_handle.ok_or_else(|| {
                    CliError::snowflake("", "Statement accepted without a statement handle")
                })?;
                info!(handle = %handle, "Statement still running, polling for result");
                self.wait_for(&handle).await?
            }
            _ => return Err(error_from_response(response).await),
        };

        self.fetch_remaining_partitions(&mut body).await?;
        Ok(into_result_set(body))
    }

    async fn wait_for(&self, handle: &str) -> Result<StatementResponse> {
        let url = endpoints::statement_status_url(&self.base_url, handle);
        let deadline = Instant::now() + Duration::from_secs(self.statement_timeout_secs);

        loop {
            tokio::time::sleep(self.poll_interval).await;

            let response = self.client.get(&url).headers(self.headers()?).send().await?;
            match response.status() {
                StatusCode::OK => return Ok(response.json().await?),
                StatusCode::ACCEPTED => {
                    if Instant::now() >= deadline {
                        warn!(handle = %handle, "Statement did not finish before the deadline");
                        return Err(CliError::StatementTimeout {
                            handle: handle.to_string(),
                            secs: self.statement_timeout_secs,
                        });
                    }
                    debug!(handle = %handle, "Statement still running");
                }
                _ => return Err(error_from_response(response).await),
            }
        }
    }

    /// Large results are split into partitions; the first one arrives inline.
    async fn fetch_remaining_partitions(&self, body: &mut StatementResponse) -> Result<()> {
        let partitions = body
            .result_set_meta_data
            .as_ref()
            .map(|m| m.partition_info.len())
            .unwrap_or(0);
        if partitions <= 1 {
            return Ok(());
        }

        let handle = body.statement_handle.clone().ok_or_else(|| {
            CliError::snowflake("", "Partitioned result without a statement handle")
        })?;

        for partition in 1..partitions {
            let url = endpoints::partition_url(&self.base_url, &handle, partition);
            debug!(handle = %handle, partition, "Fetching result partition");
            let response = self.client.get(&url).headers(self.headers()?).send().await?;
            if response.status() != StatusCode::OK {
                return Err(error_from_response(response).await);
            }
            let page: StatementResponse = response.json().await?;
            body.data.extend(page.data);
        }

        Ok(())
    }
}

#[async_trait]
impl SqlExecutor for SnowflakeClient {
    async fn execute(&self, sql: &str) -> Result<ResultSet> {
        self.execute_statement(sql).await
    }
}

fn build_http_client(statement_timeout_secs: u64) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(statement_timeout_secs + HTTP_GRACE_SECS))
        .build()?)
}

fn into_result_set(body: StatementResponse) -> ResultSet {
    let columns = body
        .result_set_meta_data
        .map(|m| m.row_type.into_iter().map(|c| c.name).collect())
        .unwrap_or_default();
    ResultSet::new(columns, body.data)
}

async fn error_from_response(response: Response) -> CliError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(err) => CliError::snowflake(
            err.code.unwrap_or_else(|| status.as_u16().to_string()),
            err.message.unwrap_or_else(|| status.to_string()),
        ),
        Err(_) if status == StatusCode::UNAUTHORIZED => CliError::snowflake(
            "401",
            "Authentication failed. Check GSP_SNOWFLAKE_TOKEN and GSP_SNOWFLAKE_TOKEN_TYPE.",
        ),
        Err(_) => CliError::snowflake(status.as_u16().to_string(), format!("{}: {}", status, text.trim())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> SnowflakeClient {
        SnowflakeClient::new(server.uri(), "test-token", TokenType::KeypairJwt)
            .unwrap()
            .with_poll_interval(Duration::from_millis(10))
    }

    fn count_result(count: &str) -> serde_json::Value {
        json!({
            "resultSetMetaData": {
                "numRows": 1,
                "rowType": [{"name": "COUNT(*)", "type": "fixed"}],
                "partitionInfo": [{"rowCount": 1}]
            },
            "data": [[count]],
            "code": "090001",
            "statementHandle": "h-1"
        })
    }

    #[tokio::test]
    async fn test_execute_sends_auth_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/statements"))
            .and(header("Authorization", "Bearer test-token"))
            .and(header("X-Snowflake-Authorization-Token-Type", "KEYPAIR_JWT"))
            .and(body_partial_json(json!({"statement": "SELECT COUNT(*) FROM T"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(count_result("7")))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server).execute("SELECT COUNT(*) FROM T").await.unwrap();
        assert_eq!(result.columns, vec!["COUNT(*)"]);
        assert_eq!(result.first_value(), Some("7"));
    }

    #[tokio::test]
    async fn test_execute_polls_accepted_statement() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/statements"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "code": "333334",
                "message": "Asynchronous execution in progress.",
                "statementHandle": "h-1",
                "statementStatusUrl": "/api/v2/statements/h-1"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/statements/h-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(count_result("3")))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server).execute("SELECT COUNT(*) FROM T").await.unwrap();
        assert_eq!(result.first_value(), Some("3"));
    }

    #[tokio::test]
    async fn test_execute_times_out() {
        let server = MockServer::start().await;
        let running = json!({"code": "333334", "statementHandle": "h-slow"});
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202).set_body_json(running.clone()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/statements/h-slow"))
            .respond_with(ResponseTemplate::new(202).set_body_json(running))
            .mount(&server)
            .await;

        let err = client(&server)
            .with_statement_timeout(0)
            .unwrap()
            .execute("SELECT 1")
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::StatementTimeout { ref handle, .. } if handle == "h-slow"));
    }

    #[tokio::test]
    async fn test_execute_maps_sql_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "code": "002003",
                "message": "SQL compilation error: Object 'ORDERS_DB.PUBLIC.NOPE' does not exist.",
                "sqlState": "02000",
                "statementHandle": "h-2"
            })))
            .mount(&server)
            .await;

        let err = client(&server).execute("SELECT * FROM NOPE").await.unwrap_err();
        match err {
            CliError::Snowflake { code, message } => {
                assert_eq!(code, "002003");
                assert!(message.contains("does not exist"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_unauthorized_without_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).execute("SELECT 1").await.unwrap_err();
        assert!(err.to_string().contains("GSP_SNOWFLAKE_TOKEN"));
    }

    #[tokio::test]
    async fn test_execute_fetches_partitions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resultSetMetaData": {
                    "rowType": [{"name": "FILE_NAME"}],
                    "partitionInfo": [{"rowCount": 1}, {"rowCount": 2}]
                },
                "data": [["a.csv"]],
                "statementHandle": "h-3"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/statements/h-3"))
            .and(query_param("partition", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [["b.csv"], ["c.csv"]]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server).execute("SELECT FILE_NAME").await.unwrap();
        assert_eq!(result.rows.len(), 3);
        assert_eq!(result.rows[2][0].as_deref(), Some("c.csv"));
    }
}
