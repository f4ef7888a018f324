//! SQL API endpoint URL builders

/// Submit a statement
pub fn statements_url(base_url: &str, request_id: &str) -> String {
    format!(
        "{}/api/v2/statements?requestId={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(request_id)
    )
}

/// Status / result of a submitted statement
pub fn statement_status_url(base_url: &str, handle: &str) -> String {
    format!(
        "{}/api/v2/statements/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(handle)
    )
}

/// One result partition of a finished statement
pub fn partition_url(base_url: &str, handle: &str, partition: usize) -> String {
    format!("{}?partition={}", statement_status_url(base_url, handle), partition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_url() {
        assert_eq!(
            statements_url("https://acme.snowflakecomputing.com/", "abc-123"),
            "https://acme.snowflakecomputing.com/api/v2/statements?requestId=abc-123"
        );
    }

    #[test]
    fn test_status_and_partition_urls() {
        assert_eq!(
            statement_status_url("http://localhost:9000", "01b2-x"),
            "http://localhost:9000/api/v2/statements/01b2-x"
        );
        assert_eq!(
            partition_url("http://localhost:9000", "h/1", 2),
            "http://localhost:9000/api/v2/statements/h%2F1?partition=2"
        );
    }
}
