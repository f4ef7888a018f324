//! `COPY_HISTORY` rows

use crate::error::Result;
use crate::snowflake::ResultSet;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Load outcome of one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LoadStatus {
    Loaded,
    LoadFailed,
    PartiallyLoaded,
    LoadSkipped,
    Unknown(String),
}

impl LoadStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().replace(' ', "_").as_str() {
            "LOADED" => LoadStatus::Loaded,
            "LOAD_FAILED" => LoadStatus::LoadFailed,
            "PARTIALLY_LOADED" => LoadStatus::PartiallyLoaded,
            "LOAD_SKIPPED" => LoadStatus::LoadSkipped,
            _ => LoadStatus::Unknown(s.to_string()),
        }
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStatus::Loaded => f.write_str("LOADED"),
            LoadStatus::LoadFailed => f.write_str("LOAD_FAILED"),
            LoadStatus::PartiallyLoaded => f.write_str("PARTIALLY_LOADED"),
            LoadStatus::LoadSkipped => f.write_str("LOAD_SKIPPED"),
            LoadStatus::Unknown(s) => f.write_str(s),
        }
    }
}

/// One `COPY_HISTORY` row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyHistoryEntry {
    pub file_name: String,
    pub last_load_time: Option<String>,
    pub status: LoadStatus,
    pub row_count: u64,
    pub row_parsed: u64,
    pub error_count: u64,
    pub first_error_message: Option<String>,
    pub pipe_name: Option<String>,
}

impl CopyHistoryEntry {
    /// Whether the entry refers to `path` (exact, or by trailing path segments)
    pub fn matches(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            return false;
        }
        self.file_name == path
            || self.file_name.ends_with(&format!("/{}", path))
            || path.ends_with(&format!("/{}", self.file_name))
    }
}

/// `COPY_HISTORY` result for the landing table
#[derive(Debug, Clone, Default, Serialize)]
pub struct CopyHistory {
    pub entries: Vec<CopyHistoryEntry>,
}

/// Aggregates over a history window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistorySummary {
    pub files: usize,
    pub loaded: usize,
    pub failed: usize,
    pub partially_loaded: usize,
    pub skipped: usize,
    pub rows_loaded: u64,
}

impl CopyHistory {
    /// Build from the rows of [`crate::ddl::copy_history`]
    pub fn from_result_set(rs: &ResultSet) -> Result<Self> {
        let entries = rs
            .rows
            .iter()
            .map(|row| {
                let text = |col: &str| rs.value(row, col).map(str::to_string);
                let number = |col: &str| {
                    rs.value(row, col)
                        .and_then(|v| v.trim().parse::<u64>().ok())
                        .unwrap_or(0)
                };

                CopyHistoryEntry {
                    file_name: text("FILE_NAME").unwrap_or_default(),
                    last_load_time: text("LAST_LOAD_TIME"),
                    status: LoadStatus::parse(rs.value(row, "STATUS").unwrap_or_default()),
                    row_count: number("ROW_COUNT"),
                    row_parsed: number("ROW_PARSED"),
                    error_count: number("ERROR_COUNT"),
                    first_error_message: text("FIRST_ERROR_MESSAGE").filter(|m| !m.is_empty()),
                    pipe_name: text("PIPE_NAME"),
                }
            })
            .collect();

        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries for one file
    pub fn for_file<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a CopyHistoryEntry> + 'a {
        self.entries.iter().filter(move |e| e.matches(path))
    }

    pub fn successful_loads(&self) -> impl Iterator<Item = &CopyHistoryEntry> {
        self.entries.iter().filter(|e| e.status == LoadStatus::Loaded)
    }

    /// Files with more than one `LOADED` entry of the same row count, with
    /// the size of the largest such group
    ///
    /// `COPY_HISTORY` carries no content checksum. A path reloaded with a
    /// different row count was replaced, not repeated.
    pub fn duplicate_loads(&self) -> Vec<(String, usize)> {
        let mut groups: HashMap<(&str, u64), usize> = HashMap::new();
        for entry in self.successful_loads() {
            *groups.entry((entry.file_name.as_str(), entry.row_count)).or_default() += 1;
        }

        let mut worst: HashMap<&str, usize> = HashMap::new();
        for ((file, _), n) in groups.into_iter().filter(|(_, n)| *n > 1) {
            let count = worst.entry(file).or_default();
            *count = (*count).max(n);
        }

        let mut duplicates: Vec<(String, usize)> = worst.into_iter().map(|(f, n)| (f.to_string(), n)).collect();
        duplicates.sort();
        duplicates
    }

    pub fn summary(&self) -> HistorySummary {
        let mut summary = HistorySummary {
            files: self.entries.len(),
            ..Default::default()
        };
        for entry in &self.entries {
            match entry.status {
                LoadStatus::Loaded => summary.loaded += 1,
                LoadStatus::LoadFailed => summary.failed += 1,
                LoadStatus::PartiallyLoaded => summary.partially_loaded += 1,
                LoadStatus::LoadSkipped => summary.skipped += 1,
                LoadStatus::Unknown(_) => {}
            }
            summary.rows_loaded += entry.row_count;
        }
        summary
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod tests {
    use super::*;
    use crate::ddl::COPY_HISTORY_COLUMNS;

    /// A `COPY_HISTORY` result set: (file, status, row_count, first_error)
    pub(crate) fn history(rows: &[(&str, &str, u64, Option<&str>)]) -> ResultSet {
        ResultSet::new(
            COPY_HISTORY_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|(file, status, count, error)| {
                    vec![
                        Some(file.to_string()),
                        Some("2024-05-02 10:15:04.121 -0700".to_string()),
                        Some(status.to_string()),
                        Some(count.to_string()),
                        Some(count.to_string()),
                        Some(if error.is_some() { "1" } else { "0" }.to_string()),
                        error.map(str::to_string),
                        Some("ORDERS_DB.PUBLIC.GCS_TO_SNOWFLAKE_PIPE".to_string()),
                    ]
                })
                .collect(),
        )
    }

    #[test]
    fn test_parse_rows() {
        let rs = history(&[
            ("orders/a.csv", "Loaded", 10, None),
            ("orders/bad.csv", "Load failed", 0, Some("Number of columns in file (3) does not match")),
        ]);
        let history = CopyHistory::from_result_set(&rs).unwrap();
        assert_eq!(history.entries.len(), 2);
        assert_eq!(history.entries[0].status, LoadStatus::Loaded);
        assert_eq!(history.entries[1].status, LoadStatus::LoadFailed);
        assert!(history.entries[1].first_error_message.as_deref().unwrap().contains("columns"));
    }

    #[test]
    fn test_load_status_parse() {
        assert_eq!(LoadStatus::parse("LOADED"), LoadStatus::Loaded);
        assert_eq!(LoadStatus::parse("partially_loaded"), LoadStatus::PartiallyLoaded);
        assert_eq!(LoadStatus::parse("Load skipped"), LoadStatus::LoadSkipped);
        assert_eq!(LoadStatus::parse("weird"), LoadStatus::Unknown("weird".to_string()));
    }

    #[test]
    fn test_for_file_matches_suffix() {
        let rs = history(&[("orders/2024/a.csv", "LOADED", 5, None), ("orders/b.csv", "LOADED", 1, None)]);
        let history = CopyHistory::from_result_set(&rs).unwrap();
        assert_eq!(history.for_file("orders/2024/a.csv").count(), 1);
        assert_eq!(history.for_file("a.csv").count(), 1);
        assert_eq!(history.for_file("gs://snowpipe-orders/orders/b.csv").count(), 1);
        assert_eq!(history.for_file("c.csv").count(), 0);
        assert_eq!(history.for_file("").count(), 0);
    }

    #[test]
    fn test_duplicates_and_summary() {
        let rs = history(&[
            ("a.csv", "LOADED", 5, None),
            ("a.csv", "LOADED", 5, None),
            ("b.csv", "LOADED", 2, None),
            ("b.csv", "LOADED", 3, None),
            ("c.csv", "LOAD_FAILED", 0, Some("bad")),
        ]);
        let history = CopyHistory::from_result_set(&rs).unwrap();
        assert_eq!(history.duplicate_loads(), vec![("a.csv".to_string(), 2)]);

        let summary = history.summary();
        assert_eq!(summary.files, 5);
        assert_eq!(summary.loaded, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.rows_loaded, 15);
    }
}
