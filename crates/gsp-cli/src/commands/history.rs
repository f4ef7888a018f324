//! `gsp history` command implementation

use crate::commands::{connect, load_manifest, new_table, print_json};
use crate::config::Config;
use crate::error::Result;
use crate::monitor::{self, CopyHistory, LoadStatus};
use crate::OutputFormat;
use colored::Colorize;
use comfy_table::{Cell, Color};
use std::path::Path;

pub async fn run(manifest_path: &Path, hours: u32, file: Option<String>, format: OutputFormat) -> Result<()> {
    let manifest = load_manifest(manifest_path)?;
    let config = Config::load()?;
    let sql = connect(&config, &manifest)?;

    let mut history = monitor::fetch_copy_history(&sql, &manifest, hours).await?;
    if let Some(path) = file.as_deref() {
        history = filter_file(history, path);
    }

    match format {
        OutputFormat::Json => print_json(&history),
        OutputFormat::Table => {
            print_history(&history, hours);
            Ok(())
        }
    }
}

fn filter_file(history: CopyHistory, path: &str) -> CopyHistory {
    CopyHistory {
        entries: history.entries.into_iter().filter(|e| e.matches(path)).collect(),
    }
}

fn status_cell(status: &LoadStatus) -> Cell {
    let color = match status {
        LoadStatus::Loaded => Color::Green,
        LoadStatus::LoadFailed => Color::Red,
        LoadStatus::PartiallyLoaded => Color::Yellow,
        LoadStatus::LoadSkipped | LoadStatus::Unknown(_) => Color::Grey,
    };
    Cell::new(status.to_string()).fg(color)
}

fn print_history(history: &CopyHistory, hours: u32) {
    if history.is_empty() {
        println!("{} No loads in the last {}h", "→".cyan(), hours);
        return;
    }

    let mut table = new_table();
    table.set_header(vec!["File", "Loaded at", "Status", "Rows", "Errors", "First error"]);
    for entry in &history.entries {
        table.add_row(vec![
            Cell::new(&entry.file_name),
            Cell::new(entry.last_load_time.as_deref().unwrap_or("-")),
            status_cell(&entry.status),
            Cell::new(entry.row_count),
            Cell::new(entry.error_count),
            Cell::new(entry.first_error_message.as_deref().unwrap_or("")),
        ]);
    }
    println!("{}", table);

    let summary = history.summary();
    println!(
        "{} {} files: {} loaded, {} failed, {} partially loaded, {} rows",
        "→".cyan(),
        summary.files,
        summary.loaded,
        summary.failed,
        summary.partially_loaded,
        summary.rows_loaded
    );

    for (file, count) in history.duplicate_loads() {
        println!("  {} {} loaded {} times with the same row count", "!".yellow().bold(), file, count);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::monitor::copy_history::tests::history;

    #[test]
    fn test_filter_file() {
        let rs = history(&[
            ("orders/a.csv", "LOADED", 10, None),
            ("orders/b.csv", "LOADED", 5, None),
            ("orders/a.csv", "LOAD_FAILED", 0, Some("bad row")),
        ]);
        let filtered = filter_file(CopyHistory::from_result_set(&rs).unwrap(), "a.csv");
        assert_eq!(filtered.entries.len(), 2);
        assert!(filtered.entries.iter().all(|e| e.file_name == "orders/a.csv"));
    }
}
