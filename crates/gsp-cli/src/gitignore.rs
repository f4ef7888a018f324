//! Keeps local state and credentials out of version control

use crate::error::Result;
use std::fs;
use std::path::Path;

const SECTION_MARKER: &str = "# gsp local state";

/// `.env` may hold `GSP_SNOWFLAKE_TOKEN`.
const ENTRIES: &[&str] = &[".gsp/", ".env"];

/// Add the gsp entries to `.gitignore`, creating it if needed
///
/// Idempotent: entries already present anywhere in the file are not repeated.
pub fn update_gitignore(project_dir: &Path) -> Result<bool> {
    let path = project_dir.join(".gitignore");
    let content = if path.exists() {
        fs::read_to_string(&path)?
    } else {
        String::new()
    };

    let missing = missing_entries(&content);
    if missing.is_empty() {
        return Ok(false);
    }

    let mut updated = content;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    if !updated.contains(SECTION_MARKER) {
        if !updated.is_empty() {
            updated.push('\n');
        }
        updated.push_str(SECTION_MARKER);
        updated.push('\n');
    }
    for entry in missing {
        updated.push_str(entry);
        updated.push('\n');
    }

    fs::write(&path, updated)?;
    Ok(true)
}

fn missing_entries(content: &str) -> Vec<&'static str> {
    ENTRIES
        .iter()
        .copied()
        .filter(|entry| !content.lines().any(|line| line.trim() == *entry))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_gitignore() {
        let dir = TempDir::new().unwrap();
        assert!(update_gitignore(dir.path()).unwrap());

        let content = fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert!(content.starts_with(SECTION_MARKER));
        assert!(content.lines().any(|l| l == ".gsp/"));
        assert!(content.lines().any(|l| l == ".env"));
    }

    #[test]
    fn test_appends_to_existing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "target/").unwrap();
        update_gitignore(dir.path()).unwrap();

        let content = fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert!(content.starts_with("target/\n\n# gsp local state\n"));
    }

    #[test]
    fn test_idempotent() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), ".env\n").unwrap();
        assert!(update_gitignore(dir.path()).unwrap());
        assert!(!update_gitignore(dir.path()).unwrap());

        let content = fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(content.matches(".env").count(), 1);
        assert_eq!(content.matches(".gsp/").count(), 1);
    }
}
