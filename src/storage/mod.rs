//! Scan history
//!
//! Finished scans are stored one JSON document per scan under the cache
//! directory (`~/.cache/codereview/history/<scan_id>.json`).

use crate::models::{Scan, ScanRecord};
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Persistent store of finished scans
pub trait ScanHistory: Send + Sync {
    fn save(&self, scan: &Scan) -> Result<()>;

    fn get(&self, scan_id: &str) -> Result<Option<Scan>>;

    /// Newest first, optionally restricted to one repository path
    fn list(&self, repo_path: Option<&str>, limit: usize) -> Result<Vec<ScanRecord>>;
}

#[derive(Debug, Clone)]
pub struct FileScanHistory {
    dir: PathBuf,
}

impl FileScanHistory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn scan_path(&self, scan_id: &str) -> Option<PathBuf> {
        // Ids are uuids; anything with a path separator is not ours
        if scan_id.is_empty() || scan_id.contains(['/', '\\', '.']) {
            return None;
        }
        Some(self.dir.join(format!("{}.json", scan_id)))
    }

    fn read_scan(path: &Path) -> Result<Scan> {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Remove every stored scan, returning how many were deleted
    pub fn clear(&self) -> Result<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir).context("Failed to read history directory")? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl ScanHistory for FileScanHistory {
    fn save(&self, scan: &Scan) -> Result<()> {
        let path = self
            .scan_path(&scan.id)
            .with_context(|| format!("Invalid scan id: {}", scan.id))?;
        fs::create_dir_all(&self.dir).context("Failed to create history directory")?;

        let tmp_file = path.with_extension("tmp");
        let file = File::create(&tmp_file).context("Failed to create temp history file")?;
        serde_json::to_writer_pretty(BufWriter::new(file), scan)
            .context("Failed to write scan history")?;
        fs::rename(&tmp_file, &path).context("Failed to rename temp history file")?;

        debug!("Saved scan {} to {}", scan.id, path.display());
        Ok(())
    }

    fn get(&self, scan_id: &str) -> Result<Option<Scan>> {
        match self.scan_path(scan_id) {
            Some(path) if path.exists() => Self::read_scan(&path).map(Some),
            _ => Ok(None),
        }
    }

    fn list(&self, repo_path: Option<&str>, limit: usize) -> Result<Vec<ScanRecord>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir).context("Failed to read history directory")? {
            let path = entry?.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            match Self::read_scan(&path) {
                Ok(scan) => {
                    if repo_path.is_none_or(|repo| scan.repo_path == repo) {
                        records.push(scan.record());
                    }
                }
                Err(e) => warn!("Skipping unreadable history entry: {:#}", e),
            }
        }

        records.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        records.truncate(limit);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Issue, IssueCategory, IssueSeverity, ScanStatus};
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn scan(id: &str, repo: &str, minutes_ago: i64) -> Scan {
        let mut scan = Scan::new(id, repo);
        scan.start_time = Utc::now() - Duration::minutes(minutes_ago);
        scan.status = ScanStatus::Completed;
        scan.issues.push(Issue::new(
            IssueCategory::Bug,
            IssueSeverity::Error,
            "a.py",
            1,
            "Syntax error: invalid syntax",
        ));
        scan
    }

    #[test]
    fn test_save_and_get() {
        let tmp = TempDir::new().unwrap();
        let history = FileScanHistory::new(tmp.path().join("history"));
        history.save(&scan("s1", "/repo", 0)).unwrap();

        let loaded = history.get("s1").unwrap().unwrap();
        assert_eq!(loaded.issues.len(), 1);
        assert_eq!(loaded.status, ScanStatus::Completed);
        assert!(history.get("missing").unwrap().is_none());
        assert!(history.get("../etc/passwd").unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first_with_filter() {
        let tmp = TempDir::new().unwrap();
        let history = FileScanHistory::new(tmp.path());
        history.save(&scan("old", "/a", 30)).unwrap();
        history.save(&scan("new", "/a", 1)).unwrap();
        history.save(&scan("other", "/b", 5)).unwrap();
        fs::write(tmp.path().join("junk.json"), "{").unwrap();

        let all = history.list(None, 10).unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.scan_id.as_str()).collect();
        assert_eq!(ids, vec!["new", "other", "old"]);
        assert_eq!(all[0].total_issues, 1);

        let only_a = history.list(Some("/a"), 1).unwrap();
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].scan_id, "new");
    }

    #[test]
    fn test_clear() {
        let tmp = TempDir::new().unwrap();
        let history = FileScanHistory::new(tmp.path());
        history.save(&scan("s1", "/a", 0)).unwrap();
        assert_eq!(history.clear().unwrap(), 1);
        assert!(history.list(None, 10).unwrap().is_empty());
    }
}
