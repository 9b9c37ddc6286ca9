//! Persistent knowledge base of prior remote findings
//!
//! Entries are keyed by content hash alone. Saving the same hash again
//! replaces the entry (last write wins), so concurrent identical writes are
//! harmless.

use crate::models::RawIssue;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

const KB_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub issues: Vec<RawIssue>,
    pub timestamp: DateTime<Utc>,
    /// Producer tag, e.g. `"llm"`
    pub source: String,
}

/// Content-hash keyed store consulted before any remote call
pub trait KnowledgeBase: Send + Sync {
    fn get(&self, content_hash: &str) -> Option<Vec<RawIssue>>;

    fn save(&self, content_hash: &str, issues: &[RawIssue], source: &str) -> Result<()>;

    /// Full entry including timestamp and source
    fn entry(&self, content_hash: &str) -> Option<KnowledgeEntry>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persist pending writes. No-op for in-memory stores.
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()>;
}

/// In-memory knowledge base for tests and `--no-history` style runs
#[derive(Debug, Default)]
pub struct MemoryKnowledgeBase {
    entries: DashMap<String, KnowledgeEntry>,
}

impl MemoryKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KnowledgeBase for MemoryKnowledgeBase {
    fn get(&self, content_hash: &str) -> Option<Vec<RawIssue>> {
        self.entries.get(content_hash).map(|e| e.issues.clone())
    }

    fn save(&self, content_hash: &str, issues: &[RawIssue], source: &str) -> Result<()> {
        self.entries.insert(
            content_hash.to_string(),
            KnowledgeEntry {
                issues: issues.to_vec(),
                timestamp: Utc::now(),
                source: source.to_string(),
            },
        );
        Ok(())
    }

    fn entry(&self, content_hash: &str) -> Option<KnowledgeEntry> {
        self.entries.get(content_hash).map(|e| e.clone())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct KnowledgeFile {
    version: u32,
    entries: HashMap<String, KnowledgeEntry>,
}

/// Knowledge base persisted as a single JSON file.
///
/// Writes go to memory and are flushed with a temp-file rename; `Drop`
/// flushes anything still pending.
#[derive(Debug)]
pub struct JsonKnowledgeBase {
    path: PathBuf,
    entries: DashMap<String, KnowledgeEntry>,
    dirty: AtomicBool,
}

impl JsonKnowledgeBase {
    /// Open (or start) the store at `path`. A missing, unreadable or
    /// version-mismatched file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries: DashMap<String, KnowledgeEntry> = match Self::load(&path) {
            Ok(Some(loaded)) => {
                debug!("Loaded {} knowledge base entries from {:?}", loaded.len(), path);
                loaded.into_iter().collect()
            }
            Ok(None) => {
                debug!("No knowledge base at {:?}", path);
                DashMap::new()
            }
            Err(e) => {
                warn!("Failed to load knowledge base {:?}: {}", path, e);
                DashMap::new()
            }
        };
        Self {
            path,
            entries,
            dirty: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drop entries written before `cutoff`, returning how many were removed
    pub fn prune_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.timestamp >= cutoff);
        let removed = before - self.entries.len();
        if removed > 0 {
            self.dirty.store(true, Ordering::Release);
        }
        removed
    }

    fn load(path: &Path) -> Result<Option<HashMap<String, KnowledgeEntry>>> {
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(path).context("Failed to open knowledge base")?;
        let data: KnowledgeFile =
            serde_json::from_reader(BufReader::new(file)).context("Failed to parse knowledge base")?;
        if data.version != KB_VERSION {
            info!(
                "Knowledge base version mismatch (got {}, expected {}), starting fresh",
                data.version, KB_VERSION
            );
            return Ok(None);
        }
        Ok(Some(data.entries))
    }
}

impl KnowledgeBase for JsonKnowledgeBase {
    fn get(&self, content_hash: &str) -> Option<Vec<RawIssue>> {
        self.entries.get(content_hash).map(|e| e.issues.clone())
    }

    fn save(&self, content_hash: &str, issues: &[RawIssue], source: &str) -> Result<()> {
        self.entries.insert(
            content_hash.to_string(),
            KnowledgeEntry {
                issues: issues.to_vec(),
                timestamp: Utc::now(),
                source: source.to_string(),
            },
        );
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }

    fn entry(&self, content_hash: &str) -> Option<KnowledgeEntry> {
        self.entries.get(content_hash).map(|e| e.clone())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn flush(&self) -> Result<()> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        let result = (|| -> Result<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent).context("Failed to create knowledge base directory")?;
            }
            let data = KnowledgeFile {
                version: KB_VERSION,
                entries: self
                    .entries
                    .iter()
                    .map(|e| (e.key().clone(), e.value().clone()))
                    .collect(),
            };

            // Write to temp file first, then rename (atomic on POSIX)
            let tmp_file = self.path.with_extension("tmp");
            let file = File::create(&tmp_file).context("Failed to create temp knowledge base file")?;
            serde_json::to_writer(BufWriter::new(file), &data)
                .context("Failed to write knowledge base")?;
            fs::rename(&tmp_file, &self.path).context("Failed to rename temp knowledge base")?;

            debug!("Saved knowledge base with {} entries", data.entries.len());
            Ok(())
        })();

        if result.is_err() {
            self.dirty.store(true, Ordering::Release);
        }
        result
    }

    fn clear(&self) -> Result<()> {
        self.entries.clear();
        self.dirty.store(false, Ordering::Release);
        if self.path.exists() {
            fs::remove_file(&self.path).context("Failed to remove knowledge base")?;
        }
        Ok(())
    }
}

impl Drop for JsonKnowledgeBase {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("Failed to save knowledge base on drop: {}", e);
        }
    }
}
