//! Caching for remote review results
//!
//! Two layers:
//!
//! - [`ResponseCache`]: in-process, keyed by path plus content hash, with a
//!   TTL. Lives as long as the orchestrator that owns it.
//! - [`KnowledgeBase`]: persistent, keyed by content hash alone, so identical
//!   content anywhere in any tree reuses earlier findings.

pub mod knowledge;
pub mod paths;

pub use knowledge::{JsonKnowledgeBase, KnowledgeBase, KnowledgeEntry, MemoryKnowledgeBase};
pub use paths::{ensure_cache_dir, get_cache_dir, history_dir, knowledge_base_path};

use crate::models::RawIssue;
use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Lowercase hex SHA-256 of file content
pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[derive(Debug, Clone)]
struct CacheEntry {
    issues: Vec<RawIssue>,
    stored_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
}

/// Thread-safe TTL cache of raw remote results.
///
/// Empty results are stored like any other: "analyzed, nothing found" must
/// not trigger another call.
#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    fn key(file_path: &str, hash: &str) -> String {
        format!("{}:{}", file_path, hash)
    }

    pub fn get(&self, file_path: &str, content: &str) -> Option<Vec<RawIssue>> {
        self.get_by_hash(file_path, &content_hash(content))
    }

    pub fn set(&self, file_path: &str, content: &str, issues: Vec<RawIssue>) {
        self.set_by_hash(file_path, &content_hash(content), issues)
    }

    pub fn get_by_hash(&self, file_path: &str, hash: &str) -> Option<Vec<RawIssue>> {
        self.get_at(file_path, hash, Instant::now())
    }

    pub fn set_by_hash(&self, file_path: &str, hash: &str, issues: Vec<RawIssue>) {
        self.set_at(file_path, hash, issues, Instant::now())
    }

    pub(crate) fn get_at(&self, file_path: &str, hash: &str, now: Instant) -> Option<Vec<RawIssue>> {
        let key = Self::key(file_path, hash);
        if let Some(entry) = self.entries.get(&key) {
            if !self.is_expired(&entry, now) {
                return Some(entry.issues.clone());
            }
        } else {
            return None;
        }
        self.entries.remove_if(&key, |_, e| self.is_expired(e, now));
        None
    }

    pub(crate) fn set_at(&self, file_path: &str, hash: &str, issues: Vec<RawIssue>, now: Instant) {
        self.entries.insert(
            Self::key(file_path, hash),
            CacheEntry {
                issues,
                stored_at: now,
            },
        );
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) >= self.ttl
    }

    /// Drop expired entries, returning how many were removed
    pub fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(Instant::now())
    }

    pub(crate) fn cleanup_expired_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now.saturating_duration_since(entry.stored_at) < self.ttl);
        before - self.entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let total = self.entries.len();
        let expired = self
            .entries
            .iter()
            .filter(|e| self.is_expired(e.value(), now))
            .count();
        CacheStats {
            total_entries: total,
            valid_entries: total - expired,
            expired_entries: expired,
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
