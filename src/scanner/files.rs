//! Source file collection
//!
//! Walks the repository with `ignore`, pruning configured directory names,
//! caller globs and paths listed in `.codereviewignore`. VCS ignore files are
//! not consulted. Keeps files some analyzer understands that fit the size
//! limit.

use crate::analyzers::AnalyzerRegistry;
use crate::config::AnalysisConfig;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-repository ignore file honored alongside `.gitignore`
pub const IGNORE_FILE: &str = ".codereviewignore";

/// A file selected for analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Repo-relative, `/`-separated
    pub relative: String,
}

/// Compile exclude globs. Patterns match repo-relative `/` paths; `*` may
/// cross directory boundaries and a trailing `/` is ignored.
pub fn build_exclude_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let trimmed = pattern.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            continue;
        }
        let glob = Glob::new(trimmed).with_context(|| format!("Invalid exclude pattern: {}", pattern))?;
        builder.add(glob);
    }
    builder.build().context("Failed to build exclude patterns")
}

/// Repo-relative path with forward slashes
pub fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Walker shared by file collection and language sampling
pub(crate) fn walker(root: &Path, exclude_dirs: &[String], excludes: Arc<GlobSet>) -> ignore::Walk {
    let pruned: HashSet<String> = exclude_dirs.iter().cloned().collect();
    let root_buf = root.to_path_buf();

    let mut builder = WalkBuilder::new(root);
    // No VCS ignore files: only pruned names, caller globs and
    // `.codereviewignore` hide paths
    builder
        .standard_filters(false)
        .hidden(false)
        .follow_links(false)
        .add_custom_ignore_filename(IGNORE_FILE)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            if is_dir && pruned.contains(entry.file_name().to_string_lossy().as_ref()) {
                return false;
            }
            excludes.is_empty() || !excludes.is_match(relative_path(&root_buf, entry.path()))
        });
    builder.build()
}

/// Enumerate analyzable files under `root`
pub fn collect_files(
    root: &Path,
    config: &AnalysisConfig,
    excludes: Arc<GlobSet>,
    registry: &AnalyzerRegistry,
) -> Vec<SourceFile> {
    let mut files = Vec::new();

    for entry in walker(root, &config.exclude_dirs, excludes) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable path: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let path = entry.path();
        if !registry.is_supported(path) {
            continue;
        }

        match entry.metadata() {
            Ok(meta) if meta.len() > config.max_file_size => {
                debug!("Skipping {} ({} bytes over limit)", path.display(), meta.len());
                continue;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Cannot stat {}: {}", path.display(), e);
                continue;
            }
        }

        files.push(SourceFile {
            relative: relative_path(root, path),
            path: path.to_path_buf(),
        });
    }

    files
}

/// Read a file, replacing invalid UTF-8 instead of failing
pub fn read_lossy(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}
