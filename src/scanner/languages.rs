//! Best-effort language detection
//!
//! Samples file extensions under the repository (a bounded number of files
//! per directory). The result is a hint for reports; it never gates analysis.

use super::files::walker;
use crate::analyzers::language_for_extension;
use globset::GlobSet;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const UNKNOWN_LANGUAGE: &str = "unknown";

fn language_label(ext: &str) -> Option<&'static str> {
    match ext {
        ".jsx" | ".tsx" => Some("react"),
        other => language_for_extension(other),
    }
}

/// Languages seen in the first `sample_size` files of each directory, or
/// `{"unknown"}` when none are recognized
pub fn detect_languages(
    root: &Path,
    exclude_dirs: &[String],
    excludes: Arc<GlobSet>,
    sample_size: usize,
) -> BTreeSet<String> {
    let mut per_dir: HashMap<PathBuf, usize> = HashMap::new();
    let mut languages = BTreeSet::new();

    for entry in walker(root, exclude_dirs, excludes).flatten() {
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        let parent = path.parent().unwrap_or(root).to_path_buf();
        let seen = per_dir.entry(parent).or_insert(0);
        if *seen >= sample_size {
            continue;
        }
        *seen += 1;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()));
        if let Some(lang) = ext.as_deref().and_then(language_label) {
            languages.insert(lang.to_string());
        }
    }

    if languages.is_empty() {
        languages.insert(UNKNOWN_LANGUAGE.to_string());
    }
    languages
}
