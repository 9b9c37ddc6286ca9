//! Cache path utilities
//!
//! Everything lives under one user-level directory because the knowledge
//! base is keyed by content, not by repository:
//! `~/.cache/codereview/` on Unix, `%LOCALAPPDATA%/codereview/` on Windows.
//! `CODEREVIEW_CACHE_DIR` overrides the location.

use std::path::{Path, PathBuf};

pub const CACHE_DIR_ENV: &str = "CODEREVIEW_CACHE_DIR";

/// Root cache directory
pub fn get_cache_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }

    let base = if cfg!(windows) {
        std::env::var("LOCALAPPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".")))
    } else {
        dirs::cache_dir().unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".cache"))
                .unwrap_or_else(|| PathBuf::from("."))
        })
    };

    base.join("codereview")
}

/// Knowledge base file inside `cache_dir`
pub fn knowledge_base_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("knowledge_base.json")
}

/// Scan history directory inside `cache_dir`
pub fn history_dir(cache_dir: &Path) -> PathBuf {
    cache_dir.join("history")
}

/// Ensure the cache directory exists.
pub fn ensure_cache_dir(cache_dir: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(cache_dir)?;
    Ok(cache_dir.to_path_buf())
}
