//! Base analyzer trait and shared helpers
//!
//! This module defines the core abstractions for file analysis:
//! - `Analyzer` trait that every analyzer implements
//! - `AnalyzerKind`, the closed set of analyzer tags
//! - `AnalyzerResult` for capturing one analyzer run over one file
//! - `LineRule` for the line-oriented regex checks most pattern analyzers use

use crate::models::{Issue, IssueCategory, IssueSeverity};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Tag for every analyzer the registry knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalyzerKind {
    Remote,
    Python,
    JavaScript,
    Sql,
    Json,
    Go,
    Java,
    Rust,
}

impl AnalyzerKind {
    pub fn is_remote(&self) -> bool {
        matches!(self, AnalyzerKind::Remote)
    }
}

/// Result from running a single analyzer over a single file
#[derive(Debug, Clone)]
pub struct AnalyzerResult {
    pub analyzer_name: String,
    pub issues: Vec<Issue>,
    pub duration_ms: u64,
    pub success: bool,
    pub error: Option<String>,
}

impl AnalyzerResult {
    pub fn success(analyzer_name: String, issues: Vec<Issue>, duration_ms: u64) -> Self {
        Self {
            analyzer_name,
            issues,
            duration_ms,
            success: true,
            error: None,
        }
    }

    pub fn failure(analyzer_name: String, error: String, duration_ms: u64) -> Self {
        Self {
            analyzer_name,
            issues: Vec::new(),
            duration_ms,
            success: false,
            error: Some(error),
        }
    }
}

/// Trait for all analyzers
///
/// An analyzer claims a fixed set of file extensions and turns one file's
/// content into zero or more [`Issue`]s. `analyze` must not fail on
/// malformed input: a parse failure is reported as a single `bug/error`
/// issue instead.
///
/// # Example Implementation
///
/// ```ignore
/// pub struct TomlAnalyzer;
///
/// impl Analyzer for TomlAnalyzer {
///     fn name(&self) -> &'static str { "TomlAnalyzer" }
///     fn kind(&self) -> AnalyzerKind { AnalyzerKind::Json }
///     fn supported_extensions(&self) -> &'static [&'static str] { &[".toml"] }
///     fn analyze(&self, path: &str, content: &str) -> Vec<Issue> { vec![] }
/// }
/// ```
pub trait Analyzer: Send + Sync {
    /// Unique identifier for this analyzer
    fn name(&self) -> &'static str;

    fn kind(&self) -> AnalyzerKind;

    /// Lowercase extensions including the leading dot
    fn supported_extensions(&self) -> &'static [&'static str];

    /// True iff the path's lowercase extension is supported
    fn can_analyze(&self, path: &Path) -> bool {
        match extension_of(path) {
            Some(ext) => self.supported_extensions().contains(&ext.as_str()),
            None => false,
        }
    }

    fn analyze(&self, file_path: &str, content: &str) -> Vec<Issue>;

    /// Pattern analyzers are always available
    fn is_available(&self) -> bool {
        true
    }
}

/// Lowercase extension with the leading dot, e.g. `".py"`
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
}

/// Language tag used in prompts and language detection
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    let lang = match ext {
        ".py" | ".pyw" => "python",
        ".js" | ".jsx" | ".mjs" => "javascript",
        ".ts" | ".tsx" => "typescript",
        ".sql" => "sql",
        ".json" => "json",
        ".go" => "go",
        ".java" => "java",
        ".rs" => "rust",
        _ => return None,
    };
    Some(lang)
}

/// Language tag for a path, `"text"` when the extension is unknown
pub fn language_for_path(path: &Path) -> &'static str {
    extension_of(path)
        .and_then(|ext| language_for_extension(&ext))
        .unwrap_or("text")
}

/// A single line-oriented regex check
pub struct LineRule {
    pub pattern: Regex,
    pub category: IssueCategory,
    pub severity: IssueSeverity,
    pub description: &'static str,
    pub recommendation: &'static str,
}

impl LineRule {
    pub fn new(
        pattern: &str,
        category: IssueCategory,
        severity: IssueSeverity,
        description: &'static str,
        recommendation: &'static str,
    ) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("valid rule pattern"),
            category,
            severity,
            description,
            recommendation,
        }
    }

    fn issue(&self, file_path: &str, line: usize) -> Issue {
        Issue::new(self.category, self.severity, file_path, line, self.description)
            .with_recommendation(self.recommendation)
    }
}

/// Run every rule over every line. Each match yields its own issue.
pub fn scan_lines(file_path: &str, content: &str, rules: &[LineRule]) -> Vec<Issue> {
    let mut issues = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        for rule in rules {
            if rule.pattern.is_match(line) {
                issues.push(rule.issue(file_path, idx + 1));
            }
        }
    }
    issues
}

/// Secret rules stop at the first hit per line and only look at the head of a file
pub fn scan_secrets(
    file_path: &str,
    content: &str,
    rules: &[LineRule],
    max_lines: usize,
) -> Vec<Issue> {
    content
        .lines()
        .take(max_lines)
        .enumerate()
        .filter_map(|(idx, line)| {
            rules
                .iter()
                .find(|rule| rule.pattern.is_match(line))
                .map(|rule| rule.issue(file_path, idx + 1))
        })
        .collect()
}

static TODO_MARKER: OnceLock<Regex> = OnceLock::new();

/// `// TODO`, `// FIXME`, `// HACK` and `// XXX` comments
pub fn todo_markers(file_path: &str, content: &str) -> Vec<Issue> {
    let marker = TODO_MARKER
        .get_or_init(|| Regex::new(r"(?i)//\s*(TODO|FIXME|HACK|XXX)").expect("valid regex"));
    content
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let caps = marker.captures(line)?;
            let tag = caps.get(1)?.as_str().to_ascii_uppercase();
            Some(
                Issue::new(
                    IssueCategory::Maintainability,
                    IssueSeverity::Info,
                    file_path,
                    idx + 1,
                    format!("Found {} comment", tag),
                )
                .with_recommendation("Address or document these items for better code maintainability."),
            )
        })
        .collect()
}

/// True for lines that are entirely a `//` comment
pub fn is_line_comment(line: &str) -> bool {
    line.trim_start().starts_with("//")
}
