//! Rust analyzer

use super::base::{is_line_comment, scan_lines, todo_markers, Analyzer, AnalyzerKind, LineRule};
use crate::models::{Issue, IssueCategory, IssueSeverity};
use regex::Regex;
use std::sync::OnceLock;

static RULES: OnceLock<Vec<LineRule>> = OnceLock::new();
static PUB_FN: OnceLock<Regex> = OnceLock::new();

fn rules() -> &'static [LineRule] {
    RULES.get_or_init(|| {
        vec![
            LineRule::new(
                r#"(?i)(password|secret|token|api[_-]?key)\s*[:=]\s*["'][\w\-]{8,}["']"#,
                IssueCategory::Security,
                IssueSeverity::Error,
                "Potential hardcoded credential detected",
                "Use environment variables or secure configuration management for credentials.",
            ),
            LineRule::new(
                r"^\s*unsafe\s*\{",
                IssueCategory::Security,
                IssueSeverity::Warning,
                "Use of unsafe block",
                "Ensure unsafe code is necessary and well-documented. Consider safe alternatives.",
            ),
            LineRule::new(
                r#"\.expect\(\s*""\s*\)"#,
                IssueCategory::Bug,
                IssueSeverity::Info,
                "expect() called with empty message",
                "Provide a meaningful error message to expect().",
            ),
        ]
    })
}

pub struct RustAnalyzer;

impl RustAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for RustAnalyzer {
    fn name(&self) -> &'static str {
        "RustAnalyzer"
    }

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Rust
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &[".rs"]
    }

    fn analyze(&self, file_path: &str, content: &str) -> Vec<Issue> {
        let pub_fn = PUB_FN.get_or_init(|| Regex::new(r"^\s*pub\s+fn\s+\w+").expect("valid regex"));
        let mut issues = scan_lines(file_path, content, rules());
        let lines: Vec<&str> = content.lines().collect();

        for (idx, line) in lines.iter().enumerate() {
            if is_line_comment(line) {
                continue;
            }

            if line.contains(".unwrap()") {
                issues.push(
                    Issue::new(
                        IssueCategory::Bug,
                        IssueSeverity::Warning,
                        file_path,
                        idx + 1,
                        "Use of unwrap() can cause panic",
                    )
                    .with_recommendation(
                        "Use pattern matching, if let, or expect() with a descriptive message instead.",
                    ),
                );
            }

            if line.contains("for ") && line.contains(".clone()") {
                issues.push(
                    Issue::new(
                        IssueCategory::Performance,
                        IssueSeverity::Warning,
                        file_path,
                        idx + 1,
                        "Cloning in loop may impact performance",
                    )
                    .with_recommendation("Consider using references or restructuring to avoid unnecessary clones."),
                );
            }

            if pub_fn.is_match(line) && !is_documented(&lines, idx) {
                issues.push(
                    Issue::new(
                        IssueCategory::Maintainability,
                        IssueSeverity::Info,
                        file_path,
                        idx + 1,
                        "Public function without documentation comment",
                    )
                    .with_recommendation("Add /// documentation comments for public APIs."),
                );
            }
        }

        issues.extend(todo_markers(file_path, content));
        issues
    }
}

/// Walk back over attributes looking for a `///` doc line
fn is_documented(lines: &[&str], idx: usize) -> bool {
    lines[..idx]
        .iter()
        .rev()
        .map(|l| l.trim())
        .find(|l| !l.starts_with("#["))
        .is_some_and(|l| l.starts_with("///") || l.ends_with("*/"))
}
