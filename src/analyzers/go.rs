//! Go analyzer

use super::base::{is_line_comment, scan_lines, todo_markers, Analyzer, AnalyzerKind, LineRule};
use crate::models::{Issue, IssueCategory, IssueSeverity};
use std::sync::OnceLock;

static RULES: OnceLock<Vec<LineRule>> = OnceLock::new();

fn rules() -> &'static [LineRule] {
    RULES.get_or_init(|| {
        vec![
            LineRule::new(
                r#"(?i)(password|secret|token|api[_-]?key)\s*(:=|[:=])\s*["'`][\w\-]{8,}["'`]"#,
                IssueCategory::Security,
                IssueSeverity::Error,
                "Potential hardcoded credential detected",
                "Use environment variables or secure configuration management for credentials.",
            ),
            LineRule::new(
                r#"^\s*[a-zA-Z_]\w*\s*,\s*_\s*:?="#,
                IssueCategory::Bug,
                IssueSeverity::Warning,
                "Error value ignored",
                "Always check error return values in Go.",
            ),
            LineRule::new(
                r"if\s+err\s*!=\s*nil\s*\{\s*\}",
                IssueCategory::Bug,
                IssueSeverity::Error,
                "Empty error check block",
                "Handle errors appropriately instead of ignoring them.",
            ),
            LineRule::new(
                r#"import\s+(_\s+)?"unsafe""#,
                IssueCategory::Security,
                IssueSeverity::Warning,
                "Use of unsafe package",
                "Avoid using the unsafe package unless absolutely necessary.",
            ),
        ]
    })
}

pub struct GoAnalyzer;

impl GoAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GoAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for GoAnalyzer {
    fn name(&self) -> &'static str {
        "GoAnalyzer"
    }

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Go
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &[".go"]
    }

    fn analyze(&self, file_path: &str, content: &str) -> Vec<Issue> {
        let mut issues = scan_lines(file_path, content, rules());

        for (idx, line) in content.lines().enumerate() {
            if is_line_comment(line) {
                continue;
            }
            let runs_query = line.contains("Exec(") || line.contains("Query(");
            if runs_query && (line.contains('+') || line.contains("fmt.Sprintf")) {
                issues.push(
                    Issue::new(
                        IssueCategory::Security,
                        IssueSeverity::Error,
                        file_path,
                        idx + 1,
                        "Potential SQL injection vulnerability",
                    )
                    .with_recommendation("Use parameterized queries instead of string concatenation."),
                );
            }
        }

        issues.extend(todo_markers(file_path, content));
        issues
    }
}
