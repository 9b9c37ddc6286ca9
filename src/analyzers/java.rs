//! Java analyzer

use super::base::{is_line_comment, scan_lines, todo_markers, Analyzer, AnalyzerKind, LineRule};
use crate::models::{Issue, IssueCategory, IssueSeverity};
use std::sync::OnceLock;

static RULES: OnceLock<Vec<LineRule>> = OnceLock::new();

fn rules() -> &'static [LineRule] {
    RULES.get_or_init(|| {
        vec![
            LineRule::new(
                r#"(?i)(password|secret|token|api[_-]?key)\s*=\s*["'][\w\-]{8,}["']"#,
                IssueCategory::Security,
                IssueSeverity::Error,
                "Potential hardcoded credential detected",
                "Use environment variables or secure configuration management for credentials.",
            ),
            LineRule::new(
                r"ObjectInputStream.*readObject|readObject.*ObjectInputStream",
                IssueCategory::Security,
                IssueSeverity::Warning,
                "Unsafe deserialization detected",
                "Validate and sanitize deserialized objects to prevent remote code execution.",
            ),
            LineRule::new(
                r"catch\s*\([^)]+\)\s*\{\s*\}",
                IssueCategory::Bug,
                IssueSeverity::Warning,
                "Empty catch block",
                "Handle exceptions appropriately or at least log them.",
            ),
            LineRule::new(
                r"catch\s*\(\s*Exception\s+\w+\s*\)",
                IssueCategory::Bug,
                IssueSeverity::Info,
                "Catching generic Exception",
                "Catch specific exception types instead of generic Exception.",
            ),
            LineRule::new(
                r#"==\s*""#,
                IssueCategory::Bug,
                IssueSeverity::Warning,
                "String comparison using == instead of .equals()",
                "Use .equals() method for string comparison instead of == operator.",
            ),
            LineRule::new(
                r"new\s+Vector\b",
                IssueCategory::Performance,
                IssueSeverity::Info,
                "Use of legacy Vector class",
                "Use ArrayList instead of Vector for better performance in non-threaded contexts.",
            ),
        ]
    })
}

pub struct JavaAnalyzer;

impl JavaAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JavaAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for JavaAnalyzer {
    fn name(&self) -> &'static str {
        "JavaAnalyzer"
    }

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Java
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &[".java"]
    }

    fn analyze(&self, file_path: &str, content: &str) -> Vec<Issue> {
        let mut issues = scan_lines(file_path, content, rules());

        for (idx, line) in content.lines().enumerate() {
            if is_line_comment(line) {
                continue;
            }
            let runs_query = line.contains("executeQuery(") || line.contains("executeUpdate(");
            if runs_query && (line.contains('+') || line.contains("String.format")) {
                issues.push(
                    Issue::new(
                        IssueCategory::Security,
                        IssueSeverity::Error,
                        file_path,
                        idx + 1,
                        "Potential SQL injection vulnerability",
                    )
                    .with_recommendation(
                        "Use PreparedStatement with parameterized queries instead of string concatenation.",
                    ),
                );
            }
        }

        issues.extend(todo_markers(file_path, content));
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_java_checks() {
        let src = "class A {\n\
                   \tvoid f() {\n\
                   \t\ttry { g(); } catch (IOException e) {}\n\
                   \t\tstmt.executeQuery(\"SELECT * FROM u WHERE n='\" + name + \"'\");\n\
                   \t\t// TODO tidy\n\
                   \t}\n\
                   }\n";
        let issues = JavaAnalyzer::new().analyze("A.java", src);
        assert!(issues
            .iter()
            .any(|i| i.description == "Empty catch block" && i.line_start == 3));
        assert!(issues
            .iter()
            .any(|i| i.description == "Potential SQL injection vulnerability" && i.line_start == 4));
        assert!(issues
            .iter()
            .any(|i| i.description == "Found TODO comment" && i.line_start == 5));
    }
}
