//! JavaScript / TypeScript analyzer with React and React Native checks

use super::base::{is_line_comment, scan_lines, scan_secrets, Analyzer, AnalyzerKind, LineRule};
use crate::models::{Issue, IssueCategory, IssueSeverity};
use std::sync::OnceLock;

const SECRET_SCAN_LINES: usize = 500;

struct Rules {
    secrets: Vec<LineRule>,
    dangerous: Vec<LineRule>,
    react: Vec<LineRule>,
}

static RULES: OnceLock<Rules> = OnceLock::new();

fn rules() -> &'static Rules {
    RULES.get_or_init(|| Rules {
        secrets: vec![
            LineRule::new(
                r#"(?i)(api[_-]?key|apikey)\s*[:=]\s*["']([^"']{20,})["']"#,
                IssueCategory::Security,
                IssueSeverity::Error,
                "Hardcoded API key detected",
                "Move secrets to environment variables (.env file)",
            ),
            LineRule::new(
                r#"(?i)(secret|password|token)\s*[:=]\s*["']([^"']{8,})["']"#,
                IssueCategory::Security,
                IssueSeverity::Error,
                "Hardcoded secret detected",
                "Move secrets to environment variables (.env file)",
            ),
        ],
        dangerous: vec![
            LineRule::new(
                r"\beval\s*\(",
                IssueCategory::Security,
                IssueSeverity::Warning,
                "Use of eval() is dangerous",
                "Use safer alternatives or sanitize input",
            ),
            LineRule::new(
                r"dangerouslySetInnerHTML",
                IssueCategory::Security,
                IssueSeverity::Warning,
                "Use of dangerouslySetInnerHTML can lead to XSS",
                "Use safer alternatives or sanitize input",
            ),
            LineRule::new(
                r"innerHTML\s*=[^=]",
                IssueCategory::Security,
                IssueSeverity::Warning,
                "Direct innerHTML assignment can lead to XSS",
                "Use safer alternatives or sanitize input",
            ),
        ],
        react: vec![
            LineRule::new(
                r"(onClick|onPress|onChange|onSubmit)\s*=\s*\{.*=>",
                IssueCategory::Performance,
                IssueSeverity::Info,
                "Inline function in JSX prop",
                "Define function outside render or use useCallback to avoid re-renders",
            ),
            LineRule::new(
                r"useState\s*\(\s*\{",
                IssueCategory::Maintainability,
                IssueSeverity::Info,
                "useState with object",
                "Consider splitting into multiple useState calls for better performance",
            ),
        ],
    })
}

pub struct JavaScriptAnalyzer;

impl JavaScriptAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JavaScriptAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for JavaScriptAnalyzer {
    fn name(&self) -> &'static str {
        "JavaScriptAnalyzer"
    }

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::JavaScript
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &[".js", ".jsx", ".ts", ".tsx", ".mjs"]
    }

    fn analyze(&self, file_path: &str, content: &str) -> Vec<Issue> {
        let rules = rules();
        let lines: Vec<&str> = content.lines().collect();

        let mut issues = scan_secrets(file_path, content, &rules.secrets, SECRET_SCAN_LINES);
        issues.extend(scan_lines(file_path, content, &rules.dangerous));
        issues.extend(check_lines(file_path, &lines));

        let is_react_native = content.contains("react-native");
        let is_react = content.contains("import React")
            || content.contains("from 'react'")
            || content.contains("from \"react\"");
        if is_react || is_react_native {
            issues.extend(scan_lines(file_path, content, &rules.react));
            issues.extend(check_react(file_path, &lines, is_react_native));
        }

        issues
    }
}

/// Position of a loose `==` (not `===`, `!=`, `<=`, `>=`)
fn loose_equality(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    (1..bytes.len().saturating_sub(2)).find(|&i| {
        bytes[i] == b'='
            && bytes[i + 1] == b'='
            && bytes[i + 2] != b'='
            && !matches!(bytes[i - 1], b'=' | b'!' | b'<' | b'>')
    })
}

fn check_lines(file_path: &str, lines: &[&str]) -> Vec<Issue> {
    let mut issues = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;

        if let Some(pos) = loose_equality(line) {
            if !line[..pos].contains("//") {
                issues.push(
                    Issue::new(
                        IssueCategory::Bug,
                        IssueSeverity::Warning,
                        file_path,
                        line_no,
                        "Use === instead of == for comparison",
                    )
                    .with_recommendation("Use strict equality (===) to avoid type coercion bugs"),
                );
            }
        }

        if !is_line_comment(line)
            && (line.contains("console.log") || line.contains("console.debug") || line.contains("console.info"))
        {
            issues.push(
                Issue::new(
                    IssueCategory::Maintainability,
                    IssueSeverity::Info,
                    file_path,
                    line_no,
                    "Console statement found",
                )
                .with_recommendation("Remove console statements before production deployment"),
            );
        }

        let iterations = line.matches(".map(").count()
            + line.matches(".filter(").count()
            + line.matches(".forEach(").count();
        if iterations > 1 {
            issues.push(
                Issue::new(
                    IssueCategory::Performance,
                    IssueSeverity::Info,
                    file_path,
                    line_no,
                    "Multiple array iterations on same line",
                )
                .with_recommendation("Consider combining operations or using a single loop"),
            );
        }
    }
    issues
}

/// True if any of the `window` lines after `idx` contain `needle`
fn lookahead(lines: &[&str], idx: usize, window: usize, needle: &str) -> bool {
    lines
        .iter()
        .skip(idx + 1)
        .take(window)
        .any(|l| l.contains(needle))
}

fn check_react(file_path: &str, lines: &[&str], is_react_native: bool) -> Vec<Issue> {
    let mut issues = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;

        if line.contains(".map(")
            && line.contains("return")
            && !line.contains("key=")
            && !lookahead(lines, idx, 3, "key=")
        {
            issues.push(
                Issue::new(
                    IssueCategory::Bug,
                    IssueSeverity::Warning,
                    file_path,
                    line_no,
                    "Missing 'key' prop in list rendering",
                )
                .with_recommendation("Add a unique 'key' prop to elements in a list"),
            );
        }

        if !is_react_native {
            continue;
        }

        let touchable = ["<TouchableOpacity", "<Button", "<Pressable"]
            .iter()
            .any(|tag| line.contains(tag));
        if touchable && !line.contains("accessible") && !lookahead(lines, idx, 5, "accessible") {
            issues.push(
                Issue::new(
                    IssueCategory::Maintainability,
                    IssueSeverity::Info,
                    file_path,
                    line_no,
                    "Missing accessibility props",
                )
                .with_recommendation("Add accessibilityLabel and accessibilityRole for better accessibility"),
            );
        }

        if line.contains("<FlatList")
            && !line.contains("keyExtractor")
            && !lookahead(lines, idx, 10, "keyExtractor")
        {
            issues.push(
                Issue::new(
                    IssueCategory::Performance,
                    IssueSeverity::Warning,
                    file_path,
                    line_no,
                    "FlatList without keyExtractor",
                )
                .with_recommendation("Add keyExtractor prop for better performance"),
            );
        }
    }
    issues
}
