//! SQL analyzer
//!
//! Statement-level checks run over `;`-separated statements (quotes and
//! `--` comments respected); line-level checks run over the raw text.

use super::base::{Analyzer, AnalyzerKind};
use crate::models::{Issue, IssueCategory, IssueSeverity};
use regex::Regex;
use std::sync::OnceLock;

struct Patterns {
    select_star: Regex,
    where_kw: Regex,
    where_or: Regex,
    limit_kw: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| Patterns {
        select_star: Regex::new(r"(?i)\bSELECT\s*\*").expect("valid regex"),
        where_kw: Regex::new(r"(?i)\bWHERE\b").expect("valid regex"),
        where_or: Regex::new(r"(?i)\bWHERE\b.*\bOR\b").expect("valid regex"),
        limit_kw: Regex::new(r"(?i)\bLIMIT\b").expect("valid regex"),
    })
}

/// One statement with the 1-based line of its first meaningful token
#[derive(Debug, PartialEq)]
struct Statement {
    text: String,
    line: usize,
}

/// Split on `;` outside of quotes and line comments
fn split_statements(content: &str) -> Vec<Statement> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut start_line: Option<usize> = None;
    let mut line = 1usize;
    let mut quote: Option<char> = None;
    let mut in_comment = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            line += 1;
            in_comment = false;
            current.push(c);
            continue;
        }
        if in_comment {
            continue;
        }
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => {
                if c == '-' && chars.peek() == Some(&'-') {
                    in_comment = true;
                    continue;
                }
                if c == '\'' || c == '"' || c == '`' {
                    quote = Some(c);
                } else if c == ';' {
                    if let Some(l) = start_line.take() {
                        statements.push(Statement {
                            text: current.trim().to_string(),
                            line: l,
                        });
                    }
                    current.clear();
                    continue;
                }
            }
        }
        if start_line.is_none() && !c.is_whitespace() {
            start_line = Some(line);
        }
        current.push(c);
    }

    if let Some(l) = start_line {
        statements.push(Statement {
            text: current.trim().to_string(),
            line: l,
        });
    }
    statements
}

pub struct SqlAnalyzer;

impl SqlAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn check_statement(&self, file_path: &str, stmt: &Statement, issues: &mut Vec<Issue>) {
        let p = patterns();

        if p.select_star.is_match(&stmt.text) {
            issues.push(
                Issue::new(
                    IssueCategory::Performance,
                    IssueSeverity::Warning,
                    file_path,
                    stmt.line,
                    "SELECT * is inefficient and can cause issues",
                )
                .with_recommendation("Explicitly list the columns you need instead of using SELECT *."),
            );
        }

        let verb = stmt
            .text
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_uppercase();
        if (verb == "DELETE" || verb == "UPDATE") && !p.where_kw.is_match(&stmt.text) {
            issues.push(
                Issue::new(
                    IssueCategory::Bug,
                    IssueSeverity::Error,
                    file_path,
                    stmt.line,
                    format!("{} statement without WHERE clause", verb),
                )
                .with_recommendation("Add a WHERE clause to avoid affecting all rows unintentionally."),
            );
        }
    }
}

impl Default for SqlAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for SqlAnalyzer {
    fn name(&self) -> &'static str {
        "SqlAnalyzer"
    }

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Sql
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &[".sql"]
    }

    fn analyze(&self, file_path: &str, content: &str) -> Vec<Issue> {
        let mut issues = Vec::new();
        for stmt in split_statements(content) {
            self.check_statement(file_path, &stmt, &mut issues);
        }

        let p = patterns();
        let has_limit = p.limit_kw.is_match(content);
        for (idx, line) in content.lines().enumerate() {
            let upper = line.to_ascii_uppercase();
            if upper.contains("CROSS JOIN") && !has_limit {
                issues.push(
                    Issue::new(
                        IssueCategory::Performance,
                        IssueSeverity::Warning,
                        file_path,
                        idx + 1,
                        "CROSS JOIN without LIMIT can produce huge result sets",
                    )
                    .with_recommendation("Add a LIMIT clause or reconsider if CROSS JOIN is necessary."),
                );
            }
            if p.where_or.is_match(line) {
                issues.push(
                    Issue::new(
                        IssueCategory::Performance,
                        IssueSeverity::Info,
                        file_path,
                        idx + 1,
                        "OR in WHERE clause may prevent index usage",
                    )
                    .with_recommendation("Consider using UNION or restructuring the query for better performance."),
                );
            }
        }
        issues
    }
}
