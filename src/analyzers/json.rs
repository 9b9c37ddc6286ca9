//! JSON analyzer

use super::base::{Analyzer, AnalyzerKind};
use crate::models::{Issue, IssueCategory, IssueSeverity};
use serde_json::Value;
use std::collections::HashSet;

/// Kept below the default `max_file_size`
const LARGE_FILE_BYTES: usize = 512 * 1024;
const MAX_DEPTH: usize = 10;

pub struct JsonAnalyzer;

impl JsonAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for JsonAnalyzer {
    fn name(&self) -> &'static str {
        "JsonAnalyzer"
    }

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Json
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &[".json"]
    }

    fn analyze(&self, file_path: &str, content: &str) -> Vec<Issue> {
        let data: Value = match serde_json::from_str(content) {
            Ok(v) => v,
            Err(e) => {
                return vec![Issue::new(
                    IssueCategory::Bug,
                    IssueSeverity::Error,
                    file_path,
                    e.line(),
                    format!("Invalid JSON: {}", e),
                )
                .with_recommendation("Fix the JSON syntax error.")];
            }
        };

        let mut issues: Vec<Issue> = duplicate_keys(content)
            .into_iter()
            .map(|(key, line)| {
                Issue::new(
                    IssueCategory::Bug,
                    IssueSeverity::Warning,
                    file_path,
                    line,
                    format!("Duplicate key '{}' found in JSON", key),
                )
                .with_recommendation("Remove duplicate keys. The last occurrence will override previous ones.")
            })
            .collect();

        if content.len() > LARGE_FILE_BYTES {
            issues.push(
                Issue::new(
                    IssueCategory::Performance,
                    IssueSeverity::Warning,
                    file_path,
                    1,
                    format!("Large JSON file ({}KB)", content.len() / 1024),
                )
                .with_recommendation("Consider splitting into smaller files or using a more efficient format."),
            );
        }

        let depth = max_depth(&data);
        if depth > MAX_DEPTH {
            issues.push(
                Issue::new(
                    IssueCategory::Maintainability,
                    IssueSeverity::Info,
                    file_path,
                    1,
                    format!("Deeply nested JSON structure (depth: {})", depth),
                )
                .with_recommendation("Consider flattening the structure for better readability and performance."),
            );
        }

        issues
    }
}

/// Nesting depth; a scalar at the top level has depth 1
fn max_depth(value: &Value) -> usize {
    match value {
        Value::Object(map) => 1 + map.values().map(max_depth).max().unwrap_or(0),
        Value::Array(items) => 1 + items.iter().map(max_depth).max().unwrap_or(0),
        _ => 1,
    }
}

enum Frame {
    Object { keys: HashSet<String>, expect_key: bool },
    Array,
}

/// Keys repeated within the same object, with the line of the repeat.
/// Assumes `content` is valid JSON.
fn duplicate_keys(content: &str) -> Vec<(String, usize)> {
    let mut found = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut line = 1usize;
    let mut chars = content.chars();

    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            '{' => stack.push(Frame::Object {
                keys: HashSet::new(),
                expect_key: true,
            }),
            '[' => stack.push(Frame::Array),
            '}' | ']' => {
                stack.pop();
            }
            ',' => {
                if let Some(Frame::Object { expect_key, .. }) = stack.last_mut() {
                    *expect_key = true;
                }
            }
            '"' => {
                let start_line = line;
                let mut text = String::new();
                while let Some(s) = chars.next() {
                    match s {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                text.push('\\');
                                text.push(escaped);
                            }
                        }
                        '"' => break,
                        '\n' => {
                            line += 1;
                            text.push(s);
                        }
                        _ => text.push(s),
                    }
                }
                if let Some(Frame::Object { keys, expect_key }) = stack.last_mut() {
                    if *expect_key {
                        *expect_key = false;
                        if !keys.insert(text.clone()) {
                            found.push((text, start_line));
                        }
                    }
                }
            }
            _ => {}
        }
    }
    found
}
