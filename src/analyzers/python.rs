//! Python analyzer using tree-sitter
//!
//! Text checks (hardcoded secrets) run on every file. Tree checks only run
//! when the source parses cleanly; otherwise the first syntax error is
//! reported as a single `bug/error` issue.

use super::base::{scan_secrets, Analyzer, AnalyzerKind, LineRule};
use crate::models::{Issue, IssueCategory, IssueSeverity};
use std::sync::OnceLock;
use tree_sitter::{Node, Parser, Tree};

const MAX_FUNCTION_LINES: usize = 50;
const MAX_PARAMETERS: usize = 5;
const SECRET_SCAN_LINES: usize = 500;

static SECRET_RULES: OnceLock<Vec<LineRule>> = OnceLock::new();

fn secret_rules() -> &'static [LineRule] {
    SECRET_RULES.get_or_init(|| {
        vec![
            LineRule::new(
                r#"(?i)password\s*=\s*["']([^"']{8,})["']"#,
                IssueCategory::Security,
                IssueSeverity::Error,
                "Hardcoded password detected in source code",
                "Move sensitive credentials to environment variables.",
            ),
            LineRule::new(
                r#"(?i)api[_-]?key\s*=\s*["']([^"']{20,})["']"#,
                IssueCategory::Security,
                IssueSeverity::Error,
                "Hardcoded API key detected in source code",
                "Move sensitive credentials to environment variables.",
            ),
        ]
    })
}

pub struct PythonAnalyzer;

impl PythonAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn parse(content: &str) -> Option<Tree> {
        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&tree_sitter_python::LANGUAGE.into()) {
            tracing::warn!("Failed to set Python language: {}", e);
            return None;
        }
        parser.parse(content, None)
    }
}

impl Default for PythonAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for PythonAnalyzer {
    fn name(&self) -> &'static str {
        "PythonAnalyzer"
    }

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Python
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &[".py", ".pyw"]
    }

    fn analyze(&self, file_path: &str, content: &str) -> Vec<Issue> {
        let mut issues = scan_secrets(file_path, content, secret_rules(), SECRET_SCAN_LINES);

        let Some(tree) = Self::parse(content) else {
            return issues;
        };
        let root = tree.root_node();

        if root.has_error() {
            issues.push(syntax_error_issue(file_path, root));
            return issues;
        }

        let mut checker = TreeChecks {
            file_path,
            source: content.as_bytes(),
            issues: &mut issues,
        };
        checker.visit(root, 0);
        issues
    }
}

/// Locate the earliest ERROR or MISSING node and describe it
fn syntax_error_issue(file_path: &str, root: Node) -> Issue {
    let (line, message) = match first_error(root) {
        Some(node) if node.is_missing() => (
            node.start_position().row + 1,
            format!("Syntax error: missing '{}'", node.kind()),
        ),
        Some(node) => (node.start_position().row + 1, "Syntax error: invalid syntax".to_string()),
        None => (1, "Syntax error: invalid syntax".to_string()),
    };
    Issue::new(IssueCategory::Bug, IssueSeverity::Error, file_path, line, message)
        .with_recommendation("Fix the syntax error to make the code valid Python.")
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    node.children(&mut node.walk()).find_map(first_error)
}

struct TreeChecks<'a> {
    file_path: &'a str,
    source: &'a [u8],
    issues: &'a mut Vec<Issue>,
}

impl TreeChecks<'_> {
    /// Depth-first walk; `loop_depth` counts enclosing for/while statements
    fn visit(&mut self, node: Node, loop_depth: usize) {
        match node.kind() {
            "call" => self.check_call(node),
            "except_clause" => self.check_except(node),
            "function_definition" => self.check_function(node),
            "augmented_assignment" if loop_depth > 0 => self.check_aug_assign(node),
            _ => {}
        }

        let depth = match node.kind() {
            "for_statement" | "while_statement" => loop_depth + 1,
            _ => loop_depth,
        };
        for child in node.children(&mut node.walk()) {
            self.visit(child, depth);
        }
    }

    fn text(&self, node: Node) -> &str {
        node.utf8_text(self.source).unwrap_or("")
    }

    fn push(&mut self, node: Node, category: IssueCategory, severity: IssueSeverity, description: String, recommendation: &str) {
        let issue = Issue::new(category, severity, self.file_path, node.start_position().row + 1, description)
            .with_line_end(node.end_position().row + 1)
            .with_recommendation(recommendation);
        self.issues.push(issue);
    }

    fn check_call(&mut self, node: Node) {
        let Some(func) = node.child_by_field_name("function") else {
            return;
        };
        if func.kind() != "identifier" {
            return;
        }
        let name = self.text(func).to_string();
        if name == "eval" || name == "exec" {
            self.push(
                node,
                IssueCategory::Security,
                IssueSeverity::Warning,
                format!("Use of '{}' function can be dangerous", name),
                &format!("Avoid using {}().", name),
            );
        }
    }

    fn check_except(&mut self, node: Node) {
        let catches_something = node
            .named_children(&mut node.walk())
            .any(|c| c.kind() != "block" && c.kind() != "comment");
        if !catches_something {
            self.push(
                node,
                IssueCategory::Bug,
                IssueSeverity::Warning,
                "Bare except clause catches all exceptions".to_string(),
                "Specify the exception type(s) to catch. Use 'except Exception:' at minimum.",
            );
        }
    }

    fn check_function(&mut self, node: Node) {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_else(|| "<anonymous>".to_string());
        let start = node.start_position().row + 1;
        let end = node.end_position().row + 1;

        let mut positional = 0usize;
        let mut mutable_default = false;
        if let Some(params) = node.child_by_field_name("parameters") {
            for param in params.named_children(&mut params.walk()) {
                match param.kind() {
                    "identifier" | "typed_parameter" => positional += 1,
                    "default_parameter" | "typed_default_parameter" => {
                        positional += 1;
                        let is_mutable = param
                            .child_by_field_name("value")
                            .is_some_and(|v| matches!(v.kind(), "list" | "dictionary" | "set"));
                        mutable_default |= is_mutable;
                    }
                    _ => {}
                }
            }
        }

        if mutable_default {
            self.issues.push(
                Issue::new(
                    IssueCategory::Bug,
                    IssueSeverity::Warning,
                    self.file_path,
                    start,
                    format!("Function '{}' has mutable default argument", name),
                )
                .with_recommendation("Use None as default and create the mutable object inside the function."),
            );
        }

        let length = end - start;
        if length > MAX_FUNCTION_LINES {
            self.push(
                node,
                IssueCategory::Maintainability,
                IssueSeverity::Info,
                format!("Function '{}' is too long ({} lines)", name, length),
                "Consider breaking this function into smaller, more focused functions.",
            );
        }

        if positional > MAX_PARAMETERS {
            self.issues.push(
                Issue::new(
                    IssueCategory::Maintainability,
                    IssueSeverity::Info,
                    self.file_path,
                    start,
                    format!("Function '{}' has too many parameters ({})", name, positional),
                )
                .with_recommendation("Consider using a configuration object or reducing the number of parameters."),
            );
        }
    }

    fn check_aug_assign(&mut self, node: Node) {
        let is_add = node
            .child_by_field_name("operator")
            .is_some_and(|op| self.text(op) == "+=");
        if is_add {
            self.push(
                node,
                IssueCategory::Performance,
                IssueSeverity::Warning,
                "String concatenation in loop is inefficient".to_string(),
                "Use ''.join() or a list to collect strings, then join them.",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(src: &str) -> Vec<Issue> {
        PythonAnalyzer::new().analyze("app.py", src)
    }

    #[test]
    fn test_hardcoded_password() {
        let issues = analyze("import os\npassword = \"supersecretvalue1\"\n");
        let hit = issues
            .iter()
            .find(|i| i.category == IssueCategory::Security && i.severity == IssueSeverity::Error)
            .expect("password issue");
        assert_eq!(hit.line_start, 2);
    }

    #[test]
    fn test_short_password_ignored() {
        let issues = analyze("password = \"abc\"\n");
        assert!(issues.is_empty());
    }

    #[test]
    fn test_syntax_error_single_issue() {
        let issues = analyze("def broken(:\n    pass\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].category, IssueCategory::Bug);
        assert_eq!(issues[0].severity, IssueSeverity::Error);
        assert!(issues[0].description.starts_with("Syntax error"));
    }

    #[test]
    fn test_eval_and_bare_except() {
        let src = "try:\n    eval(x)\nexcept:\n    pass\n";
        let issues = analyze(src);
        assert!(issues
            .iter()
            .any(|i| i.description.contains("'eval'") && i.line_start == 2));
        assert!(issues
            .iter()
            .any(|i| i.description.starts_with("Bare except") && i.line_start == 3));
    }

    #[test]
    fn test_typed_except_not_flagged() {
        let issues = analyze("try:\n    pass\nexcept ValueError:\n    pass\n");
        assert!(!issues.iter().any(|i| i.description.starts_with("Bare except")));
    }

    #[test]
    fn test_mutable_default_and_params() {
        let src = "def f(a, b, c, d, e, g=[]):\n    return a\n";
        let issues = analyze(src);
        assert!(issues.iter().any(|i| i.description.contains("mutable default")));
        assert!(issues.iter().any(|i| i.description.contains("too many parameters (6)")));
    }

    #[test]
    fn test_long_function() {
        let mut src = String::from("def long():\n");
        for i in 0..55 {
            src.push_str(&format!("    x{} = {}\n", i, i));
        }
        let issues = analyze(&src);
        assert!(issues.iter().any(|i| i.description.contains("is too long")));
    }

    #[test]
    fn test_concat_in_loop_reported_once() {
        let src = "s = ''\nfor a in b:\n    for c in d:\n        s += c\n";
        let issues = analyze(src);
        let hits: Vec<_> = issues
            .iter()
            .filter(|i| i.category == IssueCategory::Performance)
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].line_start, 4);
    }

    #[test]
    fn test_clean_file() {
        assert!(analyze("def add(a, b):\n    return a + b\n").is_empty());
    }
}
