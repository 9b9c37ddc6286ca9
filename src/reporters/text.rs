//! Text (terminal) reporter with colors and formatting

use crate::models::{IssueCategory, IssueSeverity, ScanResults};
use anyhow::Result;

/// Severity colors
fn severity_color(severity: &IssueSeverity) -> &'static str {
    match severity {
        IssueSeverity::Error => "\x1b[31m",   // Red
        IssueSeverity::Warning => "\x1b[33m", // Yellow
        IssueSeverity::Info => "\x1b[90m",    // Gray
    }
}

/// Reset ANSI color
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Severity tag
fn severity_tag(severity: &IssueSeverity) -> &'static str {
    match severity {
        IssueSeverity::Error => "[E]",
        IssueSeverity::Warning => "[W]",
        IssueSeverity::Info => "[I]",
    }
}

/// Render results as formatted terminal output
pub fn render(results: &ScanResults) -> Result<String> {
    let mut out = String::new();
    let summary = &results.summary;

    out.push_str(&format!("\n{BOLD}Code Review{RESET}  {DIM}{}{RESET}\n", results.repository_path));
    out.push_str(&format!(
        "{DIM}──────────────────────────────────────{RESET}\n"
    ));
    out.push_str(&format!(
        "Files: {}  Languages: {}  Issues: {BOLD}{}{RESET}\n\n",
        results.total_files,
        results.detected_languages.join(", "),
        summary.total_issues
    ));

    if summary.total_issues == 0 {
        out.push_str(&format!("{DIM}No issues found.{RESET}\n"));
        return Ok(out);
    }

    let mut severity_parts = Vec::new();
    for severity in [IssueSeverity::Error, IssueSeverity::Warning, IssueSeverity::Info] {
        let count = summary.count_severity(severity);
        if count > 0 {
            severity_parts.push(format!("{}{} {}{RESET}", severity_color(&severity), count, severity));
        }
    }
    out.push_str(&format!("  {}\n", severity_parts.join(" | ")));

    let category_parts: Vec<String> = IssueCategory::ALL
        .iter()
        .filter_map(|c| {
            let count = summary.count_category(*c);
            (count > 0).then(|| format!("{} {}", count, c))
        })
        .collect();
    out.push_str(&format!("  {DIM}{}{RESET}\n\n", category_parts.join(" | ")));

    let mut current_file: Option<&str> = None;
    for issue in &results.issues {
        if current_file != Some(issue.file_path.as_str()) {
            out.push_str(&format!("{BOLD}{}{RESET}\n", issue.file_path));
            current_file = Some(&issue.file_path);
        }
        let location = if issue.line_end > issue.line_start {
            format!("{}:{}-{}", issue.file_path, issue.line_start, issue.line_end)
        } else {
            format!("{}:{}", issue.file_path, issue.line_start)
        };
        out.push_str(&format!(
            "  {}{}{RESET} {DIM}{:<12}{RESET} {}  {DIM}{}{RESET}\n",
            severity_color(&issue.severity),
            severity_tag(&issue.severity),
            issue.category.as_str(),
            issue.description,
            location
        ));
        if let Some(rec) = &issue.recommendation {
            out.push_str(&format!("      {DIM}-> {}{RESET}\n", rec));
        }
    }
    out.push('\n');

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_results;

    #[test]
    fn test_text_lists_issues_by_file() {
        let out = render(&test_results()).unwrap();
        assert!(out.contains("Issues: \x1b[1m2"));
        assert!(out.contains("1 error"));
        assert!(out.contains("1 security | 1 performance"));
        assert!(out.contains("[E]"));
        assert!(out.contains("Hardcoded password detected"));
        assert!(out.contains("-> Use environment variables for secrets"));
        assert!(out.find("app/settings.py").unwrap() < out.find("db/report.sql").unwrap());
    }

    #[test]
    fn test_text_clean_scan() {
        let mut results = test_results();
        results.issues.clear();
        results.summary = Default::default();
        assert!(render(&results).unwrap().contains("No issues found."));
    }
}
