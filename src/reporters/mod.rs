//! Output reporters for scan results
//!
//! Supports two output formats:
//! - `text` - Terminal output with colors
//! - `json` - The scan result document, pretty-printed

mod json;
mod text;

use crate::models::ScanResults;
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Unknown format '{}'. Valid formats: text, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Render results in the specified format
pub fn report(results: &ScanResults, format: &str) -> Result<String> {
    let fmt = OutputFormat::from_str(format)?;
    report_with_format(results, fmt)
}

/// Render results using an OutputFormat enum
pub fn report_with_format(results: &ScanResults, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render(results),
        OutputFormat::Json => json::render(results),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal ScanResults for testing
    pub(crate) fn test_results() -> ScanResults {
        use crate::models::{Issue, IssueCategory, IssueSeverity, ScanSummary};

        let issues = vec![
            Issue::new(
                IssueCategory::Security,
                IssueSeverity::Error,
                "app/settings.py",
                2,
                "Hardcoded password detected",
            )
            .with_recommendation("Use environment variables for secrets"),
            Issue::new(
                IssueCategory::Performance,
                IssueSeverity::Warning,
                "db/report.sql",
                7,
                "SELECT * query - specify columns explicitly",
            ),
        ];

        ScanResults {
            scan_id: "scan-1".into(),
            repository_path: "/work/repo".into(),
            detected_languages: vec!["python".into(), "sql".into()],
            total_files: 12,
            summary: ScanSummary::from_issues(&issues),
            issues,
        }
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(OutputFormat::from_str("text").unwrap(), OutputFormat::Text);
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert!(OutputFormat::from_str("sarif").is_err());
    }

    #[test]
    fn test_report_dispatch() {
        let results = test_results();
        assert!(report(&results, "json").unwrap().starts_with('{'));
        assert!(report(&results, "text").unwrap().contains("app/settings.py:2"));
    }
}
