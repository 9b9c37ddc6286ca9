//! Core data models for codereview

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Issue category.
///
/// Deserialization is lenient: any label outside the closed set maps to
/// [`IssueCategory::Maintainability`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum IssueCategory {
    Bug,
    Security,
    Performance,
    Maintainability,
    Architecture,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 5] = [
        IssueCategory::Bug,
        IssueCategory::Security,
        IssueCategory::Performance,
        IssueCategory::Maintainability,
        IssueCategory::Architecture,
    ];

    /// Map a free-text label onto the closed set
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "bug" => Self::Bug,
            "security" => Self::Security,
            "performance" => Self::Performance,
            "maintainability" => Self::Maintainability,
            "architecture" => Self::Architecture,
            _ => Self::Maintainability,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bug => "bug",
            Self::Security => "security",
            Self::Performance => "performance",
            Self::Maintainability => "maintainability",
            Self::Architecture => "architecture",
        }
    }
}

impl From<String> for IssueCategory {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue severity. Unknown labels map to [`IssueSeverity::Info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum IssueSeverity {
    Error,
    Warning,
    Info,
}

impl IssueSeverity {
    pub const ALL: [IssueSeverity; 3] = [
        IssueSeverity::Error,
        IssueSeverity::Warning,
        IssueSeverity::Info,
    ];

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "error" => Self::Error,
            "warning" => Self::Warning,
            "info" => Self::Info,
            _ => Self::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl From<String> for IssueSeverity {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single normalized finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub category: IssueCategory,
    pub severity: IssueSeverity,
    pub file_path: String,
    /// 1-based, inclusive
    pub line_start: usize,
    pub line_end: usize,
    pub description: String,
    pub recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
}

impl Issue {
    /// Create a single-line issue
    pub fn new(
        category: IssueCategory,
        severity: IssueSeverity,
        file_path: impl Into<String>,
        line: usize,
        description: impl Into<String>,
    ) -> Self {
        let line = line.max(1);
        Self {
            category,
            severity,
            file_path: file_path.into(),
            line_start: line,
            line_end: line,
            description: description.into(),
            recommendation: None,
            code_snippet: None,
        }
    }

    pub fn with_line_end(mut self, line_end: usize) -> Self {
        self.line_end = line_end.max(self.line_start);
        self
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.code_snippet = Some(snippet.into());
        self
    }
}

/// Issue record as exchanged with the remote model and stored in the
/// knowledge base. Category and severity stay free text until converted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawIssue {
    pub category: String,
    pub severity: String,
    pub line_start: usize,
    pub line_end: usize,
    pub description: String,
    #[serde(default)]
    pub recommendation: Option<String>,
}

impl RawIssue {
    /// Build from an arbitrary JSON value. Returns `None` for non-objects;
    /// every missing or mistyped field falls back to a default.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let text = |key: &str| -> Option<String> {
            obj.get(key).and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
        };
        let line = |key: &str| -> Option<usize> {
            obj.get(key).and_then(|v| match v {
                Value::Number(n) => n.as_u64().map(|n| n as usize).or_else(|| {
                    n.as_f64()
                        .filter(|f| f.is_finite() && *f >= 0.0)
                        .map(|f| f as usize)
                }),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
        };

        let line_start = line("line_start").unwrap_or(1).max(1);
        let line_end = line("line_end").unwrap_or(line_start).max(line_start);

        Some(Self {
            category: text("category").unwrap_or_default(),
            severity: text("severity").unwrap_or_default(),
            line_start,
            line_end,
            description: text("description").unwrap_or_default(),
            recommendation: text("recommendation").filter(|r| !r.is_empty()),
        })
    }

    /// Parse a JSON array of issue objects, skipping entries that are not objects
    pub fn list_from_value(value: &Value) -> Vec<Self> {
        value
            .as_array()
            .map(|items| items.iter().filter_map(Self::from_value).collect())
            .unwrap_or_default()
    }

    pub fn from_issue(issue: &Issue) -> Self {
        Self {
            category: issue.category.to_string(),
            severity: issue.severity.to_string(),
            line_start: issue.line_start,
            line_end: issue.line_end,
            description: issue.description.clone(),
            recommendation: issue.recommendation.clone(),
        }
    }

    /// Normalize into an [`Issue`] for `file_path`
    pub fn to_issue(&self, file_path: &str) -> Issue {
        Issue {
            category: IssueCategory::from_label(&self.category),
            severity: IssueSeverity::from_label(&self.severity),
            file_path: file_path.to_string(),
            line_start: self.line_start.max(1),
            line_end: self.line_end.max(self.line_start.max(1)),
            description: self.description.clone(),
            recommendation: self.recommendation.clone(),
            code_snippet: None,
        }
    }
}

/// Lifecycle state of a scan. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Running,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScanStatus::Running)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScanStatus::Running => "running",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Which pass produced a file's findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisRoute {
    /// Fresh answer from the remote model
    Remote,
    /// Reused from the knowledge base (or the response cache)
    KnowledgeBase,
    /// Pattern analyzers
    Pattern,
}

impl AnalysisRoute {
    /// Remote and knowledge-base answers both count as LLM-handled
    pub fn is_llm(&self) -> bool {
        matches!(self, AnalysisRoute::Remote | AnalysisRoute::KnowledgeBase)
    }
}

/// A scan and everything it produced
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scan {
    pub id: String,
    pub repo_path: String,
    pub status: ScanStatus,
    /// 0.0 ..= 100.0
    pub progress: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_files: usize,
    pub detected_languages: BTreeSet<String>,
    pub issues: Vec<Issue>,
    pub error: Option<String>,
    /// Route taken per file (repo-relative path)
    #[serde(default)]
    pub routes: BTreeMap<String, AnalysisRoute>,
}

impl Scan {
    pub fn new(id: impl Into<String>, repo_path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            repo_path: repo_path.into(),
            status: ScanStatus::Running,
            progress: 0.0,
            start_time: Utc::now(),
            end_time: None,
            total_files: 0,
            detected_languages: BTreeSet::new(),
            issues: Vec::new(),
            error: None,
            routes: BTreeMap::new(),
        }
    }

    pub fn status_report(&self) -> ScanStatusReport {
        ScanStatusReport {
            status: self.status,
            progress: self.progress,
            error: self.error.clone(),
        }
    }

    pub fn results(&self) -> ScanResults {
        ScanResults {
            scan_id: self.id.clone(),
            repository_path: self.repo_path.clone(),
            detected_languages: self.detected_languages.iter().cloned().collect(),
            total_files: self.total_files,
            summary: ScanSummary::from_issues(&self.issues),
            issues: self.issues.clone(),
        }
    }

    pub fn record(&self) -> ScanRecord {
        ScanRecord {
            scan_id: self.id.clone(),
            repository_path: self.repo_path.clone(),
            status: self.status,
            start_time: self.start_time,
            end_time: self.end_time,
            total_files: self.total_files,
            total_issues: self.issues.len(),
        }
    }
}

/// Snapshot returned by a status query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStatusReport {
    pub status: ScanStatus,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Counts grouped by category and by severity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub total_issues: usize,
    pub issues_by_category: BTreeMap<IssueCategory, usize>,
    pub issues_by_severity: BTreeMap<IssueSeverity, usize>,
}

impl ScanSummary {
    pub fn from_issues(issues: &[Issue]) -> Self {
        let mut summary = Self {
            total_issues: issues.len(),
            ..Default::default()
        };
        for issue in issues {
            *summary.issues_by_category.entry(issue.category).or_insert(0) += 1;
            *summary.issues_by_severity.entry(issue.severity).or_insert(0) += 1;
        }
        summary
    }

    pub fn count_category(&self, category: IssueCategory) -> usize {
        self.issues_by_category.get(&category).copied().unwrap_or(0)
    }

    pub fn count_severity(&self, severity: IssueSeverity) -> usize {
        self.issues_by_severity.get(&severity).copied().unwrap_or(0)
    }
}

/// Full result of a completed scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResults {
    pub scan_id: String,
    pub repository_path: String,
    pub detected_languages: Vec<String>,
    pub total_files: usize,
    pub issues: Vec<Issue>,
    pub summary: ScanSummary,
}

/// History list entry (issues omitted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub scan_id: String,
    pub repository_path: String,
    pub status: ScanStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_files: usize,
    pub total_issues: usize,
}
