//! End-to-end scan tests
//!
//! Each test builds a small repository in its own temp directory and runs
//! the orchestrator against it. The remote model is replaced by a counting
//! mock so the knowledge base and fallback routing can be observed.

use codereview::ai::{AiError, AiResult, ModelService, SlidingWindowLimiter};
use codereview::analyzers::{AnalyzerRegistry, BatchSettings, RemoteAnalyzer};
use codereview::cache::{JsonKnowledgeBase, KnowledgeBase, MemoryKnowledgeBase, ResponseCache};
use codereview::config::AnalysisConfig;
use codereview::models::{AnalysisRoute, IssueCategory, IssueSeverity, ScanResults, ScanStatus};
use codereview::scanner::ScanOrchestrator;
use codereview::storage::{FileScanHistory, ScanHistory};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const PASSWORD_LINE: &str = "password = \"supersecretvalue1\"";

/// Answers batch prompts with `batch_reply` and single-file prompts with
/// `single_reply`, counting every call
struct CountingService {
    batch_reply: String,
    single_reply: String,
    calls: AtomicUsize,
}

impl CountingService {
    fn new(batch_reply: &str, single_reply: &str) -> Arc<Self> {
        Arc::new(Self {
            batch_reply: batch_reply.to_string(),
            single_reply: single_reply.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ModelService for CountingService {
    fn name(&self) -> String {
        "counting".into()
    }

    fn probe(&self) -> AiResult<()> {
        Ok(())
    }

    fn complete(&self, prompt: &str) -> AiResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if prompt.contains("--- File 1:") {
            Ok(self.batch_reply.clone())
        } else {
            Ok(self.single_reply.clone())
        }
    }
}

/// Always times out
struct DeadService;

impl ModelService for DeadService {
    fn name(&self) -> String {
        "dead".into()
    }

    fn probe(&self) -> AiResult<()> {
        Ok(())
    }

    fn complete(&self, _prompt: &str) -> AiResult<String> {
        Err(AiError::Timeout)
    }
}

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn pattern_only() -> ScanOrchestrator {
    let remote = RemoteAnalyzer::disabled(Arc::new(ResponseCache::default()));
    ScanOrchestrator::new(
        AnalyzerRegistry::new(Arc::new(remote)),
        Arc::new(MemoryKnowledgeBase::new()),
    )
}

fn with_service(
    service: Arc<dyn ModelService>,
    knowledge: Arc<dyn KnowledgeBase>,
    per_minute: u32,
    batch: BatchSettings,
) -> ScanOrchestrator {
    let remote = RemoteAnalyzer::new(
        service,
        SlidingWindowLimiter::new(per_minute, 100),
        Arc::new(ResponseCache::default()),
        batch,
    );
    ScanOrchestrator::new(AnalyzerRegistry::new(Arc::new(remote)), knowledge)
}

fn scan(orch: &ScanOrchestrator, root: &Path, excludes: &[&str]) -> (String, ScanResults) {
    let excludes: Vec<String> = excludes.iter().map(|s| s.to_string()).collect();
    let id = orch.start_scan(root, &excludes).expect("scan starts");
    let status = orch.get_scan_status(&id).unwrap();
    assert_eq!(status.status, ScanStatus::Completed, "error: {:?}", status.error);
    let results = orch.get_scan_results(&id).unwrap();
    (id, results)
}

const REMOTE_BATCH: &str = r#"Review complete.
```json
{"app.py": [{"category": "security", "severity": "error", "line_start": 2, "line_end": 2, "description": "remote finding", "recommendation": "rotate the credential"}]}
```"#;

#[test]
fn test_hardcoded_password_without_remote() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "settings.py", &format!("import os\n{}\n", PASSWORD_LINE));

    let (_, results) = scan(&pattern_only(), tmp.path(), &[]);
    assert_eq!(results.total_files, 1);
    assert_eq!(results.detected_languages, vec!["python"]);

    let hit = results
        .issues
        .iter()
        .find(|i| i.category == IssueCategory::Security && i.severity == IssueSeverity::Error)
        .expect("security/error issue");
    assert_eq!(hit.file_path, "settings.py");
    assert_eq!(hit.line_start, 2);
    assert!(results.summary.count_category(IssueCategory::Security) >= 1);
}

#[test]
fn test_syntax_error_is_single_issue() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "broken.py", "def broken(:\n    return 1\n");

    let (_, results) = scan(&pattern_only(), tmp.path(), &[]);
    assert_eq!(results.issues.len(), 1, "{:?}", results.issues);
    let issue = &results.issues[0];
    assert_eq!(issue.category, IssueCategory::Bug);
    assert_eq!(issue.severity, IssueSeverity::Error);
    assert!(issue.description.starts_with("Syntax error"));
    assert!(issue.line_start >= 1);
}

#[test]
fn test_invalid_json_is_single_issue() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "package.json", "{\n  \"name\": \"x\",\n}\n");

    let (_, results) = scan(&pattern_only(), tmp.path(), &[]);
    assert_eq!(results.issues.len(), 1);
    assert!(results.issues[0].description.starts_with("Invalid JSON"));
}

#[test]
fn test_excluded_files_never_counted() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "app.py", "x = 1\n");
    write(tmp.path(), "node_modules/pkg/index.js", "eval(input);\n");
    write(tmp.path(), "generated/models.py", &format!("{}\n", PASSWORD_LINE));
    write(tmp.path(), "vendor/lib.go", "package lib\n");

    let (_, results) = scan(&pattern_only(), tmp.path(), &["generated/**", "vendor"]);
    assert_eq!(results.total_files, 1);
    assert!(results.issues.iter().all(|i| i.file_path == "app.py"));
}

#[test]
fn test_gitignored_secrets_are_scanned() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), ".gitignore", "local_settings.py\n");
    write(tmp.path(), "local_settings.py", &format!("{}\n", PASSWORD_LINE));
    write(tmp.path(), "app.py", "x = 1\n");

    let (_, results) = scan(&pattern_only(), tmp.path(), &[]);
    assert_eq!(results.total_files, 2);
    let hit = results
        .issues
        .iter()
        .find(|i| i.file_path == "local_settings.py")
        .expect("secret in ignored file");
    assert_eq!(hit.category, IssueCategory::Security);
    assert_eq!(hit.severity, IssueSeverity::Error);
}

#[test]
fn test_results_sorted_and_summarized() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "b.sql", "SELECT * FROM users;\nDELETE FROM users;\n");
    write(tmp.path(), "a.py", &format!("{}\n", PASSWORD_LINE));

    let (_, results) = scan(&pattern_only(), tmp.path(), &[]);
    let paths: Vec<&str> = results.issues.iter().map(|i| i.file_path.as_str()).collect();
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);

    let by_category: usize = results.summary.issues_by_category.values().sum();
    let by_severity: usize = results.summary.issues_by_severity.values().sum();
    assert_eq!(by_category, results.issues.len());
    assert_eq!(by_severity, results.issues.len());
    assert_eq!(results.summary.total_issues, results.issues.len());
}

#[test]
fn test_knowledge_base_reuse_skips_remote() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    let kb_path = tmp.path().join("cache").join("knowledge_base.json");
    write(&repo, "app.py", &format!("import os\n{}\n", PASSWORD_LINE));
    write(&repo, "db/query.sql", "SELECT id FROM users WHERE id = 1;\n");
    write(&repo, "main.go", "package main\n\nfunc main() {}\n");

    let service = CountingService::new(REMOTE_BATCH, "[]");

    // First scan: one batched call covers both remote-eligible files
    let first = {
        let kb: Arc<dyn KnowledgeBase> = Arc::new(JsonKnowledgeBase::open(&kb_path));
        let orch = with_service(service.clone(), kb, 10, BatchSettings::default());
        let (id, results) = scan(&orch, &repo, &[]);
        let routes = orch.get_scan(&id).unwrap().routes;
        assert_eq!(routes.get("app.py"), Some(&AnalysisRoute::Remote));
        assert_eq!(routes.get("db/query.sql"), Some(&AnalysisRoute::Remote));
        assert_eq!(routes.get("main.go"), Some(&AnalysisRoute::Pattern));
        assert_eq!(orch.knowledge().len(), 2);
        results
    };
    assert_eq!(service.calls(), 1);

    // The remote answer replaces pattern analysis for app.py entirely
    let app_issues: Vec<_> = first.issues.iter().filter(|i| i.file_path == "app.py").collect();
    assert_eq!(app_issues.len(), 1);
    assert_eq!(app_issues[0].description, "remote finding");
    assert!(first.issues.iter().all(|i| i.file_path != "db/query.sql"));

    // Second scan, fresh process state, same knowledge base file
    let kb: Arc<dyn KnowledgeBase> = Arc::new(JsonKnowledgeBase::open(&kb_path));
    let orch = with_service(service.clone(), Arc::clone(&kb), 10, BatchSettings::default());
    let (id, second) = scan(&orch, &repo, &[]);
    assert_eq!(service.calls(), 1, "second scan must not call the remote model");
    assert_eq!(second.issues, first.issues);
    let routes = orch.get_scan(&id).unwrap().routes;
    assert_eq!(routes.get("app.py"), Some(&AnalysisRoute::KnowledgeBase));
    assert_eq!(routes.get("db/query.sql"), Some(&AnalysisRoute::KnowledgeBase));

    // Renamed but unchanged content is still a knowledge-base hit
    fs::rename(repo.join("app.py"), repo.join("renamed.py")).unwrap();
    let orch = with_service(service.clone(), kb, 10, BatchSettings::default());
    let (_, third) = scan(&orch, &repo, &[]);
    assert_eq!(service.calls(), 1);
    let renamed: Vec<_> = third.issues.iter().filter(|i| i.file_path == "renamed.py").collect();
    assert_eq!(renamed.len(), 1);
    assert_eq!(renamed[0].description, "remote finding");
}

#[test]
fn test_rate_limited_files_fall_back_to_patterns() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.py", "x = 1\n");
    write(tmp.path(), "b.py", &format!("{}\n", PASSWORD_LINE));

    let service = CountingService::new("{}", "[]");
    let kb: Arc<dyn KnowledgeBase> = Arc::new(MemoryKnowledgeBase::new());
    let one_file_batches = BatchSettings {
        max_files: 1,
        ..Default::default()
    };
    let orch = with_service(service.clone(), Arc::clone(&kb), 1, one_file_batches);
    let (id, results) = scan(&orch, tmp.path(), &[]);

    assert_eq!(service.calls(), 1);
    let routes = orch.get_scan(&id).unwrap().routes;
    assert_eq!(routes.get("a.py"), Some(&AnalysisRoute::Remote));
    assert_eq!(routes.get("b.py"), Some(&AnalysisRoute::Pattern));
    // Only the genuinely analyzed file is remembered
    assert_eq!(kb.len(), 1);
    assert!(results
        .issues
        .iter()
        .any(|i| i.file_path == "b.py" && i.category == IssueCategory::Security));
}

#[test]
fn test_remote_failure_falls_back_without_caching() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "settings.py", &format!("{}\n", PASSWORD_LINE));

    let kb: Arc<dyn KnowledgeBase> = Arc::new(MemoryKnowledgeBase::new());
    let orch = with_service(Arc::new(DeadService), Arc::clone(&kb), 10, BatchSettings::default());
    let (id, results) = scan(&orch, tmp.path(), &[]);

    assert!(kb.is_empty());
    assert_eq!(
        orch.get_scan(&id).unwrap().routes.get("settings.py"),
        Some(&AnalysisRoute::Pattern)
    );
    assert!(results.issues.iter().any(|i| i.category == IssueCategory::Security));

    // Unparseable replies are failures too
    let garbage = CountingService::new("no json here", "no json here");
    let orch = with_service(garbage.clone(), Arc::clone(&kb), 10, BatchSettings::default());
    scan(&orch, tmp.path(), &[]);
    assert_eq!(garbage.calls(), 1);
    assert!(kb.is_empty());
}

#[test]
fn test_every_file_takes_one_route() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.py", "x = 1\n");
    write(tmp.path(), "b.js", "var a = 1;\n");
    write(tmp.path(), "c.rs", "fn main() {}\n");
    write(tmp.path(), "d.json", "{}\n");
    write(tmp.path(), "notes.txt", "ignored\n");

    let service = CountingService::new("{}", "[]");
    let orch = with_service(
        service,
        Arc::new(MemoryKnowledgeBase::new()),
        10,
        BatchSettings::default(),
    );
    let (id, results) = scan(&orch, tmp.path(), &[]);
    assert_eq!(results.total_files, 4);

    let routes = orch.get_scan(&id).unwrap().routes;
    assert_eq!(routes.len(), 4);
    assert!(routes["a.py"].is_llm());
    assert!(routes["b.js"].is_llm());
    assert!(routes["d.json"].is_llm());
    assert_eq!(routes["c.rs"], AnalysisRoute::Pattern);
}

#[test]
fn test_history_records_completed_scans() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    write(&repo, "a.py", &format!("{}\n", PASSWORD_LINE));

    let history = Arc::new(FileScanHistory::new(tmp.path().join("history")));
    let orch = pattern_only().with_history(history.clone());
    let (id, results) = scan(&orch, &repo, &[]);

    let stored = history.get(&id).unwrap().expect("stored scan");
    assert_eq!(stored.results().issues, results.issues);

    let records = history.list(Some(&repo.display().to_string()), 10).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].total_issues, results.issues.len());
}

#[test]
fn test_analysis_config_limits() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "small.py", "x = 1\n");
    write(tmp.path(), "large.py", &"# filler\n".repeat(100));
    write(tmp.path(), "skipme/a.py", "x = 1\n");

    let config = AnalysisConfig {
        max_file_size: 64,
        exclude_dirs: vec!["skipme".into()],
        workers: 2,
        ..Default::default()
    };
    let orch = pattern_only().with_config(config);
    let (_, results) = scan(&orch, tmp.path(), &[]);
    assert_eq!(results.total_files, 1);
}
