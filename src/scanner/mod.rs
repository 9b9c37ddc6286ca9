//! Scan orchestration
//!
//! A scan runs to completion inside [`ScanOrchestrator::start_scan`]:
//!
//! ```text
//! detect languages ─> collect files ─> read
//!                                        │
//!          ┌─────────────────────────────┴──────────────┐
//!          │ remote available?                           │
//!          │   knowledge base hit ──────────> reuse      │
//!          │   otherwise ─> batches ─> Analyzed ─> save  │
//!          │                         └─> Skipped ─┐      │
//!          └──────────────────────────────────────┼──────┘
//!                                                 v
//!                         pattern analyzers (rayon, per file)
//!                                                 │
//!                                  sort + summarize + history
//! ```
//!
//! Every file takes exactly one route: remote (or its cached/knowledge-base
//! equivalent) or pattern analysis, never both.

pub mod files;
pub mod languages;

use crate::ai::{AiClient, AiConfig, LlmBackend, SlidingWindowLimiter};
use crate::analyzers::{
    plan_batches, Analyzer, AnalyzerRegistry, AnalyzerResult, BatchSettings, RemoteAnalyzer,
    RemoteFile, RemoteOutcome,
};
use crate::cache::{content_hash, KnowledgeBase, ResponseCache};
use crate::config::{AnalysisConfig, LlmConfig};
use crate::models::{AnalysisRoute, Issue, Scan, ScanResults, ScanStatus, ScanStatusReport};
use crate::storage::ScanHistory;
use anyhow::{anyhow, Result};
use chrono::Utc;
use dashmap::DashMap;
use files::{build_exclude_set, collect_files, read_lossy, SourceFile};
use globset::GlobSet;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Progress callback: (phase or file, done, total)
pub type ProgressCallback = Box<dyn Fn(&str, usize, usize) + Send + Sync>;

/// Source tag for knowledge-base entries written by scans
pub const KB_SOURCE: &str = "llm";

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Repository path does not exist or is not a directory: {0}")]
    InvalidRepository(String),

    #[error("Invalid exclude pattern: {0}")]
    InvalidPattern(String),

    #[error("Scan not found: {0}")]
    NotFound(String),

    #[error("Scan {id} is not completed (status: {status})")]
    NotCompleted { id: String, status: ScanStatus },

    #[error("Scan {0} has already been started")]
    AlreadyStarted(String),
}

/// Build the remote analyzer described by `[llm]`. A disabled section, or an
/// unknown provider, yields a disabled analyzer.
pub fn remote_analyzer_from_config(llm: &LlmConfig, cache: Arc<ResponseCache>) -> RemoteAnalyzer {
    if !llm.enabled {
        return RemoteAnalyzer::disabled(cache);
    }
    let backend: LlmBackend = match llm.provider.parse() {
        Ok(backend) => backend,
        Err(e) => {
            warn!("Remote analysis disabled: {}", e);
            return RemoteAnalyzer::disabled(cache);
        }
    };

    let provider = llm.active_provider();
    let api_key = match provider.api_key.clone() {
        Some(key) => key,
        None if !backend.requires_api_key() => "ollama".to_string(),
        None => String::new(),
    };
    let client = AiClient::new(
        AiConfig {
            backend,
            model: provider.model.clone(),
            max_tokens: provider.max_tokens,
            temperature: provider.temperature,
            timeout: llm.timeout(),
        },
        api_key,
    );

    RemoteAnalyzer::new(
        Arc::new(client),
        SlidingWindowLimiter::new(
            provider.rate_limit.requests_per_minute,
            provider.rate_limit.requests_per_hour,
        ),
        cache,
        BatchSettings {
            max_files: llm.batch_max_files,
            max_tokens: llm.batch_max_tokens,
            ..Default::default()
        },
    )
}

/// A collected file with its content, once read
struct LoadedFile {
    source: SourceFile,
    content: String,
    hash: String,
}

/// A created scan's inputs and its own cancellation flag
struct ScanControl {
    repo_path: PathBuf,
    excludes: Arc<GlobSet>,
    cancelled: Arc<AtomicBool>,
    started: AtomicBool,
}

/// Per-run progress and cancellation state
struct RunState<'a> {
    scan_id: &'a str,
    cancelled: &'a AtomicBool,
    done: AtomicUsize,
    total_files: usize,
}

impl RunState<'_> {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(anyhow!("scan cancelled"));
        }
        Ok(())
    }
}

/// What a successful run produces
struct ScanOutput {
    languages: BTreeSet<String>,
    total_files: usize,
    issues: Vec<Issue>,
    routes: BTreeMap<String, AnalysisRoute>,
}

pub struct ScanOrchestrator {
    registry: AnalyzerRegistry,
    knowledge: Arc<dyn KnowledgeBase>,
    history: Option<Arc<dyn ScanHistory>>,
    config: AnalysisConfig,
    scans: DashMap<String, Scan>,
    controls: DashMap<String, Arc<ScanControl>>,
    progress_callback: Option<ProgressCallback>,
}

impl ScanOrchestrator {
    pub fn new(registry: AnalyzerRegistry, knowledge: Arc<dyn KnowledgeBase>) -> Self {
        Self {
            registry,
            knowledge,
            history: None,
            config: AnalysisConfig::default(),
            scans: DashMap::new(),
            controls: DashMap::new(),
            progress_callback: None,
        }
    }

    pub fn with_history(mut self, history: Arc<dyn ScanHistory>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn registry(&self) -> &AnalyzerRegistry {
        &self.registry
    }

    pub fn knowledge(&self) -> &Arc<dyn KnowledgeBase> {
        &self.knowledge
    }

    /// Ask a scan that has not finished to stop at the next file or batch.
    /// Returns false when the scan is unknown or already finished.
    pub fn cancel(&self, scan_id: &str) -> bool {
        match self.controls.get(scan_id) {
            Some(control) => {
                control.cancelled.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Cancellation flag of one unfinished scan
    pub fn cancel_handle(&self, scan_id: &str) -> Option<Arc<AtomicBool>> {
        self.controls
            .get(scan_id)
            .map(|control| Arc::clone(&control.cancelled))
    }

    /// Create a scan and run it to completion; returns its id.
    ///
    /// Input errors are returned before any scan exists. Anything that goes
    /// wrong afterwards is recorded on the scan as `failed`.
    pub fn start_scan(&self, repo_path: &Path, exclude_patterns: &[String]) -> Result<String, ScanError> {
        let scan_id = self.create_scan(repo_path, exclude_patterns)?;
        self.run(&scan_id)?;
        Ok(scan_id)
    }

    /// Validate inputs and register a `running` scan without doing any work.
    /// The id can be cancelled before or during [`ScanOrchestrator::run`].
    pub fn create_scan(&self, repo_path: &Path, exclude_patterns: &[String]) -> Result<String, ScanError> {
        if !repo_path.is_dir() {
            return Err(ScanError::InvalidRepository(repo_path.display().to_string()));
        }

        let mut patterns = self.config.exclude.clone();
        patterns.extend(exclude_patterns.iter().cloned());
        let excludes = build_exclude_set(&patterns)
            .map(Arc::new)
            .map_err(|e| ScanError::InvalidPattern(format!("{:#}", e)))?;

        let scan_id = Uuid::new_v4().to_string();
        self.scans.insert(
            scan_id.clone(),
            Scan::new(scan_id.clone(), repo_path.display().to_string()),
        );
        self.controls.insert(
            scan_id.clone(),
            Arc::new(ScanControl {
                repo_path: repo_path.to_path_buf(),
                excludes,
                cancelled: Arc::new(AtomicBool::new(false)),
                started: AtomicBool::new(false),
            }),
        );
        Ok(scan_id)
    }

    /// Run a created scan to completion. Each scan runs once.
    pub fn run(&self, scan_id: &str) -> Result<(), ScanError> {
        let control = self
            .controls
            .get(scan_id)
            .map(|c| Arc::clone(c.value()))
            .ok_or_else(|| ScanError::NotFound(scan_id.to_string()))?;
        if control.started.swap(true, Ordering::SeqCst) {
            return Err(ScanError::AlreadyStarted(scan_id.to_string()));
        }

        let start = Instant::now();
        info!("Starting scan {} of {}", scan_id, control.repo_path.display());

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.execute(scan_id, &control)
        }))
        .unwrap_or_else(|panic_info| {
            let msg = panic_message(panic_info.as_ref());
            Err(anyhow!("scan panicked: {}", msg))
        });

        match outcome {
            Ok(output) => self.complete_scan(scan_id, output, start),
            Err(e) => {
                error!("Scan {} failed: {:#}", scan_id, e);
                if let Some(mut scan) = self.scans.get_mut(scan_id) {
                    scan.status = ScanStatus::Failed;
                    scan.error = Some(e.to_string());
                    scan.issues.clear();
                    scan.routes.clear();
                    scan.end_time = Some(Utc::now());
                }
            }
        }

        self.controls.remove(scan_id);
        Ok(())
    }

    fn complete_scan(&self, scan_id: &str, output: ScanOutput, start: Instant) {
        let snapshot = {
            let Some(mut scan) = self.scans.get_mut(scan_id) else {
                return;
            };
            scan.detected_languages = output.languages;
            scan.total_files = output.total_files;
            scan.issues = output.issues;
            scan.routes = output.routes;
            scan.progress = 100.0;
            scan.status = ScanStatus::Completed;
            scan.end_time = Some(Utc::now());
            scan.clone()
        };

        info!(
            "Scan {} completed: {} issues in {} files ({:?})",
            scan_id,
            snapshot.issues.len(),
            snapshot.total_files,
            start.elapsed()
        );

        if let Some(history) = &self.history {
            if let Err(e) = history.save(&snapshot) {
                warn!("Failed to save scan history: {:#}", e);
            }
        }
    }

    pub fn get_scan(&self, scan_id: &str) -> Option<Scan> {
        self.scans.get(scan_id).map(|s| s.clone())
    }

    pub fn get_scan_status(&self, scan_id: &str) -> Result<ScanStatusReport, ScanError> {
        self.scans
            .get(scan_id)
            .map(|s| s.status_report())
            .ok_or_else(|| ScanError::NotFound(scan_id.to_string()))
    }

    /// Results with summary; only for completed scans
    pub fn get_scan_results(&self, scan_id: &str) -> Result<ScanResults, ScanError> {
        let scan = self
            .scans
            .get(scan_id)
            .ok_or_else(|| ScanError::NotFound(scan_id.to_string()))?;
        if scan.status != ScanStatus::Completed {
            return Err(ScanError::NotCompleted {
                id: scan_id.to_string(),
                status: scan.status,
            });
        }
        Ok(scan.results())
    }

    fn report_progress(&self, scan_id: &str, label: &str, done: usize, total: usize) {
        let pct = if total == 0 {
            100.0
        } else {
            (done as f64 / total as f64) * 100.0
        };
        if let Some(mut scan) = self.scans.get_mut(scan_id) {
            if pct > scan.progress {
                scan.progress = pct;
            }
        }
        if let Some(ref callback) = self.progress_callback {
            callback(label, done, total);
        }
    }

    /// Count one more file as finished
    fn advance(&self, run: &RunState<'_>, label: &str) {
        let n = run.done.fetch_add(1, Ordering::SeqCst) + 1;
        self.report_progress(run.scan_id, label, n, run.total_files);
    }

    fn execute(&self, scan_id: &str, control: &ScanControl) -> Result<ScanOutput> {
        let repo_path = control.repo_path.as_path();
        let excludes = Arc::clone(&control.excludes);
        let cancelled = control.cancelled.as_ref();
        if cancelled.load(Ordering::SeqCst) {
            return Err(anyhow!("scan cancelled"));
        }

        let languages = languages::detect_languages(
            repo_path,
            &self.config.exclude_dirs,
            Arc::clone(&excludes),
            self.config.language_sample_size,
        );
        debug!("Detected languages: {:?}", languages);

        let sources = collect_files(repo_path, &self.config, excludes, &self.registry);
        let total_files = sources.len();
        if let Some(mut scan) = self.scans.get_mut(scan_id) {
            scan.total_files = total_files;
            scan.detected_languages = languages.clone();
        }
        info!("Scanning {} files", total_files);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.worker_count())
            .build()?;

        let loaded: Vec<LoadedFile> = pool.install(|| {
            sources
                .into_par_iter()
                .filter_map(|source| match read_lossy(&source.path) {
                    Ok(content) if content.is_empty() => None,
                    Ok(content) => Some(LoadedFile {
                        hash: content_hash(&content),
                        source,
                        content,
                    }),
                    Err(e) => {
                        warn!("Failed to read {}: {}", source.relative, e);
                        None
                    }
                })
                .collect()
        });
        let run = RunState {
            scan_id,
            cancelled,
            done: AtomicUsize::new(total_files - loaded.len()),
            total_files,
        };
        run.check_cancelled()?;

        let mut issues = Vec::new();
        let mut routes = BTreeMap::new();

        let llm_handled = self.remote_pass(&run, &loaded, &mut issues, &mut routes)?;

        let fallback: Vec<&LoadedFile> = loaded
            .iter()
            .filter(|f| !llm_handled.contains(f.source.relative.as_str()))
            .collect();
        debug!(
            "{} files answered remotely, {} files for pattern analysis",
            llm_handled.len(),
            fallback.len()
        );

        let pattern_results: Vec<Option<Vec<Issue>>> = pool.install(|| {
            fallback
                .par_iter()
                .map(|file| {
                    if run.is_cancelled() {
                        return None;
                    }
                    let file_issues = self.run_pattern_analyzers(file);
                    self.advance(&run, &file.source.relative);
                    Some(file_issues)
                })
                .collect()
        });
        run.check_cancelled()?;

        for (file, result) in fallback.iter().zip(pattern_results) {
            if let Some(file_issues) = result {
                issues.extend(file_issues);
                routes.insert(file.source.relative.clone(), AnalysisRoute::Pattern);
            }
        }

        issues.sort_by(|a, b| {
            a.file_path
                .cmp(&b.file_path)
                .then(a.line_start.cmp(&b.line_start))
                .then(a.line_end.cmp(&b.line_end))
        });

        Ok(ScanOutput {
            languages,
            total_files,
            issues,
            routes,
        })
    }

    /// Knowledge-base lookups then batched remote analysis. Returns the set
    /// of files that got an answer.
    fn remote_pass(
        &self,
        run: &RunState<'_>,
        loaded: &[LoadedFile],
        issues: &mut Vec<Issue>,
        routes: &mut BTreeMap<String, AnalysisRoute>,
    ) -> Result<BTreeSet<String>> {
        let mut handled = BTreeSet::new();
        let remote = self.registry.remote();
        if !remote.is_available() {
            debug!("Remote analyzer not available ({:?})", remote.state());
            return Ok(handled);
        }

        let eligible: Vec<&LoadedFile> = loaded
            .iter()
            .filter(|f| self.registry.remote_supports(&f.source.path))
            .collect();

        let mut pending = Vec::new();
        for file in eligible {
            match self.knowledge.get(&file.hash) {
                Some(raw) => {
                    let rel = &file.source.relative;
                    remote.cache().set_by_hash(rel, &file.hash, raw.clone());
                    issues.extend(raw.iter().map(|r| r.to_issue(rel)));
                    routes.insert(rel.clone(), AnalysisRoute::KnowledgeBase);
                    handled.insert(rel.clone());
                    self.advance(run, rel);
                }
                None => pending.push(file),
            }
        }
        if !handled.is_empty() {
            info!("Reused knowledge base results for {} files", handled.len());
        }

        let requests: Vec<RemoteFile<'_>> = pending
            .iter()
            .map(|f| RemoteFile {
                path: &f.source.relative,
                content: &f.content,
                hash: &f.hash,
            })
            .collect();

        let mut saved = 0usize;
        for batch in plan_batches(&requests, remote.batch_settings()) {
            run.check_cancelled()?;
            let members: Vec<RemoteFile<'_>> = batch.iter().map(|&i| requests[i]).collect();
            for (file, outcome) in members.iter().zip(remote.analyze_batch(&members)) {
                let RemoteOutcome::Analyzed { issues: raw, cached } = outcome else {
                    continue;
                };
                // A cached answer may predate a failed save
                if !cached || self.knowledge.get(file.hash).is_none() {
                    match self.knowledge.save(file.hash, &raw, KB_SOURCE) {
                        Ok(()) => saved += 1,
                        Err(e) => warn!("Failed to save knowledge for {}: {:#}", file.path, e),
                    }
                }
                issues.extend(raw.iter().map(|r| r.to_issue(file.path)));
                let route = if cached {
                    AnalysisRoute::KnowledgeBase
                } else {
                    AnalysisRoute::Remote
                };
                routes.insert(file.path.to_string(), route);
                handled.insert(file.path.to_string());
                self.advance(run, file.path);
            }
        }

        if saved > 0 {
            if let Err(e) = self.knowledge.flush() {
                warn!("Failed to persist knowledge base: {:#}", e);
            }
        }
        Ok(handled)
    }

    /// Every matching pattern analyzer, each isolated from the others
    fn run_pattern_analyzers(&self, file: &LoadedFile) -> Vec<Issue> {
        let mut issues = Vec::new();
        for analyzer in self.registry.pattern_analyzers_for_file(&file.source.path) {
            let name = analyzer.name().to_string();
            let start = Instant::now();
            let result = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                analyzer.analyze(&file.source.relative, &file.content)
            })) {
                Ok(found) => AnalyzerResult::success(name, found, start.elapsed().as_millis() as u64),
                Err(panic_info) => AnalyzerResult::failure(
                    name,
                    panic_message(panic_info.as_ref()),
                    start.elapsed().as_millis() as u64,
                ),
            };

            if result.success {
                debug!(
                    "{} found {} issues in {} ({}ms)",
                    result.analyzer_name,
                    result.issues.len(),
                    file.source.relative,
                    result.duration_ms
                );
                issues.extend(result.issues);
            } else if let Some(err) = &result.error {
                warn!(
                    "Analyzer {} failed on {}: {}",
                    result.analyzer_name, file.source.relative, err
                );
            }
        }
        issues
    }

    fn worker_count(&self) -> usize {
        if self.config.workers == 0 {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        } else {
            self.config.workers
        }
    }
}

fn panic_message(panic_info: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiResult, ModelService};
    use crate::cache::{KnowledgeEntry, MemoryKnowledgeBase};
    use crate::models::{IssueCategory, IssueSeverity, RawIssue};
    use std::fs;
    use std::sync::OnceLock;
    use tempfile::TempDir;

    fn orchestrator() -> ScanOrchestrator {
        let remote = RemoteAnalyzer::disabled(Arc::new(ResponseCache::default()));
        ScanOrchestrator::new(
            AnalyzerRegistry::new(Arc::new(remote)),
            Arc::new(MemoryKnowledgeBase::new()),
        )
    }

    #[test]
    fn test_invalid_repository() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        let err = orchestrator().start_scan(&missing, &[]).unwrap_err();
        assert!(matches!(err, ScanError::InvalidRepository(_)));

        let file = tmp.path().join("file.py");
        fs::write(&file, "x = 1\n").unwrap();
        assert!(matches!(
            orchestrator().start_scan(&file, &[]),
            Err(ScanError::InvalidRepository(_))
        ));
    }

    #[test]
    fn test_invalid_pattern_creates_no_scan() {
        let tmp = TempDir::new().unwrap();
        let orch = orchestrator();
        let err = orch.start_scan(tmp.path(), &["[".to_string()]).unwrap_err();
        assert!(matches!(err, ScanError::InvalidPattern(_)));
        assert!(orch.scans.is_empty());
    }

    #[test]
    fn test_pattern_scan_completes() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("settings.py"),
            "import os\npassword = \"supersecretvalue1\"\n",
        )
        .unwrap();
        fs::write(tmp.path().join("empty.py"), "").unwrap();

        let orch = orchestrator();
        let id = orch.start_scan(tmp.path(), &[]).unwrap();
        let status = orch.get_scan_status(&id).unwrap();
        assert_eq!(status.status, ScanStatus::Completed);
        assert_eq!(status.progress, 100.0);

        let results = orch.get_scan_results(&id).unwrap();
        assert_eq!(results.total_files, 2);
        assert!(results.issues.iter().any(|i| i.category == IssueCategory::Security
            && i.severity == IssueSeverity::Error
            && i.line_start == 2));

        let scan = orch.get_scan(&id).unwrap();
        assert_eq!(scan.routes.get("settings.py"), Some(&AnalysisRoute::Pattern));
        // Empty files take no route
        assert!(!scan.routes.contains_key("empty.py"));
    }

    #[test]
    fn test_cancelled_scan_fails() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.py"), "x = 1\n").unwrap();
        fs::write(tmp.path().join("b.py"), "y = 2\n").unwrap();

        // Cancel from inside the scan, after the first file
        let slot: Arc<OnceLock<Arc<AtomicBool>>> = Arc::new(OnceLock::new());
        let seen = Arc::clone(&slot);
        let orch = orchestrator().with_progress_callback(Box::new(move |_, _, _| {
            if let Some(flag) = seen.get() {
                flag.store(true, Ordering::SeqCst);
            }
        }));
        let id = orch.create_scan(tmp.path(), &[]).unwrap();
        assert!(slot.set(orch.cancel_handle(&id).unwrap()).is_ok());
        orch.run(&id).unwrap();

        let status = orch.get_scan_status(&id).unwrap();
        assert_eq!(status.status, ScanStatus::Failed);
        assert_eq!(status.error.as_deref(), Some("scan cancelled"));
        assert!(matches!(
            orch.get_scan_results(&id),
            Err(ScanError::NotCompleted { .. })
        ));
        assert!(orch.get_scan(&id).unwrap().issues.is_empty());

        // Finished scans can be neither cancelled nor rerun
        assert!(!orch.cancel(&id));
        assert!(orch.cancel_handle(&id).is_none());
        assert!(matches!(orch.run(&id), Err(ScanError::NotFound(_))));
    }

    #[test]
    fn test_cancellation_is_per_scan() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("settings.py"),
            "password = \"supersecretvalue1\"\n",
        )
        .unwrap();
        let orch = orchestrator();

        // Creating and running another scan does not clear a pending cancel
        let cancelled = orch.create_scan(tmp.path(), &[]).unwrap();
        assert!(orch.cancel(&cancelled));
        let other = orch.start_scan(tmp.path(), &[]).unwrap();
        assert_eq!(orch.get_scan_status(&other).unwrap().status, ScanStatus::Completed);
        orch.run(&cancelled).unwrap();
        assert_eq!(
            orch.get_scan_status(&cancelled).unwrap().status,
            ScanStatus::Failed
        );

        // Same on two threads at once
        let a = orch.create_scan(tmp.path(), &[]).unwrap();
        let b = orch.create_scan(tmp.path(), &[]).unwrap();
        assert!(orch.cancel(&a));
        std::thread::scope(|s| {
            s.spawn(|| orch.run(&a).unwrap());
            s.spawn(|| orch.run(&b).unwrap());
        });
        let failed = orch.get_scan_status(&a).unwrap();
        assert_eq!(failed.status, ScanStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("scan cancelled"));
        let results = orch.get_scan_results(&b).unwrap();
        assert_eq!(results.total_files, 1);
        assert!(results.issues.iter().any(|i| i.category == IssueCategory::Security));
    }

    /// Answers every prompt with an empty issue list
    struct CleanService {
        calls: AtomicUsize,
    }

    impl ModelService for CleanService {
        fn name(&self) -> String {
            "clean".into()
        }

        fn probe(&self) -> AiResult<()> {
            Ok(())
        }

        fn complete(&self, _prompt: &str) -> AiResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("[]".into())
        }
    }

    /// In-memory knowledge base whose first save fails
    struct FailFirstSave {
        inner: MemoryKnowledgeBase,
        failed: AtomicBool,
    }

    impl KnowledgeBase for FailFirstSave {
        fn get(&self, content_hash: &str) -> Option<Vec<RawIssue>> {
            self.inner.get(content_hash)
        }

        fn save(&self, content_hash: &str, issues: &[RawIssue], source: &str) -> Result<()> {
            if !self.failed.swap(true, Ordering::SeqCst) {
                return Err(anyhow!("disk full"));
            }
            self.inner.save(content_hash, issues, source)
        }

        fn entry(&self, content_hash: &str) -> Option<KnowledgeEntry> {
            self.inner.entry(content_hash)
        }

        fn len(&self) -> usize {
            self.inner.len()
        }

        fn clear(&self) -> Result<()> {
            self.inner.clear()
        }
    }

    #[test]
    fn test_failed_knowledge_save_is_repaired() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("app.py"), "x = 1\n").unwrap();

        let service = Arc::new(CleanService {
            calls: AtomicUsize::new(0),
        });
        let remote = RemoteAnalyzer::new(
            service.clone(),
            SlidingWindowLimiter::new(10, 100),
            Arc::new(ResponseCache::default()),
            BatchSettings::default(),
        );
        let knowledge = Arc::new(FailFirstSave {
            inner: MemoryKnowledgeBase::new(),
            failed: AtomicBool::new(false),
        });
        let orch = ScanOrchestrator::new(AnalyzerRegistry::new(Arc::new(remote)), knowledge.clone());

        let first = orch.start_scan(tmp.path(), &[]).unwrap();
        assert_eq!(orch.get_scan_status(&first).unwrap().status, ScanStatus::Completed);
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert!(knowledge.is_empty());

        // Second scan answers from the response cache and backfills the store
        let second = orch.start_scan(tmp.path(), &[]).unwrap();
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert_eq!(knowledge.len(), 1);
        assert_eq!(
            orch.get_scan(&second).unwrap().routes.get("app.py"),
            Some(&AnalysisRoute::KnowledgeBase)
        );
    }

    #[test]
    fn test_unknown_scan() {
        let orch = orchestrator();
        assert!(matches!(orch.get_scan_status("x"), Err(ScanError::NotFound(_))));
        assert!(matches!(orch.get_scan_results("x"), Err(ScanError::NotFound(_))));
    }

    #[test]
    fn test_remote_from_config() {
        let cache = Arc::new(ResponseCache::default());
        let disabled = remote_analyzer_from_config(&LlmConfig::default(), Arc::clone(&cache));
        assert_eq!(disabled.state(), crate::analyzers::RemoteState::Disabled);

        let unknown = LlmConfig {
            enabled: true,
            provider: "nonesuch".into(),
            ..Default::default()
        };
        let remote = remote_analyzer_from_config(&unknown, Arc::clone(&cache));
        assert_eq!(remote.state(), crate::analyzers::RemoteState::Disabled);

        // Enabled without a key: the probe fails without touching the network
        let keyless = LlmConfig {
            enabled: true,
            provider: "openai".into(),
            ..Default::default()
        };
        let remote = remote_analyzer_from_config(&keyless, cache);
        assert_eq!(remote.initialize(), crate::analyzers::RemoteState::Unavailable);
    }
}
