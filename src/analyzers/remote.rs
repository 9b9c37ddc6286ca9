//! Remote-model analyzer
//!
//! Wraps a [`ModelService`] with admission control (sliding-window rate
//! limiter), a shared response cache, batching and response parsing.
//!
//! Every call reports a [`RemoteOutcome`]. `Analyzed` means the model (or
//! the cache) produced an answer, possibly empty. `Skipped` means no answer
//! exists: the caller must fall back to pattern analysis and nothing is
//! cached.

use super::base::{language_for_path, Analyzer, AnalyzerKind};
use crate::ai::prompts::{batch_prompt, single_file_prompt, PromptFile};
use crate::ai::{response, ModelService, SlidingWindowLimiter};
use crate::cache::{content_hash, ResponseCache};
use crate::models::{Issue, RawIssue};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Estimate prompt tokens for a piece of content
pub type TokenEstimator = fn(&str) -> usize;

/// Roughly four bytes per token
pub fn estimate_tokens(content: &str) -> usize {
    content.len() / 4
}

pub const DEFAULT_BATCH_MAX_FILES: usize = 5;
pub const DEFAULT_BATCH_MAX_TOKENS: usize = 6000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteState {
    /// No configuration; never available
    Disabled,
    /// Configured, probe not yet run
    Initializing,
    Available,
    /// Probe failed (bad key, no connectivity)
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    RateLimited,
    Unavailable,
    /// Network error, timeout, or a response without usable JSON
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome {
    Analyzed { issues: Vec<RawIssue>, cached: bool },
    Skipped(SkipReason),
}

impl RemoteOutcome {
    pub fn is_analyzed(&self) -> bool {
        matches!(self, RemoteOutcome::Analyzed { .. })
    }
}

/// One file handed to the remote analyzer
#[derive(Debug, Clone, Copy)]
pub struct RemoteFile<'a> {
    pub path: &'a str,
    pub content: &'a str,
    pub hash: &'a str,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchSettings {
    pub max_files: usize,
    pub max_tokens: usize,
    pub estimator: TokenEstimator,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_BATCH_MAX_FILES,
            max_tokens: DEFAULT_BATCH_MAX_TOKENS,
            estimator: estimate_tokens,
        }
    }
}

/// Group files (by index) into batches bounded by file count and estimated
/// tokens. Input order is preserved. A file that alone exceeds the token
/// budget gets a batch of its own.
pub fn plan_batches(files: &[RemoteFile<'_>], settings: &BatchSettings) -> Vec<Vec<usize>> {
    let max_files = settings.max_files.max(1);
    let mut batches = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut current_tokens = 0usize;

    for (idx, file) in files.iter().enumerate() {
        let tokens = (settings.estimator)(file.content);
        let full = current.len() >= max_files || current_tokens + tokens > settings.max_tokens;
        if !current.is_empty() && full {
            batches.push(std::mem::take(&mut current));
            current_tokens = 0;
        }
        current.push(idx);
        current_tokens += tokens;
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

pub struct RemoteAnalyzer {
    service: Option<Arc<dyn ModelService>>,
    limiter: SlidingWindowLimiter,
    cache: Arc<ResponseCache>,
    state: Mutex<RemoteState>,
    batch: BatchSettings,
    calls: AtomicUsize,
}

impl RemoteAnalyzer {
    pub fn new(
        service: Arc<dyn ModelService>,
        limiter: SlidingWindowLimiter,
        cache: Arc<ResponseCache>,
        batch: BatchSettings,
    ) -> Self {
        Self {
            service: Some(service),
            limiter,
            cache,
            state: Mutex::new(RemoteState::Initializing),
            batch,
            calls: AtomicUsize::new(0),
        }
    }

    /// Analyzer with no backing service
    pub fn disabled(cache: Arc<ResponseCache>) -> Self {
        Self {
            service: None,
            limiter: SlidingWindowLimiter::new(0, 0),
            cache,
            state: Mutex::new(RemoteState::Disabled),
            batch: BatchSettings::default(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Run the connectivity probe once; later calls return the settled state
    pub fn initialize(&self) -> RemoteState {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != RemoteState::Initializing {
            return *state;
        }
        let Some(service) = &self.service else {
            *state = RemoteState::Disabled;
            return *state;
        };
        *state = match service.probe() {
            Ok(()) => {
                info!("Remote analyzer '{}' initialized successfully", service.name());
                RemoteState::Available
            }
            Err(e) => {
                warn!("Remote analyzer '{}' not available: {}", service.name(), e);
                RemoteState::Unavailable
            }
        };
        *state
    }

    pub fn state(&self) -> RemoteState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn batch_settings(&self) -> &BatchSettings {
        &self.batch
    }

    /// Number of requests actually sent to the service
    pub fn remote_calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn ready(&self) -> Option<&Arc<dyn ModelService>> {
        if self.initialize() == RemoteState::Available {
            self.service.as_ref()
        } else {
            None
        }
    }

    fn send(&self, service: &Arc<dyn ModelService>, prompt: &str) -> Option<String> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match service.complete(prompt) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Remote analysis request failed: {}", e);
                None
            }
        }
    }

    pub fn analyze_file(&self, file_path: &str, content: &str) -> RemoteOutcome {
        let hash = content_hash(content);
        self.analyze_one(RemoteFile {
            path: file_path,
            content,
            hash: &hash,
        })
    }

    fn analyze_one(&self, file: RemoteFile<'_>) -> RemoteOutcome {
        let Some(service) = self.ready() else {
            return RemoteOutcome::Skipped(SkipReason::Unavailable);
        };
        if let Some(issues) = self.cache.get_by_hash(file.path, file.hash) {
            return RemoteOutcome::Analyzed {
                issues,
                cached: true,
            };
        }
        if !self.limiter.try_acquire() {
            debug!("Rate limit reached, skipping remote analysis of {}", file.path);
            return RemoteOutcome::Skipped(SkipReason::RateLimited);
        }

        let prompt = single_file_prompt(PromptFile {
            path: file.path,
            language: language_for_path(Path::new(file.path)),
            content: file.content,
        });
        let Some(text) = self.send(service, &prompt) else {
            return RemoteOutcome::Skipped(SkipReason::Failed);
        };
        match response::parse_single(&text) {
            Some(issues) => {
                debug!("Remote analysis found {} issues in {}", issues.len(), file.path);
                self.cache.set_by_hash(file.path, file.hash, issues.clone());
                RemoteOutcome::Analyzed {
                    issues,
                    cached: false,
                }
            }
            None => {
                warn!("Could not parse remote response for {}", file.path);
                RemoteOutcome::Skipped(SkipReason::Failed)
            }
        }
    }

    /// Analyze one planned batch with a single request. Cache hits inside the
    /// batch are answered locally; outcomes are returned in input order.
    pub fn analyze_batch(&self, files: &[RemoteFile<'_>]) -> Vec<RemoteOutcome> {
        let Some(service) = self.ready() else {
            return vec![RemoteOutcome::Skipped(SkipReason::Unavailable); files.len()];
        };

        let mut outcomes: Vec<Option<RemoteOutcome>> = files
            .iter()
            .map(|f| {
                self.cache
                    .get_by_hash(f.path, f.hash)
                    .map(|issues| RemoteOutcome::Analyzed {
                        issues,
                        cached: true,
                    })
            })
            .collect();

        let pending: Vec<usize> = (0..files.len()).filter(|&i| outcomes[i].is_none()).collect();
        match pending.as_slice() {
            [] => {}
            [only] => outcomes[*only] = Some(self.analyze_one(files[*only])),
            _ => {
                let results = self.request_batch(service, files, &pending);
                for (idx, outcome) in pending.iter().zip(results) {
                    outcomes[*idx] = Some(outcome);
                }
            }
        }

        outcomes
            .into_iter()
            .map(|o| o.unwrap_or(RemoteOutcome::Skipped(SkipReason::Failed)))
            .collect()
    }

    fn request_batch(
        &self,
        service: &Arc<dyn ModelService>,
        files: &[RemoteFile<'_>],
        pending: &[usize],
    ) -> Vec<RemoteOutcome> {
        let skipped = |reason| vec![RemoteOutcome::Skipped(reason); pending.len()];

        if !self.limiter.try_acquire() {
            debug!("Rate limit reached, skipping batch of {} files", pending.len());
            return skipped(SkipReason::RateLimited);
        }

        let prompt_files: Vec<PromptFile<'_>> = pending
            .iter()
            .map(|&i| PromptFile {
                path: files[i].path,
                language: language_for_path(Path::new(files[i].path)),
                content: files[i].content,
            })
            .collect();
        let Some(text) = self.send(service, &batch_prompt(&prompt_files)) else {
            return skipped(SkipReason::Failed);
        };

        let paths: Vec<&str> = pending.iter().map(|&i| files[i].path).collect();
        let Some(mut parsed) = response::parse_batch(&text, &paths) else {
            warn!("Could not parse batch response for {} files", pending.len());
            return skipped(SkipReason::Failed);
        };

        pending
            .iter()
            .map(|&i| {
                let file = files[i];
                let issues = parsed.remove(file.path).unwrap_or_default();
                self.cache.set_by_hash(file.path, file.hash, issues.clone());
                RemoteOutcome::Analyzed {
                    issues,
                    cached: false,
                }
            })
            .collect()
    }

    /// Plan and run every batch in order
    pub fn analyze_files(&self, files: &[RemoteFile<'_>]) -> Vec<RemoteOutcome> {
        let mut outcomes = vec![RemoteOutcome::Skipped(SkipReason::Failed); files.len()];
        for batch in plan_batches(files, &self.batch) {
            let members: Vec<RemoteFile<'_>> = batch.iter().map(|&i| files[i]).collect();
            for (idx, outcome) in batch.into_iter().zip(self.analyze_batch(&members)) {
                outcomes[idx] = outcome;
            }
        }
        outcomes
    }
}

/// Normalize raw remote issues for a file
pub fn to_issues(file_path: &str, raw: &[RawIssue]) -> Vec<Issue> {
    raw.iter().map(|r| r.to_issue(file_path)).collect()
}

impl Analyzer for RemoteAnalyzer {
    fn name(&self) -> &'static str {
        "RemoteAnalyzer"
    }

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Remote
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &[".py", ".pyw", ".js", ".jsx", ".ts", ".tsx", ".mjs", ".sql", ".json"]
    }

    /// Issues only; a skipped call reads as no issues
    fn analyze(&self, file_path: &str, content: &str) -> Vec<Issue> {
        match self.analyze_file(file_path, content) {
            RemoteOutcome::Analyzed { issues, .. } => to_issues(file_path, &issues),
            RemoteOutcome::Skipped(_) => Vec::new(),
        }
    }

    /// Configured, probe passed, and the rate limiter has headroom
    fn is_available(&self) -> bool {
        self.initialize() == RemoteState::Available && self.limiter.has_capacity()
    }
}
