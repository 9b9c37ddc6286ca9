//! Analyzer registry
//!
//! Holds every analyzer in priority order: the remote analyzer first, then
//! the pattern analyzers. Dispatch is by lowercase file extension.

use super::base::Analyzer;
use super::{
    GoAnalyzer, JavaAnalyzer, JavaScriptAnalyzer, JsonAnalyzer, PythonAnalyzer, RemoteAnalyzer,
    RustAnalyzer, SqlAnalyzer,
};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

pub struct AnalyzerRegistry {
    remote: Arc<RemoteAnalyzer>,
    analyzers: Vec<Arc<dyn Analyzer>>,
}

impl AnalyzerRegistry {
    /// Registry with the given remote analyzer and all built-in pattern analyzers
    pub fn new(remote: Arc<RemoteAnalyzer>) -> Self {
        let analyzers: Vec<Arc<dyn Analyzer>> = vec![
            remote.clone() as Arc<dyn Analyzer>,
            Arc::new(PythonAnalyzer::new()),
            Arc::new(JavaScriptAnalyzer::new()),
            Arc::new(SqlAnalyzer::new()),
            Arc::new(JsonAnalyzer::new()),
            Arc::new(GoAnalyzer::new()),
            Arc::new(JavaAnalyzer::new()),
            Arc::new(RustAnalyzer::new()),
        ];
        Self { remote, analyzers }
    }

    pub fn remote(&self) -> &Arc<RemoteAnalyzer> {
        &self.remote
    }

    /// All analyzers, in priority order
    pub fn analyzers(&self) -> &[Arc<dyn Analyzer>] {
        &self.analyzers
    }

    /// Available analyzers that claim the path. The remote analyzer, when
    /// present, is always first.
    pub fn get_analyzers_for_file(&self, path: &Path) -> Vec<Arc<dyn Analyzer>> {
        self.analyzers
            .iter()
            .filter(|a| a.can_analyze(path) && a.is_available())
            .cloned()
            .collect()
    }

    /// Pattern analyzers only; used when the remote path did not answer
    pub fn pattern_analyzers_for_file(&self, path: &Path) -> Vec<Arc<dyn Analyzer>> {
        self.analyzers
            .iter()
            .filter(|a| !a.kind().is_remote() && a.can_analyze(path))
            .cloned()
            .collect()
    }

    /// True when any analyzer claims the path's extension
    pub fn is_supported(&self, path: &Path) -> bool {
        self.analyzers.iter().any(|a| a.can_analyze(path))
    }

    /// Does the remote analyzer claim this path?
    pub fn remote_supports(&self, path: &Path) -> bool {
        self.remote.can_analyze(path)
    }

    /// Union of all supported extensions
    pub fn supported_extensions(&self) -> BTreeSet<&'static str> {
        self.analyzers
            .iter()
            .flat_map(|a| a.supported_extensions().iter().copied())
            .collect()
    }

    pub fn analyzer_names(&self) -> Vec<&'static str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }
}
