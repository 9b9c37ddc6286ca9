//! Scan command

use crate::analyzers::AnalyzerRegistry;
use crate::cache::{
    ensure_cache_dir, get_cache_dir, history_dir, knowledge_base_path, JsonKnowledgeBase,
    KnowledgeBase, ResponseCache,
};
use crate::config::load_config;
use crate::models::ScanStatus;
use crate::reporters;
use crate::scanner::{remote_analyzer_from_config, ScanOrchestrator};
use crate::storage::FileScanHistory;
use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

fn create_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap()
        .progress_chars("█▓▒░  ")
}

pub fn run(
    path: &Path,
    exclude: &[String],
    format: &str,
    output: Option<&Path>,
    no_llm: bool,
    no_history: bool,
    workers: Option<usize>,
) -> Result<()> {
    let repo_path = path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", path.display()))?;
    if !repo_path.is_dir() {
        anyhow::bail!("Path is not a directory: {}", repo_path.display());
    }
    let format = reporters::OutputFormat::from_str(format)?;

    let mut config = load_config(&repo_path);
    if no_llm {
        config.llm.enabled = false;
    }
    if let Some(n) = workers {
        config.analysis.workers = n;
    }

    let cache_dir = ensure_cache_dir(&get_cache_dir()).context("Failed to create cache directory")?;
    let knowledge: Arc<dyn KnowledgeBase> =
        Arc::new(JsonKnowledgeBase::open(knowledge_base_path(&cache_dir)));
    let response_cache = Arc::new(ResponseCache::new(config.llm.cache_ttl()));
    let remote = Arc::new(remote_analyzer_from_config(&config.llm, response_cache));

    let bar = ProgressBar::new(0);
    bar.set_style(create_bar_style());
    let progress = bar.clone();

    let mut orchestrator = ScanOrchestrator::new(AnalyzerRegistry::new(remote), knowledge)
        .with_config(config.analysis.clone())
        .with_progress_callback(Box::new(move |label, done, total| {
            progress.set_length(total as u64);
            progress.set_position(done as u64);
            progress.set_message(label.to_string());
        }));
    if !no_history {
        orchestrator =
            orchestrator.with_history(Arc::new(FileScanHistory::new(history_dir(&cache_dir))));
    }

    let scan_id = orchestrator.start_scan(&repo_path, exclude)?;
    bar.finish_and_clear();

    let status = orchestrator.get_scan_status(&scan_id)?;
    if status.status == ScanStatus::Failed {
        anyhow::bail!(
            "Scan {} failed: {}",
            scan_id,
            status.error.as_deref().unwrap_or("unknown error")
        );
    }

    let results = orchestrator.get_scan_results(&scan_id)?;
    let rendered = reporters::report_with_format(&results, format)?;

    match output {
        Some(out) => {
            std::fs::write(out, &rendered)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            eprintln!(
                "{} Wrote {} issues to {}",
                style("✓").green(),
                results.summary.total_issues,
                style(out.display()).cyan()
            );
        }
        None => print!("{}", rendered),
    }

    if let Some(scan) = orchestrator.get_scan(&scan_id) {
        let remote_files = scan.routes.values().filter(|r| r.is_llm()).count();
        if remote_files > 0 {
            eprintln!(
                "{}",
                style(format!(
                    "{} of {} files reviewed by the remote model ({} requests)",
                    remote_files,
                    scan.routes.len(),
                    orchestrator.registry().remote().remote_calls()
                ))
                .dim()
            );
        }
        eprintln!("{}", style(format!("Scan id: {}", scan_id)).dim());
    }

    Ok(())
}
