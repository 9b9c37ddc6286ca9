//! Cache command - inspect and clear the knowledge base and history

use crate::cache::{get_cache_dir, history_dir, knowledge_base_path, JsonKnowledgeBase, KnowledgeBase};
use crate::storage::{FileScanHistory, ScanHistory};
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use console::style;

pub fn stats() -> Result<()> {
    let cache_dir = get_cache_dir();
    let kb_path = knowledge_base_path(&cache_dir);
    let kb = JsonKnowledgeBase::open(&kb_path);
    let history = FileScanHistory::new(history_dir(&cache_dir));
    let scans = history.list(None, usize::MAX)?;
    let kb_size = std::fs::metadata(&kb_path).map(|m| m.len()).unwrap_or(0);

    println!("\n{}\n", style("codereview cache").bold());
    println!("  Location: {}", style(cache_dir.display()).dim());
    println!(
        "  Knowledge base: {} entries ({} KiB)",
        style(kb.len()).cyan(),
        kb_size / 1024
    );
    println!("  Scan history: {} scans", style(scans.len()).cyan());
    Ok(())
}

pub fn clean(older_than_days: u32) -> Result<()> {
    let kb = JsonKnowledgeBase::open(knowledge_base_path(&get_cache_dir()));
    let cutoff = Utc::now() - Duration::days(i64::from(older_than_days));
    let removed = kb.prune_older_than(cutoff);
    kb.flush().context("Failed to save knowledge base")?;
    println!(
        "Removed {} knowledge base entr{} older than {} days ({} remain).",
        removed,
        if removed == 1 { "y" } else { "ies" },
        older_than_days,
        kb.len()
    );
    Ok(())
}

pub fn clear() -> Result<()> {
    let cache_dir = get_cache_dir();
    let kb = JsonKnowledgeBase::open(knowledge_base_path(&cache_dir));
    let entries = kb.len();
    kb.clear()?;
    let scans = FileScanHistory::new(history_dir(&cache_dir)).clear()?;
    println!(
        "{} Cleared {} knowledge base entries and {} scans.",
        style("✓").green(),
        entries,
        scans
    );
    Ok(())
}
