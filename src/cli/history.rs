//! History and show commands

use crate::cache::{get_cache_dir, history_dir};
use crate::models::ScanStatus;
use crate::reporters;
use crate::storage::{FileScanHistory, ScanHistory};
use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use std::str::FromStr;

fn open_history() -> FileScanHistory {
    FileScanHistory::new(history_dir(&get_cache_dir()))
}

fn status_label(status: ScanStatus) -> String {
    match status {
        ScanStatus::Completed => style(status).green().to_string(),
        ScanStatus::Failed => style(status).red().to_string(),
        ScanStatus::Running => style(status).yellow().to_string(),
    }
}

/// List stored scans, newest first
pub fn list(repo: Option<&Path>, limit: usize) -> Result<()> {
    let repo = match repo {
        Some(path) => Some(
            path.canonicalize()
                .with_context(|| format!("Path does not exist: {}", path.display()))?
                .display()
                .to_string(),
        ),
        None => None,
    };

    let records = open_history().list(repo.as_deref(), limit)?;
    if records.is_empty() {
        println!("No scans recorded yet. Run {}", style("codereview scan").cyan());
        return Ok(());
    }

    println!("{}", style("Recent scans").bold());
    println!();
    for record in records {
        println!(
            "  {}  {}  {:>5} files  {:>5} issues  {}",
            style(&record.scan_id).cyan(),
            record.start_time.format("%Y-%m-%d %H:%M"),
            record.total_files,
            record.total_issues,
            status_label(record.status),
        );
        println!("      {}", style(&record.repository_path).dim());
    }
    Ok(())
}

/// Print a stored scan's results
pub fn show(scan_id: &str, format: &str) -> Result<()> {
    let format = reporters::OutputFormat::from_str(format)?;
    let Some(scan) = open_history().get(scan_id)? else {
        anyhow::bail!(
            "No scan with id {}. Run `codereview history` to list scans.",
            scan_id
        );
    };

    if scan.status != ScanStatus::Completed {
        anyhow::bail!(
            "Scan {} is {}: {}",
            scan_id,
            scan.status,
            scan.error.as_deref().unwrap_or("no results")
        );
    }

    print!("{}", reporters::report_with_format(&scan.results(), format)?);
    Ok(())
}
