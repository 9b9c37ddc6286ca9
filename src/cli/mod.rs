//! CLI command definitions and handlers

mod cache;
mod history;
mod init;
mod scan;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// codereview - multi-language code scanner
#[derive(Parser, Debug)]
#[command(name = "codereview")]
#[command(
    version,
    about = "Scan a repository for bugs, security, performance and maintainability issues",
    long_about = "codereview walks a repository and reviews every supported file exactly once: \
with a remote model when one is configured and has capacity, otherwise with built-in \
pattern analyzers. Findings from the remote model are remembered by content hash, so \
unchanged files are never sent twice.\n\n\
Supported languages: Python, JavaScript, TypeScript, SQL, JSON, Go, Java, Rust",
    after_help = "\
Examples:
  codereview scan .                          Scan current directory
  codereview scan . --format json -o r.json  JSON results for scripting
  codereview scan . --no-llm                 Pattern analyzers only
  codereview history                         Recent scans
  codereview cache stats                     Knowledge base size"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write an example codereview.toml (and user config) for a repository
    Init {
        /// Path to repository
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Scan a repository
    #[command(after_help = "\
Examples:
  codereview scan .                               Scan current directory
  codereview scan /path/to/repo --exclude 'gen/**'  Skip generated code
  codereview scan . --format json                 JSON output for scripting")]
    Scan {
        /// Path to repository (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Glob of repo-relative paths to skip (repeatable)
        #[arg(long, short = 'e')]
        exclude: Vec<String>,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,

        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Disable the remote model for this scan
        #[arg(long)]
        no_llm: bool,

        /// Do not record this scan in history
        #[arg(long)]
        no_history: bool,

        /// Number of parallel workers for pattern analysis (1-64)
        #[arg(long, value_parser = parse_workers)]
        workers: Option<usize>,
    },

    /// List previous scans, newest first
    History {
        /// Only scans of this repository
        #[arg(long)]
        repo: Option<PathBuf>,

        /// Maximum number of scans to list
        #[arg(long, short = 'n', default_value = "20")]
        limit: usize,
    },

    /// Show the results of a previous scan
    Show {
        /// Scan id (from `codereview history`)
        scan_id: String,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Inspect or clear the knowledge base and scan history
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show cache location and sizes
    Stats,

    /// Drop knowledge base entries older than the given age
    Clean {
        /// Maximum entry age in days
        #[arg(long, default_value = "30")]
        older_than: u32,
    },

    /// Remove the knowledge base and all scan history
    Clear,
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { path } => init::run(&path),

        Commands::Scan {
            path,
            exclude,
            format,
            output,
            no_llm,
            no_history,
            workers,
        } => scan::run(
            &path,
            &exclude,
            &format,
            output.as_deref(),
            no_llm,
            no_history,
            workers,
        ),

        Commands::History { repo, limit } => history::list(repo.as_deref(), limit),

        Commands::Show { scan_id, format } => history::show(&scan_id, &format),

        Commands::Cache { action } => match action {
            CacheAction::Stats => cache::stats(),
            CacheAction::Clean { older_than } => cache::clean(older_than),
            CacheAction::Clear => cache::clear(),
        },
    }
}
