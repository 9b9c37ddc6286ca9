//! CLI contract tests
//!
//! Runs the built binary against temp repositories. The cache directory and
//! user config location point into a temp dir so runs never touch the real
//! home directory, and `--no-llm` keeps everything offline.

use std::process::{Command, Output};
use tempfile::TempDir;

struct Env {
    home: TempDir,
    repo: TempDir,
}

impl Env {
    fn new() -> Self {
        let env = Self {
            home: TempDir::new().unwrap(),
            repo: TempDir::new().unwrap(),
        };
        std::fs::write(
            env.repo.path().join("settings.py"),
            "import os\npassword = \"supersecretvalue1\"\n",
        )
        .unwrap();
        std::fs::write(env.repo.path().join("query.sql"), "SELECT * FROM users;\n").unwrap();
        env
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_codereview"))
            .args(args)
            .env("CODEREVIEW_CACHE_DIR", self.home.path().join("cache"))
            .env("XDG_CONFIG_HOME", self.home.path().join("config"))
            .env("HOME", self.home.path())
            .env_remove("CODEREVIEW_LLM_ENABLED")
            .env_remove("RUST_LOG")
            .output()
            .expect("binary runs")
    }

    fn repo_arg(&self) -> String {
        self.repo.path().display().to_string()
    }

    fn scan_json(&self) -> serde_json::Value {
        let out = self.run(&["scan", &self.repo_arg(), "--format", "json", "--no-llm"]);
        assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
        serde_json::from_slice(&out.stdout).expect("stdout is JSON")
    }
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

#[test]
fn test_json_output_shape() {
    let env = Env::new();
    let report = env.scan_json();

    assert_eq!(report["totalFiles"], 2);
    let languages = report["detectedLanguages"].as_array().unwrap();
    assert!(languages.iter().any(|l| l == "python"));
    assert!(languages.iter().any(|l| l == "sql"));

    let issues = report["issues"].as_array().unwrap();
    assert_eq!(report["summary"]["totalIssues"], issues.len());
    let password = issues
        .iter()
        .find(|i| i["filePath"] == "settings.py" && i["category"] == "security")
        .expect("password issue");
    assert_eq!(password["severity"], "error");
    assert_eq!(password["lineStart"], 2);
}

#[test]
fn test_text_output_to_file() {
    let env = Env::new();
    let out_path = env.home.path().join("report.txt");
    let out = env.run(&[
        "scan",
        &env.repo_arg(),
        "--no-llm",
        "--output",
        &out_path.display().to_string(),
    ]);
    assert!(out.status.success());
    assert!(stdout(&out).is_empty());

    let report = std::fs::read_to_string(&out_path).unwrap();
    assert!(report.contains("settings.py"));
    assert!(report.contains("security"));
}

#[test]
fn test_missing_path_fails() {
    let env = Env::new();
    let missing = env.repo.path().join("does-not-exist");
    let out = env.run(&["scan", &missing.display().to_string(), "--no-llm"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("does not exist"));
}

#[test]
fn test_invalid_exclude_fails() {
    let env = Env::new();
    let out = env.run(&["scan", &env.repo_arg(), "--no-llm", "--exclude", "[unclosed"]);
    assert!(!out.status.success());
}

#[test]
fn test_exclude_flag() {
    let env = Env::new();
    let out = env.run(&[
        "scan",
        &env.repo_arg(),
        "--no-llm",
        "--format",
        "json",
        "-e",
        "*.sql",
    ]);
    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["totalFiles"], 1);
    assert!(report["issues"]
        .as_array()
        .unwrap()
        .iter()
        .all(|i| i["filePath"] != "query.sql"));
}

#[test]
fn test_history_and_show() {
    let env = Env::new();
    let report = env.scan_json();
    let scan_id = report["scanId"].as_str().unwrap().to_string();

    let listed = env.run(&["history"]);
    assert!(listed.status.success());
    assert!(stdout(&listed).contains(&scan_id));

    let shown = env.run(&["show", &scan_id, "--format", "json"]);
    assert!(shown.status.success());
    let replay: serde_json::Value = serde_json::from_slice(&shown.stdout).unwrap();
    assert_eq!(replay["issues"], report["issues"]);

    let unknown = env.run(&["show", "not-a-scan"]);
    assert!(!unknown.status.success());
}

#[test]
fn test_no_history_flag() {
    let env = Env::new();
    let out = env.run(&["scan", &env.repo_arg(), "--no-llm", "--no-history"]);
    assert!(out.status.success());
    let listed = env.run(&["history"]);
    assert!(stdout(&listed).contains("No scans recorded yet"));
}

#[test]
fn test_cache_stats_and_clear() {
    let env = Env::new();
    env.scan_json();

    let stats = env.run(&["cache", "stats"]);
    assert!(stats.status.success());
    assert!(stdout(&stats).contains("Scan history: 1 scans"));

    let cleared = env.run(&["cache", "clear"]);
    assert!(cleared.status.success());
    assert!(stdout(&cleared).contains("1 scans"));

    let stats = env.run(&["cache", "stats"]);
    assert!(stdout(&stats).contains("Scan history: 0 scans"));
}

#[test]
fn test_init_writes_project_config() {
    let env = Env::new();
    let out = env.run(&["init", &env.repo_arg()]);
    assert!(out.status.success());
    assert!(env.repo.path().join("codereview.toml").exists());

    // Scanning with the generated config still works
    env.scan_json();
}
