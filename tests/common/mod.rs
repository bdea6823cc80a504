#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Duration, Utc};
use registry_retention::core::errors::{Result, RrpError};
use registry_retention::registry::RegistryStore;
use registry_retention::registry::models::{
    RepoTop, SearchRepository, SearchResponse, Statistics, TagInfo,
};

// ──────────────────── CLI runner ────────────────────

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_rrp") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "rrp.exe" } else { "rrp" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve rrp binary path for integration test"),
    }
}

/// Run the binary with `args`, extra env vars and `stdin`, keeping a log of
/// the exchange for failed assertions to point at.
pub fn run_cli_case_with(
    case_name: &str,
    args: &[&str],
    envs: &[(&str, &str)],
    stdin: &str,
) -> CmdResult {
    let root = std::env::temp_dir().join("rrp-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut child = Command::new(&bin_path)
        .args(args)
        .envs(envs.iter().copied())
        .env_remove("RRP_OUTPUT_FORMAT")
        .env("RUST_BACKTRACE", "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn rrp command");
    if let Some(mut pipe) = child.stdin.take() {
        // The child may exit before reading; a closed pipe is not a test failure.
        let _ = pipe.write_all(stdin.as_bytes());
    }
    let output = child.wait_with_output().expect("execute rrp command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    run_cli_case_with(case_name, args, &[], "")
}

/// Write a config that points every path into `dir`.
pub fn write_config(dir: &Path, registry_url: &str) -> PathBuf {
    let config_path = dir.join("config.toml");
    let body = format!(
        "[registry]\nurl = \"{registry_url}\"\ntimeout_secs = 1\n\n\
         [policy]\nfile = \"{}\"\n\n\
         [paths]\nsession_file = \"{}\"\nactivity_log = \"{}\"\n",
        dir.join("rp.yaml").display(),
        dir.join("session.json").display(),
        dir.join("activity.jsonl").display(),
    );
    fs::write(&config_path, body).expect("write config");
    config_path
}

// ──────────────────── in-memory registry ────────────────────

/// Registry fake recording every request it receives.
#[derive(Default)]
pub struct FakeRegistry {
    pub stats: Statistics,
    pub top: Vec<RepoTop>,
    pub repositories: Vec<SearchRepository>,
    pub tags: HashMap<String, Vec<TagInfo>>,
    /// Deletions that fail: a repository name, or `repo:tag`.
    pub failing_deletes: HashSet<String>,
    pub fail_statistics: bool,
    pub top_requests: RefCell<Vec<u64>>,
    pub searches: RefCell<Vec<String>>,
    pub tag_listings: RefCell<Vec<String>>,
    pub deleted_repositories: RefCell<Vec<String>>,
    pub deleted_tags: RefCell<Vec<(String, String)>>,
}

impl FakeRegistry {
    pub fn with_repo(mut self, id: i64, name: &str, pulls: i64, tags: i64, update_time: &str) -> Self {
        self.top.push(RepoTop {
            id,
            name: name.to_string(),
            project_id: 1,
            description: String::new(),
            pull_count: pulls,
            star_count: 0,
            tags_count: tags,
            creation_time: update_time.to_string(),
            update_time: update_time.to_string(),
        });
        self.stats.public_repo_count = self.top.len() as u64;
        self
    }

    pub fn with_tags<S: AsRef<str>>(mut self, repository: &str, tags: &[(&str, S)]) -> Self {
        self.repositories.push(SearchRepository {
            project_id: 1,
            project_name: "library".to_string(),
            project_public: true,
            pull_count: 0,
            repository_name: repository.to_string(),
            tags_count: tags.len() as i64,
        });
        self.tags.insert(
            repository.to_string(),
            tags.iter()
                .map(|(name, created)| TagInfo {
                    name: (*name).to_string(),
                    created: created.as_ref().to_string(),
                    ..TagInfo::default()
                })
                .collect(),
        );
        self
    }

    pub fn failing(mut self, target: &str) -> Self {
        self.failing_deletes.insert(target.to_string());
        self
    }

    fn rejected(target: &str) -> RrpError {
        RrpError::HttpStatus {
            method: "DELETE",
            url: format!("http://fake/api/repositories/{target}"),
            status: 500,
        }
    }
}

impl RegistryStore for FakeRegistry {
    fn statistics(&self) -> Result<Statistics> {
        if self.fail_statistics {
            return Err(RrpError::HttpStatus {
                method: "GET",
                url: "http://fake/api/statistics".to_string(),
                status: 401,
            });
        }
        Ok(self.stats.clone())
    }

    fn top_repositories(&self, count: u64) -> Result<Vec<RepoTop>> {
        self.top_requests.borrow_mut().push(count);
        let limit = usize::try_from(count).unwrap_or(usize::MAX);
        Ok(self.top.iter().take(limit).cloned().collect())
    }

    fn search(&self, query: &str) -> Result<SearchResponse> {
        self.searches.borrow_mut().push(query.to_string());
        Ok(SearchResponse {
            repository: self
                .repositories
                .iter()
                .filter(|r| r.repository_name.contains(query))
                .cloned()
                .collect(),
            project: Vec::new(),
        })
    }

    fn list_tags(&self, repository: &str) -> Result<Vec<TagInfo>> {
        self.tag_listings.borrow_mut().push(repository.to_string());
        Ok(self.tags.get(repository).cloned().unwrap_or_default())
    }

    fn delete_repository(&self, repository: &str) -> Result<()> {
        if self.failing_deletes.contains(repository) {
            return Err(Self::rejected(repository));
        }
        self.deleted_repositories
            .borrow_mut()
            .push(repository.to_string());
        Ok(())
    }

    fn delete_tag(&self, repository: &str, tag: &str) -> Result<()> {
        let target = format!("{repository}:{tag}");
        if self.failing_deletes.contains(&target) {
            return Err(Self::rejected(&target));
        }
        self.deleted_tags
            .borrow_mut()
            .push((repository.to_string(), tag.to_string()));
        Ok(())
    }
}

// ──────────────────── time helpers ────────────────────

pub fn run_clock() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-06-01T00:00:00Z")
        .expect("valid clock")
        .with_timezone(&Utc)
}

/// RFC 3339 timestamp `days` before the run clock.
pub fn days_ago(days: i64) -> String {
    (run_clock() - Duration::days(days)).to_rfc3339()
}
