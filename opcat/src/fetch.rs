//! The repository fetch stage.
//!
//! A bounded pool of fully independent fetch tasks, one per configured
//! operator: local-path sources are copied wholesale, URL sources are
//! cloned or updated through the `git` CLI. Ordering between repositories
//! is not guaranteed and does not matter functionally; outcomes are
//! collected back in configuration order for the manifest.

use crate::stage::copy_tree;
use opcat_common::config::FetchConfig;
use opcat_common::{OperatorName, OperatorSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Commit marker for local-path sources.
pub const COMMIT_LOCAL: &str = "local_changes";
/// Commit marker when no commit could be resolved.
pub const COMMIT_UNKNOWN: &str = "no_info";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("git {args:?} failed: {stderr}")]
    Git { args: Vec<String>, stderr: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("reference {0:?} not found on remote")]
    RefNotFound(String),
}

/// How one operator's fetch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Cloned,
    Updated,
    Unchanged,
    LocalCopy,
    Failed,
}

/// Outcome of one operator fetch.
#[derive(Debug)]
pub struct FetchOutcome {
    pub source: OperatorSource,
    pub name: OperatorName,
    /// Resolved commit, or a marker (`local_changes`, `no_info`).
    pub commit: String,
    pub status: FetchStatus,
}

impl FetchOutcome {
    pub fn succeeded(&self) -> bool {
        self.status != FetchStatus::Failed
    }
}

/// Fetch every configured operator with at most `fetch.jobs` running at
/// once. Failures are per-operator outcomes, never a batch abort.
pub async fn fetch_all(
    sources: Vec<OperatorSource>,
    cfg: &FetchConfig,
    fetch_dir: &Path,
) -> Vec<FetchOutcome> {
    if let Err(e) = std::fs::create_dir_all(fetch_dir) {
        warn!(dir = %fetch_dir.display(), error = %e, "could not create fetch directory");
    }

    let semaphore = Arc::new(Semaphore::new(cfg.effective_jobs()));
    let timeout = cfg.timeout();

    let tasks: Vec<_> = sources
        .into_iter()
        .map(|source| {
            let semaphore = Arc::clone(&semaphore);
            let fetch_dir = fetch_dir.to_path_buf();
            tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("fetch semaphore never closed");
                fetch_with_timeout(source, &fetch_dir, timeout).await
            })
        })
        .collect();

    let mut outcomes = Vec::with_capacity(tasks.len());
    for task in futures::future::join_all(tasks).await {
        match task {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => warn!(error = %e, "fetch task panicked"),
        }
    }
    outcomes
}

async fn fetch_with_timeout(
    source: OperatorSource,
    fetch_dir: &Path,
    timeout: Duration,
) -> FetchOutcome {
    let name = source.name();
    debug!(operator = %name, url = %source.url, "processing");

    let result = tokio::time::timeout(timeout, fetch_one(&source, &name, fetch_dir)).await;
    let (commit, status) = match result {
        Ok(Ok(done)) => done,
        Ok(Err(e)) => {
            warn!(operator = %name, url = %source.url, error = %e, "fetch failed");
            (COMMIT_UNKNOWN.to_string(), FetchStatus::Failed)
        }
        Err(_) => {
            warn!(operator = %name, timeout = ?timeout, "fetch timed out");
            (COMMIT_UNKNOWN.to_string(), FetchStatus::Failed)
        }
    };

    FetchOutcome {
        source,
        name,
        commit,
        status,
    }
}

async fn fetch_one(
    source: &OperatorSource,
    name: &OperatorName,
    fetch_dir: &Path,
) -> Result<(String, FetchStatus), FetchError> {
    let repo_dir = repo_path(fetch_dir, name);

    if source.is_local_path() {
        // Local path: replace the cached copy wholesale.
        let _ = std::fs::remove_dir_all(&repo_dir);
        copy_tree(Path::new(&source.url), &repo_dir, &|_| false)?;
        info!(operator = %name, path = %source.url, "copied local operator");
        return Ok((COMMIT_LOCAL.to_string(), FetchStatus::LocalCopy));
    }

    if repo_dir.join(".git").is_dir() {
        return update_existing(source, name, &repo_dir).await;
    }

    // New operator: clone at the requested reference.
    info!(operator = %name, "new operator detected");
    run_git(
        &[
            "clone",
            "--branch",
            &source.git_ref,
            &source.url,
            &repo_dir.to_string_lossy(),
        ],
        None,
    )
    .await?;
    let commit = run_git(&["rev-parse", "HEAD"], Some(&repo_dir)).await?;
    Ok((commit, FetchStatus::Cloned))
}

async fn update_existing(
    source: &OperatorSource,
    name: &OperatorName,
    repo_dir: &Path,
) -> Result<(String, FetchStatus), FetchError> {
    let local = run_git(&["rev-parse", "HEAD"], Some(repo_dir)).await?;
    let remote = remote_ref(&source.url, &source.git_ref).await?;

    if local == remote {
        info!(operator = %name, "no changes detected");
        return Ok((local, FetchStatus::Unchanged));
    }

    info!(operator = %name, from = %local, to = %remote, "change detected");
    run_git(&["fetch", "origin"], Some(repo_dir)).await?;
    match run_git(&["checkout", "--detach", &remote], Some(repo_dir)).await {
        Ok(_) => Ok((remote, FetchStatus::Updated)),
        Err(e) => {
            // Keep the current checkout when the reference is unusable.
            warn!(
                operator = %name,
                reference = %source.git_ref,
                error = %e,
                "reference not valid, keeping current checkout"
            );
            Ok((local, FetchStatus::Unchanged))
        }
    }
}

/// Resolve the sha1 of a remote reference, ls-remote style.
async fn remote_ref(url: &str, reference: &str) -> Result<String, FetchError> {
    let output = run_git(&["ls-remote", url, reference], None).await?;
    output
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().next())
        .map(str::to_string)
        .filter(|sha| !sha.is_empty())
        .ok_or_else(|| FetchError::RefNotFound(reference.to_string()))
}

fn repo_path(fetch_dir: &Path, name: &OperatorName) -> PathBuf {
    fetch_dir.join(format!("op-{name}"))
}

async fn run_git(args: &[&str], cwd: Option<&Path>) -> Result<String, FetchError> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    let output = cmd.output().await?;
    if !output.status.success() {
        return Err(FetchError::Git {
            args: args.iter().map(|s| s.to_string()).collect(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
