//! Batch synchronization of the context root.
//!
//! Each configured repository is cloned (shallow, single branch) when its
//! directory is missing and pulled when it is present. All operations are
//! spawned up front on a [`JoinSet`] and then drained to completion; a
//! failure in one repository never cancels or skips another.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

use crate::config::{RepositorySpec, SyncConfig};
use crate::error::{ErrorKind, SyncError};
use crate::git;
use crate::progress::{Reporter, SilentReporter};

/// What to do with a repository, decided from the filesystem at plan time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Clone,
    Pull,
}

impl SyncAction {
    /// Present participle used in progress lines ("Cloning effect...").
    pub fn progressive(self) -> &'static str {
        match self {
            Self::Clone => "Cloning",
            Self::Pull => "Pulling",
        }
    }

    pub fn past(self) -> &'static str {
        match self {
            Self::Clone => "Cloned",
            Self::Pull => "Pulled",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clone => f.write_str("clone"),
            Self::Pull => f.write_str("pull"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum SyncStatus {
    Success,
    Failure(SyncError),
}

/// Result of processing one repository.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub repository: String,
    pub action: SyncAction,
    #[serde(flatten)]
    pub status: SyncStatus,
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, SyncStatus::Success)
    }

    pub fn error(&self) -> Option<&SyncError> {
        match &self.status {
            SyncStatus::Failure(err) => Some(err),
            SyncStatus::Success => None,
        }
    }
}

/// All outcomes of a run, in completion order.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub context_root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<SyncOutcome>,
}

impl SyncReport {
    pub fn failures(&self) -> impl Iterator<Item = &SyncError> {
        self.outcomes.iter().filter_map(SyncOutcome::error)
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    pub fn outcome(&self, repository: &str) -> Option<&SyncOutcome> {
        self.outcomes.iter().find(|o| o.repository == repository)
    }
}

/// Pair every repository with its action. Clone iff its directory does not exist yet.
pub fn plan(config: &SyncConfig) -> Vec<(RepositorySpec, SyncAction)> {
    config
        .repositories
        .iter()
        .map(|spec| {
            let action = if config.repo_dir(&spec.name).exists() {
                SyncAction::Pull
            } else {
                SyncAction::Clone
            };
            (spec.clone(), action)
        })
        .collect()
}

/// Clone or pull a single repository. Never fails: errors land in the outcome.
pub async fn sync_one(
    spec: &RepositorySpec,
    action: SyncAction,
    context_root: &Path,
    timeout: Duration,
) -> SyncOutcome {
    let repo_dir = context_root.join(&spec.name);

    let result = match action {
        SyncAction::Clone => {
            let existed = repo_dir.exists();
            let result = git::shallow_clone(&spec.remote_url, &spec.branch, &repo_dir, timeout)
                .await
                .map_err(|e| SyncError::from_command(&spec.name, action, &e));
            // A killed clone leaves a partial work tree that would be taken for a pullable copy.
            if result.is_err() && !existed {
                discard_partial_clone(&repo_dir).await;
            }
            result
        }
        // Without this check git would walk up and pull whatever repo encloses the context root.
        SyncAction::Pull if !git::is_git_repo(&repo_dir) => Err(SyncError::new(
            &spec.name,
            action,
            ErrorKind::CorruptLocalCopy,
            format!("{} exists but is not a git repository", repo_dir.display()),
        )),
        SyncAction::Pull => git::pull(&repo_dir, timeout)
            .await
            .map_err(|e| SyncError::from_command(&spec.name, action, &e)),
    };

    let status = match result {
        Ok(()) => {
            debug!("{} of {} succeeded", action, spec.name);
            SyncStatus::Success
        }
        Err(err) => {
            warn!("{err}");
            SyncStatus::Failure(err)
        }
    };

    SyncOutcome {
        repository: spec.name.clone(),
        action,
        status,
    }
}

async fn discard_partial_clone(repo_dir: &Path) {
    if !repo_dir.exists() {
        return;
    }
    match tokio::fs::remove_dir_all(repo_dir).await {
        Ok(()) => debug!("removed partial clone at {}", repo_dir.display()),
        Err(e) => warn!(
            "failed to remove partial clone at {}: {e}",
            repo_dir.display()
        ),
    }
}

/// Drives one synchronization run over a [`SyncConfig`].
pub struct Synchronizer {
    config: SyncConfig,
    reporter: Arc<dyn Reporter>,
}

impl Synchronizer {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            reporter: Arc::new(SilentReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Fan out one task per repository, then wait for every one of them.
    ///
    /// Only fails if the context root itself cannot be created.
    pub async fn run(&self) -> Result<SyncReport> {
        let started_at = Utc::now();
        let root = self.config.context_root.clone();

        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create context root {}", root.display()))?;

        let mut tasks = JoinSet::new();
        let mut issued = HashMap::new();

        for (spec, action) in plan(&self.config) {
            self.reporter.started(&spec, action);

            let reporter = Arc::clone(&self.reporter);
            let root = root.clone();
            let timeout = self.config.timeout;
            let name = spec.name.clone();

            let handle = tasks.spawn(async move {
                let outcome = sync_one(&spec, action, &root, timeout).await;
                reporter.finished(&outcome);
                outcome
            });
            issued.insert(handle.id(), (name, action));
        }
        debug!("issued {} sync operations", issued.len());

        let mut outcomes = Vec::with_capacity(issued.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, outcome)) => outcomes.push(outcome),
                Err(join_err) => {
                    let Some((name, action)) = issued.remove(&join_err.id()) else {
                        warn!("sync task ended abnormally: {join_err}");
                        continue;
                    };
                    let err = SyncError::new(
                        &name,
                        action,
                        ErrorKind::Other,
                        format!("task ended abnormally: {join_err}"),
                    );
                    warn!("{err}");
                    let outcome = SyncOutcome {
                        repository: name,
                        action,
                        status: SyncStatus::Failure(err),
                    };
                    self.reporter.finished(&outcome);
                    outcomes.push(outcome);
                }
            }
        }

        let report = SyncReport {
            context_root: root,
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        self.reporter.summary(&report);
        Ok(report)
    }
}
