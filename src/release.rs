//! Release notes from the commits between the tag on HEAD and the tag before it,
//! published as a GitHub release through the `gh` CLI.

use anyhow::Result;
use log::info;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

use crate::git::run_command;

const GIT_TIMEOUT: Duration = Duration::from_secs(60);
const GH_TIMEOUT: Duration = Duration::from_secs(120);

/// Notes used when the commit range contains no (non-merge) commits.
pub const EMPTY_NOTES: &str = "Initial release";

/// Format of one release-note line: subject and author handle.
const LOG_FORMAT: &str = "--pretty=format:- %s (@%an)";

/// What will be published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleasePlan {
    pub tag: String,
    pub previous_tag: Option<String>,
    pub notes: String,
}

impl ReleasePlan {
    pub fn commit_count(&self) -> usize {
        self.notes.lines().count()
    }

    pub fn previous_tag_display(&self) -> &str {
        self.previous_tag.as_deref().unwrap_or("none")
    }

    /// Text printed instead of publishing.
    pub fn dry_run_text(&self) -> String {
        format!(
            "\n=== DRY RUN ===\nTag: {}\nPrevious tag: {}\n\nRelease notes:\n{}",
            self.tag,
            self.previous_tag_display(),
            self.notes
        )
    }
}

/// The tag pointing exactly at HEAD.
pub async fn current_tag(repo: &Path) -> Result<String> {
    let tag = run_command(
        "git",
        &["describe", "--tags", "--exact-match", "HEAD"],
        Some(repo),
        GIT_TIMEOUT,
    )
    .await
    .unwrap_or_default();

    if tag.is_empty() {
        anyhow::bail!("No tag found on HEAD");
    }
    Ok(tag)
}

/// The closest tag reachable from the parent of `tag`, if any.
pub async fn previous_tag(repo: &Path, tag: &str) -> Option<String> {
    let parent = format!("{tag}^");
    run_command(
        "git",
        &["describe", "--tags", "--abbrev=0", &parent],
        Some(repo),
        GIT_TIMEOUT,
    )
    .await
    .ok()
    .filter(|s| !s.is_empty())
}

/// `prev..tag`, or just `tag` for the first release.
pub fn commit_range(previous: Option<&str>, tag: &str) -> String {
    match previous {
        Some(prev) => format!("{prev}..{tag}"),
        None => tag.to_string(),
    }
}

/// One `- subject (@author)` line per non-merge commit in `range`.
pub async fn release_notes(repo: &Path, range: &str) -> Result<String> {
    let notes = run_command(
        "git",
        &["log", range, LOG_FORMAT, "--no-merges"],
        Some(repo),
        GIT_TIMEOUT,
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to get git log: {e}"))?;

    if notes.is_empty() {
        Ok(EMPTY_NOTES.to_string())
    } else {
        Ok(notes)
    }
}

/// Work out tag, previous tag and notes for the release at HEAD.
pub async fn prepare(repo: &Path) -> Result<ReleasePlan> {
    let tag = current_tag(repo).await?;
    info!("Current tag: {tag}");

    let previous_tag = previous_tag(repo, &tag).await;
    info!(
        "Previous tag: {}",
        previous_tag.as_deref().unwrap_or("none")
    );

    let range = commit_range(previous_tag.as_deref(), &tag);
    let notes = release_notes(repo, &range).await?;

    let plan = ReleasePlan {
        tag,
        previous_tag,
        notes,
    };
    info!("Found {} commits", plan.commit_count());
    Ok(plan)
}

/// Arguments for `gh`.
pub fn gh_release_args(plan: &ReleasePlan) -> Vec<&str> {
    vec![
        "release",
        "create",
        plan.tag.as_str(),
        "--title",
        plan.tag.as_str(),
        "--notes",
        plan.notes.as_str(),
    ]
}

/// Create the GitHub release.
pub async fn publish(repo: &Path, plan: &ReleasePlan) -> Result<()> {
    run_command("gh", &gh_release_args(plan), Some(repo), GH_TIMEOUT)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create release: {e}"))?;
    info!("Release created: {}", plan.tag);
    Ok(())
}
