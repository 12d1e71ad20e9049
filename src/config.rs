//! Which repositories to keep in sync, and where.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory, relative to the project root, that holds the cached copies.
pub const CONTEXT_DIR: &str = ".context";

/// Default per-operation deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

fn default_branch() -> String {
    "main".to_string()
}

/// A remote repository and the branch to track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySpec {
    /// Unique name, also the local directory name under the context root
    pub name: String,
    #[serde(alias = "remote")]
    pub remote_url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
}

impl RepositorySpec {
    pub fn new(
        name: impl Into<String>,
        remote_url: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            remote_url: remote_url.into(),
            branch: branch.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RepositoryFile {
    #[serde(default)]
    repositories: Vec<RepositorySpec>,
}

/// Everything the synchronizer needs for one run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub context_root: PathBuf,
    pub repositories: Vec<RepositorySpec>,
    pub timeout: Duration,
}

impl SyncConfig {
    pub fn new(context_root: impl Into<PathBuf>, repositories: Vec<RepositorySpec>) -> Self {
        Self {
            context_root: context_root.into(),
            repositories,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The reference repositories pulled when no config file is given.
    pub fn default_repositories() -> Vec<RepositorySpec> {
        vec![RepositorySpec::new(
            "effect",
            "https://github.com/Effect-TS/effect.git",
            "main",
        )]
    }

    /// Load a repository list from a `.yaml`/`.yml` or `.json` file.
    pub fn repositories_from_file(path: &Path) -> Result<Vec<RepositorySpec>> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let file: RepositoryFile = match ext.as_str() {
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?,
            "yaml" | "yml" => serde_yaml_ng::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?,
            _ => anyhow::bail!(
                "Unsupported config format '{}': use .yaml, .yml or .json",
                path.display()
            ),
        };

        Ok(file.repositories)
    }

    /// Reject lists the synchronizer cannot process safely.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for repo in &self.repositories {
            validate_repo_name(&repo.name)?;
            if repo.remote_url.trim().is_empty() {
                anyhow::bail!("Repository '{}' has an empty remote URL", repo.name);
            }
            if repo.branch.trim().is_empty() {
                anyhow::bail!("Repository '{}' has an empty branch", repo.name);
            }
            if !seen.insert(repo.name.as_str()) {
                anyhow::bail!("Duplicate repository name '{}'", repo.name);
            }
        }
        if self.timeout.is_zero() {
            anyhow::bail!("Timeout must be greater than zero");
        }
        Ok(())
    }

    pub fn repo_dir(&self, name: &str) -> PathBuf {
        self.context_root.join(name)
    }
}

/// A repository name doubles as a directory name, so it must be a single safe path component.
pub fn validate_repo_name(name: &str) -> Result<()> {
    if name.is_empty() {
        anyhow::bail!("Repository name cannot be empty");
    }
    if name.starts_with('.') {
        anyhow::bail!("Invalid repository name '{name}': cannot start with '.'");
    }
    if name.contains('/') || name.contains('\\') {
        anyhow::bail!("Invalid repository name '{name}': cannot contain path separators");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        anyhow::bail!("Invalid repository name '{name}': only ASCII alphanumeric characters, hyphens, underscores and dots allowed");
    }
    Ok(())
}

/// Resolve the context root: explicit path wins, otherwise `<project_root>/.context`.
pub fn resolve_context_root(explicit: Option<&Path>, project_root: &Path) -> PathBuf {
    match explicit {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => project_root.join(path),
        None => project_root.join(CONTEXT_DIR),
    }
}

/// Parse a human-friendly duration string.
/// Supported formats: "30s", "5m", "1h", or bare seconds "300"
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    // Bare number: treat as seconds
    if s.chars().all(|c| c.is_ascii_digit()) {
        let secs = s
            .parse::<u64>()
            .with_context(|| format!("Invalid duration: '{s}'"))?;
        return Ok(Duration::from_secs(secs));
    }

    let split = s.char_indices().last().map(|(i, _)| i).unwrap_or(0);
    let (num_str, suffix) = s.split_at(split);
    let num: u64 = num_str
        .parse()
        .with_context(|| format!("Invalid duration number: '{num_str}'"))?;

    let multiplier = match suffix {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        _ => anyhow::bail!(
            "Invalid duration suffix '{suffix}'. Use s (seconds), m (minutes) or h (hours)"
        ),
    };

    let secs = num
        .checked_mul(multiplier)
        .with_context(|| format!("Duration too large: '{s}'"))?;
    Ok(Duration::from_secs(secs))
}
