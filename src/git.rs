//! Thin async wrappers around the `git` and `gh` binaries.
//!
//! Every call runs under a deadline. Children are spawned with
//! `kill_on_drop`, so a call that times out does not leave a stray process
//! behind.

use log::debug;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::CommandError;

/// Run `program args...` in `cwd` and return its trimmed stdout.
pub async fn run_command(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    timeout: Duration,
) -> Result<String, CommandError> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    debug!("running {} {} (cwd: {:?})", program, args.join(" "), cwd);

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(result) => result.map_err(|source| CommandError::Spawn {
            program: program.to_string(),
            source,
        })?,
        Err(_) => {
            return Err(CommandError::Timeout {
                program: program.to_string(),
                timeout,
            })
        }
    };

    if !output.status.success() {
        return Err(CommandError::Failed {
            program: program.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// `git clone --depth 1 --branch <branch> <url> <dest>`
pub async fn shallow_clone(
    url: &str,
    branch: &str,
    dest: &Path,
    timeout: Duration,
) -> Result<(), CommandError> {
    let dest = dest.to_string_lossy();
    run_command(
        "git",
        &["clone", "--depth", "1", "--branch", branch, url, &dest],
        None,
        timeout,
    )
    .await
    .map(|_| ())
}

/// `git pull` inside an existing working copy.
pub async fn pull(repo_dir: &Path, timeout: Duration) -> Result<(), CommandError> {
    run_command("git", &["pull"], Some(repo_dir), timeout)
        .await
        .map(|_| ())
}

/// Top level of the git work tree containing `cwd`, if there is one.
pub async fn project_root(cwd: &Path, timeout: Duration) -> Option<PathBuf> {
    run_command("git", &["rev-parse", "--show-toplevel"], Some(cwd), timeout)
        .await
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

/// Check if a path is a git repository
pub fn is_git_repo(path: &Path) -> bool {
    path.join(".git").exists()
}
