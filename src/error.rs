//! Structured errors for repository synchronization.
//!
//! A failed clone or pull never escapes its own task. It is folded into a
//! [`SyncError`] that names the repository, the action that was attempted,
//! and a coarse [`ErrorKind`] derived from what git printed.

use serde::Serialize;
use std::fmt;
use std::process::ExitStatus;
use std::time::Duration;

use crate::sync::SyncAction;

/// Failure of a single external command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The program could not be started at all.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program did not finish before its deadline and was killed.
    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    /// The program ran and exited unsuccessfully.
    #[error("{program} failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

impl CommandError {
    /// Captured stderr, if the command got far enough to produce any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Failed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Coarse classification of why a clone or pull failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    NotFound,
    Permission,
    CorruptLocalCopy,
    Timeout,
    Spawn,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Network => "network",
            Self::NotFound => "not found",
            Self::Permission => "permission denied",
            Self::CorruptLocalCopy => "corrupt local copy",
            Self::Timeout => "timeout",
            Self::Spawn => "spawn",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// Substrings git prints for each failure class. Checked in order, first hit wins.
const KIND_PATTERNS: &[(ErrorKind, &[&str])] = &[
    (
        ErrorKind::CorruptLocalCopy,
        &[
            "not a git repository",
            "There is no tracking information",
            "index file corrupt",
            "bad object",
        ],
    ),
    (
        ErrorKind::Permission,
        &[
            "Permission denied",
            "Authentication failed",
            "could not read Username",
        ],
    ),
    (
        ErrorKind::NotFound,
        &[
            "not found",
            "does not exist",
            "does not appear to be a git repository",
        ],
    ),
    (
        ErrorKind::Network,
        &[
            "Could not resolve host",
            "Connection refused",
            "Connection timed out",
            "Connection reset by peer",
            "Operation timed out",
            "Network is unreachable",
            "unable to access",
        ],
    ),
];

/// Classify git stderr into an [`ErrorKind`].
pub fn classify_stderr(stderr: &str) -> ErrorKind {
    KIND_PATTERNS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| stderr.contains(p)))
        .map(|(kind, _)| *kind)
        .unwrap_or(ErrorKind::Other)
}

/// Drop git's progress and hint chatter, keeping the lines that explain the failure.
fn condense_stderr(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty() && !line.starts_with("Cloning into") && !line.starts_with("hint:")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A clone or pull that failed, labelled with the repository it belongs to.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{action} of {repository} failed ({kind}): {message}")]
pub struct SyncError {
    pub repository: String,
    pub action: SyncAction,
    pub kind: ErrorKind,
    pub message: String,
}

impl SyncError {
    pub fn new(
        repository: impl Into<String>,
        action: SyncAction,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            repository: repository.into(),
            action,
            kind,
            message: message.into(),
        }
    }

    /// Build from a failed command, classifying by its stderr.
    pub fn from_command(repository: &str, action: SyncAction, err: &CommandError) -> Self {
        let kind = match err {
            CommandError::Spawn { .. } => ErrorKind::Spawn,
            CommandError::Timeout { .. } => ErrorKind::Timeout,
            CommandError::Failed { stderr, .. } => classify_stderr(stderr),
        };
        let message = match err.stderr().map(condense_stderr) {
            Some(text) if !text.is_empty() => text,
            _ => err.to_string(),
        };
        Self::new(repository, action, kind, message)
    }
}
