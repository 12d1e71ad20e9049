//! Shared fixtures: throwaway origin repositories served over `file://`.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use context_tools::config::RepositorySpec;
use context_tools::progress::Reporter;
use context_tools::sync::{SyncAction, SyncOutcome, SyncReport};

pub fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// A bare origin plus the work tree used to push commits into it.
pub struct Origin {
    pub name: String,
    pub work: PathBuf,
    pub bare: PathBuf,
}

impl Origin {
    pub fn create(root: &Path, name: &str) -> Self {
        let work = root.join(format!("work-{name}"));
        let bare = root.join(format!("{name}.git"));
        std::fs::create_dir_all(&work).unwrap();

        git(&work, &["init"]);
        git(&work, &["config", "user.email", "test@test.com"]);
        git(&work, &["config", "user.name", "Test"]);
        git(&work, &["config", "commit.gpgsign", "false"]);
        std::fs::write(work.join("README.md"), format!("# {name}")).unwrap();
        git(&work, &["add", "."]);
        git(&work, &["commit", "-m", "Initial commit"]);
        git(&work, &["branch", "-M", "main"]);
        git(
            root,
            &["clone", "--bare", &work.to_string_lossy(), &bare.to_string_lossy()],
        );

        Self {
            name: name.to_string(),
            work,
            bare,
        }
    }

    pub fn url(&self) -> String {
        format!("file://{}", self.bare.display())
    }

    pub fn spec(&self) -> RepositorySpec {
        RepositorySpec::new(&self.name, self.url(), "main")
    }

    /// Commit a new file and push it to the bare origin.
    pub fn push_file(&self, file: &str, contents: &str) {
        std::fs::write(self.work.join(file), contents).unwrap();
        git(&self.work, &["add", "."]);
        git(&self.work, &["commit", "-m", &format!("Add {file}")]);
        git(&self.work, &["push", &self.bare.to_string_lossy(), "main"]);
    }
}

/// Records every reporter callback as a line, in call order.
#[derive(Default)]
pub struct RecordingReporter {
    pub events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn started(&self, spec: &RepositorySpec, action: SyncAction) {
        self.events
            .lock()
            .unwrap()
            .push(format!("started {action} {}", spec.name));
    }

    fn finished(&self, outcome: &SyncOutcome) {
        let result = if outcome.is_success() { "ok" } else { "failed" };
        self.events.lock().unwrap().push(format!(
            "finished {} {} {result}",
            outcome.action, outcome.repository
        ));
    }

    fn summary(&self, report: &SyncReport) {
        self.events
            .lock()
            .unwrap()
            .push(format!("summary {} failed", report.failure_count()));
    }
}
