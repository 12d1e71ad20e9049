//! Console output for a sync run.
//!
//! Two renderings of the same lines: plain `println!` output for pipes and
//! CI logs, and one indicatif spinner per repository on a terminal.

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::RepositorySpec;
use crate::sync::{SyncAction, SyncOutcome, SyncReport};

/// Receives progress events from a [`crate::sync::Synchronizer`].
///
/// `started` is called for every repository before any operation is awaited;
/// `finished` is called from the task that ran the operation, in completion order.
pub trait Reporter: Send + Sync {
    fn started(&self, spec: &RepositorySpec, action: SyncAction);
    fn finished(&self, outcome: &SyncOutcome);
    fn summary(&self, report: &SyncReport);
}

/// Reports nothing.
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn started(&self, _spec: &RepositorySpec, _action: SyncAction) {}
    fn finished(&self, _outcome: &SyncOutcome) {}
    fn summary(&self, _report: &SyncReport) {}
}

pub fn started_line(name: &str, action: SyncAction) -> String {
    format!("{} {}...", action.progressive(), name)
}

pub fn success_line(outcome: &SyncOutcome) -> String {
    format!(
        "{} {} {}",
        style("✓").green(),
        outcome.action.past(),
        outcome.repository
    )
}

/// The failure block printed after all operations settle, or `None` if everything succeeded.
pub fn failure_summary(report: &SyncReport) -> Option<String> {
    let count = report.failure_count();
    if count == 0 {
        return None;
    }
    let mut out = format!("\n{count} operation(s) failed:");
    for err in report.failures() {
        out.push_str(&format!("\n  - {}: {}", err.repository, err.message));
    }
    Some(out)
}

fn print_summary(report: &SyncReport) {
    if let Some(text) = failure_summary(report) {
        eprintln!("{}", style(text).red());
    }
    println!("Done!");
}

/// Line-per-event output.
pub struct PlainReporter;

impl Reporter for PlainReporter {
    fn started(&self, spec: &RepositorySpec, action: SyncAction) {
        println!("{}", started_line(&spec.name, action));
    }

    fn finished(&self, outcome: &SyncOutcome) {
        if outcome.is_success() {
            println!("{}", success_line(outcome));
        }
    }

    fn summary(&self, report: &SyncReport) {
        print_summary(report);
    }
}

/// One spinner per repository.
pub struct SpinnerReporter {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl SpinnerReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}

impl Default for SpinnerReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for SpinnerReporter {
    fn started(&self, spec: &RepositorySpec, action: SyncAction) {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(Self::spinner_style());
        pb.set_message(started_line(&spec.name, action));
        pb.enable_steady_tick(Duration::from_millis(100));

        let mut bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());
        bars.insert(spec.name.clone(), pb);
    }

    fn finished(&self, outcome: &SyncOutcome) {
        let pb = {
            let mut bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());
            bars.remove(&outcome.repository)
        };
        let Some(pb) = pb else {
            return;
        };
        if outcome.is_success() {
            pb.finish_with_message(success_line(outcome));
        } else {
            pb.finish_with_message(format!(
                "{} Failed to {} {}",
                style("✗").red(),
                outcome.action,
                outcome.repository
            ));
        }
    }

    fn summary(&self, report: &SyncReport) {
        print_summary(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, SyncError};
    use crate::sync::SyncStatus;
    use chrono::Utc;
    use std::path::PathBuf;

    fn report(outcomes: Vec<SyncOutcome>) -> SyncReport {
        SyncReport {
            context_root: PathBuf::from("/tmp/ctx"),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            outcomes,
        }
    }

    fn failed(name: &str, message: &str) -> SyncOutcome {
        SyncOutcome {
            repository: name.into(),
            action: SyncAction::Clone,
            status: SyncStatus::Failure(SyncError::new(
                name,
                SyncAction::Clone,
                ErrorKind::NotFound,
                message,
            )),
        }
    }

    #[test]
    fn started_lines() {
        assert_eq!(started_line("effect", SyncAction::Clone), "Cloning effect...");
        assert_eq!(started_line("effect", SyncAction::Pull), "Pulling effect...");
    }

    #[test]
    fn success_line_names_action_and_repo() {
        let outcome = SyncOutcome {
            repository: "effect".into(),
            action: SyncAction::Pull,
            status: SyncStatus::Success,
        };
        let line = console::strip_ansi_codes(&success_line(&outcome)).to_string();
        assert_eq!(line, "✓ Pulled effect");
    }

    #[test]
    fn no_summary_when_all_succeed() {
        let ok = SyncOutcome {
            repository: "a".into(),
            action: SyncAction::Clone,
            status: SyncStatus::Success,
        };
        assert!(failure_summary(&report(vec![ok])).is_none());
        assert!(failure_summary(&report(vec![])).is_none());
    }

    #[test]
    fn summary_lists_each_failure_with_its_repository() {
        let text = failure_summary(&report(vec![
            failed("a", "fatal: no such remote"),
            failed("c", "fatal: branch missing"),
        ]))
        .unwrap();

        assert!(text.starts_with("\n2 operation(s) failed:"));
        assert!(text.contains("  - a: fatal: no such remote"));
        assert!(text.contains("  - c: fatal: branch missing"));
    }

    #[test]
    fn spinner_reporter_tracks_and_releases_bars() {
        let reporter = SpinnerReporter::new();
        reporter.multi.set_draw_target(indicatif::ProgressDrawTarget::hidden());
        let spec = RepositorySpec::new("a", "file:///tmp/a", "main");

        reporter.started(&spec, SyncAction::Clone);
        assert_eq!(reporter.bars.lock().unwrap().len(), 1);

        reporter.finished(&failed("a", "boom"));
        assert!(reporter.bars.lock().unwrap().is_empty());
    }
}
