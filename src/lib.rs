//! Keep a local cache of reference git repositories up to date, and cut
//! tagged releases.
//!
//! The `context-pull` binary drives [`sync::Synchronizer`] over a
//! [`config::SyncConfig`]; the `release` binary drives [`release`].

pub mod config;
pub mod error;
pub mod git;
pub mod progress;
pub mod release;
pub mod sync;

pub use config::{RepositorySpec, SyncConfig};
pub use error::{CommandError, ErrorKind, SyncError};
pub use progress::{PlainReporter, Reporter, SilentReporter, SpinnerReporter};
pub use sync::{SyncAction, SyncOutcome, SyncReport, SyncStatus, Synchronizer};

/// Install the `tracing` subscriber used by the binaries.
///
/// `log` records from the library are forwarded through the subscriber's
/// `tracing-log` bridge. Verbosity comes from `RUST_LOG`, defaulting to `default_level`.
pub fn init_logging(default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
