//! `context-pull`: clone or update the reference repositories under `.context/`.

use anyhow::{Context, Result};
use clap::Parser;
use console::Term;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use context_tools::config::{self, SyncConfig};
use context_tools::{
    git, PlainReporter, Reporter, SilentReporter, SpinnerReporter, Synchronizer,
};

#[derive(Parser, Debug)]
#[command(name = "context-pull", version)]
#[command(about = "Clone or pull reference repositories into the local context cache", long_about = None)]
struct Cli {
    /// YAML or JSON file listing repositories (defaults to the built-in list)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Directory holding the cached copies (defaults to <project-root>/.context)
    #[arg(long, env = "CONTEXT_ROOT")]
    context_root: Option<PathBuf>,

    /// Deadline for each clone or pull, e.g. "90s", "5m"
    #[arg(long, env = "CONTEXT_PULL_TIMEOUT", default_value = "5m", value_parser = parse_timeout)]
    timeout: std::time::Duration,

    /// Print plain lines even on a terminal
    #[arg(long)]
    plain: bool,

    /// Print only the final report, as JSON
    #[arg(long)]
    json: bool,
}

fn parse_timeout(s: &str) -> Result<std::time::Duration, String> {
    config::parse_duration(s).map_err(|e| e.to_string())
}

impl Cli {
    async fn build_config(&self) -> Result<SyncConfig> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let project_root = git::project_root(&cwd, self.timeout)
            .await
            .unwrap_or(cwd);
        let context_root =
            config::resolve_context_root(self.context_root.as_deref(), &project_root);

        let repositories = match &self.config {
            Some(path) => SyncConfig::repositories_from_file(path)?,
            None => SyncConfig::default_repositories(),
        };

        let config = SyncConfig::new(context_root, repositories).with_timeout(self.timeout);
        config.validate()?;
        Ok(config)
    }

    fn reporter(&self) -> Arc<dyn Reporter> {
        if self.json {
            Arc::new(SilentReporter)
        } else if !self.plain && Term::stdout().is_term() {
            Arc::new(SpinnerReporter::new())
        } else {
            Arc::new(PlainReporter)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = cli.build_config().await?;
    log::debug!(
        "syncing {} repositories into {}",
        config.repositories.len(),
        config.context_root.display()
    );

    let report = Synchronizer::new(config)
        .with_reporter(cli.reporter())
        .run()
        .await?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    context_tools::init_logging("error");

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            return ExitCode::from(2);
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::time::Duration;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["context-pull"]).unwrap();
        assert!(cli.config.is_none());
        assert_eq!(cli.timeout, Duration::from_secs(300));
        assert!(!cli.plain);
        assert!(!cli.json);
    }

    #[test]
    fn timeout_flag_accepts_suffixes() {
        let cli = Cli::try_parse_from(["context-pull", "--timeout", "90s"]).unwrap();
        assert_eq!(cli.timeout, Duration::from_secs(90));
        assert!(Cli::try_parse_from(["context-pull", "--timeout", "soon"]).is_err());
    }

    #[test]
    #[serial]
    fn context_root_from_env() {
        std::env::set_var("CONTEXT_ROOT", "/tmp/ctx-from-env");
        let cli = Cli::try_parse_from(["context-pull"]);
        std::env::remove_var("CONTEXT_ROOT");

        assert_eq!(
            cli.unwrap().context_root,
            Some(PathBuf::from("/tmp/ctx-from-env"))
        );
    }

    #[test]
    #[serial]
    fn flag_overrides_env() {
        std::env::set_var("CONTEXT_ROOT", "/tmp/ctx-from-env");
        let cli = Cli::try_parse_from(["context-pull", "--context-root", "/tmp/flag"]);
        std::env::remove_var("CONTEXT_ROOT");

        assert_eq!(cli.unwrap().context_root, Some(PathBuf::from("/tmp/flag")));
    }
}
