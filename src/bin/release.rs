//! `release`: publish a GitHub release for the tag on HEAD.

use anyhow::{Context, Result};
use clap::Parser;

use context_tools::release;

#[derive(Parser, Debug)]
#[command(name = "release", version = "0.0.0")]
#[command(about = "Create a GitHub release for the tag on HEAD", long_about = None)]
struct Cli {
    /// Print release notes without creating release
    #[arg(long, short = 'd')]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    context_tools::init_logging("info");

    let repo = std::env::current_dir().context("Failed to read current directory")?;
    let plan = release::prepare(&repo).await?;

    if cli.dry_run {
        println!("{}", plan.dry_run_text());
    } else {
        release::publish(&repo, &plan).await?;
    }
    Ok(())
}
