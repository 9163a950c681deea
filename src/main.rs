//! git-tm - Terminal time machine for git history
//!
//! Browse local and remote branches, list the commits a branch added on
//! top of its base, and compare any two revisions side by side.
//!
//! # Usage
//!
//! ```bash
//! git-tm                                  # Browse the current repository
//! git-tm -C /path/to/repo --offline       # Browse without fetching
//! git-tm snapshot                         # Print the repository snapshot as JSON
//! git-tm branch remotes/origin/feature    # Commits unique to a branch
//! git-tm compare HEAD~3 HEAD --raw        # Patch text between two revisions
//! git-tm checkout remotes/origin/feature  # Track a remote branch locally
//! ```

mod app;
mod config;
mod git;
mod logging;
mod syntax;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::git::{Git2Backend, RepoService};

/// Terminal time machine for git history
#[derive(Parser, Debug)]
#[command(name = "git-tm")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the repository (defaults to current directory)
    #[arg(short = 'C', long = "repo", default_value = ".", global = true)]
    repo: PathBuf,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Never fetch from remotes
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print branches, tags, remotes and the commit log as JSON
    Snapshot,
    /// Print the commits that belong to a branch as JSON
    Branch {
        /// Local branch, tag, hash or remotes/<remote>/<branch>
        branch_id: String,
    },
    /// Print the diff between two revisions as JSON
    Compare {
        from: String,
        to: String,
        /// Print the patch text instead
        #[arg(long)]
        raw: bool,
    },
    /// Create a local branch tracking a remote branch and switch to it
    Checkout {
        /// remotes/<remote>/<branch> or <remote>/<branch>
        remote_branch: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    config.offline |= args.offline;

    let repo_path = args.repo.canonicalize()
        .with_context(|| format!("Repository path {} does not exist", args.repo.display()))?;
    let backend = Git2Backend::discover(&repo_path, config.context_lines)
        .with_context(|| format!("{} is not a git repository", repo_path.display()))?;

    match args.command {
        None => browse(backend, &config),
        Some(command) => {
            logging::init_stderr()?;
            let service = RepoService::new(Arc::new(backend), config.service_options());
            run_command(&service, command)
        }
    }
}

/// Run the interactive browser
fn browse(backend: Git2Backend, config: &Config) -> Result<()> {
    // Logging is optional for the UI; a missing cache dir is not fatal
    if let Ok(Some(log_path)) = logging::init_file() {
        info!(repo = %backend.repo_path().display(), log = %log_path.display(), "starting browser");
    }

    let service = RepoService::new(Arc::new(backend), config.service_options());
    let mut app = app::App::new(service, config)?;
    let result = app.run();
    app.shutdown();
    result
}

/// Run a non-interactive subcommand, printing its result to stdout
fn run_command(service: &RepoService, command: Command) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to start async runtime")?;

    let result = runtime.block_on(async {
        match command {
            Command::Snapshot => print_json(&service.snapshot().await?),
            Command::Branch { branch_id } => {
                let commits = service
                    .branch_commits(&branch_id)
                    .await
                    .with_context(|| format!("Failed to list commits of {branch_id}"))?;
                print_json(&commits)
            }
            Command::Compare { from, to, raw: true } => {
                print!("{}", service.raw_diff(&from, &to).await?);
                Ok(())
            }
            Command::Compare { from, to, raw: false } => {
                print_json(&service.compare(&from, &to).await?)
            }
            Command::Checkout { remote_branch } => {
                let outcome = service.checkout_remote_branch(&remote_branch).await?;
                print_json(&outcome)?;
                if !outcome.success {
                    anyhow::bail!("Checkout of {remote_branch} failed");
                }
                Ok(())
            }
        }
    });

    // A fetch past its timeout may still be running on the blocking pool
    runtime.shutdown_background();
    result
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::git::ServiceOptions;
    use crate::git::fake::FakeRepo;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let args = Args::parse_from(["git-tm", "compare", "a", "b", "--raw", "-C", "/tmp", "--offline"]);
        assert_eq!(args.repo, PathBuf::from("/tmp"));
        assert!(args.offline);
        assert!(matches!(
            args.command,
            Some(Command::Compare { ref from, ref to, raw: true }) if from == "a" && to == "b"
        ));
    }

    #[test]
    fn no_subcommand_means_browser() {
        let args = Args::parse_from(["git-tm"]);
        assert_eq!(args.repo, PathBuf::from("."));
        assert!(args.command.is_none());
        assert!(args.config.is_none());
    }

    #[test]
    fn command_returns_without_waiting_for_hung_fetch() {
        let mut fake = FakeRepo::with_main_and_remote();
        fake.fetch_delay = Some(Duration::from_secs(3));
        let options = ServiceOptions {
            fetch_timeout: Duration::from_millis(20),
            ..ServiceOptions::default()
        };
        let service = RepoService::new(Arc::new(fake), options);

        let started = Instant::now();
        run_command(&service, Command::Snapshot).unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
