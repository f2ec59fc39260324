use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use atc_git::{GitWorktrees, ProcessCommandRunner};
use atc_session::Service;
use atc_store::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    let atc_dir = dirs::home_dir()
        .ok_or_else(|| anyhow!("could not determine the home directory"))?
        .join(".atc");

    init_tracing(&atc_dir)?;

    // tmux owns the PTYs; without it there is nothing to attach to.
    if let Err(error) = Command::new("tmux").arg("-V").output() {
        if error.kind() == std::io::ErrorKind::NotFound {
            bail!("tmux is required but not found in PATH");
        }
        return Err(error).context("failed to probe for tmux");
    }

    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let git = GitWorktrees::new(ProcessCommandRunner);

    if !git.is_repository(&cwd) {
        bail!("not a git repository (or any of the parent directories)");
    }
    // When launched from inside one of our worktrees this still resolves to
    // the main repository, so every launch shares one session list.
    let repo_path = git
        .repository_root(&cwd)
        .context("failed to resolve the repository root")?;
    let repo_name = repo_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let invoking_branch = git
        .current_branch(&cwd)
        .unwrap_or_else(|_| "HEAD".to_owned());

    let store = SessionStore::open(atc_dir.join("sessions.db"))
        .context("failed to open the session database")?;
    let service = Service::new(store, git, repo_path)?;

    atc_tui::run(service, repo_name, invoking_branch).await?;
    Ok(())
}

/// Logs go to a file: stdout/stderr belong to the alternate screen while
/// the TUI runs.
fn init_tracing(atc_dir: &PathBuf) -> Result<()> {
    std::fs::create_dir_all(atc_dir)
        .with_context(|| format!("failed to create '{}'", atc_dir.display()))?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(atc_dir.join("atc.log"))
        .context("failed to open the log file")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("ATC_LOG")
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}
