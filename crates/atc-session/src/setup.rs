use std::path::Path;
use std::process::Command;

use atc_core::{CoreError, CoreResult};
use tracing::debug;

/// Runs the repo's setup commands in the worktree directory, through a shell
/// so pipes and environment expansion work. Stops at the first failure.
///
/// This is blocking; callers run it on a background task so session creation
/// stays responsive.
pub fn run_setup_commands(worktree_path: &Path, commands: &[String]) -> CoreResult<()> {
    for command in commands {
        if command.is_empty() {
            continue;
        }
        debug!(worktree = %worktree_path.display(), command, "running setup command");

        // Capture rather than inherit stdio; the alternate screen is live.
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(worktree_path)
            .output()
            .map_err(|error| {
                CoreError::Configuration(format!("failed to run '{command}': {error}"))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim().lines().last().unwrap_or_default().to_owned();
            return Err(CoreError::Configuration(if detail.is_empty() {
                format!("command failed: {command}: {}", output.status)
            } else {
                format!("command failed: {command}: {detail}")
            }));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_commands_in_the_worktree_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        run_setup_commands(
            dir.path(),
            &["touch marker".to_owned(), String::new(), "true".to_owned()],
        )
        .expect("setup");
        assert!(dir.path().join("marker").exists());
    }

    #[test]
    fn stops_at_the_first_failing_command() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = run_setup_commands(
            dir.path(),
            &["false".to_owned(), "touch after".to_owned()],
        )
        .expect_err("failure");
        assert!(error.to_string().contains("command failed"), "{error}");
        assert!(!dir.path().join("after").exists());
    }
}
