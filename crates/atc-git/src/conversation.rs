use std::path::{Path, PathBuf};

/// Whether the agent has any prior conversation recorded for this worktree.
/// Used to decide between starting fresh and resuming (`claude --continue`).
pub fn has_existing_conversation(worktree_path: &Path) -> bool {
    let Some(project_dir) = claude_project_dir(worktree_path) else {
        return false;
    };
    let Ok(entries) = std::fs::read_dir(project_dir) else {
        return false;
    };
    entries
        .flatten()
        .any(|entry| entry.file_name().to_string_lossy().ends_with(".jsonl"))
}

/// The agent's per-project transcript directory for a worktree path.
/// Claude Code encodes project paths by replacing `/` and `.` with `-`.
fn claude_project_dir(worktree_path: &Path) -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    let abs = if worktree_path.is_absolute() {
        worktree_path.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(worktree_path)
    };
    Some(
        home.join(".claude")
            .join("projects")
            .join(encode_project_path(&abs)),
    )
}

fn encode_project_path(path: &Path) -> String {
    path.to_string_lossy().replace(['/', '.'], "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_paths_flatten_slashes_and_dots() {
        assert_eq!(
            encode_project_path(Path::new("/Users/kevin/.atc/project")),
            "-Users-kevin--atc-project"
        );
    }

    #[test]
    fn missing_project_dir_means_no_conversation() {
        assert!(!has_existing_conversation(Path::new(
            "/definitely/not/a/real/worktree/path"
        )));
    }
}
