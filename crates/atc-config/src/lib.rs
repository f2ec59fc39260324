//! Per-repo worktree configuration: `.cursor/worktrees.json` holds the shell
//! commands to run after a fresh worktree is created.

use std::path::{Path, PathBuf};

use atc_core::{CoreError, CoreResult};
use serde::Deserialize;

const CONFIG_DIR: &str = ".cursor";
const CONFIG_FILE: &str = "worktrees.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WorktreeConfig {
    #[serde(rename = "setup-worktree", default)]
    pub setup_worktree: Vec<String>,
}

impl WorktreeConfig {
    /// Finds and parses `.cursor/worktrees.json`, searching upward from
    /// `start_dir`. An absent file yields the empty config; a present but
    /// unparsable file is an error.
    pub fn load(start_dir: &Path) -> CoreResult<Self> {
        let Some(config_path) = find_config(start_dir) else {
            return Ok(Self::default());
        };

        let data = std::fs::read_to_string(&config_path).map_err(|error| {
            CoreError::Configuration(format!(
                "failed to read '{}': {error}",
                config_path.display()
            ))
        })?;
        serde_json::from_str(&data).map_err(|error| {
            CoreError::Configuration(format!(
                "failed to parse '{}': {error}",
                config_path.display()
            ))
        })
    }
}

fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let mut dir = start_dir;
    loop {
        let candidate = dir.join(CONFIG_DIR).join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
}
