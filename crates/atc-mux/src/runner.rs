use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use atc_core::CoreError;

const ENV_TMUX_BIN: &str = "ATC_TMUX_BIN";

/// Executes one multiplexer invocation. The seam exists so tests can record
/// argument vectors and script outputs without a tmux server.
#[async_trait]
pub trait MuxRunner: Send + Sync {
    async fn run(&self, args: &[String], cwd: Option<&Path>) -> io::Result<Output>;
}

/// Runs the real tmux binary (`ATC_TMUX_BIN` overrides the name).
#[derive(Debug)]
pub struct ProcessMuxRunner {
    binary: PathBuf,
}

impl Default for ProcessMuxRunner {
    fn default() -> Self {
        Self {
            binary: std::env::var_os(ENV_TMUX_BIN)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("tmux")),
        }
    }
}

impl ProcessMuxRunner {
    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl MuxRunner for ProcessMuxRunner {
    async fn run(&self, args: &[String], cwd: Option<&Path>) -> io::Result<Output> {
        let mut command = tokio::process::Command::new(&self.binary);
        command.args(args).env("TERM", "xterm-256color");
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }
        command.output().await
    }
}

pub(crate) fn mux_unavailable(binary_hint: &str, error: &io::Error) -> CoreError {
    if error.kind() == io::ErrorKind::NotFound {
        CoreError::DependencyUnavailable(format!(
            "`{binary_hint}` was not found. Install tmux or set {ENV_TMUX_BIN} to a valid binary path."
        ))
    } else {
        CoreError::DependencyUnavailable(format!("failed to execute `{binary_hint}`: {error}"))
    }
}
