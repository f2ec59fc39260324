use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::{Command, Output};

/// Executes one git invocation. The seam exists so tests can record argument
/// vectors and script outputs without touching a repository.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[OsString], cwd: Option<&Path>) -> io::Result<Output>;
}

#[derive(Debug, Default)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, program: &str, args: &[OsString], cwd: Option<&Path>) -> io::Result<Output> {
        let mut command = Command::new(program);
        command.args(args);
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }
        command.output()
    }
}
