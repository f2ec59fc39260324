use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use atc_core::{CoreError, CoreResult};
use tracing::debug;

use crate::runner::CommandRunner;

const ENV_GIT_BIN: &str = "ATC_GIT_BIN";

/// Git worktree operations scoped to one main repository.
pub struct GitWorktrees<R: CommandRunner> {
    runner: R,
    binary: PathBuf,
}

impl<R: CommandRunner> GitWorktrees<R> {
    pub fn new(runner: R) -> Self {
        let binary = std::env::var_os(ENV_GIT_BIN)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("git"));
        Self::with_binary(runner, binary)
    }

    pub fn with_binary(runner: R, binary: PathBuf) -> Self {
        Self { runner, binary }
    }

    /// Creates a worktree at `target_path`. With `use_existing` the worktree
    /// attaches to the existing branch; otherwise a new branch is created
    /// from `base_branch` (empty or `"HEAD"` means the current HEAD).
    pub fn create_worktree(
        &self,
        repo_path: &Path,
        branch_name: &str,
        target_path: &Path,
        base_branch: &str,
        use_existing: bool,
    ) -> CoreResult<()> {
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).map_err(|error| {
                CoreError::Vcs(format!(
                    "failed to create worktree parent '{}': {error}",
                    parent.display()
                ))
            })?;
        }

        let mut args = os_args(&["worktree", "add"]);
        if use_existing {
            args.push(target_path.into());
            args.push(branch_name.into());
        } else {
            let base = if base_branch.is_empty() {
                "HEAD"
            } else {
                base_branch
            };
            args.push("-b".into());
            args.push(branch_name.into());
            args.push(target_path.into());
            args.push(base.into());
        }

        debug!(branch = branch_name, target = %target_path.display(), "creating worktree");
        self.run_git(&args, Some(repo_path)).map(drop)
    }

    /// Removes a worktree. The removal runs from the main repository, which
    /// is recovered from the worktree's `.git` gitdir pointer.
    pub fn delete_worktree(&self, worktree_path: &Path) -> CoreResult<()> {
        let main_repo = main_repo_for_worktree(worktree_path)?;
        let args: Vec<OsString> = vec![
            "worktree".into(),
            "remove".into(),
            worktree_path.into(),
            "--force".into(),
        ];
        self.run_git(&args, Some(&main_repo)).map(drop)
    }

    /// All local branch names of the repository.
    pub fn list_branches(&self, repo_path: &Path) -> CoreResult<Vec<String>> {
        let output = self.run_git(
            &os_args(&["branch", "--format=%(refname:short)"]),
            Some(repo_path),
        )?;
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect())
    }

    /// The branch name HEAD points at in the given directory.
    pub fn current_branch(&self, dir: &Path) -> CoreResult<String> {
        let output = self.run_git(&os_args(&["rev-parse", "--abbrev-ref", "HEAD"]), Some(dir))?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
    }

    /// Whether the directory is inside a git repository.
    pub fn is_repository(&self, dir: &Path) -> bool {
        self.run_git(&os_args(&["rev-parse", "--git-dir"]), Some(dir))
            .is_ok()
    }

    /// Root of the main repository for the directory. When invoked from
    /// inside a linked worktree this resolves to the main repository's
    /// toplevel, not the worktree's.
    pub fn repository_root(&self, dir: &Path) -> CoreResult<PathBuf> {
        let common = self.rev_parse(dir, "--git-common-dir")?;
        let git_dir = self.rev_parse(dir, "--git-dir")?;

        if common != git_dir {
            // Inside a worktree: the common dir is the main repo's .git.
            if let Some(stripped) = common.strip_suffix("/.git") {
                return Ok(PathBuf::from(stripped));
            }
            if common != ".git" {
                if let Some(parent) = Path::new(&common).parent() {
                    return Ok(parent.to_path_buf());
                }
            }
        }

        let toplevel = self.rev_parse(dir, "--show-toplevel")?;
        Ok(PathBuf::from(toplevel))
    }

    fn rev_parse(&self, dir: &Path, flag: &str) -> CoreResult<String> {
        let output = self.run_git(&os_args(&["rev-parse", flag]), Some(dir))?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
    }

    fn run_git(&self, args: &[OsString], cwd: Option<&Path>) -> CoreResult<std::process::Output> {
        let program = self
            .binary
            .to_str()
            .ok_or_else(|| CoreError::Configuration("invalid git binary path".to_owned()))?;
        let output = self
            .runner
            .run(program, args, cwd)
            .map_err(|error| match error.kind() {
                io::ErrorKind::NotFound => CoreError::DependencyUnavailable(format!(
                    "`{}` was not found. Install git or set {ENV_GIT_BIN} to a valid binary path.",
                    self.binary.display()
                )),
                _ => CoreError::DependencyUnavailable(format!(
                    "failed to execute `{}`: {error}",
                    self.binary.display()
                )),
            })?;

        if output.status.success() {
            return Ok(output);
        }
        Err(self.command_failed(args, &output))
    }

    fn command_failed(&self, args: &[OsString], output: &std::process::Output) -> CoreError {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        let detail = if !stderr.is_empty() {
            stderr
        } else if !stdout.is_empty() {
            stdout
        } else {
            format!("exit status {}", output.status)
        };
        let rendered = args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ");
        CoreError::Vcs(format!("git {rendered}: {detail}"))
    }
}

/// Resolves the main repository path from a worktree's `.git` file, which
/// contains `gitdir: <main>/.git/worktrees/<name>`.
fn main_repo_for_worktree(worktree_path: &Path) -> CoreResult<PathBuf> {
    let git_file = worktree_path.join(".git");
    let data = fs::read_to_string(&git_file).map_err(|error| {
        CoreError::Vcs(format!(
            "failed to read '{}': {error}",
            git_file.display()
        ))
    })?;

    let gitdir = data
        .trim()
        .strip_prefix("gitdir:")
        .map(str::trim)
        .unwrap_or_default();
    if gitdir.is_empty() {
        return Err(CoreError::Vcs(format!(
            "invalid .git file format in '{}'",
            git_file.display()
        )));
    }

    let (main_repo, _) = gitdir.split_once("/.git/worktrees/").ok_or_else(|| {
        CoreError::Vcs(format!("unexpected gitdir format: {gitdir}"))
    })?;
    Ok(PathBuf::from(main_repo))
}

fn os_args(args: &[&str]) -> Vec<OsString> {
    args.iter().map(OsString::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct StubRunner {
        calls: Mutex<Vec<(String, Vec<OsString>, Option<PathBuf>)>>,
        results: Mutex<VecDeque<io::Result<std::process::Output>>>,
    }

    impl StubRunner {
        fn with_results(results: Vec<io::Result<std::process::Output>>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                results: Mutex::new(VecDeque::from(results)),
            }
        }
    }

    impl CommandRunner for StubRunner {
        fn run(
            &self,
            program: &str,
            args: &[OsString],
            cwd: Option<&Path>,
        ) -> io::Result<std::process::Output> {
            self.calls.lock().expect("lock").push((
                program.to_owned(),
                args.to_vec(),
                cwd.map(Path::to_path_buf),
            ));
            self.results
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| {
                    Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "missing stubbed command output",
                    ))
                })
        }
    }

    fn output_with(code: i32, stdout: &[u8], stderr: &[u8]) -> std::process::Output {
        #[cfg(unix)]
        use std::os::unix::process::ExitStatusExt;
        std::process::Output {
            status: std::process::ExitStatus::from_raw(code),
            stdout: stdout.to_vec(),
            stderr: stderr.to_vec(),
        }
    }

    fn success() -> io::Result<std::process::Output> {
        Ok(output_with(0, &[], &[]))
    }

    #[test]
    fn create_with_new_branch_defaults_base_to_head() {
        let runner = StubRunner::with_results(vec![success()]);
        let provider = GitWorktrees::with_binary(runner, PathBuf::from("git"));
        let target = std::env::temp_dir().join("atc-wt-test/feat-x");

        provider
            .create_worktree(Path::new("/repo"), "feat-x", &target, "", false)
            .expect("create");

        let calls = provider.runner.calls.lock().expect("lock");
        let (program, args, cwd) = &calls[0];
        assert_eq!(program, "git");
        assert_eq!(
            args,
            &vec![
                OsString::from("worktree"),
                OsString::from("add"),
                OsString::from("-b"),
                OsString::from("feat-x"),
                OsString::from(&target),
                OsString::from("HEAD"),
            ]
        );
        assert_eq!(cwd.as_deref(), Some(Path::new("/repo")));
    }

    #[test]
    fn create_from_existing_branch_omits_branch_creation() {
        let runner = StubRunner::with_results(vec![success()]);
        let provider = GitWorktrees::with_binary(runner, PathBuf::from("git"));
        let target = std::env::temp_dir().join("atc-wt-test/feat-y");

        provider
            .create_worktree(Path::new("/repo"), "feat-y", &target, "main", true)
            .expect("create");

        let calls = provider.runner.calls.lock().expect("lock");
        let (_, args, _) = &calls[0];
        assert_eq!(
            args,
            &vec![
                OsString::from("worktree"),
                OsString::from("add"),
                OsString::from(&target),
                OsString::from("feat-y"),
            ]
        );
    }

    #[test]
    fn create_failure_surfaces_stderr() {
        let runner = StubRunner::with_results(vec![Ok(output_with(
            128,
            &[],
            b"fatal: invalid reference: nope",
        ))]);
        let provider = GitWorktrees::with_binary(runner, PathBuf::from("git"));
        let target = std::env::temp_dir().join("atc-wt-test/feat-z");

        let error = provider
            .create_worktree(Path::new("/repo"), "feat-z", &target, "nope", false)
            .expect_err("failure");
        assert!(error.to_string().contains("invalid reference"), "{error}");
    }

    #[test]
    fn delete_resolves_the_main_repo_from_the_gitdir_pointer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let worktree = dir.path().join("wt");
        fs::create_dir_all(&worktree).expect("mkdir");
        fs::write(
            worktree.join(".git"),
            "gitdir: /home/user/repo/.git/worktrees/feat-x\n",
        )
        .expect("write");

        let runner = StubRunner::with_results(vec![success()]);
        let provider = GitWorktrees::with_binary(runner, PathBuf::from("git"));
        provider.delete_worktree(&worktree).expect("delete");

        let calls = provider.runner.calls.lock().expect("lock");
        let (_, args, cwd) = &calls[0];
        assert_eq!(args[0], OsString::from("worktree"));
        assert_eq!(args[1], OsString::from("remove"));
        assert_eq!(args[3], OsString::from("--force"));
        assert_eq!(cwd.as_deref(), Some(Path::new("/home/user/repo")));
    }

    #[test]
    fn delete_rejects_a_malformed_gitdir_pointer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let worktree = dir.path().join("wt");
        fs::create_dir_all(&worktree).expect("mkdir");
        fs::write(worktree.join(".git"), "gitdir: /not/a/worktree/gitdir\n").expect("write");

        let provider = GitWorktrees::with_binary(
            StubRunner::with_results(vec![]),
            PathBuf::from("git"),
        );
        assert!(provider.delete_worktree(&worktree).is_err());
    }

    #[test]
    fn list_branches_parses_short_refnames() {
        let runner =
            StubRunner::with_results(vec![Ok(output_with(0, b"main\nfeat-x\n\n  dev \n", &[]))]);
        let provider = GitWorktrees::with_binary(runner, PathBuf::from("git"));
        let branches = provider.list_branches(Path::new("/repo")).expect("list");
        assert_eq!(branches, vec!["main", "feat-x", "dev"]);
    }

    #[test]
    fn repository_root_resolves_worktrees_to_the_main_repo() {
        // --git-common-dir and --git-dir differ: linked worktree.
        let runner = StubRunner::with_results(vec![
            Ok(output_with(0, b"/home/user/repo/.git\n", &[])),
            Ok(output_with(
                0,
                b"/home/user/repo/.git/worktrees/feat-x\n",
                &[],
            )),
        ]);
        let provider = GitWorktrees::with_binary(runner, PathBuf::from("git"));
        let root = provider
            .repository_root(Path::new("/somewhere"))
            .expect("root");
        assert_eq!(root, PathBuf::from("/home/user/repo"));
    }

    #[test]
    fn repository_root_uses_toplevel_outside_worktrees() {
        let runner = StubRunner::with_results(vec![
            Ok(output_with(0, b".git\n", &[])),
            Ok(output_with(0, b".git\n", &[])),
            Ok(output_with(0, b"/home/user/repo\n", &[])),
        ]);
        let provider = GitWorktrees::with_binary(runner, PathBuf::from("git"));
        let root = provider
            .repository_root(Path::new("/home/user/repo/src"))
            .expect("root");
        assert_eq!(root, PathBuf::from("/home/user/repo"));
    }
}
