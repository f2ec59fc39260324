//! Session service: the one place worktree operations and database writes
//! are coordinated. Creation is transactional in the sense "worktree exists
//! iff row exists": any failure after the worktree is made rolls the
//! worktree back (best-effort) before returning.

mod setup;

use std::path::{Path, PathBuf};

use atc_config::WorktreeConfig;
use atc_core::{CoreError, CoreResult, Session, SessionStatus};
use atc_git::{validate_branch_name, CommandRunner, GitWorktrees};
use atc_store::SessionStore;
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

pub use setup::run_setup_commands;

pub struct Service<R: CommandRunner> {
    store: SessionStore,
    git: GitWorktrees<R>,
    atc_dir: PathBuf,
    repo_path: PathBuf,
    repo_name: String,
}

impl<R: CommandRunner> Service<R> {
    pub fn new(store: SessionStore, git: GitWorktrees<R>, repo_path: PathBuf) -> CoreResult<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            CoreError::Configuration("could not determine the home directory".to_owned())
        })?;
        Ok(Self::with_atc_dir(store, git, repo_path, home.join(".atc")))
    }

    pub fn with_atc_dir(
        store: SessionStore,
        git: GitWorktrees<R>,
        repo_path: PathBuf,
        atc_dir: PathBuf,
    ) -> Self {
        let repo_name = repo_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            store,
            git,
            atc_dir,
            repo_path,
            repo_name,
        }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub fn repo_name(&self) -> &str {
        &self.repo_name
    }

    /// Creates a session: validates the name, makes the worktree, loads the
    /// repo's setup commands, and persists the row. Returns the session plus
    /// the setup commands to run. Running them is the caller's concern, so
    /// creation itself stays non-blocking.
    ///
    /// With `use_existing_branch` the worktree attaches to the branch named
    /// by `name`; otherwise a new branch is created from `base_branch`
    /// (empty or "HEAD" meaning the current HEAD).
    pub fn create(
        &self,
        name: &str,
        base_branch: &str,
        use_existing_branch: bool,
    ) -> CoreResult<(Session, Vec<String>)> {
        validate_branch_name(name)?;

        if self.store.get_by_name(name).is_ok() {
            return Err(CoreError::Validation(format!(
                "session with name '{name}' already exists"
            )));
        }
        if use_existing_branch && self.store.find_by_branch(name)?.is_some() {
            return Err(CoreError::Validation(format!(
                "branch '{name}' already has a session"
            )));
        }

        let session = Session {
            id: Uuid::new_v4().to_string(),
            name: name.to_owned(),
            repo_path: self.repo_path.clone(),
            repo_name: self.repo_name.clone(),
            worktree_path: self
                .atc_dir
                .join("worktrees")
                .join(&self.repo_name)
                .join(name),
            branch_name: name.to_owned(),
            created_at: OffsetDateTime::now_utc(),
            last_accessed: None,
            archived_at: None,
            status: SessionStatus::Active,
        };

        self.git.create_worktree(
            &self.repo_path,
            &session.branch_name,
            &session.worktree_path,
            base_branch,
            use_existing_branch,
        )?;

        let config = match WorktreeConfig::load(&self.repo_path) {
            Ok(config) => config,
            Err(error) => {
                self.rollback_worktree(&session.worktree_path);
                return Err(error);
            }
        };

        if let Err(error) = self.store.insert(&session) {
            self.rollback_worktree(&session.worktree_path);
            return Err(error);
        }

        debug!(session = name, "session created");
        Ok((session, config.setup_worktree))
    }

    /// Sessions for this repo, newest first, filtered by a case-insensitive
    /// substring match on the name. Active/archived partitioning is the
    /// caller's concern.
    pub fn list(&self, query: &str) -> CoreResult<Vec<Session>> {
        self.store.list(&self.repo_name, query)
    }

    pub fn get(&self, name: &str) -> CoreResult<Session> {
        self.store.get_by_name(name)
    }

    pub fn get_by_branch(&self, branch_name: &str) -> CoreResult<Option<Session>> {
        self.store.find_by_branch(branch_name)
    }

    /// Removes the worktree, then the row. Any terminal handle must already
    /// be closed by the caller.
    pub fn delete(&self, name: &str) -> CoreResult<()> {
        let session = self.get(name)?;
        self.git
            .delete_worktree(&session.worktree_path)
            .map_err(|error| CoreError::Vcs(format!("failed to remove worktree: {error}")))?;
        self.store.delete(&session.id)
    }

    pub fn archive(&self, name: &str) -> CoreResult<()> {
        let session = self.get(name)?;
        self.store.archive(&session.id, OffsetDateTime::now_utc())
    }

    pub fn unarchive(&self, name: &str) -> CoreResult<()> {
        let session = self.get(name)?;
        self.store.unarchive(&session.id)
    }

    pub fn touch(&self, name: &str) -> CoreResult<()> {
        let session = self.get(name)?;
        self.store.touch(&session.id, OffsetDateTime::now_utc())
    }

    pub fn list_branches(&self) -> CoreResult<Vec<String>> {
        self.git.list_branches(&self.repo_path)
    }

    pub fn current_branch(&self) -> CoreResult<String> {
        self.git.current_branch(&self.repo_path)
    }

    fn rollback_worktree(&self, worktree_path: &Path) {
        if let Err(error) = self.git.delete_worktree(worktree_path) {
            warn!(
                worktree = %worktree_path.display(),
                %error,
                "failed to roll back worktree"
            );
        }
    }
}
