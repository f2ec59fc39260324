//! Sqlite persistence for sessions.
//!
//! One table, one connection, serialized behind a mutex: every caller goes
//! through the same handle, and command tasks are the only code that touches
//! it. Timestamps are stored as unix seconds.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use atc_core::{CoreError, CoreResult, Session, SessionStatus};
use rusqlite::{params, Connection, Row};
use time::OffsetDateTime;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE,
    repo_path     TEXT NOT NULL,
    repo_name     TEXT NOT NULL,
    worktree_path TEXT NOT NULL,
    branch_name   TEXT NOT NULL,
    created_at    TIMESTAMP NOT NULL,
    last_accessed TIMESTAMP,
    archived_at   TIMESTAMP,
    status        TEXT DEFAULT 'active'
);

CREATE INDEX IF NOT EXISTS idx_sessions_repo ON sessions(repo_name);
CREATE INDEX IF NOT EXISTS idx_sessions_status ON sessions(status);
CREATE INDEX IF NOT EXISTS idx_sessions_archived ON sessions(archived_at);
";

const SESSION_COLUMNS: &str = "id, name, repo_path, repo_name, worktree_path, branch_name,
       created_at, last_accessed, archived_at, status";

pub struct SessionStore {
    conn: Mutex<Connection>,
}

impl SessionStore {
    /// Opens (creating if needed) the database at `path`, including its
    /// parent directory, and applies the schema.
    pub fn open(path: impl AsRef<Path>) -> CoreResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                CoreError::Persistence(format!(
                    "failed to create database directory '{}': {error}",
                    parent.display()
                ))
            })?;
        }
        let conn = Connection::open(path).map_err(persistence)?;
        Self::bootstrap(conn)
    }

    pub fn in_memory() -> CoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(persistence)?;
        Self::bootstrap(conn)
    }

    fn bootstrap(conn: Connection) -> CoreResult<Self> {
        conn.execute_batch(SCHEMA).map_err(persistence)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn insert(&self, session: &Session) -> CoreResult<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO sessions (
                id, name, repo_path, repo_name, worktree_path, branch_name,
                created_at, last_accessed, archived_at, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                session.id,
                session.name,
                path_text(&session.repo_path),
                session.repo_name,
                path_text(&session.worktree_path),
                session.branch_name,
                session.created_at.unix_timestamp(),
                session.last_accessed.map(|t| t.unix_timestamp()),
                session.archived_at.map(|t| t.unix_timestamp()),
                session.status.as_str(),
            ],
        )
        .map_err(persistence)?;
        Ok(())
    }

    pub fn get_by_name(&self, name: &str) -> CoreResult<Session> {
        let conn = self.lock();
        conn.query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE name = ?1"),
            params![name],
            map_session,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => CoreError::SessionNotFound(name.to_owned()),
            other => persistence(other),
        })
    }

    /// Looks a session up by branch; absence is not an error here (a branch
    /// without a session is a normal state).
    pub fn find_by_branch(&self, branch_name: &str) -> CoreResult<Option<Session>> {
        let conn = self.lock();
        match conn.query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE branch_name = ?1"),
            params![branch_name],
            map_session,
        ) {
            Ok(session) => Ok(Some(session)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(error) => Err(persistence(error)),
        }
    }

    /// Sessions for one repo, newest first, filtered by a case-insensitive
    /// substring match on the name.
    pub fn list(&self, repo_name: &str, query: &str) -> CoreResult<Vec<Session>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE repo_name = ?1 AND LOWER(name) LIKE ?2
                 ORDER BY created_at DESC"
            ))
            .map_err(persistence)?;
        let pattern = format!("%{}%", query.to_lowercase());
        let rows = stmt
            .query_map(params![repo_name, pattern], map_session)
            .map_err(persistence)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(persistence)
    }

    pub fn archive(&self, id: &str, when: OffsetDateTime) -> CoreResult<()> {
        self.execute_on_id(
            "UPDATE sessions SET archived_at = ?2, status = 'archived' WHERE id = ?1",
            id,
            Some(when.unix_timestamp()),
        )
    }

    pub fn unarchive(&self, id: &str) -> CoreResult<()> {
        let conn = self.lock();
        conn.execute(
            "UPDATE sessions SET archived_at = NULL, status = 'active' WHERE id = ?1",
            params![id],
        )
        .map_err(persistence)?;
        Ok(())
    }

    pub fn touch(&self, id: &str, when: OffsetDateTime) -> CoreResult<()> {
        self.execute_on_id(
            "UPDATE sessions SET last_accessed = ?2 WHERE id = ?1",
            id,
            Some(when.unix_timestamp()),
        )
    }

    pub fn delete(&self, id: &str) -> CoreResult<()> {
        let conn = self.lock();
        conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])
            .map_err(persistence)?;
        Ok(())
    }

    fn execute_on_id(&self, sql: &str, id: &str, stamp: Option<i64>) -> CoreResult<()> {
        let conn = self.lock();
        conn.execute(sql, params![id, stamp]).map_err(persistence)?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn persistence(error: rusqlite::Error) -> CoreError {
    CoreError::Persistence(error.to_string())
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn map_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    let timestamp = |seconds: i64| {
        OffsetDateTime::from_unix_timestamp(seconds).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    };
    let status: String = row.get(9)?;
    Ok(Session {
        id: row.get(0)?,
        name: row.get(1)?,
        repo_path: PathBuf::from(row.get::<_, String>(2)?),
        repo_name: row.get(3)?,
        worktree_path: PathBuf::from(row.get::<_, String>(4)?),
        branch_name: row.get(5)?,
        created_at: timestamp(row.get(6)?),
        last_accessed: row.get::<_, Option<i64>>(7)?.map(timestamp),
        archived_at: row.get::<_, Option<i64>>(8)?.map(timestamp),
        status: SessionStatus::parse(&status).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, created_unix: i64) -> Session {
        Session {
            id: format!("id-{name}"),
            name: name.to_owned(),
            repo_path: PathBuf::from("/home/user/repo"),
            repo_name: "repo".to_owned(),
            worktree_path: PathBuf::from(format!("/home/user/.atc/worktrees/repo/{name}")),
            branch_name: name.to_owned(),
            created_at: OffsetDateTime::from_unix_timestamp(created_unix).expect("timestamp"),
            last_accessed: None,
            archived_at: None,
            status: SessionStatus::Active,
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let store = SessionStore::in_memory().expect("store");
        let session = sample("feat-x", 1_700_000_000);
        store.insert(&session).expect("insert");

        let loaded = store.get_by_name("feat-x").expect("get");
        assert_eq!(loaded, session);
    }

    #[test]
    fn missing_session_is_not_found() {
        let store = SessionStore::in_memory().expect("store");
        assert!(matches!(
            store.get_by_name("ghost"),
            Err(CoreError::SessionNotFound(_))
        ));
    }

    #[test]
    fn duplicate_names_surface_the_unique_violation() {
        let store = SessionStore::in_memory().expect("store");
        store.insert(&sample("feat-x", 1)).expect("insert");
        let mut dup = sample("feat-x", 2);
        dup.id = "other-id".to_owned();
        let error = store.insert(&dup).expect_err("duplicate");
        assert!(matches!(error, CoreError::Persistence(_)), "{error}");
        assert!(error.to_string().to_lowercase().contains("unique"), "{error}");
    }

    #[test]
    fn list_filters_by_repo_and_substring_newest_first() {
        let store = SessionStore::in_memory().expect("store");
        store.insert(&sample("alpha", 100)).expect("insert");
        store.insert(&sample("beta", 200)).expect("insert");
        let mut other_repo = sample("gamma", 300);
        other_repo.repo_name = "elsewhere".to_owned();
        store.insert(&other_repo).expect("insert");

        let all = store.list("repo", "").expect("list");
        assert_eq!(
            all.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            vec!["beta", "alpha"]
        );

        let filtered = store.list("repo", "ALPH").expect("list");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "alpha");
    }

    #[test]
    fn archive_flip_is_atomic_and_reversible() {
        let store = SessionStore::in_memory().expect("store");
        let session = sample("feat-x", 1);
        store.insert(&session).expect("insert");

        let when = OffsetDateTime::from_unix_timestamp(12_345).expect("timestamp");
        store.archive(&session.id, when).expect("archive");
        let loaded = store.get_by_name("feat-x").expect("get");
        assert_eq!(loaded.status, SessionStatus::Archived);
        assert_eq!(loaded.archived_at, Some(when));

        store.unarchive(&session.id).expect("unarchive");
        let loaded = store.get_by_name("feat-x").expect("get");
        assert_eq!(loaded.status, SessionStatus::Active);
        assert_eq!(loaded.archived_at, None);
    }

    #[test]
    fn touch_records_last_access() {
        let store = SessionStore::in_memory().expect("store");
        let session = sample("feat-x", 1);
        store.insert(&session).expect("insert");

        let when = OffsetDateTime::from_unix_timestamp(55_555).expect("timestamp");
        store.touch(&session.id, when).expect("touch");
        assert_eq!(
            store.get_by_name("feat-x").expect("get").last_accessed,
            Some(when)
        );
    }

    #[test]
    fn delete_removes_the_row() {
        let store = SessionStore::in_memory().expect("store");
        let session = sample("feat-x", 1);
        store.insert(&session).expect("insert");
        store.delete(&session.id).expect("delete");
        assert!(store.get_by_name("feat-x").is_err());
    }

    #[test]
    fn find_by_branch_returns_none_for_unclaimed_branches() {
        let store = SessionStore::in_memory().expect("store");
        store.insert(&sample("feat-x", 1)).expect("insert");
        assert!(store.find_by_branch("feat-x").expect("find").is_some());
        assert!(store.find_by_branch("main").expect("find").is_none());
    }

    #[test]
    fn open_creates_the_parent_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/deeper/sessions.db");
        let store = SessionStore::open(&path).expect("open");
        store.insert(&sample("feat-x", 1)).expect("insert");
        assert!(path.exists());
    }
}
