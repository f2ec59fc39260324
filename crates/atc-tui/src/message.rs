use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use atc_core::Session;
use atc_mux::{Terminal, TerminalEvent};

/// Everything the reducer consumes: results of background commands, events
/// from terminal polling tasks, and the spinner tick.
#[derive(Debug)]
pub enum AppMessage {
    SessionsLoaded(Vec<Session>),
    BranchesLoaded {
        branches: Vec<String>,
        with_sessions: HashSet<String>,
    },
    SessionCreated {
        session: Session,
        setup_commands: Vec<String>,
    },
    SetupComplete {
        name: String,
        error: Option<String>,
    },
    SessionDeleted {
        name: String,
    },
    SessionArchived {
        name: String,
    },
    SessionUnarchived {
        name: String,
    },
    /// An activation command finished building a handle; ownership moves
    /// into the reducer's terminal map here.
    TerminalReady {
        name: String,
        terminal: Arc<Terminal>,
    },
    Terminal(TerminalEvent),
    Error(String),
    Tick,
}

/// Work the reducer wants done off-loop. Commands are self-contained: the
/// dispatcher can run them without touching the model.
#[derive(Debug)]
pub enum Command {
    LoadSessions,
    LoadBranches,
    CreateSession {
        name: String,
        base_branch: String,
        use_existing: bool,
    },
    DeleteSession {
        name: String,
        terminal: Option<Arc<Terminal>>,
    },
    ArchiveSession {
        name: String,
    },
    UnarchiveSession {
        name: String,
    },
    TouchSession {
        name: String,
    },
    RunSetup {
        name: String,
        worktree_path: PathBuf,
        commands: Vec<String>,
    },
    ActivateTerminal {
        session: Session,
        width: u16,
        height: u16,
    },
    RespawnTerminal {
        terminal: Arc<Terminal>,
        resume: bool,
    },
}
