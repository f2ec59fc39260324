use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use atc_core::Session;
use atc_mux::{Terminal, TerminalEvent};

use crate::message::{AppMessage, Command};
use crate::selection::Selection;
use crate::styles::{SIDEBAR_WIDTH, SMALL_SCREEN_THRESHOLD, SPINNER_FRAMES};
use crate::textfield::TextField;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Sidebar,
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    None,
    CreateSession,
    SelectBaseBranch,
    SelectExistingBranch,
    ConfirmBranchWithSession,
    EnterNewSessionName,
    DeleteConfirm,
    Help,
    Creating,
    ArchivedSessions,
}

/// The whole UI state. One reducer mutates it, one message at a time; every
/// state change is a function of (model, message), and side effects leave as
/// [`Command`] values for the dispatcher.
pub struct Model {
    pub focus: Focus,
    pub overlay: Overlay,
    pub repo_name: String,
    pub sessions: Vec<Session>,
    pub cursor: usize,
    pub scroll_offset: usize,
    pub active_session: Option<Session>,

    /// Terminal handles by session name. Owned exclusively by the reducer;
    /// command tasks only ever receive clones of individual handles.
    pub terminals: HashMap<String, Arc<Terminal>>,

    pub window_width: u16,
    pub window_height: u16,

    // Archived-sessions overlay.
    pub archived_cursor: usize,
    pub archived_scroll_offset: usize,
    pub archived_list: Vec<Session>,
    pub delete_from_archived: bool,

    pub spinner_frame: usize,
    pub err: Option<String>,
    pub message: Option<String>,
    pub setting_up: HashSet<String>,

    // Session creation.
    pub create_input: TextField,
    pub pending_session_name: String,
    pub select_after_load: Option<String>,
    pub activating_session: Option<String>,

    // Branch selection.
    pub branches: Vec<String>,
    pub filtered_branches: Vec<String>,
    pub branch_input: TextField,
    pub branch_cursor: usize,
    pub branches_with_sessions: HashSet<String>,
    pub current_branch: String,
    pub selected_branch_name: String,
    pub new_session_input: TextField,

    // Delete confirmation.
    pub selected_session: Option<Session>,

    // Text selection.
    pub selection: Selection,
    /// Budget of SGR mouse fragment characters to suppress. Over a remote
    /// shell, TCP can split a mouse escape sequence so the tail bytes parse
    /// as individual key events; each mouse event grants a fresh budget.
    pub mouse_fragment_budget: u8,
    pub last_click: Option<(Instant, u16, u16)>,

    pub should_quit: bool,
}

impl Model {
    pub fn new(repo_name: String, invoking_branch: String) -> Self {
        Self {
            focus: Focus::Sidebar,
            overlay: Overlay::None,
            repo_name,
            sessions: Vec::new(),
            cursor: 0,
            scroll_offset: 0,
            active_session: None,
            terminals: HashMap::new(),
            window_width: 0,
            window_height: 0,
            archived_cursor: 0,
            archived_scroll_offset: 0,
            archived_list: Vec::new(),
            delete_from_archived: false,
            spinner_frame: 0,
            err: None,
            message: None,
            setting_up: HashSet::new(),
            create_input: TextField::new("Session name..."),
            pending_session_name: String::new(),
            select_after_load: None,
            activating_session: None,
            branches: Vec::new(),
            filtered_branches: Vec::new(),
            branch_input: TextField::new("Filter branches..."),
            branch_cursor: 0,
            branches_with_sessions: HashSet::new(),
            current_branch: invoking_branch,
            selected_branch_name: String::new(),
            new_session_input: TextField::new("New session name..."),
            selected_session: None,
            selection: Selection::default(),
            mouse_fragment_budget: 0,
            last_click: None,
            should_quit: false,
        }
    }

    pub fn init(&self) -> Vec<Command> {
        vec![Command::LoadSessions]
    }

    // --- Message reducer ---

    pub fn update(&mut self, msg: AppMessage) -> Vec<Command> {
        match msg {
            AppMessage::SessionsLoaded(sessions) => self.on_sessions_loaded(sessions),
            AppMessage::BranchesLoaded {
                branches,
                with_sessions,
            } => {
                self.branches = branches;
                self.branches_with_sessions = with_sessions;
                self.filter_branches();
                Vec::new()
            }
            AppMessage::SessionCreated {
                session,
                setup_commands,
            } => self.on_session_created(session, setup_commands),
            AppMessage::SetupComplete { name, error } => {
                if !self.setting_up.remove(&name) {
                    return Vec::new();
                }
                match error {
                    Some(error) => self.err = Some(format!("setup failed for '{name}': {error}")),
                    None => self.message = Some(format!("Setup complete for '{name}'")),
                }
                Vec::new()
            }
            AppMessage::SessionDeleted { name } => {
                self.message = Some(format!("Session '{name}' deleted"));
                self.selected_session = None;
                if self.activating_session.as_deref() == Some(name.as_str()) {
                    self.activating_session = None;
                }
                if self
                    .active_session
                    .as_ref()
                    .is_some_and(|s| s.name == name)
                {
                    self.active_session = None;
                }
                if self.delete_from_archived {
                    self.overlay = Overlay::ArchivedSessions;
                    self.delete_from_archived = false;
                } else {
                    self.overlay = Overlay::None;
                }
                vec![Command::LoadSessions]
            }
            AppMessage::SessionArchived { name } => {
                self.message = Some(format!("Session '{name}' archived"));
                self.detach_terminal(&name);
                if self
                    .active_session
                    .as_ref()
                    .is_some_and(|s| s.name == name)
                {
                    self.active_session = None;
                }
                vec![Command::LoadSessions]
            }
            AppMessage::SessionUnarchived { name } => {
                self.message = Some(format!("Session '{name}' unarchived"));
                vec![Command::LoadSessions]
            }
            AppMessage::TerminalReady { name, terminal } => {
                let expected = self.activating_session.as_deref() == Some(name.as_str())
                    || self.sessions.iter().any(|s| s.name == name);
                if expected {
                    let (tw, th) = self.terminal_pane_dimensions();
                    terminal.resize(tw, th);
                    self.terminals.insert(name.clone(), terminal);
                } else {
                    // Deleted while activating; don't leak a polling task.
                    terminal.detach();
                }
                if self.activating_session.as_deref() == Some(name.as_str()) {
                    self.activating_session = None;
                }
                Vec::new()
            }
            AppMessage::Terminal(TerminalEvent::Output { .. }) => {
                // New capture; the redraw after this message picks it up.
                Vec::new()
            }
            AppMessage::Terminal(TerminalEvent::Exited { .. }) => {
                // The pane banner comes from the handle's dead flag.
                Vec::new()
            }
            AppMessage::Error(error) => {
                self.err = Some(error);
                if self.overlay == Overlay::Creating {
                    self.overlay = Overlay::None;
                }
                if let Some(name) = self.activating_session.take() {
                    self.detach_terminal(&name);
                }
                Vec::new()
            }
            AppMessage::Tick => {
                if !self.setting_up.is_empty() || self.overlay == Overlay::Creating {
                    self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
                }
                Vec::new()
            }
        }
    }

    fn on_sessions_loaded(&mut self, sessions: Vec<Session>) -> Vec<Command> {
        self.sessions = sessions;
        let active_len = self.active_sessions().len();

        // Move the cursor onto a just-created session.
        if let Some(wanted) = self.select_after_load.take() {
            if let Some(idx) = self
                .active_sessions()
                .iter()
                .position(|s| s.name == wanted)
            {
                self.cursor = idx;
            }
        }

        let mut max_idx = active_len.saturating_sub(1);
        if self.archived_count() > 0 {
            max_idx = active_len; // the "(N archived)" line
        }
        if self.cursor > max_idx {
            self.cursor = max_idx;
        }

        let commands = self.switch_view_to_current_session();

        // Refresh the archived overlay if it is open.
        if self.overlay == Overlay::ArchivedSessions {
            self.archived_list = self.archived_sessions_list();
            if self.archived_list.is_empty() {
                self.overlay = Overlay::None;
            } else if self.archived_cursor >= self.archived_list.len() {
                self.archived_cursor = self.archived_list.len() - 1;
            }
        }

        commands
    }

    fn on_session_created(
        &mut self,
        session: Session,
        setup_commands: Vec<String>,
    ) -> Vec<Command> {
        self.overlay = Overlay::None;
        self.pending_session_name.clear();
        self.select_after_load = Some(session.name.clone());

        let mut commands = vec![Command::LoadSessions];
        commands.extend(self.activate_session(&session, true));
        if !setup_commands.is_empty() {
            self.setting_up.insert(session.name.clone());
            commands.push(Command::RunSetup {
                name: session.name.clone(),
                worktree_path: session.worktree_path.clone(),
                commands: setup_commands,
            });
        }
        commands
    }

    // --- Activation ---

    /// Makes `session` the viewed session and ensures a running terminal
    /// handle exists for it by reusing, reattaching, or creating as a command.
    pub fn activate_session(&mut self, session: &Session, switch_focus: bool) -> Vec<Command> {
        self.active_session = Some(session.clone());
        if switch_focus {
            self.message = None;
            self.err = None;
            self.focus = Focus::Terminal;
        }

        let (tw, th) = self.terminal_pane_dimensions();
        if let Some(terminal) = self.terminals.get(&session.name) {
            if terminal.is_running() {
                terminal.resize(tw, th);
                return vec![Command::TouchSession {
                    name: session.name.clone(),
                }];
            }
            // A stopped wrapper gets detached before reattaching.
            self.detach_terminal(&session.name);
        }

        if self.activating_session.as_deref() == Some(session.name.as_str()) {
            return Vec::new();
        }
        self.activating_session = Some(session.name.clone());
        vec![Command::ActivateTerminal {
            session: session.clone(),
            width: tw,
            height: th,
        }]
    }

    /// Follows the sidebar cursor: views the session under it, resizing a
    /// live handle or auto-activating when none exists yet.
    pub fn switch_view_to_current_session(&mut self) -> Vec<Command> {
        let active = self.active_sessions();
        if self.cursor >= active.len() {
            // Cursor on the archived line; keep the current view.
            return Vec::new();
        }
        let session = active[self.cursor].clone();
        self.active_session = Some(session.clone());

        if let Some(terminal) = self.terminals.get(&session.name) {
            if terminal.is_running() {
                let (tw, th) = self.terminal_pane_dimensions();
                terminal.resize(tw, th);
            }
            return Vec::new();
        }
        if self.activating_session.as_deref() == Some(session.name.as_str()) {
            return Vec::new();
        }
        self.activate_session(&session, false)
    }

    /// Stops polling for a session and forgets its handle. The tmux session
    /// keeps running.
    pub fn detach_terminal(&mut self, name: &str) {
        if let Some(terminal) = self.terminals.remove(name) {
            terminal.detach();
        }
    }

    pub fn detach_all_terminals(&mut self) {
        for (_, terminal) in self.terminals.drain() {
            terminal.detach();
        }
    }

    // --- Queries ---

    pub fn active_sessions(&self) -> Vec<Session> {
        self.sessions
            .iter()
            .filter(|s| !s.is_archived())
            .cloned()
            .collect()
    }

    pub fn archived_count(&self) -> usize {
        self.sessions.iter().filter(|s| s.is_archived()).count()
    }

    pub fn archived_sessions_list(&self) -> Vec<Session> {
        self.sessions
            .iter()
            .filter(|s| s.is_archived())
            .cloned()
            .collect()
    }

    pub fn active_terminal(&self) -> Option<&Arc<Terminal>> {
        let session = self.active_session.as_ref()?;
        self.terminals.get(&session.name)
    }

    /// Whether the sidebar is rendered. On narrow screens it hides while the
    /// terminal has focus, giving the child the full width.
    pub fn sidebar_visible(&self) -> bool {
        self.window_width >= SMALL_SCREEN_THRESHOLD || self.focus == Focus::Sidebar
    }

    /// Inner width/height of the terminal pane.
    pub fn terminal_pane_dimensions(&self) -> (u16, u16) {
        let width = if self.sidebar_visible() {
            self.window_width.saturating_sub(SIDEBAR_WIDTH + 1)
        } else {
            self.window_width
        };
        (width.max(10), self.window_height.max(5))
    }

    /// Maps raw mouse coordinates to clamped terminal-pane coordinates.
    /// Crossterm reports exact 0-based cell positions, so no correction
    /// offsets are needed.
    pub fn mouse_to_term_coords(&self, mouse_x: u16, mouse_y: u16, term_start_x: u16) -> (usize, usize) {
        let (tw, th) = self.terminal_pane_dimensions();
        let col = mouse_x.saturating_sub(term_start_x).min(tw - 1);
        let row = mouse_y.min(th - 1);
        (col as usize, row as usize)
    }

    pub fn resize_terminal_if_needed(&self) {
        if let Some(terminal) = self.active_terminal() {
            let (tw, th) = self.terminal_pane_dimensions();
            terminal.resize(tw, th);
        }
    }

    pub fn set_window_size(&mut self, width: u16, height: u16) {
        self.window_width = width;
        self.window_height = height;
        self.resize_terminal_if_needed();
    }

    // --- Sidebar geometry ---

    pub fn max_visible_sessions(&self) -> usize {
        // Tower block + top border consume 8 rows, plus the bottom border
        // and the archived line.
        (self.window_height as usize).saturating_sub(10).max(1)
    }

    pub fn adjust_scroll(&mut self) {
        let max_visible = self.max_visible_sessions();
        if self.cursor < self.scroll_offset {
            self.scroll_offset = self.cursor;
        }
        if self.cursor >= self.scroll_offset + max_visible {
            self.scroll_offset = self.cursor + 1 - max_visible;
        }
    }

    // --- Branch filtering ---

    pub fn filter_branches(&mut self) {
        let query = self.branch_input.value().trim().to_lowercase();
        if query.is_empty() {
            self.filtered_branches = self.branches.clone();
        } else {
            self.filtered_branches = self
                .branches
                .iter()
                .filter(|b| b.to_lowercase().contains(&query))
                .cloned()
                .collect();
        }
    }

    /// Whether the synthetic HEAD row is shown in the base-branch picker.
    pub fn show_head_option(&self) -> bool {
        let filter = self.branch_input.value().to_lowercase();
        filter.is_empty() || "head".contains(&filter)
    }

    pub fn selected_base_branch(&self) -> Option<String> {
        let show_head = self.show_head_option();
        if show_head && self.branch_cursor == 0 {
            return Some(self.current_branch.clone());
        }
        let idx = self.branch_cursor - usize::from(show_head);
        self.filtered_branches.get(idx).cloned()
    }

    pub fn clamp_branch_cursor(&mut self, total: usize) {
        if total == 0 {
            self.branch_cursor = 0;
        } else if self.branch_cursor >= total {
            self.branch_cursor = total - 1;
        }
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.spinner_frame]
    }
}
