use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use std::time::{Duration, Instant};

use atc_ansi::strip_ansi;
use atc_git::validate_branch_name;
use atc_mux::{KeyKind, KeyPress};

use crate::message::Command;
use crate::model::{Focus, Model, Overlay};
use crate::overlay;
use crate::selection::{copy_to_clipboard, selected_text, word_bounds_at};
use crate::styles::SIDEBAR_WIDTH;
use crate::textfield::TextField;

const MOUSE_FRAGMENT_BUDGET: u8 = 15;
const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);
const ARCHIVED_MAX_VISIBLE: usize = 10;
const BRANCH_MAX_VISIBLE: usize = 10;

pub fn handle_event(model: &mut Model, event: Event) -> Vec<Command> {
    match event {
        Event::Resize(width, height) => {
            model.set_window_size(width, height);
            Vec::new()
        }
        Event::Key(key) if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) => {
            handle_key(model, key)
        }
        Event::Mouse(mouse) => handle_mouse(model, mouse),
        _ => Vec::new(),
    }
}

fn is_ctrl(key: &KeyEvent, c: char) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char(c)
}

// --- Keys ---

fn handle_key(model: &mut Model, key: KeyEvent) -> Vec<Command> {
    // Any key press clears the text selection.
    model.selection.clear();

    if model.overlay != Overlay::None {
        return handle_overlay_key(model, key);
    }

    // Ctrl+C in the terminal returns to the sidebar.
    if is_ctrl(&key, 'c') && model.focus == Focus::Terminal {
        model.focus = Focus::Sidebar;
        model.resize_terminal_if_needed();
        return Vec::new();
    }

    if model.focus == Focus::Terminal {
        handle_terminal_key(model, key)
    } else {
        handle_sidebar_key(model, key)
    }
}

fn handle_sidebar_key(model: &mut Model, key: KeyEvent) -> Vec<Command> {
    if is_ctrl(&key, 'c') {
        model.should_quit = true;
        return Vec::new();
    }
    match key.code {
        KeyCode::Char('q') => {
            model.should_quit = true;
            Vec::new()
        }
        KeyCode::Up | KeyCode::Char('k') => {
            if model.cursor > 0 {
                model.cursor -= 1;
                model.adjust_scroll();
                return model.switch_view_to_current_session();
            }
            Vec::new()
        }
        KeyCode::Down | KeyCode::Char('j') => {
            let active_len = model.active_sessions().len();
            let mut max_idx = active_len.saturating_sub(1);
            if model.archived_count() > 0 {
                max_idx = active_len;
            }
            if model.cursor < max_idx {
                model.cursor += 1;
                model.adjust_scroll();
                return model.switch_view_to_current_session();
            }
            Vec::new()
        }
        KeyCode::Enter => handle_enter(model),
        KeyCode::Char('n') => {
            model.create_input = TextField::new("Session name...");
            model.overlay = Overlay::CreateSession;
            model.err = None;
            Vec::new()
        }
        KeyCode::Char('d') => {
            let active = model.active_sessions();
            if let Some(session) = active.get(model.cursor) {
                model.selected_session = Some(session.clone());
                model.overlay = Overlay::DeleteConfirm;
            }
            Vec::new()
        }
        KeyCode::Char('a') => {
            let active = model.active_sessions();
            if let Some(session) = active.get(model.cursor) {
                return vec![Command::ArchiveSession {
                    name: session.name.clone(),
                }];
            }
            Vec::new()
        }
        KeyCode::Char('?') => {
            model.overlay = Overlay::Help;
            Vec::new()
        }
        KeyCode::Esc => {
            if model.active_session.is_some() {
                model.message = None;
                model.err = None;
                model.focus = Focus::Terminal;
                model.resize_terminal_if_needed();
            }
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn handle_enter(model: &mut Model) -> Vec<Command> {
    let active = model.active_sessions();
    if model.archived_count() > 0 && model.cursor == active.len() {
        return open_archived_overlay(model);
    }
    let Some(session) = active.get(model.cursor).cloned() else {
        return Vec::new();
    };
    model.activate_session(&session, true)
}

fn handle_terminal_key(model: &mut Model, key: KeyEvent) -> Vec<Command> {
    let Some(terminal) = model.active_terminal().cloned() else {
        return Vec::new();
    };

    // A dead pane only reacts to Enter, which restarts the agent.
    if !terminal.is_running() {
        if key.code == KeyCode::Enter {
            return vec![Command::RespawnTerminal {
                terminal,
                resume: true,
            }];
        }
        return Vec::new();
    }

    // Page Up/Down drive scrollback (Ctrl variants are forwarded).
    if !key.modifiers.contains(KeyModifiers::CONTROL) {
        if key.code == KeyCode::PageUp {
            let (_, th) = model.terminal_pane_dimensions();
            terminal.scroll_up(usize::from(th) / 2);
            return Vec::new();
        }
        if key.code == KeyCode::PageDown {
            let (_, th) = model.terminal_pane_dimensions();
            terminal.scroll_down(usize::from(th) / 2);
            return Vec::new();
        }
    }

    // Suppress SGR mouse escape fragments split across TCP packets (common
    // over SSH): a fragmented `ESC [ < Cb ; Cx ; Cy M` arrives as an ESC key
    // followed by individual rune keys. The budget is granted per mouse
    // event and deliberately not reset by the ESC events in between.
    if model.mouse_fragment_budget > 0 {
        if key.code == KeyCode::Esc && terminal.is_scroll_mode() {
            model.mouse_fragment_budget -= 1;
            return Vec::new();
        }
        if let KeyCode::Char(c) = key.code {
            if matches!(c, '[' | '<' | ';' | 'M' | 'm' | '0'..='9') {
                model.mouse_fragment_budget -= 1;
                return Vec::new();
            }
        }
    }

    // Any other key exits scroll mode without being forwarded, so partial
    // mouse sequences never leak into the child.
    if terminal.is_scroll_mode() {
        terminal.exit_scroll_mode();
        return Vec::new();
    }

    if let Some(press) = key_event_to_press(&key) {
        terminal.send_keys(&press);
    }
    Vec::new()
}

/// Maps a crossterm key event onto the adapter's logical key model.
pub fn key_event_to_press(key: &KeyEvent) -> Option<KeyPress> {
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);

    let arrows = |plain, s, c, cs| match (shift, ctrl) {
        (false, false) => plain,
        (true, false) => s,
        (false, true) => c,
        (true, true) => cs,
    };

    let kind = match key.code {
        KeyCode::Char(c) if ctrl => {
            let c = c.to_ascii_lowercase();
            if !c.is_ascii_lowercase() {
                return None;
            }
            KeyKind::Ctrl(c)
        }
        KeyCode::Char(c) => return Some(KeyPress::runes(c.to_string(), alt)),
        KeyCode::Enter => KeyKind::Enter,
        KeyCode::Backspace => KeyKind::Backspace,
        KeyCode::Tab => KeyKind::Tab,
        KeyCode::BackTab => KeyKind::BackTab,
        KeyCode::Esc => KeyKind::Escape,
        KeyCode::Up => arrows(
            KeyKind::Up,
            KeyKind::ShiftUp,
            KeyKind::CtrlUp,
            KeyKind::CtrlShiftUp,
        ),
        KeyCode::Down => arrows(
            KeyKind::Down,
            KeyKind::ShiftDown,
            KeyKind::CtrlDown,
            KeyKind::CtrlShiftDown,
        ),
        KeyCode::Left => arrows(
            KeyKind::Left,
            KeyKind::ShiftLeft,
            KeyKind::CtrlLeft,
            KeyKind::CtrlShiftLeft,
        ),
        KeyCode::Right => arrows(
            KeyKind::Right,
            KeyKind::ShiftRight,
            KeyKind::CtrlRight,
            KeyKind::CtrlShiftRight,
        ),
        KeyCode::Home => arrows(
            KeyKind::Home,
            KeyKind::ShiftHome,
            KeyKind::CtrlHome,
            KeyKind::CtrlShiftHome,
        ),
        KeyCode::End => arrows(
            KeyKind::End,
            KeyKind::ShiftEnd,
            KeyKind::CtrlEnd,
            KeyKind::CtrlShiftEnd,
        ),
        KeyCode::PageUp => {
            if ctrl {
                KeyKind::CtrlPgUp
            } else {
                KeyKind::PgUp
            }
        }
        KeyCode::PageDown => {
            if ctrl {
                KeyKind::CtrlPgDown
            } else {
                KeyKind::PgDown
            }
        }
        KeyCode::Insert => KeyKind::Insert,
        KeyCode::Delete => KeyKind::Delete,
        KeyCode::F(n) => KeyKind::F(n),
        _ => return None,
    };
    Some(KeyPress::key(kind, alt))
}

// --- Overlay keys ---

fn handle_overlay_key(model: &mut Model, key: KeyEvent) -> Vec<Command> {
    match model.overlay {
        Overlay::CreateSession => handle_create_overlay_key(model, key),
        Overlay::SelectBaseBranch => handle_select_base_branch_key(model, key),
        Overlay::SelectExistingBranch => handle_select_existing_branch_key(model, key),
        Overlay::ConfirmBranchWithSession => handle_confirm_branch_key(model, key),
        Overlay::EnterNewSessionName => handle_new_session_name_key(model, key),
        Overlay::DeleteConfirm => handle_delete_confirm_key(model, key),
        Overlay::Help => {
            if is_ctrl(&key, 'c') {
                model.should_quit = true;
            } else if matches!(
                key.code,
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')
            ) {
                model.overlay = Overlay::None;
            }
            Vec::new()
        }
        Overlay::Creating => Vec::new(),
        Overlay::ArchivedSessions => handle_archived_overlay_key(model, key),
        Overlay::None => Vec::new(),
    }
}

/// Mirrors the Esc behavior of each overlay; used by clicks outside it too.
pub fn dismiss_overlay(model: &mut Model) -> Vec<Command> {
    match model.overlay {
        Overlay::Help | Overlay::ArchivedSessions => model.overlay = Overlay::None,
        Overlay::CreateSession => {
            model.overlay = Overlay::None;
            model.err = None;
        }
        Overlay::SelectBaseBranch | Overlay::SelectExistingBranch => {
            model.overlay = Overlay::CreateSession;
        }
        Overlay::ConfirmBranchWithSession | Overlay::EnterNewSessionName => {
            model.overlay = Overlay::SelectExistingBranch;
            model.selected_branch_name.clear();
        }
        Overlay::DeleteConfirm => {
            if model.delete_from_archived {
                model.overlay = Overlay::ArchivedSessions;
                model.delete_from_archived = false;
            } else {
                model.overlay = Overlay::None;
            }
            model.selected_session = None;
        }
        // Cannot dismiss while creating.
        Overlay::Creating | Overlay::None => {}
    }
    Vec::new()
}

fn handle_create_overlay_key(model: &mut Model, key: KeyEvent) -> Vec<Command> {
    if is_ctrl(&key, 'c') {
        model.should_quit = true;
        return Vec::new();
    }
    if is_ctrl(&key, 'b') {
        model.overlay = Overlay::SelectExistingBranch;
        init_branch_input(model);
        return vec![Command::LoadBranches];
    }
    match key.code {
        KeyCode::Esc => {
            model.overlay = Overlay::None;
            model.err = None;
            Vec::new()
        }
        KeyCode::Enter => {
            let name = model.create_input.value().trim().to_owned();
            if name.is_empty() {
                model.err = Some("session name cannot be empty".to_owned());
                return Vec::new();
            }
            if let Err(error) = validate_branch_name(&name) {
                model.err = Some(format!("invalid session name: {error}"));
                return Vec::new();
            }
            model.pending_session_name = name;
            model.overlay = Overlay::SelectBaseBranch;
            init_branch_input(model);
            vec![Command::LoadBranches]
        }
        _ => {
            model.create_input.handle_key(&key);
            model.err = None;
            Vec::new()
        }
    }
}

fn init_branch_input(model: &mut Model) {
    model.branch_input = TextField::new("Filter branches...");
    model.branch_cursor = 0;
}

fn create_session_command(model: &mut Model, base_branch: String, use_existing: bool) -> Vec<Command> {
    let name = model.pending_session_name.clone();
    model.overlay = Overlay::Creating;
    vec![Command::CreateSession {
        name,
        base_branch,
        use_existing,
    }]
}

fn handle_select_base_branch_key(model: &mut Model, key: KeyEvent) -> Vec<Command> {
    let show_head = model.show_head_option();
    let total = model.filtered_branches.len() + usize::from(show_head);

    if is_ctrl(&key, 'c') {
        model.should_quit = true;
        return Vec::new();
    }
    match key.code {
        KeyCode::Esc => {
            model.overlay = Overlay::CreateSession;
            Vec::new()
        }
        KeyCode::Up => {
            model.branch_cursor = model.branch_cursor.saturating_sub(1);
            Vec::new()
        }
        KeyCode::Down => {
            if model.branch_cursor + 1 < total {
                model.branch_cursor += 1;
            }
            Vec::new()
        }
        KeyCode::Enter => {
            if total == 0 {
                return Vec::new();
            }
            let Some(base) = model.selected_base_branch() else {
                return Vec::new();
            };
            create_session_command(model, base, false)
        }
        _ => {
            model.branch_input.handle_key(&key);
            model.filter_branches();
            let total = model.filtered_branches.len() + usize::from(model.show_head_option());
            model.clamp_branch_cursor(total);
            Vec::new()
        }
    }
}

fn handle_select_existing_branch_key(model: &mut Model, key: KeyEvent) -> Vec<Command> {
    let total = model.filtered_branches.len();

    if is_ctrl(&key, 'c') {
        model.should_quit = true;
        return Vec::new();
    }
    match key.code {
        KeyCode::Esc => {
            model.overlay = Overlay::CreateSession;
            Vec::new()
        }
        KeyCode::Up => {
            model.branch_cursor = model.branch_cursor.saturating_sub(1);
            Vec::new()
        }
        KeyCode::Down => {
            if model.branch_cursor + 1 < total {
                model.branch_cursor += 1;
            }
            Vec::new()
        }
        KeyCode::Enter => {
            let Some(branch) = model.filtered_branches.get(model.branch_cursor).cloned() else {
                return Vec::new();
            };
            if model.branches_with_sessions.contains(&branch) {
                model.selected_branch_name = branch;
                model.overlay = Overlay::ConfirmBranchWithSession;
                return Vec::new();
            }
            model.pending_session_name = branch.clone();
            create_session_command(model, branch, true)
        }
        _ => {
            model.branch_input.handle_key(&key);
            model.filter_branches();
            let total = model.filtered_branches.len();
            model.clamp_branch_cursor(total);
            Vec::new()
        }
    }
}

fn handle_confirm_branch_key(model: &mut Model, key: KeyEvent) -> Vec<Command> {
    if is_ctrl(&key, 'c') {
        model.should_quit = true;
        return Vec::new();
    }
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            model.new_session_input = TextField::new("New session name...");
            model.overlay = Overlay::EnterNewSessionName;
            Vec::new()
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            model.overlay = Overlay::SelectExistingBranch;
            model.selected_branch_name.clear();
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn handle_new_session_name_key(model: &mut Model, key: KeyEvent) -> Vec<Command> {
    if is_ctrl(&key, 'c') {
        model.should_quit = true;
        return Vec::new();
    }
    match key.code {
        KeyCode::Esc => {
            model.overlay = Overlay::SelectExistingBranch;
            model.selected_branch_name.clear();
            Vec::new()
        }
        KeyCode::Enter => {
            let name = model.new_session_input.value().trim().to_owned();
            if name.is_empty() {
                model.err = Some("session name cannot be empty".to_owned());
                return Vec::new();
            }
            if let Err(error) = validate_branch_name(&name) {
                model.err = Some(format!("invalid session name: {error}"));
                return Vec::new();
            }
            model.pending_session_name = name;
            let base = model.selected_branch_name.clone();
            create_session_command(model, base, false)
        }
        _ => {
            model.new_session_input.handle_key(&key);
            model.err = None;
            Vec::new()
        }
    }
}

fn handle_delete_confirm_key(model: &mut Model, key: KeyEvent) -> Vec<Command> {
    if is_ctrl(&key, 'c') {
        model.should_quit = true;
        return Vec::new();
    }
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            let Some(session) = model.selected_session.clone() else {
                return Vec::new();
            };
            model.setting_up.remove(&session.name);
            // The handle (if any) leaves the map now; the command kills the
            // tmux session before the row goes away.
            let terminal = model.terminals.remove(&session.name);
            vec![Command::DeleteSession {
                name: session.name,
                terminal,
            }]
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            if model.delete_from_archived {
                model.overlay = Overlay::ArchivedSessions;
                model.delete_from_archived = false;
            } else {
                model.overlay = Overlay::None;
            }
            model.selected_session = None;
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn open_archived_overlay(model: &mut Model) -> Vec<Command> {
    model.archived_list = model.archived_sessions_list();
    model.archived_cursor = 0;
    model.archived_scroll_offset = 0;
    model.overlay = Overlay::ArchivedSessions;
    Vec::new()
}

fn handle_archived_overlay_key(model: &mut Model, key: KeyEvent) -> Vec<Command> {
    if is_ctrl(&key, 'c') {
        model.should_quit = true;
        return Vec::new();
    }
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            if model.archived_cursor > 0 {
                model.archived_cursor -= 1;
                if model.archived_cursor < model.archived_scroll_offset {
                    model.archived_scroll_offset = model.archived_cursor;
                }
            }
            Vec::new()
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if model.archived_cursor + 1 < model.archived_list.len() {
                model.archived_cursor += 1;
                if model.archived_cursor >= model.archived_scroll_offset + ARCHIVED_MAX_VISIBLE {
                    model.archived_scroll_offset = model.archived_cursor + 1 - ARCHIVED_MAX_VISIBLE;
                }
            }
            Vec::new()
        }
        KeyCode::Char('u') => {
            let Some(session) = model.archived_list.get(model.archived_cursor) else {
                return Vec::new();
            };
            vec![Command::UnarchiveSession {
                name: session.name.clone(),
            }]
        }
        KeyCode::Char('d') => {
            let Some(session) = model.archived_list.get(model.archived_cursor).cloned() else {
                return Vec::new();
            };
            model.selected_session = Some(session);
            model.delete_from_archived = true;
            model.overlay = Overlay::DeleteConfirm;
            Vec::new()
        }
        KeyCode::Esc => {
            model.overlay = Overlay::None;
            Vec::new()
        }
        _ => Vec::new(),
    }
}

// --- Mouse ---

fn handle_mouse(model: &mut Model, mouse: MouseEvent) -> Vec<Command> {
    model.mouse_fragment_budget = MOUSE_FRAGMENT_BUDGET;

    if model.overlay != Overlay::None {
        return handle_overlay_mouse(model, mouse);
    }

    let term_start_x = if model.sidebar_visible() {
        SIDEBAR_WIDTH + 1
    } else {
        0
    };

    // Sidebar clicks and wheel.
    if model.sidebar_visible() && mouse.column < SIDEBAR_WIDTH {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => return handle_sidebar_mouse(model, mouse),
            MouseEventKind::ScrollUp => return sidebar_wheel_up(model),
            MouseEventKind::ScrollDown => return sidebar_wheel_down(model),
            _ => return Vec::new(),
        }
    }

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if mouse.column >= term_start_x && model.active_session.is_some() {
                let (col, row) = model.mouse_to_term_coords(mouse.column, mouse.row, term_start_x);

                let now = Instant::now();
                let double = model
                    .last_click
                    .is_some_and(|(at, x, y)| {
                        now.duration_since(at) < DOUBLE_CLICK_WINDOW
                            && x == mouse.column
                            && y == mouse.row
                    });
                model.last_click = Some((now, mouse.column, mouse.row));

                if model.focus == Focus::Sidebar {
                    model.message = None;
                    model.err = None;
                    model.focus = Focus::Terminal;
                    model.resize_terminal_if_needed();
                }

                if double {
                    select_word_at(model, row, col);
                } else {
                    model.selection.begin(row, col);
                }
            } else {
                model.selection.clear();
            }
            Vec::new()
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            if model.selection.selecting {
                let (col, row) = model.mouse_to_term_coords(mouse.column, mouse.row, term_start_x);
                model.selection.drag_to(row, col);
            }
            Vec::new()
        }
        MouseEventKind::Up(MouseButton::Left) => {
            if model.selection.selecting {
                model.selection.selecting = false;
                let (col, row) = model.mouse_to_term_coords(mouse.column, mouse.row, term_start_x);
                model.selection.end_row = row;
                model.selection.end_col = col;
                // Only a drag (not a bare click) leaves a selection behind.
                if model.selection.start_row != row || model.selection.start_col != col {
                    model.selection.has_selection = true;
                    copy_selection(model);
                } else {
                    model.selection.has_selection = false;
                }
            }
            Vec::new()
        }
        MouseEventKind::ScrollUp => {
            if let Some(terminal) = model.active_terminal().cloned() {
                if terminal.is_running() {
                    model.selection.clear();
                    terminal.scroll_up(2);
                }
            }
            Vec::new()
        }
        MouseEventKind::ScrollDown => {
            if let Some(terminal) = model.active_terminal().cloned() {
                if terminal.is_running() {
                    model.selection.clear();
                    terminal.scroll_down(2);
                }
            }
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn copy_selection(model: &Model) {
    let Some(terminal) = model.active_terminal() else {
        return;
    };
    let text = selected_text(&terminal.render(), &model.selection);
    copy_to_clipboard(&text);
}

/// Double-click: select the run of same-class runes under the cursor and
/// copy it.
fn select_word_at(model: &mut Model, row: usize, col: usize) {
    let Some(terminal) = model.active_terminal().cloned() else {
        return;
    };
    let content = terminal.render();
    let Some(line) = content.split('\n').nth(row) else {
        return;
    };
    let runes: Vec<char> = strip_ansi(line).chars().collect();
    if col >= runes.len() {
        return;
    }
    let (start, end) = word_bounds_at(&runes, col as isize);
    if start < 0 || end < start {
        return;
    }

    model.selection.begin(row, start as usize);
    model.selection.selecting = false;
    model.selection.end_row = row;
    model.selection.end_col = end as usize;
    model.selection.has_selection = true;
    copy_selection(model);
}

#[derive(Debug, PartialEq, Eq)]
enum SidebarHit {
    Tower,
    ScrollUp,
    ScrollDown,
    Session(usize),
    Archived,
    Empty,
}

/// Maps a mouse row onto the sidebar element rendered there.
fn sidebar_hit_test(model: &Model, y: u16) -> SidebarHit {
    let tower_height = 8; // tower art + blank + top border
    let y = y as usize;
    if y < tower_height {
        return SidebarHit::Tower;
    }
    let row = y - tower_height;

    let active_len = model.active_sessions().len();
    let max_visible = model.max_visible_sessions();
    let mut line = 0;

    if model.scroll_offset > 0 {
        if row == line {
            return SidebarHit::ScrollUp;
        }
        line += 1;
    }

    let end = (model.scroll_offset + max_visible).min(active_len);
    let visible = end.saturating_sub(model.scroll_offset);
    if row >= line && row < line + visible {
        return SidebarHit::Session(model.scroll_offset + (row - line));
    }
    line += visible;

    if end < active_len {
        if row == line {
            return SidebarHit::ScrollDown;
        }
        line += 1;
    }

    if model.archived_count() > 0 && row == line {
        return SidebarHit::Archived;
    }

    SidebarHit::Empty
}

fn handle_sidebar_mouse(model: &mut Model, mouse: MouseEvent) -> Vec<Command> {
    model.selection.clear();
    model.focus = Focus::Sidebar;
    model.resize_terminal_if_needed();

    match sidebar_hit_test(model, mouse.row) {
        SidebarHit::Session(idx) => {
            model.cursor = idx;
            model.adjust_scroll();
            model.switch_view_to_current_session()
        }
        SidebarHit::Archived => open_archived_overlay(model),
        SidebarHit::ScrollUp => sidebar_wheel_up(model),
        SidebarHit::ScrollDown => sidebar_wheel_down(model),
        SidebarHit::Tower | SidebarHit::Empty => Vec::new(),
    }
}

fn sidebar_wheel_up(model: &mut Model) -> Vec<Command> {
    if model.scroll_offset > 0 {
        model.scroll_offset -= 1;
        let max_visible = model.max_visible_sessions();
        if model.cursor >= model.scroll_offset + max_visible {
            model.cursor = model.scroll_offset + max_visible - 1;
        }
    }
    Vec::new()
}

fn sidebar_wheel_down(model: &mut Model) -> Vec<Command> {
    let active_len = model.active_sessions().len();
    let max_offset = active_len.saturating_sub(model.max_visible_sessions());
    if model.scroll_offset < max_offset {
        model.scroll_offset += 1;
        if model.cursor < model.scroll_offset {
            model.cursor = model.scroll_offset;
        }
    }
    Vec::new()
}

// --- Overlay mouse ---

fn handle_overlay_mouse(model: &mut Model, mouse: MouseEvent) -> Vec<Command> {
    let (start_row, start_col, height, width) = overlay::overlay_bounds(model);
    let inside = (mouse.column as usize) >= start_col
        && (mouse.column as usize) < start_col + width
        && (mouse.row as usize) >= start_row
        && (mouse.row as usize) < start_row + height;

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if !inside {
                return dismiss_overlay(model);
            }
            match model.overlay {
                Overlay::Help => {
                    model.overlay = Overlay::None;
                    Vec::new()
                }
                Overlay::SelectBaseBranch | Overlay::SelectExistingBranch => {
                    handle_branch_overlay_click(model, mouse, start_row)
                }
                Overlay::ArchivedSessions => {
                    handle_archived_overlay_click(model, mouse, start_row)
                }
                _ => Vec::new(),
            }
        }
        MouseEventKind::ScrollUp if inside => {
            match model.overlay {
                Overlay::SelectBaseBranch | Overlay::SelectExistingBranch => {
                    model.branch_cursor = model.branch_cursor.saturating_sub(1);
                }
                Overlay::ArchivedSessions => {
                    if model.archived_cursor > 0 {
                        model.archived_cursor -= 1;
                        if model.archived_cursor < model.archived_scroll_offset {
                            model.archived_scroll_offset = model.archived_cursor;
                        }
                    }
                }
                _ => {}
            }
            Vec::new()
        }
        MouseEventKind::ScrollDown if inside => {
            match model.overlay {
                Overlay::SelectBaseBranch => {
                    let total =
                        model.filtered_branches.len() + usize::from(model.show_head_option());
                    if model.branch_cursor + 1 < total {
                        model.branch_cursor += 1;
                    }
                }
                Overlay::SelectExistingBranch => {
                    if model.branch_cursor + 1 < model.filtered_branches.len() {
                        model.branch_cursor += 1;
                    }
                }
                Overlay::ArchivedSessions => {
                    if model.archived_cursor + 1 < model.archived_list.len() {
                        model.archived_cursor += 1;
                        if model.archived_cursor
                            >= model.archived_scroll_offset + ARCHIVED_MAX_VISIBLE
                        {
                            model.archived_scroll_offset =
                                model.archived_cursor + 1 - ARCHIVED_MAX_VISIBLE;
                        }
                    }
                }
                _ => {}
            }
            Vec::new()
        }
        _ => Vec::new(),
    }
}

/// Maps a click inside a branch-picker overlay onto a list row. The dialog
/// box contributes a border row and a padding row before the content.
fn handle_branch_overlay_click(model: &mut Model, mouse: MouseEvent, start_row: usize) -> Vec<Command> {
    let content_start = start_row + 2;
    let list_start = match model.overlay {
        // title + subtitle + blank + input + blank
        Overlay::SelectBaseBranch => content_start + 5,
        // title + blank + input + blank
        Overlay::SelectExistingBranch => content_start + 4,
        _ => return Vec::new(),
    };

    let Some(clicked) = (mouse.row as usize).checked_sub(list_start) else {
        return Vec::new();
    };

    if model.overlay == Overlay::SelectBaseBranch {
        let show_head = model.show_head_option();
        let total = model.filtered_branches.len() + usize::from(show_head);
        if total == 0 {
            return Vec::new();
        }
        let cursor_offset = usize::from(show_head);

        let branch_idx = model.branch_cursor.saturating_sub(cursor_offset);
        let mut start_idx = 0;
        if model.branch_cursor >= cursor_offset && branch_idx >= BRANCH_MAX_VISIBLE {
            start_idx = branch_idx + 1 - BRANCH_MAX_VISIBLE;
        }

        let mut line_offset = 0;
        if show_head {
            if clicked == 0 {
                model.branch_cursor = 0;
                return Vec::new();
            }
            line_offset = 1;
        }
        if start_idx > 0 {
            if clicked == line_offset {
                model.branch_cursor = model.branch_cursor.saturating_sub(1);
                return Vec::new();
            }
            line_offset += 1;
        }
        if let Some(item_idx) = clicked.checked_sub(line_offset) {
            if start_idx + item_idx < model.filtered_branches.len() {
                model.branch_cursor = (start_idx + item_idx + cursor_offset).min(total - 1);
            }
        }
    } else {
        let mut start_idx = 0;
        if model.branch_cursor >= BRANCH_MAX_VISIBLE {
            start_idx = model.branch_cursor + 1 - BRANCH_MAX_VISIBLE;
        }
        let end_idx = (start_idx + BRANCH_MAX_VISIBLE).min(model.filtered_branches.len());

        let mut line_offset = 0;
        if start_idx > 0 {
            if clicked == 0 {
                model.branch_cursor = model.branch_cursor.saturating_sub(1);
                return Vec::new();
            }
            line_offset = 1;
        }
        if let Some(item_idx) = clicked.checked_sub(line_offset) {
            if start_idx + item_idx < end_idx {
                model.branch_cursor = start_idx + item_idx;
            }
        }
    }

    Vec::new()
}

fn handle_archived_overlay_click(model: &mut Model, mouse: MouseEvent, start_row: usize) -> Vec<Command> {
    if model.archived_list.is_empty() {
        return Vec::new();
    }
    // border + padding + title + blank
    let list_start = start_row + 4;
    let Some(clicked) = (mouse.row as usize).checked_sub(list_start) else {
        return Vec::new();
    };

    let mut line_offset = 0;
    if model.archived_scroll_offset > 0 {
        if clicked == 0 {
            if model.archived_cursor > 0 {
                model.archived_cursor -= 1;
                if model.archived_cursor < model.archived_scroll_offset {
                    model.archived_scroll_offset = model.archived_cursor;
                }
            }
            return Vec::new();
        }
        line_offset = 1;
    }

    let end_idx =
        (model.archived_scroll_offset + ARCHIVED_MAX_VISIBLE).min(model.archived_list.len());
    if let Some(item_idx) = clicked.checked_sub(line_offset) {
        if model.archived_scroll_offset + item_idx < end_idx {
            model.archived_cursor = model.archived_scroll_offset + item_idx;
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use atc_core::{Session, SessionStatus};
    use std::path::PathBuf;
    use time::OffsetDateTime;

    fn session(name: &str, status: SessionStatus) -> Session {
        Session {
            id: format!("id-{name}"),
            name: name.to_owned(),
            repo_path: PathBuf::from("/repo"),
            repo_name: "repo".to_owned(),
            worktree_path: PathBuf::from(format!("/wt/{name}")),
            branch_name: name.to_owned(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            last_accessed: None,
            archived_at: None,
            status,
        }
    }

    fn model_with(sessions: Vec<Session>) -> Model {
        let mut model = Model::new("repo".to_owned(), "main".to_owned());
        model.window_width = 120;
        model.window_height = 40;
        model.sessions = sessions;
        model
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl_key(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    #[test]
    fn n_opens_the_create_overlay() {
        let mut m = model_with(vec![]);
        handle_event(&mut m, key(KeyCode::Char('n')));
        assert_eq!(m.overlay, Overlay::CreateSession);
    }

    #[test]
    fn q_quits_from_the_sidebar() {
        let mut m = model_with(vec![]);
        handle_event(&mut m, key(KeyCode::Char('q')));
        assert!(m.should_quit);
    }

    #[test]
    fn create_overlay_validates_the_name() {
        let mut m = model_with(vec![]);
        m.overlay = Overlay::CreateSession;

        // Empty name.
        let commands = handle_event(&mut m, key(KeyCode::Enter));
        assert!(commands.is_empty());
        assert!(m.err.is_some());

        // Invalid name.
        for c in "..bad".chars() {
            handle_event(&mut m, key(KeyCode::Char(c)));
        }
        handle_event(&mut m, key(KeyCode::Enter));
        assert!(m.err.is_some());
        assert_eq!(m.overlay, Overlay::CreateSession);
    }

    #[test]
    fn create_overlay_moves_to_base_branch_selection() {
        let mut m = model_with(vec![]);
        m.overlay = Overlay::CreateSession;
        for c in "feat-x".chars() {
            handle_event(&mut m, key(KeyCode::Char(c)));
        }
        let commands = handle_event(&mut m, key(KeyCode::Enter));
        assert_eq!(m.overlay, Overlay::SelectBaseBranch);
        assert_eq!(m.pending_session_name, "feat-x");
        assert!(matches!(commands[0], Command::LoadBranches));
    }

    #[test]
    fn base_branch_enter_creates_from_head_row() {
        let mut m = model_with(vec![]);
        m.overlay = Overlay::SelectBaseBranch;
        m.pending_session_name = "feat-x".to_owned();
        m.branches = vec!["main".to_owned()];
        m.filter_branches();
        m.branch_cursor = 0;

        let commands = handle_event(&mut m, key(KeyCode::Enter));
        assert_eq!(m.overlay, Overlay::Creating);
        assert!(matches!(
            &commands[0],
            Command::CreateSession { name, base_branch, use_existing }
                if name == "feat-x" && base_branch == "main" && !use_existing
        ));
    }

    #[test]
    fn existing_branch_with_session_requires_confirmation() {
        let mut m = model_with(vec![]);
        m.overlay = Overlay::SelectExistingBranch;
        m.branches = vec!["claimed".to_owned(), "free".to_owned()];
        m.branches_with_sessions.insert("claimed".to_owned());
        m.filter_branches();

        m.branch_cursor = 0;
        let commands = handle_event(&mut m, key(KeyCode::Enter));
        assert!(commands.is_empty());
        assert_eq!(m.overlay, Overlay::ConfirmBranchWithSession);
        assert_eq!(m.selected_branch_name, "claimed");

        m.overlay = Overlay::SelectExistingBranch;
        m.branch_cursor = 1;
        let commands = handle_event(&mut m, key(KeyCode::Enter));
        assert_eq!(m.overlay, Overlay::Creating);
        assert!(matches!(
            &commands[0],
            Command::CreateSession { name, use_existing, .. } if name == "free" && *use_existing
        ));
    }

    #[test]
    fn confirm_overlay_y_asks_for_a_new_name() {
        let mut m = model_with(vec![]);
        m.overlay = Overlay::ConfirmBranchWithSession;
        m.selected_branch_name = "claimed".to_owned();
        handle_event(&mut m, key(KeyCode::Char('y')));
        assert_eq!(m.overlay, Overlay::EnterNewSessionName);

        for c in "spin-off".chars() {
            handle_event(&mut m, key(KeyCode::Char(c)));
        }
        let commands = handle_event(&mut m, key(KeyCode::Enter));
        assert!(matches!(
            &commands[0],
            Command::CreateSession { name, base_branch, use_existing }
                if name == "spin-off" && base_branch == "claimed" && !use_existing
        ));
    }

    #[test]
    fn delete_confirm_takes_the_terminal_out_of_the_map() {
        let mut m = model_with(vec![session("feat-x", SessionStatus::Active)]);
        m.selected_session = Some(session("feat-x", SessionStatus::Active));
        m.overlay = Overlay::DeleteConfirm;

        let commands = handle_event(&mut m, key(KeyCode::Char('y')));
        assert!(matches!(
            &commands[0],
            Command::DeleteSession { name, terminal } if name == "feat-x" && terminal.is_none()
        ));
    }

    #[test]
    fn archive_key_emits_the_archive_command() {
        let mut m = model_with(vec![session("feat-x", SessionStatus::Active)]);
        let commands = handle_event(&mut m, key(KeyCode::Char('a')));
        assert!(matches!(
            &commands[0],
            Command::ArchiveSession { name } if name == "feat-x"
        ));
    }

    #[test]
    fn enter_on_the_archived_line_opens_the_overlay() {
        let mut m = model_with(vec![
            session("a", SessionStatus::Active),
            session("z", SessionStatus::Archived),
        ]);
        m.cursor = 1; // past the single active session
        handle_event(&mut m, key(KeyCode::Enter));
        assert_eq!(m.overlay, Overlay::ArchivedSessions);
        assert_eq!(m.archived_list.len(), 1);
    }

    #[test]
    fn archived_overlay_unarchives_and_deletes() {
        let mut m = model_with(vec![session("z", SessionStatus::Archived)]);
        m.archived_list = m.archived_sessions_list();
        m.overlay = Overlay::ArchivedSessions;

        let commands = handle_event(&mut m, key(KeyCode::Char('u')));
        assert!(matches!(
            &commands[0],
            Command::UnarchiveSession { name } if name == "z"
        ));

        handle_event(&mut m, key(KeyCode::Char('d')));
        assert_eq!(m.overlay, Overlay::DeleteConfirm);
        assert!(m.delete_from_archived);
    }

    #[test]
    fn escape_walks_back_through_the_creation_flow() {
        let mut m = model_with(vec![]);
        m.overlay = Overlay::EnterNewSessionName;
        handle_event(&mut m, key(KeyCode::Esc));
        assert_eq!(m.overlay, Overlay::SelectExistingBranch);
        handle_event(&mut m, key(KeyCode::Esc));
        assert_eq!(m.overlay, Overlay::CreateSession);
        handle_event(&mut m, key(KeyCode::Esc));
        assert_eq!(m.overlay, Overlay::None);
    }

    #[test]
    fn creating_overlay_swallows_input() {
        let mut m = model_with(vec![]);
        m.overlay = Overlay::Creating;
        let commands = handle_event(&mut m, key(KeyCode::Esc));
        assert!(commands.is_empty());
        assert_eq!(m.overlay, Overlay::Creating);
    }

    #[test]
    fn ctrl_c_quits_from_overlays() {
        let mut m = model_with(vec![]);
        m.overlay = Overlay::CreateSession;
        handle_event(&mut m, ctrl_key('c'));
        assert!(m.should_quit);
    }

    #[test]
    fn sidebar_hit_test_maps_rows() {
        let mut m = model_with(vec![
            session("a", SessionStatus::Active),
            session("b", SessionStatus::Active),
            session("z", SessionStatus::Archived),
        ]);
        m.window_height = 40;

        assert_eq!(sidebar_hit_test(&m, 0), SidebarHit::Tower);
        assert_eq!(sidebar_hit_test(&m, 7), SidebarHit::Tower);
        assert_eq!(sidebar_hit_test(&m, 8), SidebarHit::Session(0));
        assert_eq!(sidebar_hit_test(&m, 9), SidebarHit::Session(1));
        assert_eq!(sidebar_hit_test(&m, 10), SidebarHit::Archived);
        assert_eq!(sidebar_hit_test(&m, 11), SidebarHit::Empty);
    }

    #[test]
    fn sidebar_hit_test_accounts_for_scroll_indicators() {
        let sessions: Vec<Session> = (0..40)
            .map(|i| session(&format!("s{i}"), SessionStatus::Active))
            .collect();
        let mut m = model_with(sessions);
        m.window_height = 20; // max_visible = 10
        m.scroll_offset = 5;

        assert_eq!(sidebar_hit_test(&m, 8), SidebarHit::ScrollUp);
        assert_eq!(sidebar_hit_test(&m, 9), SidebarHit::Session(5));
        assert_eq!(sidebar_hit_test(&m, 18), SidebarHit::Session(14));
        assert_eq!(sidebar_hit_test(&m, 19), SidebarHit::ScrollDown);
    }

    #[test]
    fn key_translation_covers_modified_arrows() {
        let press = |code, mods| {
            key_event_to_press(&KeyEvent::new(code, mods)).expect("translation")
        };
        assert_eq!(press(KeyCode::Up, KeyModifiers::NONE).kind, KeyKind::Up);
        assert_eq!(
            press(KeyCode::Up, KeyModifiers::SHIFT).kind,
            KeyKind::ShiftUp
        );
        assert_eq!(
            press(KeyCode::Right, KeyModifiers::CONTROL).kind,
            KeyKind::CtrlRight
        );
        assert_eq!(
            press(KeyCode::Left, KeyModifiers::CONTROL | KeyModifiers::SHIFT).kind,
            KeyKind::CtrlShiftLeft
        );
        assert_eq!(
            press(KeyCode::Char('x'), KeyModifiers::ALT),
            KeyPress::runes("x", true)
        );
        assert_eq!(
            press(KeyCode::Char('a'), KeyModifiers::CONTROL).kind,
            KeyKind::Ctrl('a')
        );
        // The Tab/Enter overlaps resolve to the named keys.
        assert_eq!(
            press(KeyCode::Char('i'), KeyModifiers::CONTROL).kind,
            KeyKind::Tab
        );
        assert_eq!(
            press(KeyCode::Char('m'), KeyModifiers::CONTROL).kind,
            KeyKind::Enter
        );
        assert_eq!(press(KeyCode::F(5), KeyModifiers::NONE).kind, KeyKind::F(5));
    }
}
