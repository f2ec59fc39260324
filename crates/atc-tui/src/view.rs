use atc_ansi::{center_text, dim_ansi_colors, visible_width};

use crate::model::{Focus, Model, Overlay};
use crate::overlay;
use crate::selection::apply_selection_highlight;
use crate::styles::{
    pad_to_width, truncate_label, Style, BLACK, DANGER, PRIMARY, SIDEBAR_WIDTH, SUCCESS,
    TEXT_DIM, TEXT_MUTED, TEXT_NORMAL,
};

/// Dim factor applied to the terminal pane while the sidebar has focus.
const UNFOCUSED_DIM_FACTOR: f64 = 0.4;

/// Composes the full frame as one raw-ANSI string: sidebar joined with the
/// terminal pane, with any overlay centered on top.
pub fn compose_frame(model: &Model) -> String {
    if model.window_width == 0 || model.window_height == 0 {
        return "Loading...".to_owned();
    }

    let layout = if !model.sidebar_visible() {
        view_terminal(model)
    } else {
        join_horizontal(&view_sidebar(model), &view_terminal(model))
    };

    if model.overlay != Overlay::None {
        let overlay_content = overlay::view_overlay(model);
        if !overlay_content.is_empty() {
            return overlay::render_overlay_on_top(
                &layout,
                &overlay_content,
                model.window_width as usize,
                model.window_height as usize,
            );
        }
    }

    layout
}

/// Joins the sidebar and terminal pane line-by-line with a one-column
/// spacer. Sidebar lines are padded to the fixed sidebar width so terminal
/// content always starts at the same column.
fn join_horizontal(sidebar: &str, terminal: &str) -> String {
    let sidebar_lines: Vec<&str> = sidebar.split('\n').collect();
    let terminal_lines: Vec<&str> = terminal.split('\n').collect();
    let rows = sidebar_lines.len().max(terminal_lines.len());

    let mut out = Vec::with_capacity(rows);
    for i in 0..rows {
        let left = sidebar_lines.get(i).copied().unwrap_or("");
        let right = terminal_lines.get(i).copied().unwrap_or("");
        out.push(format!(
            "{} {right}",
            pad_to_width(left, SIDEBAR_WIDTH as usize)
        ));
    }
    out.join("\n")
}

fn view_terminal(model: &Model) -> String {
    let (tw, _) = model.terminal_pane_dimensions();
    let tw = tw as usize;

    if let Some(session) = &model.active_session {
        if let Some(terminal) = model.terminals.get(&session.name) {
            let mut rendered = terminal.render();
            if !terminal.is_running() {
                rendered.push_str("\n\n  Session ended. Press Enter to restart.");
            }

            // Scroll indicator pinned to the pane's top-right corner.
            let scroll_pos = terminal.scroll_position();
            if scroll_pos > 0 {
                let indicator = Style::fg(BLACK)
                    .bg(PRIMARY)
                    .bold()
                    .render(&format!(" SCROLL -{scroll_pos} "));
                let mut lines: Vec<String> = rendered.split('\n').map(str::to_owned).collect();
                if let Some(first) = lines.first_mut() {
                    let pad = tw.saturating_sub(visible_width(&indicator));
                    *first = format!("{}{indicator}", " ".repeat(pad));
                }
                rendered = lines.join("\n");
            }

            if model.selection.is_visible() {
                rendered = apply_selection_highlight(&rendered, &model.selection, tw);
            }

            // The pane dims when the sidebar has focus.
            if model.focus == Focus::Sidebar {
                rendered = dim_ansi_colors(&rendered, UNFOCUSED_DIM_FACTOR);
            }

            return rendered;
        }
    }

    let placeholder = if model.active_session.is_none() {
        Style::fg(TEXT_DIM)
            .italic()
            .render("Select a session or press 'n' to create one")
    } else {
        Style::fg(TEXT_DIM)
            .italic()
            .render("Press Enter to start session")
    };
    format!("\n\n{}", center_text(&placeholder, tw))
}

struct SidebarPalette {
    tower: Style,
    title: Style,
    version: Style,
    repo: Style,
    help_key: Style,
    help_desc: Style,
    border: Style,
}

fn sidebar_palette(focused: bool) -> SidebarPalette {
    if focused {
        SidebarPalette {
            tower: Style::fg(PRIMARY),
            title: Style::fg(TEXT_NORMAL).bold(),
            version: Style::fg(TEXT_MUTED),
            repo: Style::fg(PRIMARY),
            help_key: Style::fg(TEXT_NORMAL),
            help_desc: Style::fg(TEXT_MUTED),
            border: Style::fg(PRIMARY),
        }
    } else {
        SidebarPalette {
            tower: Style::fg(TEXT_MUTED),
            title: Style::fg(TEXT_MUTED),
            version: Style::fg(TEXT_DIM),
            repo: Style::fg(TEXT_MUTED),
            help_key: Style::fg(TEXT_MUTED),
            help_desc: Style::fg(TEXT_DIM),
            border: Style::fg(TEXT_DIM),
        }
    }
}

fn view_sidebar(model: &Model) -> String {
    let inner = SIDEBAR_WIDTH as usize - 2;
    let focused = model.focus == Focus::Sidebar;
    let p = sidebar_palette(focused);

    let help_item = |key: &str, desc: &str| {
        format!(
            "{}{}{} {}",
            p.help_desc.render("["),
            p.help_key.render(key),
            p.help_desc.render("]"),
            p.help_desc.render(desc)
        )
    };

    let mut lines: Vec<String> = Vec::with_capacity(model.window_height as usize);

    // Control-tower header with keyboard hints, outside the border.
    lines.push(String::new());
    lines.push(format!(
        "  {}   {}",
        p.tower.render(r"__\-----/__"),
        help_item("^C", "back to sidebar")
    ));
    lines.push(format!(
        "  {}    {}",
        p.tower.render(r"\         /"),
        help_item("n", " new session")
    ));
    lines.push(format!(
        "  {}{}{}     {}",
        p.tower.render(r" \  "),
        p.title.render("ATC"),
        p.tower.render(r"  /"),
        help_item("a", " archive")
    ));
    lines.push(format!(
        "  {}      {}",
        p.tower.render(r"  \  _  /"),
        help_item("?", " help")
    ));
    lines.push(format!(
        "  {}       {}",
        p.tower.render(r"   |   |"),
        p.version.render(env!("CARGO_PKG_VERSION"))
    ));
    lines.push(String::new());

    // Top border with the repo name embedded.
    let repo_name = if model.repo_name.is_empty() {
        "ATC"
    } else {
        &model.repo_name
    };
    let repo_label = truncate_label(repo_name, inner - 2);
    let fill = (inner - 2).saturating_sub(repo_label.chars().count());
    lines.push(format!(
        "{} {} {}",
        p.border.render("┌"),
        p.repo.render(&repo_label),
        p.border.render(&format!("{}┐", "─".repeat(fill)))
    ));

    // Bordered content rows.
    let mut content: Vec<String> = Vec::new();
    let active = model.active_sessions();
    let max_visible = model.max_visible_sessions();

    if active.is_empty() && model.archived_count() == 0 {
        content.push(Style::fg(TEXT_MUTED).render("No sessions"));
    } else {
        let end = (model.scroll_offset + max_visible).min(active.len());
        if model.scroll_offset > 0 {
            content.push(
                Style::fg(TEXT_MUTED).render(&format!("  ↑ {} more", model.scroll_offset)),
            );
        }
        for (i, session) in active.iter().enumerate().take(end).skip(model.scroll_offset) {
            content.push(render_sidebar_session(model, &session.name, i, inner, focused));
        }
        if end < active.len() {
            content.push(
                Style::fg(TEXT_MUTED).render(&format!("  ↓ {} more", active.len() - end)),
            );
        }
    }

    let archived = model.archived_count();
    if archived > 0 {
        let label = format!("({archived} archived)");
        let on_archived = model.cursor == active.len();
        let line = if on_archived {
            Style::fg(BLACK)
                .bg(TEXT_MUTED)
                .bold()
                .render_width(&format!(" {label}"), inner)
        } else if focused {
            Style::fg(TEXT_MUTED).render(&format!(" {label}"))
        } else {
            Style::fg(TEXT_DIM).render(&format!(" {label}"))
        };
        content.push(line);
    }

    // Fill to the bordered area's height, keeping room for the status bar.
    let tower_height = 8;
    let sidebar_height = (model.window_height as usize)
        .saturating_sub(tower_height + 1)
        .max(1);
    let status_lines = if model.err.is_some() || model.message.is_some() {
        2
    } else {
        0
    };
    let target = sidebar_height.saturating_sub(status_lines).max(content.len());
    while content.len() < target {
        content.push(String::new());
    }

    if let Some(err) = &model.err {
        content.push(Style::fg(TEXT_DIM).render(&"─".repeat(inner)));
        content.push(Style::fg(DANGER).bold().render(&truncate_label(err, inner)));
    } else if let Some(message) = &model.message {
        content.push(Style::fg(TEXT_DIM).render(&"─".repeat(inner)));
        content.push(Style::fg(SUCCESS).render(&truncate_label(message, inner)));
    }

    for row in content {
        lines.push(format!(
            "{}{}{}",
            p.border.render("│"),
            pad_to_width(&row, inner),
            p.border.render("│")
        ));
    }
    lines.push(p.border.render(&format!("└{}┘", "─".repeat(inner))));

    lines
        .into_iter()
        .map(|line| pad_to_width(&line, SIDEBAR_WIDTH as usize))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_sidebar_session(
    model: &Model,
    name: &str,
    index: usize,
    width: usize,
    focused: bool,
) -> String {
    let selected = model.cursor == index;
    let prefix = if model.setting_up.contains(name) {
        format!(" {} ", model.spinner())
    } else {
        " ".to_owned()
    };
    let label = truncate_label(name, width.saturating_sub(prefix.chars().count() + 1));
    let text = format!("{prefix}{label}");

    match (focused, selected) {
        (true, true) => Style::fg(BLACK).bg(PRIMARY).bold().render_width(&text, width),
        (true, false) => Style::fg(TEXT_NORMAL).render(&text),
        (false, true) => Style::fg(BLACK).bg(TEXT_DIM).bold().render_width(&text, width),
        (false, false) => Style::fg(TEXT_MUTED).render(&text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atc_ansi::strip_ansi;
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

    fn model() -> Model {
        let mut model = Model::new("repo".to_owned(), "main".to_owned());
        model.window_width = 120;
        model.window_height = 24;
        model
    }

    #[test]
    fn sidebar_lines_are_exactly_sidebar_width() {
        let mut m = model();
        m.sessions = vec![
            session("feat-x", SessionStatus::Active),
            session("old", SessionStatus::Archived),
        ];
        let sidebar = view_sidebar(&m);
        for line in sidebar.split('\n') {
            assert_eq!(
                visible_width(line),
                SIDEBAR_WIDTH as usize,
                "line {line:?}"
            );
        }
    }

    #[test]
    fn sidebar_shows_sessions_repo_and_archived_count() {
        let mut m = model();
        m.sessions = vec![
            session("feat-x", SessionStatus::Active),
            session("old", SessionStatus::Archived),
        ];
        let plain = strip_ansi(&view_sidebar(&m));
        assert!(plain.contains("repo"), "{plain}");
        assert!(plain.contains("feat-x"), "{plain}");
        assert!(plain.contains("(1 archived)"), "{plain}");
        assert!(!plain.contains("old\n"), "{plain}");
    }

    #[test]
    fn sidebar_windows_long_session_lists() {
        let mut m = model();
        m.window_height = 16; // max_visible = 6
        m.sessions = (0..20)
            .map(|i| session(&format!("s{i:02}"), SessionStatus::Active))
            .collect();
        m.cursor = 10;
        m.scroll_offset = 7;

        let plain = strip_ansi(&view_sidebar(&m));
        assert!(plain.contains("↑ 7 more"), "{plain}");
        assert!(plain.contains("↓ 7 more"), "{plain}");
        assert!(plain.contains("s07"), "{plain}");
        assert!(!plain.contains("s02"), "{plain}");
    }

    #[test]
    fn status_bar_renders_errors_over_messages() {
        let mut m = model();
        m.err = Some("boom".to_owned());
        m.message = Some("fine".to_owned());
        let plain = strip_ansi(&view_sidebar(&m));
        assert!(plain.contains("boom"), "{plain}");
        assert!(!plain.contains("fine"), "{plain}");
    }

    #[test]
    fn placeholder_invites_session_creation() {
        let m = model();
        let plain = strip_ansi(&view_terminal(&m));
        assert!(plain.contains("press 'n' to create one"), "{plain}");
    }

    #[test]
    fn frame_joins_sidebar_and_pane_with_a_spacer() {
        let mut m = model();
        m.sessions = vec![session("feat-x", SessionStatus::Active)];
        let frame = compose_frame(&m);
        let first = frame.split('\n').nth(2).expect("line");
        // Sidebar column + spacer; pane content starts at column 37.
        assert!(visible_width(first) >= SIDEBAR_WIDTH as usize);
    }

    #[test]
    fn narrow_focused_terminal_drops_the_sidebar() {
        let mut m = model();
        m.window_width = 80;
        m.focus = Focus::Terminal;
        m.sessions = vec![session("feat-x", SessionStatus::Active)];
        let frame = compose_frame(&m);
        assert!(!strip_ansi(&frame).contains("ATC"), "{frame}");
    }
}
