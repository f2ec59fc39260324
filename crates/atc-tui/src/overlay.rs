use atc_ansi::{skip_ansi, truncate_ansi, visible_width};

use crate::model::{Model, Overlay};
use crate::styles::{pad_to_width, Style, BLACK, DANGER, PRIMARY, TEXT_MUTED, TEXT_NORMAL};

const LIST_MAX_VISIBLE: usize = 10;

pub fn view_overlay(model: &Model) -> String {
    match model.overlay {
        Overlay::None => String::new(),
        Overlay::CreateSession => view_create_session(model),
        Overlay::SelectBaseBranch => view_select_base_branch(model),
        Overlay::SelectExistingBranch => view_select_existing_branch(model),
        Overlay::ConfirmBranchWithSession => view_confirm_branch(model),
        Overlay::EnterNewSessionName => view_enter_new_session_name(model),
        Overlay::DeleteConfirm => view_delete_confirm(model),
        Overlay::Help => view_help(),
        Overlay::Creating => view_creating(model),
        Overlay::ArchivedSessions => view_archived(model),
    }
}

/// Centered position and dimensions of the current overlay:
/// `(start_row, start_col, height, width)`.
pub fn overlay_bounds(model: &Model) -> (usize, usize, usize, usize) {
    let overlay = view_overlay(model);
    if overlay.is_empty() {
        return (0, 0, 0, 0);
    }
    let lines: Vec<&str> = overlay.split('\n').collect();
    let height = lines.len();
    let width = lines.iter().map(|l| visible_width(l)).max().unwrap_or(0);
    let start_row = (model.window_height as usize).saturating_sub(height) / 2;
    let start_col = (model.window_width as usize).saturating_sub(width) / 2;
    (start_row, start_col, height, width)
}

/// Centers the overlay on top of the background frame, preserving the
/// visible background on both sides of every covered row: each composite
/// row is the first `start_col` background columns, the padded overlay
/// line, then the background skipped past the overlay's right edge.
pub fn render_overlay_on_top(
    background: &str,
    overlay: &str,
    width: usize,
    height: usize,
) -> String {
    let mut bg_lines: Vec<String> = background.split('\n').map(str::to_owned).collect();
    let ol_lines: Vec<&str> = overlay.split('\n').collect();

    let ol_width = ol_lines.iter().map(|l| visible_width(l)).max().unwrap_or(0);
    let start_row = height.saturating_sub(ol_lines.len()) / 2;
    let start_col = width.saturating_sub(ol_width) / 2;

    while bg_lines.len() < height {
        bg_lines.push(String::new());
    }

    for (i, ol_line) in ol_lines.iter().enumerate() {
        let row = start_row + i;
        if row >= bg_lines.len() {
            break;
        }
        let mut left = truncate_ansi(&bg_lines[row], start_col);
        let left_width = visible_width(&left);
        if left_width < start_col {
            left.push_str(&" ".repeat(start_col - left_width));
        }
        let padded = pad_to_width(ol_line, ol_width);
        let right = skip_ansi(&bg_lines[row], start_col + ol_width);
        bg_lines[row] = format!("{left}{padded}{right}");
    }

    bg_lines.truncate(height);
    bg_lines.join("\n")
}

/// Wraps dialog content in a bordered box with one row of vertical and two
/// columns of horizontal padding.
fn dialog_box(content: &str) -> String {
    let border = Style::fg(PRIMARY);
    let lines: Vec<&str> = content.split('\n').collect();
    let inner = lines.iter().map(|l| visible_width(l)).max().unwrap_or(0);
    let total = inner + 4;

    let mut out = Vec::with_capacity(lines.len() + 4);
    out.push(border.render(&format!("┌{}┐", "─".repeat(total))));
    out.push(format!(
        "{}{}{}",
        border.render("│"),
        " ".repeat(total),
        border.render("│")
    ));
    for line in &lines {
        out.push(format!(
            "{}  {}  {}",
            border.render("│"),
            pad_to_width(line, inner),
            border.render("│")
        ));
    }
    out.push(format!(
        "{}{}{}",
        border.render("│"),
        " ".repeat(total),
        border.render("│")
    ));
    out.push(border.render(&format!("└{}┘", "─".repeat(total))));
    out.join("\n")
}

fn title(text: &str) -> String {
    Style::fg(PRIMARY).bold().render(text)
}

fn danger_title(text: &str) -> String {
    Style::fg(DANGER).bold().render(text)
}

fn dialog_text(text: &str) -> String {
    Style::fg(TEXT_NORMAL).render(text)
}

fn help_line(text: &str) -> String {
    Style::fg(TEXT_MUTED).render(text)
}

fn muted(text: &str) -> String {
    Style::fg(TEXT_MUTED).render(text)
}

fn selected_item(text: &str, width: usize) -> String {
    Style::fg(BLACK)
        .bg(PRIMARY)
        .bold()
        .render_width(&format!(" {text} "), width)
}

fn normal_item(text: &str, width: usize) -> String {
    Style::fg(TEXT_NORMAL).render_width(&format!(" {text} "), width)
}

fn view_create_session(model: &Model) -> String {
    let mut lines = vec![
        title("New Session"),
        String::new(),
        dialog_text("Session name:"),
        model.create_input.view(),
        String::new(),
    ];
    if let Some(err) = &model.err {
        lines.push(Style::fg(DANGER).bold().render(err));
        lines.push(String::new());
    }
    lines.push(help_line("[Enter] Next  [^B] From branch  [Esc] Cancel"));
    dialog_box(&lines.join("\n"))
}

fn view_select_base_branch(model: &Model) -> String {
    let help_text = "[↑/↓] Navigate  [Enter] Select  [Esc] Back";
    let mut lines = vec![
        title(&format!("Creating \"{}\"", model.pending_session_name)),
        Style::fg(TEXT_MUTED).render("Select base branch:"),
        String::new(),
        model.branch_input.view(),
        String::new(),
    ];

    let show_head = model.show_head_option();
    let cursor_offset = usize::from(show_head);
    let branch_idx = model.branch_cursor.saturating_sub(cursor_offset);
    let mut start_idx = 0;
    if model.branch_cursor >= cursor_offset && branch_idx >= LIST_MAX_VISIBLE {
        start_idx = branch_idx + 1 - LIST_MAX_VISIBLE;
    }
    let end_idx = (start_idx + LIST_MAX_VISIBLE).min(model.filtered_branches.len());

    // Full-width row highlight matched to the widest dialog element.
    let mut item_width = help_text.chars().count();
    if show_head {
        item_width = item_width.max(format!("HEAD ({})", model.current_branch).chars().count() + 2);
    }
    for branch in &model.filtered_branches[start_idx..end_idx] {
        item_width = item_width.max(branch.chars().count() + 2);
    }

    if show_head {
        let head_label = format!("HEAD ({})", model.current_branch);
        if model.branch_cursor == 0 {
            lines.push(selected_item(&head_label, item_width));
        } else {
            lines.push(normal_item(&head_label, item_width));
        }
    }
    if start_idx > 0 {
        lines.push(muted(&format!("  ↑ {start_idx} more")));
    }
    for (i, branch) in model.filtered_branches[start_idx..end_idx].iter().enumerate() {
        let pos = start_idx + i + cursor_offset;
        if model.branch_cursor == pos {
            lines.push(selected_item(branch, item_width));
        } else {
            lines.push(normal_item(branch, item_width));
        }
    }
    if end_idx < model.filtered_branches.len() {
        lines.push(muted(&format!(
            "  ↓ {} more",
            model.filtered_branches.len() - end_idx
        )));
    }

    lines.push(String::new());
    lines.push(help_line(help_text));
    dialog_box(&lines.join("\n"))
}

fn view_select_existing_branch(model: &Model) -> String {
    let help_text = "[↑/↓] Navigate  [Enter] Select  [Esc] Back  + has session";
    let mut lines = vec![
        title("From existing branch"),
        String::new(),
        model.branch_input.view(),
        String::new(),
    ];

    if model.filtered_branches.is_empty() {
        lines.push(muted("  No branches match filter"));
    } else {
        let mut start_idx = 0;
        if model.branch_cursor >= LIST_MAX_VISIBLE {
            start_idx = model.branch_cursor + 1 - LIST_MAX_VISIBLE;
        }
        let end_idx = (start_idx + LIST_MAX_VISIBLE).min(model.filtered_branches.len());

        let mut item_width = help_text.chars().count();
        for branch in &model.filtered_branches[start_idx..end_idx] {
            // Reserve room for the " +" marker on claimed branches.
            item_width = item_width.max(branch.chars().count() + 4);
        }

        if start_idx > 0 {
            lines.push(muted(&format!("  ↑ {start_idx} more")));
        }
        for (i, branch) in model.filtered_branches[start_idx..end_idx].iter().enumerate() {
            let mut label = branch.clone();
            if model.branches_with_sessions.contains(branch) {
                let content_width = item_width - 2;
                let pad = content_width
                    .saturating_sub(branch.chars().count() + 1)
                    .max(1);
                label = format!("{branch}{}+", " ".repeat(pad));
            }
            if model.branch_cursor == start_idx + i {
                lines.push(selected_item(&label, item_width));
            } else {
                lines.push(normal_item(&label, item_width));
            }
        }
        if end_idx < model.filtered_branches.len() {
            lines.push(muted(&format!(
                "  ↓ {} more",
                model.filtered_branches.len() - end_idx
            )));
        }
    }

    lines.push(String::new());
    lines.push(help_line(help_text));
    dialog_box(&lines.join("\n"))
}

fn view_confirm_branch(model: &Model) -> String {
    let lines = vec![
        danger_title("Branch Has Existing Session"),
        String::new(),
        dialog_text(&format!(
            "Branch \"{}\" already has a session.",
            model.selected_branch_name
        )),
        String::new(),
        dialog_text("Create a new session branching from it?"),
        String::new(),
        dialog_text("[Y] Yes    [N] Cancel"),
    ];
    dialog_box(&lines.join("\n"))
}

fn view_enter_new_session_name(model: &Model) -> String {
    let mut lines = vec![
        title(&format!(
            "New session from \"{}\"",
            model.selected_branch_name
        )),
        String::new(),
        dialog_text("Session name:"),
        model.new_session_input.view(),
    ];
    if let Some(err) = &model.err {
        lines.push(String::new());
        lines.push(Style::fg(DANGER).bold().render(err));
    }
    lines.push(String::new());
    lines.push(help_line("[Enter] Create  [Esc] Back"));
    dialog_box(&lines.join("\n"))
}

fn view_delete_confirm(model: &Model) -> String {
    let Some(session) = &model.selected_session else {
        return String::new();
    };
    let lines = vec![
        danger_title("Delete Session"),
        String::new(),
        dialog_text(&format!("Delete \"{}\"?", session.name)),
        String::new(),
        dialog_text("This will:"),
        dialog_text("  - Kill the agent process (if running)"),
        dialog_text("  - Remove the git worktree"),
        dialog_text("  - Delete all local changes"),
        String::new(),
        Style::fg(DANGER).render("This cannot be undone."),
        String::new(),
        dialog_text("[Y] Yes, delete    [N] Cancel"),
    ];
    dialog_box(&lines.join("\n"))
}

fn view_help() -> String {
    let lines = vec![
        title("Keyboard Shortcuts"),
        String::new(),
        dialog_text("Sidebar:"),
        dialog_text("  j/k or ↑/↓  Navigate sessions"),
        dialog_text("  Enter        Start/resume session"),
        dialog_text("  n            New session"),
        dialog_text("  d            Delete session"),
        dialog_text("  a            Archive session"),
        dialog_text("  q            Quit ATC"),
        String::new(),
        dialog_text("Terminal:"),
        dialog_text("  All keys forwarded to the agent"),
        dialog_text("  Scroll/PgUp  Scroll up (enter scroll mode)"),
        dialog_text("  Scroll/PgDn  Scroll down (any key exits)"),
        dialog_text("  Click+drag   Select text (copies to clipboard)"),
        String::new(),
        dialog_text("Global:"),
        dialog_text("  Ctrl+C       Back to sidebar (from terminal)"),
        String::new(),
        help_line("Press Esc or ? to close"),
    ];
    dialog_box(&lines.join("\n"))
}

fn view_creating(model: &Model) -> String {
    let lines = vec![
        title("Creating Session"),
        String::new(),
        format!(
            "{} Creating \"{}\"...",
            model.spinner(),
            model.pending_session_name
        ),
    ];
    dialog_box(&lines.join("\n"))
}

fn view_archived(model: &Model) -> String {
    let help_text = "[↑/↓] Navigate  [u] Unarchive  [d] Delete  [Esc] Close";
    let mut lines = vec![title("Archived Sessions"), String::new()];

    if model.archived_list.is_empty() {
        lines.push(muted("No archived sessions"));
    } else {
        let end_idx =
            (model.archived_scroll_offset + LIST_MAX_VISIBLE).min(model.archived_list.len());

        let mut item_width = help_text.chars().count();
        for session in &model.archived_list[model.archived_scroll_offset..end_idx] {
            item_width = item_width.max(session.name.chars().count() + 2);
        }

        if model.archived_scroll_offset > 0 {
            lines.push(muted(&format!("  ↑ {} more", model.archived_scroll_offset)));
        }
        for (i, session) in model.archived_list[model.archived_scroll_offset..end_idx]
            .iter()
            .enumerate()
        {
            let idx = model.archived_scroll_offset + i;
            if idx == model.archived_cursor {
                lines.push(selected_item(&session.name, item_width));
            } else {
                lines.push(normal_item(&session.name, item_width));
            }
        }
        if end_idx < model.archived_list.len() {
            lines.push(muted(&format!(
                "  ↓ {} more",
                model.archived_list.len() - end_idx
            )));
        }
    }

    lines.push(String::new());
    lines.push(help_line(help_text));
    dialog_box(&lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use atc_ansi::strip_ansi;

    #[test]
    fn composite_preserves_background_outside_the_overlay() {
        let background = (0..10)
            .map(|i| format!("{}", format!("{i}").repeat(40)))
            .collect::<Vec<_>>()
            .join("\n");
        let overlay = "XXXX\nXXXX";

        let composed = render_overlay_on_top(&background, overlay, 40, 10);
        let lines: Vec<&str> = composed.split('\n').collect();
        assert_eq!(lines.len(), 10);

        // Overlay is centered: rows 4-5, columns 18-21.
        for (i, line) in lines.iter().enumerate() {
            let plain = strip_ansi(line);
            if i == 4 || i == 5 {
                assert_eq!(&plain[..18], &format!("{i}").repeat(18), "row {i}");
                assert_eq!(&plain[18..22], "XXXX", "row {i}");
                assert_eq!(&plain[22..], &format!("{i}").repeat(18), "row {i}");
            } else {
                assert_eq!(plain, format!("{i}").repeat(40), "row {i}");
            }
        }
    }

    #[test]
    fn composite_pads_short_background_lines() {
        let background = "ab\ncd\nef\ngh";
        let composed = render_overlay_on_top(background, "XX", 10, 4);
        let lines: Vec<&str> = composed.split('\n').collect();
        // Overlay lands on row 1 at column 4, past the background content.
        assert_eq!(strip_ansi(lines[1]), "cd  XX");
        assert_eq!(strip_ansi(lines[0]), "ab");
    }

    #[test]
    fn composite_keeps_ansi_sequences_on_both_sides() {
        let background = "\x1b[31maaaaaaaaaa\x1b[0m";
        let composed = render_overlay_on_top(background, "XX", 10, 1);
        // Left keeps the color start; right keeps the reset.
        assert!(composed.contains("\x1b[31m"), "{composed:?}");
        assert!(composed.contains("\x1b[0m"), "{composed:?}");
        assert_eq!(strip_ansi(&composed), "aaaaXXaaaa");
    }

    #[test]
    fn dialog_box_is_rectangular() {
        let boxed = dialog_box("short\na much longer line");
        let widths: Vec<usize> = boxed.split('\n').map(|l| visible_width(l)).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]), "{widths:?}");
        // border(2) + padding(4) + content(18)
        assert_eq!(widths[0], 24);
    }
}
