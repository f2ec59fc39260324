use std::fmt::Write as _;

use atc_ansi::{truncate_ansi, visible_width, Rgb};

/// Sidebar visual width, borders included.
pub const SIDEBAR_WIDTH: u16 = 36;
/// Below this terminal width the sidebar hides while the terminal has focus.
pub const SMALL_SCREEN_THRESHOLD: u16 = 100;

// Color palette. Non-monochrome: primary, success, danger.
// Focus mapping when the sidebar loses focus:
//   primary -> TEXT_MUTED, TEXT_NORMAL -> TEXT_MUTED, TEXT_MUTED -> TEXT_DIM.
pub const PRIMARY: Rgb = (0, 212, 255);
pub const SUCCESS: Rgb = (0, 255, 135);
pub const DANGER: Rgb = (255, 95, 95);
pub const TEXT_NORMAL: Rgb = (228, 228, 228);
pub const TEXT_MUTED: Rgb = (108, 117, 125);
pub const TEXT_DIM: Rgb = (73, 80, 87);
pub const BLACK: Rgb = (0, 0, 0);

/// Minimal SGR-emitting text style. The whole frame is composed as a raw
/// ANSI string, so styles render straight to escape sequences instead of
/// going through a cell buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Style {
    fg: Option<Rgb>,
    bg: Option<Rgb>,
    bold: bool,
    italic: bool,
}

impl Style {
    pub fn fg(rgb: Rgb) -> Self {
        Self {
            fg: Some(rgb),
            ..Self::default()
        }
    }

    pub fn bg(mut self, rgb: Rgb) -> Self {
        self.bg = Some(rgb);
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn render(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + 32);
        if self.bold {
            out.push_str("\x1b[1m");
        }
        if self.italic {
            out.push_str("\x1b[3m");
        }
        if let Some((r, g, b)) = self.fg {
            let _ = write!(out, "\x1b[38;2;{r};{g};{b}m");
        }
        if let Some((r, g, b)) = self.bg {
            let _ = write!(out, "\x1b[48;2;{r};{g};{b}m");
        }
        out.push_str(text);
        out.push_str("\x1b[0m");
        out
    }

    /// Renders `text` padded (or truncated) to an exact visible width, so
    /// background colors cover the full row.
    pub fn render_width(&self, text: &str, width: usize) -> String {
        self.render(&pad_to_width(text, width))
    }
}

/// Pads with spaces (or truncates) to exactly `width` visible columns.
pub fn pad_to_width(s: &str, width: usize) -> String {
    let w = visible_width(s);
    if w > width {
        return truncate_ansi(s, width);
    }
    format!("{s}{}", " ".repeat(width - w))
}

/// Shortens a plain string to `max_len` runes, ellipsized.
pub fn truncate_label(s: &str, max_len: usize) -> String {
    let runes: Vec<char> = s.chars().collect();
    if runes.len() <= max_len {
        return s.to_owned();
    }
    if max_len <= 3 {
        return runes[..max_len].iter().collect();
    }
    let mut out: String = runes[..max_len - 3].iter().collect();
    out.push_str("...");
    out
}

pub const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
