use std::io::Write as _;

use atc_ansi::{apply_highlight_to_line, strip_ansi};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// How strongly selected cells are lightened.
pub const SELECTION_LIGHTEN_FACTOR: f64 = 0.35;

/// Mouse-drag text selection in terminal-pane coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub selecting: bool,
    pub has_selection: bool,
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl Selection {
    pub fn begin(&mut self, row: usize, col: usize) {
        *self = Self {
            selecting: true,
            has_selection: false,
            start_row: row,
            start_col: col,
            end_row: row,
            end_col: col,
        };
    }

    pub fn drag_to(&mut self, row: usize, col: usize) {
        self.end_row = row;
        self.end_col = col;
        self.has_selection = true;
    }

    pub fn clear(&mut self) {
        self.selecting = false;
        self.has_selection = false;
    }

    pub fn is_visible(&self) -> bool {
        self.selecting || self.has_selection
    }

    /// Selection coordinates with start ordered before end.
    pub fn normalized(&self) -> (usize, usize, usize, usize) {
        let (mut sr, mut sc) = (self.start_row, self.start_col);
        let (mut er, mut ec) = (self.end_row, self.end_col);
        if sr > er || (sr == er && sc > ec) {
            std::mem::swap(&mut sr, &mut er);
            std::mem::swap(&mut sc, &mut ec);
        }
        (sr, sc, er, ec)
    }
}

/// Overlays the lightened highlight on the selected region. The first row
/// starts at the selection's start column, the last row ends at its end
/// column, intermediate rows cover the full pane width, and rows whose
/// computed range inverts are skipped.
pub fn apply_selection_highlight(content: &str, selection: &Selection, term_width: usize) -> String {
    let mut lines: Vec<String> = content.split('\n').map(str::to_owned).collect();
    let (start_row, start_col, end_row, end_col) = selection.normalized();

    for (i, line) in lines
        .iter_mut()
        .enumerate()
        .take(end_row + 1)
        .skip(start_row)
    {
        let lsc = if i == start_row { start_col } else { 0 };
        let lec = if i == end_row {
            end_col
        } else {
            term_width.saturating_sub(1)
        };
        if lec < lsc {
            continue;
        }
        *line = apply_highlight_to_line(line, lsc, lec, SELECTION_LIGHTEN_FACTOR);
    }

    lines.join("\n")
}

/// Plain text of the selected region of `content`.
pub fn selected_text(content: &str, selection: &Selection) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let (start_row, start_col, end_row, end_col) = selection.normalized();

    let mut out = String::new();
    for (i, line) in lines
        .iter()
        .enumerate()
        .take(end_row + 1)
        .skip(start_row)
    {
        let stripped = strip_ansi(line);
        let runes: Vec<char> = stripped.chars().collect();

        let mut lsc = 0;
        let mut lec = runes.len();
        if i == start_row {
            lsc = start_col;
        }
        if i == end_row {
            lec = end_col + 1;
        }
        lsc = lsc.min(runes.len());
        lec = lec.min(runes.len());
        if lsc > lec {
            continue;
        }

        out.extend(&runes[lsc..lec]);
        if i < end_row {
            out.push('\n');
        }
    }
    out
}

/// Copies text to the system clipboard with the OSC 52 escape. The sequence
/// is interpreted by the local terminal emulator, so the copy works even
/// when this process runs over a remote shell.
pub fn copy_to_clipboard(text: &str) {
    if text.is_empty() {
        return;
    }
    let encoded = STANDARD.encode(text.as_bytes());
    let mut stderr = std::io::stderr();
    let _ = write!(stderr, "\x1b]52;c;{encoded}\x07");
    let _ = stderr.flush();
}

/// Word-character policy for double-click selection: identifiers, paths,
/// URLs and flags select as one word; brackets, quotes, commas and pipes
/// separate.
pub fn is_word_char(r: char) -> bool {
    if r.is_alphanumeric() || r == '_' {
        return true;
    }
    matches!(
        r,
        '-' | '.'
            | '/'
            | '+'
            | '~'
            | ':'
            | '@'
            | '#'
            | '$'
            | '%'
            | '^'
            | '&'
            | '*'
            | '='
            | '<'
            | '>'
            | '?'
            | '!'
            | ';'
            | '\\'
    )
}

/// Bounds (inclusive) of the run of same-class runes around `col`.
/// Out-of-range columns collapse to `(col, col)`.
pub fn word_bounds_at(runes: &[char], col: isize) -> (isize, isize) {
    if col < 0 || col as usize >= runes.len() {
        return (col, col);
    }
    let class = is_word_char(runes[col as usize]);
    let mut start = col;
    let mut end = col;
    while start > 0 && is_word_char(runes[(start - 1) as usize]) == class {
        start -= 1;
    }
    while ((end + 1) as usize) < runes.len() && is_word_char(runes[(end + 1) as usize]) == class {
        end += 1;
    }
    (start, end)
}
