use crate::token::{AnsiToken, AnsiTokenizer};

/// Removes every escape sequence, leaving only the visible runes.
pub fn strip_ansi(s: &str) -> String {
    AnsiTokenizer::new(s)
        .filter_map(|token| match token {
            AnsiToken::Rune(r) => Some(r),
            _ => None,
        })
        .collect()
}

/// Number of visible columns in the string.
pub fn visible_width(s: &str) -> usize {
    AnsiTokenizer::new(s)
        .filter(|token| matches!(token, AnsiToken::Rune(_)))
        .count()
}

/// Returns the first `max_cols` visible columns of `s`, preserving every
/// ANSI escape sequence encountered along the way.
pub fn truncate_ansi(s: &str, max_cols: usize) -> String {
    let mut out = String::with_capacity(s.len().min(max_cols + 16));
    let mut cols = 0usize;
    for token in AnsiTokenizer::new(s) {
        match token {
            AnsiToken::Rune(r) => {
                if cols >= max_cols {
                    break;
                }
                out.push(r);
                cols += 1;
            }
            other => out.push_str(other.raw().unwrap_or_default()),
        }
    }
    out
}

/// Skips past the first `cols` visible columns of `s` and returns the
/// remainder, including any escape sequences after the skip point.
pub fn skip_ansi(s: &str, cols: usize) -> String {
    if cols == 0 {
        return s.to_owned();
    }
    let mut seen = 0usize;
    let mut consumed = 0usize;
    for token in AnsiTokenizer::new(s) {
        match token {
            AnsiToken::Rune(r) => {
                seen += 1;
                consumed += r.len_utf8();
            }
            other => consumed += other.raw().map_or(0, str::len),
        }
        if seen >= cols {
            return s[consumed..].to_owned();
        }
    }
    String::new()
}

/// Centers a string inside `width` visible columns by left-padding.
pub fn center_text(s: &str, width: usize) -> String {
    let w = visible_width(s);
    if w >= width {
        return s.to_owned();
    }
    format!("{}{s}", " ".repeat((width - w) / 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_removes_sgr_and_osc() {
        assert_eq!(strip_ansi("\x1b[31mred\x1b[0m"), "red");
        assert_eq!(strip_ansi("\x1b]8;;x\x07link"), "link");
        assert_eq!(strip_ansi("\x1b(0ab"), "ab");
        assert_eq!(strip_ansi("plain"), "plain");
    }

    #[test]
    fn width_counts_visible_runes_only() {
        assert_eq!(visible_width("\x1b[1;31mabc\x1b[0m"), 3);
        assert_eq!(visible_width("héllo"), 5);
        assert_eq!(visible_width(""), 0);
    }

    #[test]
    fn truncate_keeps_escapes_before_the_cut() {
        assert_eq!(truncate_ansi("\x1b[31mabcdef", 3), "\x1b[31mabc");
        assert_eq!(truncate_ansi("ab\x1b[1mcd", 10), "ab\x1b[1mcd");
        assert_eq!(truncate_ansi("abc", 0), "");
    }

    #[test]
    fn skip_drops_leading_columns_but_keeps_the_tail_bytes() {
        assert_eq!(skip_ansi("abcdef", 2), "cdef");
        // Escapes before the skip point are dropped; those after survive.
        assert_eq!(skip_ansi("\x1b[31mab\x1b[0mcd", 2), "\x1b[0mcd");
        assert_eq!(skip_ansi("ab", 5), "");
        assert_eq!(skip_ansi("ab", 0), "ab");
    }

    #[test]
    fn truncate_then_skip_reassembles_the_line() {
        let line = "\x1b[31mhello \x1b[42mworld\x1b[0m!";
        let left = truncate_ansi(line, 4);
        let right = skip_ansi(line, 4);
        assert_eq!(strip_ansi(&format!("{left}{right}")), strip_ansi(line));
    }

    #[test]
    fn center_pads_to_half_the_slack() {
        assert_eq!(center_text("ab", 6), "  ab");
        assert_eq!(center_text("abcdef", 4), "abcdef");
    }
}
