use std::fmt::Write as _;

use crate::palette::Rgb;
use crate::state::ColorState;
use crate::token::{AnsiToken, AnsiTokenizer};

const DEFAULT_FG: Rgb = (229, 229, 229);
const DEFAULT_BG: Rgb = (0, 0, 0);

/// Blends a color toward white by the given factor (0.0-1.0). Factor 0.35
/// makes colors noticeably lighter while staying distinguishable.
pub fn lighten_rgb(rgb: Rgb, factor: f64) -> Rgb {
    let lift = |c: u8| c + (f64::from(255 - c) * factor) as u8;
    (lift(rgb.0), lift(rgb.1), lift(rgb.2))
}

/// Applies a lighten-based highlight to visible columns
/// `[start_col, end_col]` (inclusive) of a line that may contain ANSI
/// escapes. If `end_col` extends beyond the line content, the remainder is
/// padded with highlighted spaces.
pub fn apply_highlight_to_line(line: &str, start_col: usize, end_col: usize, factor: f64) -> String {
    let mut out = String::with_capacity(line.len() + 128);
    let mut state = ColorState::default();
    let mut vis_col = 0usize;
    let mut in_highlight = false;

    for token in AnsiTokenizer::new(line) {
        match token {
            AnsiToken::Rune(r) => {
                if !in_highlight && vis_col >= start_col && vis_col <= end_col {
                    emit_highlight_sgr(&mut out, &state, factor);
                    in_highlight = true;
                }
                out.push(r);
                vis_col += 1;
                if in_highlight && vis_col > end_col {
                    emit_restore_sgr(&mut out, &state);
                    in_highlight = false;
                }
            }
            AnsiToken::Sgr { raw, params } => {
                out.push_str(raw);
                state.apply_sgr(params);
                // A style change inside the selection would override the
                // highlight; re-emit the lightened pair right after it.
                if in_highlight {
                    emit_highlight_sgr(&mut out, &state, factor);
                }
            }
            other => out.push_str(other.raw().unwrap_or_default()),
        }
    }

    // Pad with highlighted spaces when the selection runs past the content.
    if end_col >= vis_col {
        if !in_highlight {
            emit_highlight_sgr(&mut out, &state, factor);
            in_highlight = true;
        }
        while vis_col <= end_col {
            out.push(' ');
            vis_col += 1;
        }
    }

    if in_highlight {
        emit_restore_sgr(&mut out, &state);
    }

    out
}

/// Emits an SGR pair that sets both fg and bg to lightened versions of the
/// current colors.
fn emit_highlight_sgr(out: &mut String, state: &ColorState, factor: f64) {
    let (fr, fg, fb) = lighten_rgb(state.fg.unwrap_or(DEFAULT_FG), factor);
    let (br, bg, bb) = lighten_rgb(state.bg.unwrap_or(DEFAULT_BG), factor);
    let _ = write!(out, "\x1b[38;2;{fr};{fg};{fb}m\x1b[48;2;{br};{bg};{bb}m");
}

/// Restores the original (non-lightened) colors after exiting the selection
/// region, falling back to the terminal defaults (39/49) when unset.
fn emit_restore_sgr(out: &mut String, state: &ColorState) {
    match state.fg {
        Some((r, g, b)) => {
            let _ = write!(out, "\x1b[38;2;{r};{g};{b}m");
        }
        None => out.push_str("\x1b[39m"),
    }
    match state.bg {
        Some((r, g, b)) => {
            let _ = write!(out, "\x1b[48;2;{r};{g};{b}m");
        }
        None => out.push_str("\x1b[49m"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::strip_ansi;

    #[test]
    fn lighten_blends_toward_white() {
        assert_eq!(lighten_rgb((0, 0, 0), 0.35), (89, 89, 89));
        assert_eq!(lighten_rgb((255, 255, 255), 0.35), (255, 255, 255));
        assert_eq!(lighten_rgb((200, 0, 0), 0.5), (227, 127, 127));
        assert_eq!(lighten_rgb((100, 50, 25), 0.0), (100, 50, 25));
    }

    #[test]
    fn plain_text_highlight_uses_truecolor_not_reverse_video() {
        let result = apply_highlight_to_line("hello world", 0, 4, 0.35);
        assert!(result.contains("hello"), "{result:?}");
        assert!(result.contains("\x1b[38;2;"), "{result:?}");
        assert!(result.contains("\x1b[48;2;"), "{result:?}");
        assert!(!result.contains("\x1b[7m"), "{result:?}");
        assert!(result.contains("world"), "{result:?}");
    }

    #[test]
    fn colored_text_is_lightened_from_its_own_color() {
        let result = apply_highlight_to_line("\x1b[38;2;200;0;0mred text", 0, 2, 0.35);
        // Original SGR survives.
        assert!(result.contains("\x1b[38;2;200;0;0m"), "{result:?}");
        // Lightened red: 200 + (55 * 0.35) = 219.
        assert!(result.contains("219"), "{result:?}");
        assert!(!result.contains("\x1b[7m"), "{result:?}");
    }

    #[test]
    fn style_change_inside_selection_reemits_the_highlight() {
        let result = apply_highlight_to_line("ab\x1b[1;38;2;100;150;200mcd", 0, 3, 0.35);
        assert!(result.contains("ab"), "{result:?}");
        assert!(result.contains("cd"), "{result:?}");
        // The mid-selection SGR is kept verbatim...
        assert!(result.contains("\x1b[1;38;2;100;150;200m"), "{result:?}");
        // ...and immediately followed by a lightened pair: 100 + (155*0.35) = 154.
        let after = result
            .split("\x1b[1;38;2;100;150;200m")
            .nth(1)
            .expect("mid-selection SGR present");
        assert!(after.starts_with("\x1b[38;2;154;186;219m"), "{result:?}");
    }

    #[test]
    fn selection_past_the_content_pads_with_highlighted_spaces() {
        let result = apply_highlight_to_line("abc", 0, 9, 0.35);
        let plain = strip_ansi(&result);
        assert_eq!(plain.len(), 10, "{plain:?}");
        assert!(plain.ends_with("       "), "{plain:?}");
    }

    #[test]
    fn empty_line_is_fully_padded() {
        let result = apply_highlight_to_line("", 0, 4, 0.35);
        assert_eq!(strip_ansi(&result).len(), 5);
    }

    #[test]
    fn indexed_color_feeds_the_highlight() {
        // 256-color index 196 = (255,0,0); lightened G/B become 89.
        let result = apply_highlight_to_line("\x1b[38;5;196mred", 0, 2, 0.35);
        assert!(result.contains("\x1b[38;2;255;89;89m"), "{result:?}");
    }

    #[test]
    fn truecolor_background_feeds_the_highlight() {
        // bg (50,100,150) lightened: (121,154,186).
        let result = apply_highlight_to_line("\x1b[48;2;50;100;150mtext", 0, 3, 0.35);
        assert!(result.contains("121"), "{result:?}");
        assert!(result.contains("186"), "{result:?}");
    }

    #[test]
    fn partial_selection_preserves_visible_structure() {
        let result = apply_highlight_to_line("abcdefgh", 2, 4, 0.35);
        assert_eq!(strip_ansi(&result), "abcdefgh");
    }

    #[test]
    fn osc_and_charset_sequences_pass_through() {
        let result = apply_highlight_to_line("\x1b]8;;https://example.com\x07link text", 0, 3, 0.35);
        assert!(result.contains("\x1b]8;;https://example.com\x07"), "{result:?}");
        assert!(result.contains("link"), "{result:?}");

        let result = apply_highlight_to_line("\x1b(0abc", 0, 2, 0.35);
        assert!(result.contains("\x1b(0"), "{result:?}");
    }

    #[test]
    fn highlight_defaults_when_no_color_is_set() {
        let mut out = String::new();
        emit_highlight_sgr(&mut out, &ColorState::default(), 0.35);
        // fg (229,229,229) -> 238; bg (0,0,0) -> 89.
        assert!(out.contains("238"), "{out:?}");
        assert!(out.contains("89"), "{out:?}");
    }

    #[test]
    fn restore_replays_tracked_colors_or_defaults() {
        let mut out = String::new();
        emit_restore_sgr(
            &mut out,
            &ColorState {
                fg: Some((100, 200, 50)),
                bg: Some((10, 20, 30)),
            },
        );
        assert!(out.contains("\x1b[38;2;100;200;50m"), "{out:?}");
        assert!(out.contains("\x1b[48;2;10;20;30m"), "{out:?}");

        let mut out = String::new();
        emit_restore_sgr(&mut out, &ColorState::default());
        assert!(out.contains("\x1b[39m"), "{out:?}");
        assert!(out.contains("\x1b[49m"), "{out:?}");
    }
}
