use crate::palette::{color256_to_rgb, Rgb, ANSI_16};

/// Running foreground/background color carried across one line of
/// ANSI-encoded bytes. `None` means the terminal default is in effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorState {
    pub fg: Option<Rgb>,
    pub bg: Option<Rgb>,
}

impl ColorState {
    /// Applies an SGR parameter string (the bytes between `ESC [` and `m`).
    /// Color codes update the state; non-color attributes are ignored.
    pub fn apply_sgr(&mut self, params: &str) {
        if params.is_empty() {
            // ESC[m is equivalent to ESC[0m (reset).
            self.fg = None;
            self.bg = None;
            return;
        }

        let parts: Vec<&str> = params.split(';').collect();
        let mut i = 0;
        while i < parts.len() {
            let Ok(code) = parts[i].parse::<u16>() else {
                i += 1;
                continue;
            };

            match code {
                0 => {
                    self.fg = None;
                    self.bg = None;
                    i += 1;
                }
                39 => {
                    self.fg = None;
                    i += 1;
                }
                49 => {
                    self.bg = None;
                    i += 1;
                }
                38 | 48 if i + 1 < parts.len() => {
                    let next = parts[i + 1].parse::<u16>().unwrap_or(0);
                    if next == 2 && i + 4 < parts.len() {
                        // 24-bit: 38;2;R;G;B or 48;2;R;G;B
                        let r = parts[i + 2].parse::<u8>().unwrap_or(0);
                        let g = parts[i + 3].parse::<u8>().unwrap_or(0);
                        let b = parts[i + 4].parse::<u8>().unwrap_or(0);
                        self.set(code, (r, g, b));
                        i += 5;
                    } else if next == 5 && i + 2 < parts.len() {
                        // 256-color: 38;5;N or 48;5;N
                        let n = parts[i + 2].parse::<u16>().unwrap_or(0);
                        self.set(code, color256_to_rgb(n));
                        i += 3;
                    } else {
                        i += 1;
                    }
                }
                30..=37 => {
                    self.fg = Some(ANSI_16[(code - 30) as usize]);
                    i += 1;
                }
                40..=47 => {
                    self.bg = Some(ANSI_16[(code - 40) as usize]);
                    i += 1;
                }
                90..=97 => {
                    self.fg = Some(ANSI_16[(code - 90 + 8) as usize]);
                    i += 1;
                }
                100..=107 => {
                    self.bg = Some(ANSI_16[(code - 100 + 8) as usize]);
                    i += 1;
                }
                _ => {
                    // Non-color attribute (bold, italic, underline, ...).
                    i += 1;
                }
            }
        }
    }

    fn set(&mut self, code: u16, rgb: Rgb) {
        if code == 38 {
            self.fg = Some(rgb);
        } else {
            self.bg = Some(rgb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_both_channels() {
        let mut state = ColorState {
            fg: Some((255, 0, 0)),
            bg: Some((100, 0, 0)),
        };
        state.apply_sgr("0");
        assert_eq!(state, ColorState::default());
    }

    #[test]
    fn empty_params_reset() {
        let mut state = ColorState {
            fg: Some((255, 0, 0)),
            bg: None,
        };
        state.apply_sgr("");
        assert_eq!(state.fg, None);
    }

    #[test]
    fn truecolor_foreground_and_background() {
        let mut state = ColorState::default();
        state.apply_sgr("38;2;100;200;50");
        assert_eq!(state.fg, Some((100, 200, 50)));
        state.apply_sgr("48;2;10;20;30");
        assert_eq!(state.bg, Some((10, 20, 30)));
    }

    #[test]
    fn indexed_colors_resolve_through_the_256_table() {
        let mut state = ColorState::default();
        state.apply_sgr("38;5;196");
        assert_eq!(state.fg, Some((255, 0, 0)));
        state.apply_sgr("48;5;21");
        assert_eq!(state.bg, Some((0, 0, 255)));
    }

    #[test]
    fn basic_and_bright_palette_codes() {
        let mut state = ColorState::default();
        state.apply_sgr("31");
        assert_eq!(state.fg, Some((205, 0, 0)));
        state.apply_sgr("42");
        assert_eq!(state.bg, Some((0, 205, 0)));
        state.apply_sgr("91");
        assert_eq!(state.fg, Some((255, 0, 0)));
        state.apply_sgr("106");
        assert_eq!(state.bg, Some((0, 255, 255)));
    }

    #[test]
    fn default_codes_clear_one_channel() {
        let mut state = ColorState {
            fg: Some((255, 0, 0)),
            bg: Some((0, 0, 100)),
        };
        state.apply_sgr("39");
        assert_eq!(state.fg, None);
        assert_eq!(state.bg, Some((0, 0, 100)));
        state.apply_sgr("49");
        assert_eq!(state.bg, None);
    }

    #[test]
    fn non_color_attributes_do_not_touch_colors() {
        let mut state = ColorState::default();
        state.apply_sgr("1;3;4");
        assert_eq!(state, ColorState::default());
    }
}
