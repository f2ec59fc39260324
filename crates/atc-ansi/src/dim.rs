use crate::palette::{color256_to_rgb, ANSI_16};
use crate::token::{AnsiToken, AnsiTokenizer};

/// Dim default foreground, applied to otherwise-uncolored text.
const DIM_DEFAULT: &str = "\x1b[38;2;91;100;109m";
const DIM_DEFAULT_PARAMS: &str = "38;2;91;100;109";

/// Walks an ANSI-colored string and reduces the brightness of every color by
/// the given factor (0.0-1.0). Non-color SGR attributes (bold, italic,
/// underline, ...) and non-SGR escape sequences (cursor movement, charset,
/// OSC) pass through unchanged.
pub fn dim_ansi_colors(s: &str, factor: f64) -> String {
    if s.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(s.len() + 64);

    // Start with the dim default foreground so plain text is also dimmed.
    out.push_str(DIM_DEFAULT);

    for token in AnsiTokenizer::new(s) {
        match token {
            AnsiToken::Rune('\n') => {
                // Re-emit the dim default after each newline: the sidebar is
                // joined line-by-line with this pane, so every line restarts
                // from whatever SGR state the sidebar left behind.
                out.push('\n');
                out.push_str(DIM_DEFAULT);
            }
            AnsiToken::Rune(r) => out.push(r),
            AnsiToken::Sgr { params, .. } => {
                out.push_str("\x1b[");
                out.push_str(&transform_sgr(params, factor));
                out.push('m');
            }
            other => out.push_str(other.raw().unwrap_or_default()),
        }
    }

    out
}

/// Rewrites the parameter portion of an SGR sequence (e.g. `38;2;255;0;0`)
/// with every color dimmed to 24-bit values.
fn transform_sgr(params: &str, factor: f64) -> String {
    if params.is_empty() {
        // ESC[m is equivalent to ESC[0m (reset).
        return format!("0;{DIM_DEFAULT_PARAMS}");
    }

    let parts: Vec<&str> = params.split(';').collect();
    let mut out: Vec<String> = Vec::with_capacity(parts.len());
    let mut i = 0;
    while i < parts.len() {
        let p = parts[i];
        let Ok(code) = p.parse::<u16>() else {
            // Non-numeric param.
            out.push(p.to_owned());
            i += 1;
            continue;
        };

        match code {
            0 => {
                // Reset, then re-apply the dim default foreground.
                out.push("0".to_owned());
                push_rgb_params(&mut out, DIM_DEFAULT_PARAMS);
                i += 1;
            }
            39 => {
                // Default foreground becomes the dim default.
                push_rgb_params(&mut out, DIM_DEFAULT_PARAMS);
                i += 1;
            }
            49 => {
                out.push(p.to_owned());
                i += 1;
            }
            38 | 48 if i + 1 < parts.len() => {
                let next = parts[i + 1].parse::<u16>().unwrap_or(0);
                if next == 2 && i + 4 < parts.len() {
                    // 24-bit: 38;2;R;G;B or 48;2;R;G;B
                    let r = parts[i + 2].parse::<u8>().unwrap_or(0);
                    let g = parts[i + 3].parse::<u8>().unwrap_or(0);
                    let b = parts[i + 4].parse::<u8>().unwrap_or(0);
                    let (r, g, b) = dim_rgb(r, g, b, factor);
                    out.push(p.to_owned());
                    out.push("2".to_owned());
                    out.push(r.to_string());
                    out.push(g.to_string());
                    out.push(b.to_string());
                    i += 5;
                } else if next == 5 && i + 2 < parts.len() {
                    // 256-color: 38;5;N or 48;5;N, rewritten as dimmed 24-bit.
                    let n = parts[i + 2].parse::<u16>().unwrap_or(0);
                    let (r, g, b) = color256_to_rgb(n);
                    let (r, g, b) = dim_rgb(r, g, b, factor);
                    out.push(p.to_owned());
                    out.push("2".to_owned());
                    out.push(r.to_string());
                    out.push(g.to_string());
                    out.push(b.to_string());
                    i += 3;
                } else {
                    out.push(p.to_owned());
                    i += 1;
                }
            }
            30..=37 => {
                push_dimmed(&mut out, "38", ANSI_16[(code - 30) as usize], factor);
                i += 1;
            }
            40..=47 => {
                push_dimmed(&mut out, "48", ANSI_16[(code - 40) as usize], factor);
                i += 1;
            }
            90..=97 => {
                push_dimmed(&mut out, "38", ANSI_16[(code - 90 + 8) as usize], factor);
                i += 1;
            }
            100..=107 => {
                push_dimmed(&mut out, "48", ANSI_16[(code - 100 + 8) as usize], factor);
                i += 1;
            }
            _ => {
                // Non-color attribute.
                out.push(p.to_owned());
                i += 1;
            }
        }
    }

    out.join(";")
}

fn push_rgb_params(out: &mut Vec<String>, rgb_params: &str) {
    out.extend(rgb_params.split(';').map(str::to_owned));
}

fn push_dimmed(out: &mut Vec<String>, channel: &str, rgb: (u8, u8, u8), factor: f64) {
    let (r, g, b) = dim_rgb(rgb.0, rgb.1, rgb.2, factor);
    out.push(channel.to_owned());
    out.push("2".to_owned());
    out.push(r.to_string());
    out.push(g.to_string());
    out.push(b.to_string());
}

fn dim_rgb(r: u8, g: u8, b: u8, factor: f64) -> (u8, u8, u8) {
    (
        (f64::from(r) * factor) as u8,
        (f64::from(g) * factor) as u8,
        (f64::from(b) * factor) as u8,
    )
}
