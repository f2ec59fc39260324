//! ANSI byte-stream transforms for captured terminal content.
//!
//! The multiplexer hands us pane snapshots as printable runes interleaved
//! with CSI/OSC/charset escape sequences. Everything in this crate walks that
//! stream with one shared tokenizer: the dim and highlight rewrites, the
//! color-state tracker they carry, and the width-aware truncate/skip helpers
//! the overlay compositor is built on.

mod dim;
mod highlight;
mod palette;
mod state;
mod text;
mod token;

pub use dim::dim_ansi_colors;
pub use highlight::{apply_highlight_to_line, lighten_rgb};
pub use palette::{color256_to_rgb, Rgb, ANSI_16};
pub use state::ColorState;
pub use text::{center_text, skip_ansi, strip_ansi, truncate_ansi, visible_width};
pub use token::{AnsiToken, AnsiTokenizer};
