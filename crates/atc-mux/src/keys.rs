/// Logical key kinds the terminal pane forwards to the child process.
///
/// `Ctrl('i')` and `Ctrl('m')` collide with Tab and Enter on the wire;
/// [`KeyPress::key`] resolves both in favor of the named keys so the rest of
/// the translation never sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Runes,
    Enter,
    Backspace,
    Tab,
    BackTab,
    Escape,
    Space,
    Up,
    Down,
    Left,
    Right,
    ShiftUp,
    ShiftDown,
    ShiftLeft,
    ShiftRight,
    CtrlUp,
    CtrlDown,
    CtrlLeft,
    CtrlRight,
    CtrlShiftUp,
    CtrlShiftDown,
    CtrlShiftLeft,
    CtrlShiftRight,
    Home,
    End,
    ShiftHome,
    ShiftEnd,
    CtrlHome,
    CtrlEnd,
    CtrlShiftHome,
    CtrlShiftEnd,
    Insert,
    Delete,
    PgUp,
    PgDown,
    CtrlPgUp,
    CtrlPgDown,
    /// Function keys F1..=F20.
    F(u8),
    /// Ctrl+letter, lowercase `a..=z`.
    Ctrl(char),
}

/// A logical keyboard event bound for the child PTY.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub kind: KeyKind,
    pub runes: String,
    pub alt: bool,
}

impl KeyPress {
    pub fn runes(runes: impl Into<String>, alt: bool) -> Self {
        Self {
            kind: KeyKind::Runes,
            runes: runes.into(),
            alt,
        }
    }

    pub fn key(kind: KeyKind, alt: bool) -> Self {
        let kind = match kind {
            KeyKind::Ctrl('i') => KeyKind::Tab,
            KeyKind::Ctrl('m') => KeyKind::Enter,
            other => other,
        };
        Self {
            kind,
            runes: String::new(),
            alt,
        }
    }
}

/// Builds the tmux argument vector for one key press, or `None` when the key
/// has no translation.
///
/// Alt-modified keys are always sent as a single `-l` literal of
/// `ESC + <encoding>`: tmux delivers separate arguments in separate PTY
/// writes, and a split write makes the child parse a standalone Escape
/// followed by a plain key, which breaks Alt shortcuts.
pub fn key_to_tmux_args(socket: &str, session: &str, key: &KeyPress) -> Option<Vec<String>> {
    let base = |tail: String| -> Vec<String> {
        vec![
            "-L".to_owned(),
            socket.to_owned(),
            "send-keys".to_owned(),
            "-t".to_owned(),
            session.to_owned(),
            tail,
        ]
    };
    let literal = |bytes: String| -> Vec<String> {
        let mut args = base("-l".to_owned());
        args.push(bytes);
        args
    };

    if key.kind == KeyKind::Runes {
        if key.alt {
            return Some(literal(format!("\x1b{}", key.runes)));
        }
        return Some(literal(key.runes.clone()));
    }

    if key.alt {
        if let Some(byte) = key_byte(key.kind) {
            let mut bytes = String::from('\x1b');
            bytes.push(byte as char);
            return Some(literal(bytes));
        }
        if let Some(seq) = key_sequence(key.kind) {
            return Some(literal(format!("\x1b{seq}")));
        }
    }

    tmux_key_name(key.kind).map(base)
}

/// The raw byte for single-byte key kinds, or `None` for kinds that encode
/// as multi-byte escape sequences.
fn key_byte(kind: KeyKind) -> Option<u8> {
    match kind {
        KeyKind::Enter => Some(b'\r'),
        KeyKind::Tab => Some(b'\t'),
        KeyKind::Backspace => Some(0x7f),
        KeyKind::Escape => Some(0x1b),
        KeyKind::Space => Some(b' '),
        // Ctrl+A through Ctrl+Z are bytes 1-26.
        KeyKind::Ctrl(c @ 'a'..='z') => Some(c as u8 - b'a' + 1),
        _ => None,
    }
}

/// The raw xterm escape sequence (without the Alt `ESC` prefix) for
/// multi-byte key kinds.
fn key_sequence(kind: KeyKind) -> Option<String> {
    let seq = match kind {
        KeyKind::Up => "[A",
        KeyKind::Down => "[B",
        KeyKind::Right => "[C",
        KeyKind::Left => "[D",
        KeyKind::ShiftUp => "[1;2A",
        KeyKind::ShiftDown => "[1;2B",
        KeyKind::ShiftRight => "[1;2C",
        KeyKind::ShiftLeft => "[1;2D",
        KeyKind::CtrlUp => "[1;5A",
        KeyKind::CtrlDown => "[1;5B",
        KeyKind::CtrlRight => "[1;5C",
        KeyKind::CtrlLeft => "[1;5D",
        KeyKind::CtrlShiftUp => "[1;6A",
        KeyKind::CtrlShiftDown => "[1;6B",
        KeyKind::CtrlShiftRight => "[1;6C",
        KeyKind::CtrlShiftLeft => "[1;6D",
        KeyKind::Home => "[H",
        KeyKind::End => "[F",
        KeyKind::ShiftHome => "[1;2H",
        KeyKind::ShiftEnd => "[1;2F",
        KeyKind::CtrlHome => "[1;5H",
        KeyKind::CtrlEnd => "[1;5F",
        KeyKind::CtrlShiftHome => "[1;6H",
        KeyKind::CtrlShiftEnd => "[1;6F",
        KeyKind::Insert => "[2~",
        KeyKind::Delete => "[3~",
        KeyKind::PgUp => "[5~",
        KeyKind::PgDown => "[6~",
        KeyKind::CtrlPgUp => "[5;5~",
        KeyKind::CtrlPgDown => "[6;5~",
        KeyKind::F(n) => return function_key_sequence(n),
        _ => return None,
    };
    Some(format!("\x1b{seq}"))
}

fn function_key_sequence(n: u8) -> Option<String> {
    let seq = match n {
        // F1-F4 are SS3 sequences.
        1 => "\x1bOP",
        2 => "\x1bOQ",
        3 => "\x1bOR",
        4 => "\x1bOS",
        5 => "\x1b[15~",
        6 => "\x1b[17~",
        7 => "\x1b[18~",
        8 => "\x1b[19~",
        9 => "\x1b[20~",
        10 => "\x1b[21~",
        11 => "\x1b[23~",
        12 => "\x1b[24~",
        13 => "\x1b[25~",
        14 => "\x1b[26~",
        15 => "\x1b[28~",
        16 => "\x1b[29~",
        17 => "\x1b[31~",
        18 => "\x1b[32~",
        19 => "\x1b[33~",
        20 => "\x1b[34~",
        _ => return None,
    };
    Some(seq.to_owned())
}

/// tmux's named-key vocabulary for each key kind.
fn tmux_key_name(kind: KeyKind) -> Option<String> {
    let name = match kind {
        KeyKind::Runes => return None,
        KeyKind::Enter => "Enter",
        KeyKind::Backspace => "BSpace",
        KeyKind::Tab => "Tab",
        KeyKind::BackTab => "BTab",
        KeyKind::Escape => "Escape",
        KeyKind::Space => "Space",
        KeyKind::Up => "Up",
        KeyKind::Down => "Down",
        KeyKind::Right => "Right",
        KeyKind::Left => "Left",
        KeyKind::ShiftUp => "S-Up",
        KeyKind::ShiftDown => "S-Down",
        KeyKind::ShiftLeft => "S-Left",
        KeyKind::ShiftRight => "S-Right",
        KeyKind::CtrlUp => "C-Up",
        KeyKind::CtrlDown => "C-Down",
        KeyKind::CtrlLeft => "C-Left",
        KeyKind::CtrlRight => "C-Right",
        KeyKind::CtrlShiftUp => "C-S-Up",
        KeyKind::CtrlShiftDown => "C-S-Down",
        KeyKind::CtrlShiftLeft => "C-S-Left",
        KeyKind::CtrlShiftRight => "C-S-Right",
        KeyKind::Home => "Home",
        KeyKind::End => "End",
        KeyKind::ShiftHome => "S-Home",
        KeyKind::ShiftEnd => "S-End",
        KeyKind::CtrlHome => "C-Home",
        KeyKind::CtrlEnd => "C-End",
        KeyKind::CtrlShiftHome => "C-S-Home",
        KeyKind::CtrlShiftEnd => "C-S-End",
        KeyKind::Insert => "IC",
        KeyKind::Delete => "DC",
        KeyKind::PgUp => "PPage",
        KeyKind::PgDown => "NPage",
        KeyKind::CtrlPgUp => "C-PPage",
        KeyKind::CtrlPgDown => "C-NPage",
        KeyKind::F(n @ 1..=20) => return Some(format!("F{n}")),
        KeyKind::F(_) => return None,
        KeyKind::Ctrl(c @ 'a'..='z') => return Some(format!("C-{c}")),
        KeyKind::Ctrl(_) => return None,
    };
    Some(name.to_owned())
}
