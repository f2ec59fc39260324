use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::styles::{Style, TEXT_DIM};

/// Single-line text input for the overlay dialogs.
#[derive(Debug, Clone, Default)]
pub struct TextField {
    value: String,
    cursor: usize, // rune index
    placeholder: String,
    char_limit: usize,
}

impl TextField {
    pub fn new(placeholder: &str) -> Self {
        Self {
            value: String::new(),
            cursor: 0,
            placeholder: placeholder.to_owned(),
            char_limit: 100,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn handle_key(&mut self, key: &KeyEvent) {
        match key.code {
            KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.cursor = 0;
            }
            KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.cursor = self.rune_count();
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.value = self.runes()[self.cursor..].iter().collect();
                self.cursor = 0;
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if self.rune_count() < self.char_limit {
                    let byte = self.byte_index(self.cursor);
                    self.value.insert(byte, c);
                    self.cursor += 1;
                }
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    let byte = self.byte_index(self.cursor - 1);
                    self.value.remove(byte);
                    self.cursor -= 1;
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.rune_count() {
                    let byte = self.byte_index(self.cursor);
                    self.value.remove(byte);
                }
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.rune_count()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.rune_count(),
            _ => {}
        }
    }

    /// Renders the value with a block cursor, or the placeholder when empty.
    pub fn view(&self) -> String {
        if self.value.is_empty() {
            return format!(
                "\x1b[7m \x1b[27m{}",
                Style::fg(TEXT_DIM).italic().render(&self.placeholder)
            );
        }
        let runes = self.runes();
        let before: String = runes[..self.cursor].iter().collect();
        if self.cursor >= runes.len() {
            return format!("{before}\x1b[7m \x1b[27m");
        }
        let at: String = runes[self.cursor..self.cursor + 1].iter().collect();
        let after: String = runes[self.cursor + 1..].iter().collect();
        format!("{before}\x1b[7m{at}\x1b[27m{after}")
    }

    fn runes(&self) -> Vec<char> {
        self.value.chars().collect()
    }

    fn rune_count(&self) -> usize {
        self.value.chars().count()
    }

    fn byte_index(&self, rune_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(rune_index)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(field: &mut TextField, code: KeyCode) {
        field.handle_key(&KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn typing_and_editing() {
        let mut field = TextField::new("name...");
        for c in "feat".chars() {
            press(&mut field, KeyCode::Char(c));
        }
        assert_eq!(field.value(), "feat");

        press(&mut field, KeyCode::Backspace);
        assert_eq!(field.value(), "fea");

        press(&mut field, KeyCode::Left);
        press(&mut field, KeyCode::Char('x'));
        assert_eq!(field.value(), "fexa");

        press(&mut field, KeyCode::Home);
        press(&mut field, KeyCode::Delete);
        assert_eq!(field.value(), "exa");
    }

    #[test]
    fn ctrl_u_clears_to_the_start() {
        let mut field = TextField::new("");
        for c in "abc".chars() {
            press(&mut field, KeyCode::Char(c));
        }
        field.handle_key(&KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert_eq!(field.value(), "");
    }

    #[test]
    fn view_shows_placeholder_when_empty() {
        let field = TextField::new("Session name...");
        assert!(field.view().contains("Session name..."));
    }
}
