use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use unicode_width::UnicodeWidthChar;

const CURSOR: &str = "│";

/// Single-line text input. `cursor` counts chars, not bytes.
#[derive(Debug, Clone)]
pub struct InputField {
    pub value: String,
    pub cursor: usize,
    pub placeholder: String,
    pub label: String,
    pub focused: bool,
    pub locked: bool,
}

impl InputField {
    pub fn new(label: &str, placeholder: &str) -> Self {
        Self {
            value: String::new(),
            cursor: 0,
            placeholder: placeholder.to_string(),
            label: label.to_string(),
            focused: false,
            locked: false,
        }
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.cursor = self.char_len();
    }

    fn char_len(&self) -> usize {
        self.value.chars().count()
    }

    fn byte_index(&self, cursor: usize) -> usize {
        self.value
            .char_indices()
            .nth(cursor)
            .map(|(idx, _)| idx)
            .unwrap_or(self.value.len())
    }

    /// Returns true when the key was consumed.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if self.locked {
            return false;
        }

        match key.code {
            KeyCode::Char(c) => {
                let idx = self.byte_index(self.cursor);
                self.value.insert(idx, c);
                self.cursor += 1;
                true
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let idx = self.byte_index(self.cursor);
                    self.value.remove(idx);
                }
                true
            }
            KeyCode::Delete => {
                if self.cursor < self.char_len() {
                    let idx = self.byte_index(self.cursor);
                    self.value.remove(idx);
                }
                true
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                true
            }
            KeyCode::Right => {
                if self.cursor < self.char_len() {
                    self.cursor += 1;
                }
                true
            }
            KeyCode::Home => {
                self.cursor = 0;
                true
            }
            KeyCode::End => {
                self.cursor = self.char_len();
                true
            }
            _ => false,
        }
    }

    /// Char offset of the first visible char so the cursor stays inside `width` columns.
    fn scroll_offset(&self, width: usize) -> usize {
        let mut used = 0;
        let mut start = self.cursor;
        for c in self.value.chars().take(self.cursor).collect::<Vec<_>>().iter().rev() {
            let w = c.width().unwrap_or(0);
            // One column is kept for the cursor glyph.
            if used + w + 1 > width {
                break;
            }
            used += w;
            start -= 1;
        }
        start
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let border_style = if self.locked {
            Style::default().fg(Color::DarkGray)
        } else if self.focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Gray)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.label.as_str())
            .border_style(border_style);

        let text = if self.value.is_empty() && !self.focused {
            Line::from(Span::styled(
                &self.placeholder,
                Style::default().fg(Color::DarkGray),
            ))
        } else if self.focused && !self.locked {
            let inner_width = area.width.saturating_sub(2) as usize;
            let start = self.scroll_offset(inner_width);
            let before: String = self
                .value
                .chars()
                .skip(start)
                .take(self.cursor - start)
                .collect();
            let after: String = self.value.chars().skip(self.cursor).collect();

            Line::from(vec![
                Span::raw(before),
                Span::styled(CURSOR, Style::default().fg(Color::Yellow)),
                Span::raw(after),
            ])
        } else {
            Line::from(Span::raw(&self.value))
        };

        let paragraph = Paragraph::new(text).block(block);
        f.render_widget(paragraph, area);
    }

    pub fn is_valid(&self) -> bool {
        !self.value.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(field: &mut InputField, text: &str) {
        for c in text.chars() {
            field.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn edits_multibyte_text_by_char() {
        let mut field = InputField::new("URL", "");
        type_str(&mut field, "héllo");
        field.handle_key(key(KeyCode::Left));
        field.handle_key(key(KeyCode::Left));
        field.handle_key(key(KeyCode::Left));
        field.handle_key(key(KeyCode::Backspace));
        assert_eq!(field.value, "hllo");

        field.handle_key(key(KeyCode::Char('é')));
        field.handle_key(key(KeyCode::End));
        field.handle_key(key(KeyCode::Delete));
        assert_eq!(field.value, "héllo");
        assert_eq!(field.cursor, 5);
    }

    #[test]
    fn locked_field_ignores_input() {
        let mut field = InputField::new("URL", "");
        field.locked = true;
        assert!(!field.handle_key(key(KeyCode::Char('x'))));
        assert!(field.value.is_empty());
    }

    #[test]
    fn scroll_keeps_cursor_visible() {
        let mut field = InputField::new("URL", "");
        field.set_value("abcdefghij");
        assert_eq!(field.scroll_offset(20), 0);
        assert_eq!(field.scroll_offset(5), 6);
    }
}
