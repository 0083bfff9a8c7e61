//! Single-line prompt input

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    widgets::{Block, Borders, Paragraph},
};
use unicode_width::UnicodeWidthStr;

use crate::tui::{styles::Theme, Frame};

pub struct ChatInput {
    content: String,
    /// Cursor position in chars
    cursor: usize,
    placeholder: String,
    has_focus: bool,
}

impl ChatInput {
    pub fn new() -> Self {
        Self {
            content: String::new(),
            cursor: 0,
            placeholder: "Type your message...".to_string(),
            has_focus: true,
        }
    }

    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = placeholder.to_string();
        self
    }

    pub fn set_focus(&mut self, focus: bool) {
        self.has_focus = focus;
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Take the current text, leaving the input empty
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.content)
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    /// Edit the line; returns false for keys the input does not handle
    pub fn handle_key_event(&mut self, event: KeyEvent) -> bool {
        match (event.code, event.modifiers) {
            (KeyCode::Char(c), KeyModifiers::NONE) | (KeyCode::Char(c), KeyModifiers::SHIFT) => {
                let at = self.byte_index(self.cursor);
                self.content.insert(at, c);
                self.cursor += 1;
            }
            (KeyCode::Backspace, _) => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_index(self.cursor);
                    self.content.remove(at);
                }
            }
            (KeyCode::Delete, _) => {
                if self.cursor < self.char_count() {
                    let at = self.byte_index(self.cursor);
                    self.content.remove(at);
                }
            }
            (KeyCode::Left, _) => self.cursor = self.cursor.saturating_sub(1),
            (KeyCode::Right, _) => self.cursor = (self.cursor + 1).min(self.char_count()),
            (KeyCode::Home, _) => self.cursor = 0,
            (KeyCode::End, _) => self.cursor = self.char_count(),
            _ => return false,
        }
        true
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Message")
            .border_style(if self.has_focus {
                theme.focused_border_style()
            } else {
                theme.border_style()
            });

        let inner_width = area.width.saturating_sub(2);
        let before_cursor = &self.content[..self.byte_index(self.cursor)];
        let cursor_col = before_cursor.width() as u16;
        let offset = cursor_col.saturating_sub(inner_width.saturating_sub(1));

        let paragraph = if self.content.is_empty() {
            Paragraph::new(self.placeholder.as_str()).style(theme.placeholder_style())
        } else {
            Paragraph::new(self.content.as_str())
                .style(theme.text_style())
                .scroll((0, offset))
        };

        frame.render_widget(paragraph.block(block), area);

        if self.has_focus {
            frame.set_cursor(area.x + 1 + cursor_col - offset, area.y + 1);
        }
    }
}

impl Default for ChatInput {
    fn default() -> Self {
        Self::new()
    }
}
