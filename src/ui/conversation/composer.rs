use crate::ui::conversation::commands::{
    CommandEntry, SlashCommand, command_entries, parse_slash_command,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};

const MAX_VISIBLE_LINES: u16 = 6;

/// Result returned when the user interacts with the conversation composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    Submitted(String),
    Command(SlashCommand),
    None,
}

/// Multi-line input box with a slash-command palette
#[derive(Debug, Clone)]
pub struct ConversationComposer {
    content: String,
    /// Cursor position in chars, not bytes
    cursor: usize,
    placeholder: String,
    disabled: bool,
    command_entries: Vec<CommandEntry>,
    filtered_commands: Vec<CommandEntry>,
    show_command_palette: bool,
    selected_command: Option<usize>,
}

impl ConversationComposer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            cursor: 0,
            placeholder: placeholder.into(),
            disabled: false,
            command_entries: command_entries(),
            filtered_commands: Vec::new(),
            show_command_palette: false,
            selected_command: None,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if self.disabled {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter
                if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
            {
                self.insert_char('\n');
            }
            KeyCode::Enter => {
                // first Enter completes a partial command, the next one runs it
                if self.show_command_palette
                    && !self.palette_matches_content()
                    && self.apply_selected_command()
                {
                    return ComposerResult::None;
                }
                return self.take_submission();
            }
            KeyCode::Up if self.show_command_palette => self.move_command_selection(-1),
            KeyCode::Down if self.show_command_palette => self.move_command_selection(1),
            KeyCode::Tab if self.show_command_palette => {
                self.apply_selected_command();
            }
            KeyCode::Esc if self.show_command_palette => self.close_command_palette(),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.insert_char(c);
                self.sync_command_palette();
            }
            KeyCode::Backspace => {
                if self.backspace() {
                    self.sync_command_palette();
                }
            }
            KeyCode::Delete => {
                if self.delete() {
                    self.sync_command_palette();
                }
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.char_len()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.char_len(),
            _ => {}
        }

        ComposerResult::None
    }

    /// Insert pasted text at the cursor
    pub fn paste(&mut self, text: &str) {
        if self.disabled {
            return;
        }
        for c in text.chars().filter(|c| *c != '\r') {
            self.insert_char(c);
        }
        self.sync_command_palette();
    }

    fn take_submission(&mut self) -> ComposerResult {
        if self.content.trim().is_empty() {
            return ComposerResult::None;
        }

        let content = std::mem::take(&mut self.content);
        self.cursor = 0;
        self.close_command_palette();

        match parse_slash_command(&content) {
            Some(command) => ComposerResult::Command(command),
            None => ComposerResult::Submitted(content),
        }
    }

    fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    /// Insert a character at the cursor position
    fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    /// Delete character before cursor
    fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.content.remove(at);
        true
    }

    /// Delete character at cursor
    fn delete(&mut self) -> bool {
        if self.cursor >= self.char_len() {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.content.remove(at);
        true
    }

    fn sync_command_palette(&mut self) {
        let is_command_prefix = self.content.starts_with('/')
            && !self.content.chars().any(char::is_whitespace);

        if is_command_prefix {
            self.show_command_palette = true;
            self.refresh_command_palette();
        } else {
            self.close_command_palette();
        }
    }

    fn close_command_palette(&mut self) {
        self.show_command_palette = false;
        self.filtered_commands.clear();
        self.selected_command = None;
    }

    fn refresh_command_palette(&mut self) {
        let query = self.content.trim_start_matches('/').to_lowercase();
        self.filtered_commands = self
            .command_entries
            .iter()
            .filter(|entry| query.is_empty() || entry.keyword.starts_with(&query))
            .copied()
            .collect();

        self.selected_command = if self.filtered_commands.is_empty() {
            None
        } else {
            let index = self.selected_command.unwrap_or(0);
            Some(index.min(self.filtered_commands.len() - 1))
        };
    }

    fn move_command_selection(&mut self, delta: isize) {
        if self.filtered_commands.is_empty() {
            self.selected_command = None;
            return;
        }

        let len = self.filtered_commands.len() as isize;
        let current = self.selected_command.unwrap_or(0) as isize;
        self.selected_command = Some((current + delta).rem_euclid(len) as usize);
    }

    fn palette_matches_content(&self) -> bool {
        self.selected_command
            .and_then(|index| self.filtered_commands.get(index))
            .is_some_and(|entry| self.content == format!("/{}", entry.keyword))
    }

    fn apply_selected_command(&mut self) -> bool {
        let Some(entry) = self
            .selected_command
            .and_then(|index| self.filtered_commands.get(index))
            .copied()
        else {
            return false;
        };

        self.content = format!("/{}", entry.keyword);
        self.cursor = self.char_len();
        self.close_command_palette();
        true
    }

    /// Disable input while an exchange is in flight
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
        if disabled {
            self.close_command_palette();
        }
    }

    pub fn is_palette_open(&self) -> bool {
        self.show_command_palette
    }

    #[cfg(test)]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Rows needed to show the content, borders included
    pub fn desired_height(&self) -> u16 {
        let lines = self.content.split('\n').count().max(1) as u16;
        lines.min(MAX_VISIBLE_LINES) + 2
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (title, border_style) = if self.disabled {
            ("MadAI is replying…", Style::default().fg(Color::DarkGray))
        } else {
            ("Message", Style::default().fg(Color::Green))
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(border_style);
        let inner = block.inner(area);
        block.render(area, buf);

        if self.content.is_empty() {
            let line = Line::from(Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            ));
            buf.set_line(inner.x, inner.y, &line, inner.width);
        } else {
            let mut content = self.content.clone();
            if !self.disabled {
                content.insert(self.byte_index(self.cursor), '▌');
            }
            let text_style = if self.disabled {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };

            // keep the cursor line in view
            let lines: Vec<&str> = content.split('\n').collect();
            let cursor_line = self.content.chars().take(self.cursor).filter(|c| *c == '\n').count();
            let height = inner.height as usize;
            let start = (cursor_line + 1).saturating_sub(height);

            for (row, text) in lines.iter().skip(start).take(height).enumerate() {
                let line = Line::from(Span::styled(*text, text_style));
                buf.set_line(inner.x, inner.y + row as u16, &line, inner.width);
            }
        }

        if self.show_command_palette && !self.filtered_commands.is_empty() {
            let palette_height = self.filtered_commands.len().min(5) as u16 + 2;
            let palette_area = Rect {
                x: area.x,
                y: area.y.saturating_sub(palette_height),
                width: area.width,
                height: palette_height.min(area.y),
            };
            if palette_area.height < 3 {
                return;
            }

            Clear.render(palette_area, buf);
            let block = Block::default()
                .borders(Borders::ALL)
                .title("Commands")
                .border_style(Style::default().fg(Color::Blue));
            let palette_inner = block.inner(palette_area);
            block.render(palette_area, buf);

            for (index, entry) in self.filtered_commands.iter().enumerate() {
                if index >= palette_inner.height as usize {
                    break;
                }

                let style = if self.selected_command == Some(index) {
                    Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };

                let line = Line::from(vec![
                    Span::styled(format!("/{}", entry.keyword), style),
                    Span::styled("  ", Style::default()),
                    Span::styled(entry.description, Style::default().fg(Color::Gray)),
                ]);
                buf.set_line(
                    palette_inner.x,
                    palette_inner.y + index as u16,
                    &line,
                    palette_inner.width,
                );
            }
        }
    }
}
