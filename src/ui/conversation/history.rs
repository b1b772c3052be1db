//! Conversation history display component

use crate::conversation::Message;
use crate::ui::conversation::typing::TypingIndicator;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget,
        Widget,
    },
};

/// Bubbles take at most this share of the row
const BUBBLE_WIDTH_PERCENT: usize = 80;

/// Scroll state for the message list. Follows the newest message unless the
/// user has scrolled up, and jumps back to it whenever a message is added.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    /// Lines scrolled up from the bottom
    offset: usize,
    /// Largest useful offset, known after the first render
    max_offset: Option<usize>,
    seen_messages: usize,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call with the current message count before rendering
    pub fn sync(&mut self, message_count: usize) {
        if message_count != self.seen_messages {
            self.seen_messages = message_count;
            self.scroll_to_bottom();
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.offset = self.offset.saturating_add(lines);
        if let Some(max) = self.max_offset {
            self.offset = self.offset.min(max);
        }
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.offset = self.offset.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset = 0;
    }

    /// Record the laid-out size so scrolling stops at the first line
    pub fn set_viewport(&mut self, total: usize, height: usize) {
        let max = total.saturating_sub(height);
        self.max_offset = Some(max);
        self.offset = self.offset.min(max);
    }

    #[cfg(test)]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// First visible line for `total` lines in a viewport of `height`
    fn first_visible(&self, total: usize, height: usize) -> usize {
        let bottom_start = total.saturating_sub(height);
        bottom_start.saturating_sub(self.offset.min(bottom_start))
    }
}

/// Renders the store through a [`ConversationHistory`], updating its
/// scroll limit to what was drawn
pub struct HistoryView<'a> {
    pub history: &'a mut ConversationHistory,
    pub messages: &'a [Message],
    pub typing: Option<&'a TypingIndicator>,
}

impl HistoryView<'_> {
    /// Lay out every message as aligned bubble lines
    pub fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let width = width as usize;
        let bubble_width = (width * BUBBLE_WIDTH_PERCENT / 100).max(8).min(width);
        let mut lines = Vec::new();

        for message in self.messages {
            lines.extend(bubble_lines(message, bubble_width));
            lines.push(Line::default());
        }

        if let Some(indicator) = self.typing {
            lines.push(indicator.line().alignment(Alignment::Left));
        }

        lines
    }
}

impl Widget for HistoryView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = block.inner(area);
        block.render(area, buf);

        // leave a column for the scrollbar
        let text_width = inner.width.saturating_sub(1);
        let lines = self.lines(text_width);
        let height = inner.height as usize;
        self.history.set_viewport(lines.len(), height);
        let start = self.history.first_visible(lines.len(), height);
        let visible: Vec<Line> = lines.iter().skip(start).take(height).cloned().collect();

        let text_area = Rect {
            width: text_width,
            ..inner
        };
        Paragraph::new(visible).render(text_area, buf);

        let max_start = lines.len().saturating_sub(height);
        if max_start > 0 {
            let mut state = ScrollbarState::new(max_start).position(start);
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .render(inner, buf, &mut state);
        }
    }
}

fn bubble_lines(message: &Message, bubble_width: usize) -> Vec<Line<'static>> {
    let (alignment, bubble_style) = if message.is_user() {
        (Alignment::Right, Style::default().fg(Color::White).bg(Color::Blue))
    } else {
        (Alignment::Left, Style::default().fg(Color::White).bg(Color::DarkGray))
    };

    let header = format!(
        "{} · {}",
        message.role().display_name(),
        message.timestamp().with_timezone(&chrono::Local).format("%H:%M")
    );
    let mut lines = vec![
        Line::from(Span::styled(header, Style::default().fg(Color::DarkGray))).alignment(alignment),
    ];

    // one column of padding on each side
    let text_width = bubble_width.saturating_sub(2).max(1);
    let wrapped = wrap_text(message.text(), text_width);
    let fill = wrapped.iter().map(|l| l.chars().count()).max().unwrap_or(0);

    for text in wrapped {
        let pad = fill - text.chars().count();
        let padded = format!(" {}{} ", text, " ".repeat(pad));
        lines.push(Line::from(Span::styled(padded, bubble_style)).alignment(alignment));
    }

    lines
}

/// Wrap text to `width` columns. Whitespace is kept as written (tabs become
/// four spaces); lines break at the last space that fits, or mid-word when
/// there is none.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let text = text.replace('\t', "    ");
    if width == 0 {
        return vec![text];
    }

    let mut lines: Vec<String> = Vec::new();

    for paragraph in text.split('\n') {
        let chars: Vec<char> = paragraph.chars().collect();
        let mut start = 0;

        while chars.len() - start > width {
            // a space right after the limit can still serve as the break
            let window = &chars[start + 1..=start + width];
            match window.iter().rposition(|c| *c == ' ') {
                Some(i) => {
                    let end = start + 1 + i;
                    lines.push(chars[start..end].iter().collect());
                    start = end + 1;
                }
                None => {
                    lines.push(chars[start..start + width].iter().collect());
                    start += width;
                }
            }
        }

        lines.push(chars[start..].iter().collect());
    }

    // drop trailing blank lines from trailing newlines, keep at least one
    while lines.len() > 1 && lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines
}
