use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
};

const FRAMES: [&str; 4] = ["●  ", "●● ", "●●●", "   "];

/// Animated "MadAI is typing" bubble, advanced by the UI tick
#[derive(Debug, Clone, Default)]
pub struct TypingIndicator {
    frame: usize,
}

impl TypingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self) {
        self.frame = (self.frame + 1) % FRAMES.len();
    }

    pub fn reset(&mut self) {
        self.frame = 0;
    }

    pub fn dots(&self) -> &'static str {
        FRAMES[self.frame]
    }

    pub fn line(&self) -> Line<'static> {
        Line::from(vec![
            Span::styled(
                " MadAI is typing ",
                Style::default().fg(Color::Gray).bg(Color::DarkGray),
            ),
            Span::styled(
                format!("{} ", self.dots()),
                Style::default().fg(Color::Yellow).bg(Color::DarkGray),
            ),
        ])
    }
}
