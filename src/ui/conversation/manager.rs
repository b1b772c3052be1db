use crate::events::AppEvent;
use crate::exchange::{ExchangeCoordinator, ExchangeResult, Notification, RejectReason};
use crate::ui::conversation::{
    ComposerResult, ConversationComposer, ConversationHistory, HistoryView, SlashCommand,
    TypingIndicator, get_help_text,
};
use crate::ui::toast::Toast;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::debug;

const PLACEHOLDER: &str = "Type a message...";
const DISCLAIMER: &str = "MadAI can make mistakes. Check important information.";
const PAGE: usize = 10;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Ties the exchange coordinator to the conversation widgets
pub struct ConversationManager {
    coordinator: ExchangeCoordinator,
    history: ConversationHistory,
    composer: ConversationComposer,
    typing: TypingIndicator,
    toast: Toast,
    results: mpsc::UnboundedSender<AppEvent>,
}

impl ConversationManager {
    pub fn new(
        coordinator: ExchangeCoordinator,
        toast_lifetime: Duration,
        results: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let mut history = ConversationHistory::new();
        history.sync(coordinator.store().len());

        Self {
            coordinator,
            history,
            composer: ConversationComposer::new(PLACEHOLDER),
            typing: TypingIndicator::new(),
            toast: Toast::new(toast_lifetime),
            results,
        }
    }

    pub fn coordinator(&self) -> &ExchangeCoordinator {
        &self.coordinator
    }

    #[cfg(test)]
    pub fn toast(&self) -> &Toast {
        &self.toast
    }

    /// Dispatch one application event
    pub fn handle_event(&mut self, event: AppEvent) -> ConversationAction {
        match event {
            AppEvent::Key(key) => return self.handle_key(key),
            AppEvent::Mouse(mouse) => self.handle_mouse(mouse),
            AppEvent::Paste(text) => self.composer.paste(&text),
            AppEvent::Tick => {
                if self.coordinator.is_pending() {
                    self.typing.tick();
                }
                self.toast.expire(Instant::now());
            }
            AppEvent::Resize(..) => {}
            AppEvent::Exchange(result) => self.finish_exchange(result),
        }
        ConversationAction::None
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('d'))
        {
            return ConversationAction::Exit;
        }

        match key.code {
            KeyCode::PageUp => {
                self.history.scroll_up(PAGE);
                return ConversationAction::None;
            }
            KeyCode::PageDown => {
                self.history.scroll_down(PAGE);
                return ConversationAction::None;
            }
            // Esc closes the palette first, then the toast
            KeyCode::Esc if self.toast.current().is_some() && !self.composer.is_palette_open() => {
                self.toast.dismiss();
                return ConversationAction::None;
            }
            _ => {}
        }

        match self.composer.handle_key(key) {
            ComposerResult::Submitted(text) => {
                self.submit(&text);
                ConversationAction::None
            }
            ComposerResult::Command(command) => self.handle_slash_command(command),
            ComposerResult::None => ConversationAction::None,
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.history.scroll_up(3),
            MouseEventKind::ScrollDown => self.history.scroll_down(3),
            _ => {}
        }
    }

    /// Start an exchange in the background; the reply comes back as `AppEvent::Exchange`
    pub fn submit(&mut self, text: &str) {
        let results = self.results.clone();
        match self.coordinator.dispatch(text, results) {
            Ok(()) => {
                self.typing.reset();
                self.composer.set_disabled(true);
                self.history.sync(self.coordinator.store().len());
            }
            Err(RejectReason::Empty) => {}
            Err(RejectReason::Pending) => debug!("ignored submit while a reply is pending"),
        }
    }

    fn finish_exchange(&mut self, result: ExchangeResult) {
        if let Some(notification) = self.coordinator.finish(result) {
            self.toast.show(notification);
        }
        self.composer.set_disabled(self.coordinator.is_pending());
        self.history.sync(self.coordinator.store().len());
    }

    /// Handle slash commands
    fn handle_slash_command(&mut self, command: SlashCommand) -> ConversationAction {
        match command {
            SlashCommand::Help => {
                self.toast.show(Notification::info("Help", get_help_text()));
                ConversationAction::None
            }
            SlashCommand::Bye => ConversationAction::Exit,
        }
    }

    /// Render the whole chat screen
    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(self.composer.desired_height()),
                Constraint::Length(1),
            ])
            .split(area);

        let header = Line::from(vec![
            Span::styled(" ✦ ", Style::default().fg(Color::Black).bg(Color::Cyan)),
            Span::styled(" MadAI", Style::default().add_modifier(Modifier::BOLD)),
        ]);
        frame.render_widget(Paragraph::new(header), chunks[0]);

        self.history.sync(self.coordinator.store().len());
        let typing = self.coordinator.is_pending().then_some(&self.typing);
        frame.render_widget(
            HistoryView {
                history: &mut self.history,
                messages: self.coordinator.store().all(),
                typing,
            },
            chunks[1],
        );

        frame.render_widget(&self.composer, chunks[2]);

        frame.render_widget(
            Paragraph::new(DISCLAIMER)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            chunks[3],
        );

        frame.render_widget(&self.toast, chunks[1]);
    }
}
