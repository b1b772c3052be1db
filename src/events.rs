use serde::{Deserialize, Serialize};

use crate::exchange::ExchangeResult;

/// Events consumed by the main loop, from the terminal, the tick timer and
/// finished exchanges
#[derive(Debug)]
#[allow(dead_code)]
pub enum AppEvent {
    /// Key press event
    Key(crossterm::event::KeyEvent),

    /// Mouse event
    Mouse(crossterm::event::MouseEvent),

    /// Bracketed paste
    Paste(String),

    /// Terminal resize
    Resize(u16, u16),

    /// Animation / expiry tick
    Tick,

    /// A dispatched exchange has completed
    Exchange(ExchangeResult),
}

impl From<ExchangeResult> for AppEvent {
    fn from(result: ExchangeResult) -> Self {
        AppEvent::Exchange(result)
    }
}

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationRole {
    User,
    Assistant,
}

impl ConversationRole {
    pub fn display_name(&self) -> &'static str {
        match self {
            ConversationRole::User => "You",
            ConversationRole::Assistant => "MadAI",
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, ConversationRole::User)
    }
}
