//! Conversation UI components for the chat screen

pub mod commands;
pub mod composer;
pub mod history;
pub mod manager;
pub mod typing;

pub use commands::{SlashCommand, get_help_text};
pub use composer::{ComposerResult, ConversationComposer};
pub use history::{ConversationHistory, HistoryView};
pub use manager::{ConversationAction, ConversationManager};
pub use typing::TypingIndicator;
