//! In-memory conversation store

use chrono::{DateTime, Utc};

use crate::events::ConversationRole;

/// A single chat turn. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: String,
    text: String,
    role: ConversationRole,
    timestamp: DateTime<Utc>,
}

impl Message {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn role(&self) -> ConversationRole {
        self.role
    }

    pub fn is_user(&self) -> bool {
        self.role.is_user()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Append-only, creation-ordered list of messages for one client run
#[derive(Debug, Clone)]
pub struct ConversationStore {
    messages: Vec<Message>,
    next_seq: u64,
}

impl ConversationStore {
    /// Create a store seeded with the assistant greeting
    pub fn new(greeting: impl Into<String>) -> Self {
        let mut store = Self {
            messages: Vec::new(),
            next_seq: 0,
        };
        store.append(ConversationRole::Assistant, greeting);
        store
    }

    /// Add a message at the end of the sequence
    pub fn append(&mut self, role: ConversationRole, text: impl Into<String>) -> &Message {
        let timestamp = Utc::now();
        // Millisecond timestamps collide for back-to-back appends, the
        // sequence suffix keeps ids unique.
        let id = format!("{}-{}", timestamp.timestamp_millis(), self.next_seq);
        self.next_seq += 1;

        self.messages.push(Message {
            id,
            text: text.into(),
            role,
            timestamp,
        });
        &self.messages[self.messages.len() - 1]
    }

    /// All messages in creation order
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}
