//! Conversation model
//!
//! Ordered, append-only list of chat messages for one widget instance.
//! A reply in flight is represented by a loading placeholder, which is
//! always the last message and never more than one.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Site visitor
    User,
    /// Chat backend
    Bot,
}

/// A displayed chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message text
    pub content: String,
    /// Author
    pub sender: Sender,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Placeholder waiting for a reply
    pub is_loading: bool,
}

impl Message {
    /// Create a message stamped now
    pub fn new(content: impl Into<String>, sender: Sender) -> Self {
        Self {
            content: content.into(),
            sender,
            timestamp: Utc::now(),
            is_loading: false,
        }
    }

    /// Empty bot message marking a pending reply
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::new(String::new(), Sender::Bot)
        }
    }
}

/// Entry of a conversation history as returned by the backend
///
/// The backend reports bot messages as `ai`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// `user`, or `ai` / `bot` / `assistant`
    pub sender: String,
    /// Message text
    pub content: String,
}

impl HistoryEntry {
    /// Create an entry
    pub fn new(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
        }
    }

    /// Map the wire sender onto [`Sender`]
    pub fn sender(&self) -> Option<Sender> {
        match self.sender.as_str() {
            "user" => Some(Sender::User),
            "ai" | "bot" | "assistant" => Some(Sender::Bot),
            _ => None,
        }
    }
}

/// Ordered messages of one widget
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages in display order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether there are no messages
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether a reply placeholder is pending
    pub fn has_pending_reply(&self) -> bool {
        self.messages.last().is_some_and(|m| m.is_loading)
    }

    /// Append a bot message (greeting)
    pub fn push_bot(&mut self, content: impl Into<String>) -> usize {
        self.push(Message::new(content, Sender::Bot))
    }

    /// Append a user message
    pub fn push_user(&mut self, content: impl Into<String>) -> Result<usize> {
        if self.has_pending_reply() {
            return Err(Error::SendInProgress);
        }
        Ok(self.push(Message::new(content, Sender::User)))
    }

    /// Append the reply placeholder, returning its index
    pub fn begin_reply(&mut self) -> Result<usize> {
        if self.has_pending_reply() {
            return Err(Error::SendInProgress);
        }
        Ok(self.push(Message::loading()))
    }

    /// Fill the placeholder in place with the reply
    pub fn complete_reply(&mut self, content: impl Into<String>) -> Option<usize> {
        let index = self.pending_index()?;
        let message = &mut self.messages[index];
        message.content = content.into();
        message.is_loading = false;
        message.timestamp = Utc::now();
        Some(index)
    }

    /// Drop the placeholder after a failed request
    pub fn fail_reply(&mut self) -> Option<usize> {
        let index = self.pending_index()?;
        self.messages.pop();
        Some(index)
    }

    /// Append history entries, returning the indices of the added messages
    ///
    /// Entries with an unknown sender or empty content are skipped. Refused
    /// while a reply is pending so the placeholder stays last.
    pub fn inject_history(&mut self, entries: &[HistoryEntry]) -> Result<Vec<usize>> {
        if self.has_pending_reply() {
            return Err(Error::SendInProgress);
        }

        let mut added = Vec::new();
        for entry in entries {
            let Some(sender) = entry.sender() else {
                tracing::debug!("Skipping history entry from unknown sender '{}'", entry.sender);
                continue;
            };
            if entry.content.trim().is_empty() {
                continue;
            }
            added.push(self.push(Message::new(entry.content.clone(), sender)));
        }
        Ok(added)
    }

    /// Remove all messages
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    fn pending_index(&self) -> Option<usize> {
        if self.has_pending_reply() {
            Some(self.messages.len() - 1)
        } else {
            None
        }
    }

    fn push(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }
}
