use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a chat-platform destination (channel, group or DM).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Platform identifier of a single message inside a conversation
/// (a Slack `ts`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef(pub String);

impl MessageRef {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Author of a message as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: String,
    pub username: Option<String>,
}

impl Sender {
    #[must_use]
    pub fn new(id: impl Into<String>, username: Option<String>) -> Self {
        Self {
            id: id.into(),
            username,
        }
    }

    /// Username if the platform has one, otherwise the stable id.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.username.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.id.clone(),
        }
    }
}

/// A message retrieved from conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformMessage {
    pub sender: Sender,
    pub text: Option<String>,
}

/// One inbound event as seen by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub conversation: ConversationId,
    /// The triggering message. Absent when the event came from a slash
    /// command, which has no message of its own to reply to.
    pub message: Option<MessageRef>,
    pub sender: Sender,
    pub text: Option<String>,
    /// Message this event replies to, if any. On Slack this is the thread
    /// parent, so it is also where responses are threaded.
    pub reply_to: Option<MessageRef>,
}

impl InboundEvent {
    #[must_use]
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Message a response should be threaded under: the root of the thread
    /// the event was posted in, else the event's own message.
    #[must_use]
    pub fn thread_root(&self) -> Option<&MessageRef> {
        self.reply_to.as_ref().or(self.message.as_ref())
    }
}
