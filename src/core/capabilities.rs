//! The two outside services the bot depends on.
//!
//! The orchestrator only ever talks to these traits; the Slack and `OpenAI`
//! adapters implement them for production and tests provide in-memory fakes.

use async_trait::async_trait;

use super::models::{ConversationId, MessageRef, PlatformMessage, Sender};
use crate::errors::BotError;

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Up to `limit` most recent messages, oldest first.
    async fn fetch_messages(
        &self,
        conversation: &ConversationId,
        limit: usize,
    ) -> Result<Vec<PlatformMessage>, BotError>;

    /// A single message by reference, `None` if it no longer exists.
    async fn fetch_message(
        &self,
        conversation: &ConversationId,
        message: &MessageRef,
    ) -> Result<Option<PlatformMessage>, BotError>;

    /// Display name for a sender: username if present, else its stable id.
    async fn sender_name(&self, sender: &Sender) -> Result<String, BotError>;

    /// Posts a new message into the conversation.
    async fn send(&self, conversation: &ConversationId, text: &str) -> Result<(), BotError>;

    /// Replies to a specific message.
    async fn reply(
        &self,
        conversation: &ConversationId,
        message: &MessageRef,
        text: &str,
    ) -> Result<(), BotError>;
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Summarizes chat lines, aiming for roughly `target_length` characters.
    async fn summarize(
        &self,
        messages: &[String],
        target_length: usize,
        extra_context: Option<&str>,
    ) -> Result<String, BotError>;

    async fn answer(&self, query: &str, context: &[String]) -> Result<String, BotError>;
}
