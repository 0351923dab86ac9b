//! Slack API client module
//!
//! Encapsulates all Slack API interactions with retry logic and error handling,
//! and exposes them to the orchestrator as a [`ChatPlatform`].

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use slack_morphism::hyper_tokio::{SlackClientHyperConnector, SlackHyperClient};
use slack_morphism::prelude::{
    SlackApiChatPostMessageRequest, SlackApiConversationsHistoryRequest, SlackApiUsersInfoRequest,
};
use slack_morphism::{
    SlackApiToken, SlackApiTokenValue, SlackChannelId, SlackCursorId, SlackHistoryMessage,
    SlackMessageContent, SlackUserId,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio_retry::strategy::jitter;
use tokio_retry::{Retry, strategy::ExponentialBackoff};
use tracing::{debug, warn};

use crate::core::capabilities::ChatPlatform;
use crate::core::models::{ConversationId, MessageRef, PlatformMessage, Sender};
use crate::errors::BotError;
use crate::utils::filters::history_to_platform_message;

/// Slack caps `conversations.history` pages at this many messages.
pub const MAX_HISTORY_PAGE: usize = 1000;

/// Page size for the next `conversations.history` call when `remaining`
/// messages are still wanted.
#[must_use]
pub fn history_page_limit(remaining: usize) -> u16 {
    u16::try_from(remaining.clamp(1, MAX_HISTORY_PAGE)).unwrap_or(u16::MAX)
}

// Build the Slack client connector safely without panicking.
// If connector construction fails, store None and surface a BotError at call sites.
static SLACK_CLIENT: std::sync::LazyLock<Option<SlackHyperClient>> =
    std::sync::LazyLock::new(|| match SlackClientHyperConnector::new() {
        Ok(connector) => Some(SlackHyperClient::new(connector)),
        Err(e) => {
            warn!("Failed to create Slack HTTP connector: {}", e);
            None
        }
    });

static HTTP_CLIENT: std::sync::LazyLock<Client> = std::sync::LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| Client::new())
});

/// Slack API client with retry logic and error handling
pub struct SlackClient {
    token: SlackApiToken,
    user_names: Mutex<HashMap<String, String>>,
}

impl SlackClient {
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            token: SlackApiToken::new(SlackApiTokenValue::new(token)),
            user_names: Mutex::new(HashMap::new()),
        }
    }

    fn connector() -> Result<&'static SlackHyperClient, BotError> {
        SLACK_CLIENT.as_ref().ok_or_else(|| {
            BotError::GeneralError("Slack HTTP connector not initialized".to_string())
        })
    }

    async fn with_retry<F, Fut, T>(&self, operation: F) -> Result<T, BotError>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, BotError>> + Send,
        T: Send,
    {
        let strategy = ExponentialBackoff::from_millis(100).map(jitter).take(5);

        Retry::spawn(strategy, operation).await
    }

    /// Slack handle for a user, cached per process. Lookup failures fall back
    /// to the user id so a summary is never blocked on profile data.
    ///
    /// # Errors
    ///
    /// Returns an error only if the Slack connector is unavailable.
    pub async fn get_user_name(&self, user_id: &str) -> Result<String, BotError> {
        if let Some(name) = self.cached_user_name(user_id) {
            return Ok(name);
        }

        let session = Self::connector()?.open_session(&self.token);
        let user_info_req = SlackApiUsersInfoRequest::new(SlackUserId(user_id.to_string()));
        let name = match session.users_info(&user_info_req).await {
            Ok(info) => info
                .user
                .name
                .clone()
                .or_else(|| {
                    info.user
                        .profile
                        .as_ref()
                        .and_then(|p| p.display_name.clone())
                })
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| user_id.to_string()),
            Err(e) => {
                warn!("Failed to fetch user info for {}: {:?}", user_id, e);
                return Ok(user_id.to_string());
            }
        };

        if let Ok(mut cache) = self.user_names.lock() {
            cache.insert(user_id.to_string(), name.clone());
        }
        Ok(name)
    }

    fn cached_user_name(&self, user_id: &str) -> Option<String> {
        self.user_names
            .lock()
            .ok()
            .and_then(|cache| cache.get(user_id).cloned())
    }

    /// Up to `count` most recent messages, newest first (Slack's order),
    /// following the history cursor across pages.
    ///
    /// # Errors
    ///
    /// Returns an error if any page cannot be fetched after retries.
    pub async fn get_recent_messages(
        &self,
        channel_id: &str,
        count: usize,
    ) -> Result<Vec<SlackHistoryMessage>, BotError> {
        let mut messages = Vec::with_capacity(count.min(MAX_HISTORY_PAGE));
        let mut cursor: Option<SlackCursorId> = None;

        while messages.len() < count {
            let limit = history_page_limit(count - messages.len());
            let page_cursor = cursor.clone();
            let page = self
                .with_retry(|| {
                    let page_cursor = page_cursor.clone();
                    async move {
                        let mut request = SlackApiConversationsHistoryRequest::new()
                            .with_channel(SlackChannelId(channel_id.to_string()))
                            .with_limit(limit);
                        if let Some(page_cursor) = page_cursor {
                            request = request.with_cursor(page_cursor);
                        }

                        let session = Self::connector()?.open_session(&self.token);
                        Ok(session.conversations_history(&request).await?)
                    }
                })
                .await?;

            messages.extend(page.messages);
            cursor = page
                .response_metadata
                .and_then(|meta| meta.next_cursor)
                .filter(|next| !next.0.is_empty());
            if cursor.is_none() {
                break;
            }
        }

        messages.truncate(count);
        Ok(messages)
    }

    /// Text and author of the message with timestamp `ts`. Works for thread
    /// parents, which is what a reply points at.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or Slack returns an error.
    pub async fn get_message(
        &self,
        channel_id: &str,
        ts: &str,
    ) -> Result<Option<PlatformMessage>, BotError> {
        let payload = json!({
            "channel": channel_id,
            "ts": ts,
            "limit": 1,
            "inclusive": true
        });

        let body = self.call_slack_api("conversations.replies", &payload).await?;

        let found = body
            .get("messages")
            .and_then(Value::as_array)
            .and_then(|arr| {
                arr.iter()
                    .find(|m| m.get("ts").and_then(Value::as_str) == Some(ts))
            })
            .map(|m| PlatformMessage {
                sender: Sender::new(
                    m.get("user")
                        .or_else(|| m.get("bot_id"))
                        .and_then(Value::as_str)
                        .unwrap_or_default(),
                    None,
                ),
                text: m.get("text").and_then(Value::as_str).map(str::to_string),
            });

        Ok(found)
    }

    /// # Errors
    pub async fn post_message(&self, channel_id: &str, message: &str) -> Result<(), BotError> {
        self.with_retry(|| async {
            let post_req = SlackApiChatPostMessageRequest::new(
                SlackChannelId(channel_id.to_string()),
                SlackMessageContent::new().with_text(message.to_string()),
            );

            let session = Self::connector()?.open_session(&self.token);
            session.chat_post_message(&post_req).await?;

            Ok(())
        })
        .await
    }

    /// Post a plain-text reply into a specific thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or Slack returns an error.
    pub async fn post_message_in_thread(
        &self,
        channel_id: &str,
        thread_ts: &str,
        message: &str,
    ) -> Result<(), BotError> {
        let payload = json!({
            "channel": channel_id,
            "text": message,
            "thread_ts": thread_ts,
        });

        self.call_slack_api("chat.postMessage", &payload).await?;
        Ok(())
    }

    async fn call_slack_api(&self, method: &str, payload: &Value) -> Result<Value, BotError> {
        self.with_retry(|| async {
            let resp = HTTP_CLIENT
                .post(format!("https://slack.com/api/{method}"))
                .bearer_auth(&self.token.token_value.0)
                .json(payload)
                .send()
                .await
                .map_err(|e| BotError::GeneralError(format!("{method} HTTP: {e}")))?;

            if !resp.status().is_success() {
                return Err(BotError::ApiError(format!(
                    "{method} HTTP {}",
                    resp.status()
                )));
            }

            let body: Value = resp
                .json()
                .await
                .map_err(|e| BotError::GeneralError(format!("{method} JSON parse error: {e}")))?;

            if !body.get("ok").and_then(Value::as_bool).unwrap_or(false) {
                return Err(BotError::ApiError(format!(
                    "{method} error: {}",
                    body.get("error")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                )));
            }

            Ok(body)
        })
        .await
    }
}

#[async_trait]
impl ChatPlatform for SlackClient {
    async fn fetch_messages(
        &self,
        conversation: &ConversationId,
        limit: usize,
    ) -> Result<Vec<PlatformMessage>, BotError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let raw = self.get_recent_messages(conversation.as_str(), limit).await?;
        let mut messages: Vec<PlatformMessage> =
            raw.into_iter().map(history_to_platform_message).collect();
        messages.reverse();
        debug!(
            "Fetched {} messages from {} (limit {})",
            messages.len(),
            conversation,
            limit
        );
        Ok(messages)
    }

    async fn fetch_message(
        &self,
        conversation: &ConversationId,
        message: &MessageRef,
    ) -> Result<Option<PlatformMessage>, BotError> {
        self.get_message(conversation.as_str(), message.as_str())
            .await
    }

    async fn sender_name(&self, sender: &Sender) -> Result<String, BotError> {
        if sender.username.as_deref().is_some_and(|n| !n.trim().is_empty()) {
            return Ok(sender.display_name());
        }
        self.get_user_name(&sender.id).await
    }

    async fn send(&self, conversation: &ConversationId, text: &str) -> Result<(), BotError> {
        self.post_message(conversation.as_str(), text).await
    }

    async fn reply(
        &self,
        conversation: &ConversationId,
        message: &MessageRef,
        text: &str,
    ) -> Result<(), BotError> {
        self.post_message_in_thread(conversation.as_str(), message.as_str(), text)
            .await
    }
}
