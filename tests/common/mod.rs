#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use recap::commands::CommandParser;
use recap::core::capabilities::{ChatPlatform, CompletionService};
use recap::core::config::SummaryLimits;
use recap::core::models::{ConversationId, InboundEvent, MessageRef, PlatformMessage, Sender};
use recap::core::registry::SharedRegistry;
use recap::errors::BotError;
use recap::worker::SummaryOrchestrator;

/// What the fake platform was asked to post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Send {
        conversation: String,
        text: String,
    },
    Reply {
        conversation: String,
        message: String,
        text: String,
    },
}

impl Outbound {
    pub fn text(&self) -> &str {
        match self {
            Outbound::Send { text, .. } | Outbound::Reply { text, .. } => text,
        }
    }
}

#[derive(Default)]
pub struct FakePlatform {
    pub history: Mutex<HashMap<String, Vec<PlatformMessage>>>,
    pub messages: Mutex<HashMap<String, PlatformMessage>>,
    pub usernames: Mutex<HashMap<String, String>>,
    pub fetch_limits: Mutex<Vec<usize>>,
    pub outbound: Mutex<Vec<Outbound>>,
}

impl FakePlatform {
    pub fn with_history(conversation: &str, history: Vec<PlatformMessage>) -> Self {
        let platform = Self::default();
        platform
            .history
            .lock()
            .unwrap()
            .insert(conversation.to_string(), history);
        platform
    }

    pub fn add_message(&self, ts: &str, text: &str) {
        self.messages.lock().unwrap().insert(
            ts.to_string(),
            PlatformMessage {
                sender: Sender::new("U0", None),
                text: Some(text.to_string()),
            },
        );
    }

    pub fn add_username(&self, id: &str, name: &str) {
        self.usernames
            .lock()
            .unwrap()
            .insert(id.to_string(), name.to_string());
    }

    pub fn outbound(&self) -> Vec<Outbound> {
        self.outbound.lock().unwrap().clone()
    }

    pub fn fetch_limits(&self) -> Vec<usize> {
        self.fetch_limits.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn fetch_messages(
        &self,
        conversation: &ConversationId,
        limit: usize,
    ) -> Result<Vec<PlatformMessage>, BotError> {
        self.fetch_limits.lock().unwrap().push(limit);
        let history = self
            .history
            .lock()
            .unwrap()
            .get(conversation.as_str())
            .cloned()
            .unwrap_or_default();
        let skip = history.len().saturating_sub(limit);
        Ok(history.into_iter().skip(skip).collect())
    }

    async fn fetch_message(
        &self,
        _conversation: &ConversationId,
        message: &MessageRef,
    ) -> Result<Option<PlatformMessage>, BotError> {
        Ok(self.messages.lock().unwrap().get(message.as_str()).cloned())
    }

    async fn sender_name(&self, sender: &Sender) -> Result<String, BotError> {
        if sender.username.is_some() {
            return Ok(sender.display_name());
        }
        Ok(self
            .usernames
            .lock()
            .unwrap()
            .get(&sender.id)
            .cloned()
            .unwrap_or_else(|| sender.id.clone()))
    }

    async fn send(&self, conversation: &ConversationId, text: &str) -> Result<(), BotError> {
        self.outbound.lock().unwrap().push(Outbound::Send {
            conversation: conversation.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn reply(
        &self,
        conversation: &ConversationId,
        message: &MessageRef,
        text: &str,
    ) -> Result<(), BotError> {
        self.outbound.lock().unwrap().push(Outbound::Reply {
            conversation: conversation.to_string(),
            message: message.as_str().to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizeCall {
    pub messages: Vec<String>,
    pub target_length: usize,
    pub extra_context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerCall {
    pub query: String,
    pub context: Vec<String>,
}

#[derive(Default)]
pub struct FakeCompletion {
    pub fail: bool,
    pub summarize_calls: Mutex<Vec<SummarizeCall>>,
    pub answer_calls: Mutex<Vec<AnswerCall>>,
}

impl FakeCompletion {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn summarize_calls(&self) -> Vec<SummarizeCall> {
        self.summarize_calls.lock().unwrap().clone()
    }

    pub fn answer_calls(&self) -> Vec<AnswerCall> {
        self.answer_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for FakeCompletion {
    async fn summarize(
        &self,
        messages: &[String],
        target_length: usize,
        extra_context: Option<&str>,
    ) -> Result<String, BotError> {
        self.summarize_calls.lock().unwrap().push(SummarizeCall {
            messages: messages.to_vec(),
            target_length,
            extra_context: extra_context.map(str::to_string),
        });
        if self.fail {
            return Err(BotError::OpenAIError("service unavailable".to_string()));
        }
        Ok(format!("summary of {} messages", messages.len()))
    }

    async fn answer(&self, query: &str, context: &[String]) -> Result<String, BotError> {
        self.answer_calls.lock().unwrap().push(AnswerCall {
            query: query.to_string(),
            context: context.to_vec(),
        });
        if self.fail {
            return Err(BotError::OpenAIError("service unavailable".to_string()));
        }
        Ok(format!("answer to {query}"))
    }
}

pub fn test_limits() -> SummaryLimits {
    SummaryLimits {
        default_summary_length: 300,
        max_summary_length: 1000,
        max_messages_per_summary: 100,
        max_auto_summary_threshold: 50,
    }
}

pub struct Harness {
    pub platform: Arc<FakePlatform>,
    pub completion: Arc<FakeCompletion>,
    pub orchestrator: Arc<SummaryOrchestrator>,
}

impl Harness {
    pub fn new(platform: FakePlatform, completion: FakeCompletion) -> Self {
        let platform = Arc::new(platform);
        let completion = Arc::new(completion);
        let orchestrator = Arc::new(SummaryOrchestrator::new(
            platform.clone(),
            completion.clone(),
            Arc::new(SharedRegistry::new(test_limits().max_auto_summary_threshold)),
            CommandParser::new("!ask").unwrap(),
            test_limits(),
        ));
        Self {
            platform,
            completion,
            orchestrator,
        }
    }

    pub fn default_fakes() -> Self {
        Self::new(FakePlatform::default(), FakeCompletion::default())
    }
}

pub fn user_msg(user: &str, text: Option<&str>) -> PlatformMessage {
    PlatformMessage {
        sender: Sender::new(user, None),
        text: text.map(str::to_string),
    }
}

/// A plain message event with its own message id.
pub fn event(conversation: &str, user: &str, ts: &str, text: &str) -> InboundEvent {
    InboundEvent {
        conversation: ConversationId::from(conversation),
        message: Some(MessageRef(ts.to_string())),
        sender: Sender::new(user, Some(user.to_string())),
        text: Some(text.to_string()),
        reply_to: None,
    }
}
