//! Routes one inbound event through the command flows and the passive
//! collector.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::ai::prompt_builder::{mentioned_message_entry, sanitize_custom_internal};
use crate::commands::{Command, CommandParser};
use crate::core::capabilities::{ChatPlatform, CompletionService};
use crate::core::config::SummaryLimits;
use crate::core::models::{ConversationId, InboundEvent};
use crate::core::registry::{Collected, RegistryError, SharedRegistry};
use crate::errors::BotError;
use crate::utils::filters::{format_entry, is_blank, stripped_text, summarizable_messages};

/// Messages fetched by `/summary` when the count cannot be parsed.
pub const DEFAULT_RANGE_COUNT: usize = 50;
/// Threshold used by `/setautosummary` when the count cannot be parsed.
pub const DEFAULT_AUTO_THRESHOLD: usize = 100;

pub const NO_MESSAGES_NOTICE: &str = "No messages to summarize.";
pub const AUTO_SUMMARY_DISABLED: &str = "Auto-summarization disabled";

#[must_use]
pub fn auto_summary_enabled_message(threshold: usize) -> String {
    format!("Auto-summarization enabled with a threshold of {threshold} messages.")
}

#[must_use]
pub fn auto_summary_message(count: usize, summary: &str) -> String {
    format!("Summarization of last {count} messages:\n\n{summary}")
}

/// Which ceiling a clamp notice refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    SummaryLength,
    MessageCount,
    AutoThreshold,
}

impl Limit {
    #[must_use]
    pub fn notice(self, requested: usize, max: usize) -> String {
        match self {
            Limit::SummaryLength => format!(
                "Requested summary length {requested} exceeds the maximum of {max} characters; using {max}."
            ),
            Limit::MessageCount => format!(
                "Requested {requested} messages exceeds the maximum of {max}; summarizing the last {max} messages."
            ),
            Limit::AutoThreshold => format!(
                "Requested threshold {requested} exceeds the maximum of {max} messages; using {max}."
            ),
        }
    }
}

/// Parses a numeric command argument, falling back to `default` when it is
/// missing or does not fit.
#[must_use]
pub fn parse_or(raw: Option<&str>, default: usize) -> usize {
    match raw {
        Some(raw) => raw.parse::<usize>().unwrap_or_else(|e| {
            debug!("Unparsable numeric argument {:?} ({}); using {}", raw, e, default);
            default
        }),
        None => default,
    }
}

pub struct SummaryOrchestrator {
    platform: Arc<dyn ChatPlatform>,
    completion: Arc<dyn CompletionService>,
    registry: Arc<SharedRegistry>,
    parser: CommandParser,
    limits: SummaryLimits,
}

impl SummaryOrchestrator {
    #[must_use]
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        completion: Arc<dyn CompletionService>,
        registry: Arc<SharedRegistry>,
        parser: CommandParser,
        limits: SummaryLimits,
    ) -> Self {
        Self {
            platform,
            completion,
            registry,
            parser,
            limits: limits.normalized(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Runs the matching command flow (if any), then passive collection.
    /// Both always run; the first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns the failure of a chat-platform or completion-service call.
    pub async fn handle_event(&self, event: &InboundEvent) -> Result<(), BotError> {
        let command_result = match self.parser.parse(event.text_or_empty()) {
            Some(command) => self.run_command(event, command).await,
            None => Ok(()),
        };
        let collect_result = self.collect(event).await;
        command_result.and(collect_result)
    }

    async fn run_command(&self, event: &InboundEvent, command: Command) -> Result<(), BotError> {
        match command {
            Command::Summary {
                count,
                length,
                extra_context,
            } => {
                self.summarize_range(event, &count, length.as_deref(), extra_context.as_deref())
                    .await
            }
            Command::SetAutoSummary { count } => self.enable_auto_summary(event, &count).await,
            Command::StopAutoSummary => self.disable_auto_summary(event).await,
            Command::Ask { question } => self.ask(event, &question).await,
        }
    }

    async fn respond(&self, event: &InboundEvent, text: &str) -> Result<(), BotError> {
        match event.thread_root() {
            Some(root) => self.platform.reply(&event.conversation, root, text).await,
            None => self.platform.send(&event.conversation, text).await,
        }
    }

    /// Clamps `requested` to `max`, telling the conversation once if it had to.
    async fn clamp_with_notice(
        &self,
        event: &InboundEvent,
        limit: Limit,
        requested: usize,
        max: usize,
    ) -> Result<usize, BotError> {
        if requested <= max {
            return Ok(requested);
        }
        info!(
            "Clamping {:?} from {} to {} in {}",
            limit, requested, max, event.conversation
        );
        self.respond(event, &limit.notice(requested, max)).await?;
        Ok(max)
    }

    async fn summarize_range(
        &self,
        event: &InboundEvent,
        count: &str,
        length: Option<&str>,
        extra_context: Option<&str>,
    ) -> Result<(), BotError> {
        let requested_length = parse_or(length, self.limits.default_summary_length).max(1);
        let length = self
            .clamp_with_notice(
                event,
                Limit::SummaryLength,
                requested_length,
                self.limits.max_summary_length,
            )
            .await?;

        let requested_count = parse_or(Some(count), DEFAULT_RANGE_COUNT);
        let count = self
            .clamp_with_notice(
                event,
                Limit::MessageCount,
                requested_count,
                self.limits.max_messages_per_summary,
            )
            .await?;

        let history = self
            .platform
            .fetch_messages(&event.conversation, count)
            .await?;
        let kept = summarizable_messages(history);
        if kept.is_empty() {
            return self.respond(event, NO_MESSAGES_NOTICE).await;
        }

        let mut lines = Vec::with_capacity(kept.len());
        for msg in &kept {
            let name = self.platform.sender_name(&msg.sender).await?;
            lines.push(format_entry(&name, stripped_text(msg.text.as_deref())));
        }

        let extra_context = extra_context.map(sanitize_custom_internal);
        info!(
            "Summarizing {} messages from {} (target length {})",
            lines.len(),
            event.conversation,
            length
        );
        let summary = self
            .completion
            .summarize(&lines, length, extra_context.as_deref())
            .await?;
        self.respond(event, &summary).await
    }

    async fn enable_auto_summary(&self, event: &InboundEvent, count: &str) -> Result<(), BotError> {
        let requested = parse_or(Some(count), DEFAULT_AUTO_THRESHOLD);
        let capped = self
            .clamp_with_notice(
                event,
                Limit::AutoThreshold,
                requested,
                self.limits.max_auto_summary_threshold,
            )
            .await?;

        let threshold = self.registry.enable(&event.conversation, capped);
        info!(
            "Auto-summarization enabled in {} with threshold {}",
            event.conversation, threshold
        );
        self.respond(event, &auto_summary_enabled_message(threshold))
            .await
    }

    async fn disable_auto_summary(&self, event: &InboundEvent) -> Result<(), BotError> {
        match self.registry.disable(&event.conversation) {
            Ok(()) => {
                info!("Auto-summarization disabled in {}", event.conversation);
                self.respond(event, AUTO_SUMMARY_DISABLED).await
            }
            Err(RegistryError::NotFound(id)) => {
                debug!("Nothing to stop in {}", id);
                Ok(())
            }
        }
    }

    async fn ask(&self, event: &InboundEvent, question: &str) -> Result<(), BotError> {
        let mut context = Vec::new();
        if let Some(reply_to) = &event.reply_to {
            match self
                .platform
                .fetch_message(&event.conversation, reply_to)
                .await?
            {
                Some(mentioned) => {
                    let text = stripped_text(mentioned.text.as_deref());
                    if !is_blank(text) {
                        context.push(mentioned_message_entry(text));
                    }
                }
                None => warn!(
                    "Replied-to message {} not found in {}",
                    reply_to.as_str(),
                    event.conversation
                ),
            }
        }

        let answer = self.completion.answer(question, &context).await?;
        self.respond(event, &answer).await
    }

    /// Buffers a qualifying message and emits the automatic summary once the
    /// conversation's threshold is reached.
    async fn collect(&self, event: &InboundEvent) -> Result<(), BotError> {
        let conversation = &event.conversation;
        if !self.registry.is_collecting(conversation) {
            return Ok(());
        }

        let stripped = stripped_text(event.text.as_deref());
        if is_blank(stripped) || self.parser.is_command_like(stripped) {
            return Ok(());
        }

        let sender_name = self.platform.sender_name(&event.sender).await?;
        match self
            .registry
            .collect_message(conversation, &sender_name, stripped)
        {
            Collected::Full(batch) => self.emit_auto_summary(conversation, batch).await,
            Collected::Buffered | Collected::Skipped => Ok(()),
        }
    }

    async fn emit_auto_summary(
        &self,
        conversation: &ConversationId,
        batch: Vec<String>,
    ) -> Result<(), BotError> {
        info!(
            "Threshold reached in {}; summarizing {} collected messages",
            conversation,
            batch.len()
        );
        let summary = self
            .completion
            .summarize(&batch, self.limits.default_summary_length, None)
            .await?;
        self.platform
            .send(conversation, &auto_summary_message(batch.len(), &summary))
            .await
    }
}
