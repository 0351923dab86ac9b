//! Socket Mode listener: turns Slack push and slash-command events into
//! [`InboundEvent`]s and hands them to the [`EventDispatcher`].

use slack_morphism::prelude::*;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::core::models::{ConversationId, InboundEvent, MessageRef, Sender};
use crate::errors::BotError;
use crate::worker::EventDispatcher;

/// State shared with the Socket Mode callbacks.
pub struct ListenerState {
    pub dispatcher: Arc<EventDispatcher>,
}

/// Subtypes that still carry text a person wrote: file captions, thread
/// replies echoed to the channel, and `/me` messages.
fn is_user_subtype(subtype: &SlackMessageEventType) -> bool {
    matches!(
        subtype,
        SlackMessageEventType::FileShare
            | SlackMessageEventType::ThreadBroadcast
            | SlackMessageEventType::MeMessage
    )
}

/// Converts a channel message into an inbound event. Bot messages and
/// system subtypes (edits, deletions, joins) are not user input and yield
/// `None`.
#[must_use]
pub fn message_event_to_inbound(event: &SlackMessageEvent) -> Option<InboundEvent> {
    if event.sender.bot_id.is_some() {
        return None;
    }
    if event.subtype.as_ref().is_some_and(|s| !is_user_subtype(s)) {
        return None;
    }
    let channel = event.origin.channel.as_ref()?;
    let user = event.sender.user.as_ref()?;
    let ts = &event.origin.ts;

    let reply_to = event
        .origin
        .thread_ts
        .as_ref()
        .filter(|thread_ts| thread_ts.0 != ts.0)
        .map(|thread_ts| MessageRef(thread_ts.0.clone()));

    Some(InboundEvent {
        conversation: ConversationId(channel.0.clone()),
        message: Some(MessageRef(ts.0.clone())),
        sender: Sender::new(user.0.clone(), event.sender.username.clone()),
        text: event.content.as_ref().and_then(|c| c.text.clone()),
        reply_to,
    })
}

/// Converts a slash-command invocation into an inbound event whose text is
/// the command line as the user typed it.
#[must_use]
pub fn command_event_to_inbound(event: &SlackCommandEvent) -> InboundEvent {
    command_to_inbound(
        &event.channel_id.0,
        &event.user_id.0,
        &event.command.0,
        event.text.as_deref(),
    )
}

#[must_use]
pub fn command_to_inbound(
    channel_id: &str,
    user_id: &str,
    command: &str,
    args: Option<&str>,
) -> InboundEvent {
    let args = args.map(str::trim).unwrap_or_default();
    let text = if args.is_empty() {
        command.to_string()
    } else {
        format!("{command} {args}")
    };

    InboundEvent {
        conversation: ConversationId::new(channel_id),
        message: None,
        sender: Sender::new(user_id, None),
        text: Some(text),
        reply_to: None,
    }
}

async fn dispatcher_from(
    states: &SlackClientEventsUserState,
) -> Result<Arc<EventDispatcher>, Box<dyn std::error::Error + Send + Sync>> {
    let storage = states.read().await;
    let state = storage
        .get_user_state::<ListenerState>()
        .ok_or("listener state missing")?;
    Ok(Arc::clone(&state.dispatcher))
}

async fn on_push_event(
    event: SlackPushEventCallback,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> UserCallbackResult<()> {
    let SlackEventCallbackBody::Message(message) = &event.event else {
        debug!("Ignoring push event: {:?}", event.event);
        return Ok(());
    };
    let Some(inbound) = message_event_to_inbound(message) else {
        return Ok(());
    };

    let dispatcher = dispatcher_from(&states).await?;
    dispatcher.dispatch(inbound).await?;
    Ok(())
}

async fn on_command_event(
    event: SlackCommandEvent,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> Result<SlackCommandEventResponse, Box<dyn std::error::Error + Send + Sync>> {
    info!(
        "Received slash command {} in {}",
        event.command.0, event.channel_id.0
    );
    let dispatcher = dispatcher_from(&states).await?;
    dispatcher.dispatch(command_event_to_inbound(&event)).await?;

    Ok(command_ack())
}

/// Empty acknowledgement; whatever the command produces is posted by the
/// worker, and some commands produce nothing at all.
#[must_use]
pub fn command_ack() -> SlackCommandEventResponse {
    SlackCommandEventResponse::new(SlackMessageContent::new())
}

fn on_error(
    err: Box<dyn std::error::Error + Send + Sync>,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> HttpStatusCode {
    error!("Socket Mode listener error: {}", err);
    // Acknowledge anyway so Slack does not redeliver the event.
    HttpStatusCode::OK
}

/// Connects to Slack over Socket Mode and serves events until the process
/// is asked to stop.
///
/// # Errors
///
/// Returns an error if the HTTP connector cannot be built or the Socket Mode
/// connection cannot be opened.
pub async fn run_socket_mode(
    app_token: &str,
    dispatcher: Arc<EventDispatcher>,
) -> Result<(), BotError> {
    let connector = SlackClientHyperConnector::new()
        .map_err(|e| BotError::GeneralError(format!("Failed to create Slack connector: {e}")))?;
    let client = Arc::new(SlackHyperClient::new(connector));

    let callbacks = SlackSocketModeListenerCallbacks::new()
        .with_command_events(on_command_event)
        .with_push_events(on_push_event);

    let environment = Arc::new(
        SlackClientEventsListenerEnvironment::new(client)
            .with_error_handler(on_error)
            .with_user_state(ListenerState { dispatcher }),
    );

    let listener = SlackClientSocketModeListener::new(
        &SlackClientSocketModeConfig::new(),
        environment,
        callbacks,
    );

    let token = SlackApiToken::new(SlackApiTokenValue::new(app_token.to_string()));
    listener.listen_for(&token).await?;
    info!("Socket Mode connection established");
    listener.serve().await;
    Ok(())
}
