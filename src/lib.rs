/// Recap - a chat bot that summarizes conversations on demand and on a
/// rolling message threshold, and answers one-shot questions.
///
/// # Architecture
///
/// - [`core::registry`] tracks which conversations are collecting messages
///   for an automatic summary and holds their buffers.
/// - [`worker::SummaryOrchestrator`] classifies each inbound event as a
///   command or a plain message and runs the matching flow.
/// - [`worker::EventDispatcher`] gives every conversation its own ordered
///   queue so events of one conversation are handled one at a time.
/// - [`slack`] and [`ai`] adapt Slack (via slack-morphism, Socket Mode) and
///   `OpenAI` to the [`core::capabilities`] traits.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use recap::ai::LlmClient;
/// use recap::commands::CommandParser;
/// use recap::core::config::AppConfig;
/// use recap::core::registry::SharedRegistry;
/// use recap::slack::SlackClient;
/// use recap::worker::{EventDispatcher, SummaryOrchestrator};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     recap::setup_logging();
///     let config = AppConfig::from_env()?;
///
///     let orchestrator = SummaryOrchestrator::new(
///         Arc::new(SlackClient::new(config.slack_bot_token.clone())),
///         Arc::new(LlmClient::new(
///             config.openai_api_key.clone(),
///             config.openai_org_id.clone(),
///             config.model_name(),
///         )),
///         Arc::new(SharedRegistry::new(config.limits.max_auto_summary_threshold)),
///         CommandParser::new(&config.ask_trigger)?,
///         config.limits,
///     );
///     let dispatcher = Arc::new(EventDispatcher::new(Arc::new(orchestrator)));
///     recap::slack::run_socket_mode(&config.slack_app_token, dispatcher).await?;
///     Ok(())
/// }
/// ```
// Module declarations
pub mod ai;
pub mod commands;
pub mod core;
pub mod errors;
pub mod slack;
pub mod utils;
pub mod worker;

pub use errors::BotError;

/// Configure structured logging with JSON output.
///
/// The level comes from `RUST_LOG` and defaults to `info`. Calling this more
/// than once is harmless; only the first call installs the subscriber.
///
/// # Example
///
/// ```
/// recap::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
