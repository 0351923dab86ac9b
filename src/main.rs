use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use recap::ai::LlmClient;
use recap::commands::CommandParser;
use recap::core::config::AppConfig;
use recap::core::registry::SharedRegistry;
use recap::slack::{SlackClient, run_socket_mode};
use recap::worker::{EventDispatcher, SummaryOrchestrator};

/// Pause before reconnecting after the listener fails.
const RESTART_DELAY: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    recap::setup_logging();

    let config = AppConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("Failed to load configuration")?;

    let platform = Arc::new(SlackClient::new(config.slack_bot_token.clone()));
    let completion = Arc::new(LlmClient::new(
        config.openai_api_key.clone(),
        config.openai_org_id.clone(),
        config.model_name(),
    ));
    let registry = Arc::new(SharedRegistry::new(
        config.limits.max_auto_summary_threshold,
    ));
    let parser = CommandParser::new(&config.ask_trigger)?;
    info!(
        "Bot is starting (ask trigger {:?}, limits {:?})",
        parser.ask_trigger(),
        config.limits
    );

    let orchestrator = Arc::new(SummaryOrchestrator::new(
        platform,
        completion,
        registry,
        parser,
        config.limits,
    ));
    let dispatcher = Arc::new(EventDispatcher::new(orchestrator));

    // Registry state lives as long as this process; only the listener is
    // restarted when it fails.
    loop {
        let result = tokio::select! {
            result = run_socket_mode(&config.slack_app_token, Arc::clone(&dispatcher)) => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received; shutting down");
                break;
            }
        };
        match result {
            Ok(()) => {
                info!("Listener stopped; shutting down");
                break;
            }
            Err(e) => {
                error!("Listener failed: {}; restarting in {:?}", e, RESTART_DELAY);
                tokio::time::sleep(RESTART_DELAY).await;
            }
        }
    }

    dispatcher.shutdown().await;
    Ok(())
}
