//! Text filtering helpers shared by the orchestrator and the Slack adapter.

pub mod filters;
