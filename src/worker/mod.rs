//! Event handling: the summary orchestrator and the per-conversation
//! dispatcher that feeds it.

pub mod dispatcher;
pub mod orchestrator;

// Re-export the main types for convenience
pub use dispatcher::EventDispatcher;
pub use orchestrator::SummaryOrchestrator;
