//! Per-conversation event queues.
//!
//! Each conversation gets one ordered queue drained by a single worker task,
//! so the append -> check -> drain sequence of one conversation never
//! interleaves with itself while other conversations run in parallel.

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info_span, warn};
use uuid::Uuid;

use super::orchestrator::SummaryOrchestrator;
use crate::core::models::{ConversationId, InboundEvent};
use crate::errors::BotError;

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

struct Worker {
    tx: mpsc::Sender<InboundEvent>,
    handle: JoinHandle<()>,
}

pub struct EventDispatcher {
    orchestrator: Arc<SummaryOrchestrator>,
    workers: Mutex<HashMap<ConversationId, Worker>>,
    capacity: usize,
}

impl EventDispatcher {
    #[must_use]
    pub fn new(orchestrator: Arc<SummaryOrchestrator>) -> Self {
        Self::with_capacity(orchestrator, DEFAULT_QUEUE_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(orchestrator: Arc<SummaryOrchestrator>, capacity: usize) -> Self {
        Self {
            orchestrator,
            workers: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Queues `event` behind earlier events of the same conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the conversation's worker could not accept the
    /// event even after being restarted.
    pub async fn dispatch(&self, event: InboundEvent) -> Result<(), BotError> {
        let tx = self.sender_for(&event.conversation);
        let event = match tx.send(event).await {
            Ok(()) => return Ok(()),
            Err(mpsc::error::SendError(event)) => event,
        };

        // The worker died (a handler panicked); start a fresh one.
        warn!(
            "Worker for {} is gone; restarting it",
            event.conversation
        );
        let tx = self.sender_for(&event.conversation);
        tx.send(event).await.map_err(|e| {
            BotError::GeneralError(format!(
                "Failed to queue event for {}",
                e.0.conversation
            ))
        })
    }

    /// Number of conversations that currently own a worker.
    #[must_use]
    pub fn active_conversations(&self) -> usize {
        self.lock_workers().len()
    }

    /// Closes every queue and waits for the workers to finish what they hold.
    pub async fn shutdown(&self) {
        let workers: Vec<Worker> = self.lock_workers().drain().map(|(_, w)| w).collect();
        let handles = workers
            .into_iter()
            .map(|Worker { tx, handle }| {
                drop(tx);
                handle
            })
            .collect::<Vec<_>>();
        for result in join_all(handles).await {
            if let Err(e) = result {
                error!("Conversation worker ended abnormally: {}", e);
            }
        }
    }

    fn lock_workers(&self) -> std::sync::MutexGuard<'_, HashMap<ConversationId, Worker>> {
        self.workers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Sender for the conversation's live worker, spawning one if there is
    /// none or the previous one has stopped.
    fn sender_for(&self, conversation: &ConversationId) -> mpsc::Sender<InboundEvent> {
        let mut workers = self.lock_workers();
        if let Some(worker) = workers.get(conversation)
            && !worker.tx.is_closed()
        {
            return worker.tx.clone();
        }

        let (tx, rx) = mpsc::channel(self.capacity);
        let handle = tokio::spawn(run_worker(
            conversation.clone(),
            Arc::clone(&self.orchestrator),
            rx,
        ));
        workers.insert(
            conversation.clone(),
            Worker {
                tx: tx.clone(),
                handle,
            },
        );
        tx
    }
}

async fn run_worker(
    conversation: ConversationId,
    orchestrator: Arc<SummaryOrchestrator>,
    mut rx: mpsc::Receiver<InboundEvent>,
) {
    while let Some(event) = rx.recv().await {
        let span = info_span!(
            "event",
            correlation_id = %Uuid::new_v4(),
            conversation = %conversation
        );
        if let Err(e) = orchestrator.handle_event(&event).instrument(span).await {
            error!("Failed to handle event in {}: {}", conversation, e);
        }
    }
}
