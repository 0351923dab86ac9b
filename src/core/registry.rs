//! Per-conversation collection state for automatic summaries.
//!
//! [`ConversationRegistry`] is a plain owned map with no internal locking;
//! callers that share it across tasks go through [`SharedRegistry`], which
//! holds a mutex only for the duration of one synchronous operation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

use super::models::ConversationId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("No collection state for conversation {0}")]
    NotFound(ConversationId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationState {
    pub collecting: bool,
    pub buffer: Vec<String>,
    pub threshold: usize,
}

impl ConversationState {
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.threshold
    }
}

#[derive(Debug)]
pub struct ConversationRegistry {
    chats: HashMap<ConversationId, ConversationState>,
    max_threshold: usize,
}

impl ConversationRegistry {
    #[must_use]
    pub fn new(max_threshold: usize) -> Self {
        Self {
            chats: HashMap::new(),
            max_threshold: max_threshold.max(1),
        }
    }

    #[must_use]
    pub fn max_threshold(&self) -> usize {
        self.max_threshold
    }

    /// Starts (or restarts) collection with an empty buffer and returns the
    /// threshold actually stored.
    pub fn enable(&mut self, id: &ConversationId, threshold: usize) -> usize {
        let threshold = threshold.clamp(1, self.max_threshold);
        let state = self
            .chats
            .entry(id.clone())
            .or_insert_with(|| ConversationState {
                collecting: false,
                buffer: Vec::new(),
                threshold,
            });
        state.collecting = true;
        state.buffer.clear();
        state.threshold = threshold;
        threshold
    }

    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if collection was never enabled here.
    pub fn disable(&mut self, id: &ConversationId) -> Result<(), RegistryError> {
        let state = self.lookup(id)?;
        state.buffer.clear();
        state.collecting = false;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if collection was never enabled here.
    pub fn lookup(&mut self, id: &ConversationId) -> Result<&mut ConversationState, RegistryError> {
        self.chats
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// Appends `"{sender_name}: {text}"`. The `collecting` flag is not
    /// consulted; that gate belongs to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if collection was never enabled here.
    pub fn append(
        &mut self,
        id: &ConversationId,
        sender_name: &str,
        text: &str,
    ) -> Result<(), RegistryError> {
        let state = self.lookup(id)?;
        state.buffer.push(format!("{sender_name}: {text}"));
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if collection was never enabled here.
    pub fn is_full(&self, id: &ConversationId) -> Result<bool, RegistryError> {
        self.chats
            .get(id)
            .map(ConversationState::is_full)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// Takes the buffered entries, leaving the buffer empty.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if collection was never enabled here.
    pub fn drain(&mut self, id: &ConversationId) -> Result<Vec<String>, RegistryError> {
        let state = self.lookup(id)?;
        Ok(std::mem::take(&mut state.buffer))
    }

    /// Absent conversations are not collecting.
    #[must_use]
    pub fn is_collecting(&self, id: &ConversationId) -> bool {
        self.chats.get(id).is_some_and(|state| state.collecting)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chats.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }
}

/// Outcome of feeding one message to a collecting conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collected {
    /// Conversation is unknown or not collecting; nothing was stored.
    Skipped,
    /// Stored; the buffer is still below its threshold.
    Buffered,
    /// Stored and the buffer reached its threshold; these entries were drained.
    Full(Vec<String>),
}

/// Registry shared between conversation workers.
#[derive(Debug)]
pub struct SharedRegistry {
    inner: Mutex<ConversationRegistry>,
}

impl SharedRegistry {
    #[must_use]
    pub fn new(max_threshold: usize) -> Self {
        Self {
            inner: Mutex::new(ConversationRegistry::new(max_threshold)),
        }
    }

    /// Locks the registry. A poisoned lock is recovered: every registry
    /// operation leaves the map consistent before it can panic.
    pub fn lock(&self) -> MutexGuard<'_, ConversationRegistry> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn enable(&self, id: &ConversationId, threshold: usize) -> usize {
        self.lock().enable(id, threshold)
    }

    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if collection was never enabled here.
    pub fn disable(&self, id: &ConversationId) -> Result<(), RegistryError> {
        self.lock().disable(id)
    }

    #[must_use]
    pub fn is_collecting(&self, id: &ConversationId) -> bool {
        self.lock().is_collecting(id)
    }

    /// Runs append, the fullness check and (when full) the drain under a
    /// single lock acquisition.
    pub fn collect_message(&self, id: &ConversationId, sender_name: &str, text: &str) -> Collected {
        let mut registry = self.lock();
        if !registry.is_collecting(id) {
            return Collected::Skipped;
        }
        if registry.append(id, sender_name, text).is_err() {
            return Collected::Skipped;
        }
        match registry.is_full(id) {
            Ok(true) => registry
                .drain(id)
                .map_or(Collected::Skipped, Collected::Full),
            _ => Collected::Buffered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(id: &str) -> ConversationId {
        ConversationId::from(id)
    }

    #[test]
    fn enable_clamps_threshold_into_range() {
        let mut registry = ConversationRegistry::new(10);
        assert_eq!(registry.enable(&chat("a"), 0), 1);
        assert_eq!(registry.enable(&chat("a"), 50), 10);
        assert_eq!(registry.enable(&chat("a"), 7), 7);
    }

    #[test]
    fn zero_max_threshold_is_raised_to_one() {
        let registry = ConversationRegistry::new(0);
        assert_eq!(registry.max_threshold(), 1);
    }

    #[test]
    fn re_enable_resets_buffer() {
        let mut registry = ConversationRegistry::new(10);
        let id = chat("a");
        registry.enable(&id, 5);
        registry.append(&id, "alice", "hi").unwrap();
        registry.enable(&id, 3);

        let state = registry.lookup(&id).unwrap();
        assert!(state.collecting);
        assert!(state.buffer.is_empty());
        assert_eq!(state.threshold, 3);
    }

    #[test]
    fn disable_leaves_residual_entry() {
        let mut registry = ConversationRegistry::new(10);
        let id = chat("a");
        registry.enable(&id, 5);
        registry.append(&id, "alice", "hi").unwrap();
        registry.disable(&id).unwrap();

        assert_eq!(registry.len(), 1);
        let state = registry.lookup(&id).unwrap();
        assert!(!state.collecting);
        assert!(state.buffer.is_empty());

        // disabling twice is fine
        assert!(registry.disable(&id).is_ok());
    }

    #[test]
    fn collect_message_skips_when_not_collecting() {
        let shared = SharedRegistry::new(10);
        let id = chat("a");
        assert_eq!(shared.collect_message(&id, "alice", "hi"), Collected::Skipped);

        shared.enable(&id, 2);
        shared.disable(&id).unwrap();
        assert_eq!(shared.collect_message(&id, "alice", "hi"), Collected::Skipped);
        assert!(shared.lock().lookup(&id).unwrap().buffer.is_empty());
    }

    #[test]
    fn collect_message_drains_when_full() {
        let shared = SharedRegistry::new(10);
        let id = chat("a");
        shared.enable(&id, 2);

        assert_eq!(shared.collect_message(&id, "alice", "hi"), Collected::Buffered);
        assert_eq!(
            shared.collect_message(&id, "bob", "hey"),
            Collected::Full(vec!["alice: hi".to_string(), "bob: hey".to_string()])
        );
        assert_eq!(shared.lock().is_full(&id), Ok(false));
    }
}
