//! Engine lifecycle notifications.
//!
//! # Responsibilities
//! - Broadcast engine start/stop to every subscribed component
//! - Let components subscribe once, at construction
//!
//! # Design Decisions
//! - Broadcast channel: every subscriber sees every event
//! - Sending with no subscribers is not an error

use tokio::sync::broadcast;

/// Capacity of the event channel.
const EVENT_BUFFER: usize = 16;

/// Lifecycle events published by the hosting engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    Started,
    Stopped,
}

/// Broadcast bus for [`EngineEvent`]s.
#[derive(Debug, Clone)]
pub struct EngineSignals {
    tx: broadcast::Sender<EngineEvent>,
}

impl EngineSignals {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Returns how many subscribers received it.
    pub fn send(&self, event: EngineEvent) -> usize {
        tracing::debug!(?event, "Engine event");
        self.tx.send(event).unwrap_or(0)
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EngineSignals {
    fn default() -> Self {
        Self::new()
    }
}
