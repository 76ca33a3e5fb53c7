//! Domain event system — decoupled communication between bounded contexts.
//!
//! Events are published when something interesting happens in the request
//! lifecycle. Other components can subscribe to react without tight coupling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A user query entered the dispatcher.
    QueryReceived {
        request_id: String,
        primary: String,
        agent_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A send to a responder failed (request continues regardless).
    SendFailed {
        request_id: String,
        address: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A responder's answer was collected for a request.
    ResponseCollected {
        request_id: String,
        agent_name: String,
        elapsed_secs: f64,
        timestamp: DateTime<Utc>,
    },

    /// A request was synthesized (possibly with zero responses).
    RequestSynthesized {
        request_id: String,
        responses: usize,
        expected: usize,
        timestamp: DateTime<Utc>,
    },

    /// An agent's performance profile was updated.
    ProfileUpdated {
        agent_id: String,
        overall_score: f64,
        timestamp: DateTime<Utc>,
    },

    /// A session recorded an agent usage event.
    UsageRecorded {
        session_id: String,
        agent_id: String,
        score: f64,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub. Components can
/// subscribe to receive all events and filter for what they care about.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // Ignore send errors (no subscribers = that's fine)
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
