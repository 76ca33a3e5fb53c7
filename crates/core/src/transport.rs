//! Responder transport seam.
//!
//! The orchestrator only needs two primitives: send a text payload to an
//! agent address, and be called back when a response arrives. How addresses
//! resolve and messages travel (mailbox relay, HTTP, message bus) is an
//! external concern behind this trait.

use crate::error::TransportError;
use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

/// A payload handed to the transport for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub address: String,
    pub text: String,
}

/// Outbound delivery to a responder agent.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver `text` to the agent at `address`.
    async fn send(&self, address: &str, text: &str) -> Result<(), TransportError>;
}

/// In-process loopback transport.
///
/// Sends land on an mpsc channel the host drains — useful for demos and for
/// tests that play the responder side by feeding the dispatcher's
/// `on_response` directly.
pub struct LocalTransport {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl LocalTransport {
    /// Create a transport and the receiving end of its outbound queue.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send(&self, address: &str, text: &str) -> Result<(), TransportError> {
        debug!(address, len = text.len(), "Local transport send");
        self.tx
            .send(OutboundMessage {
                address: address.to_string(),
                text: text.to_string(),
            })
            .map_err(|_| TransportError::NotConnected("outbound queue closed".into()))
    }
}

/// Transport that rejects every send — exercises the send-failure path.
pub struct FailingTransport {
    /// Addresses that fail; empty means fail all.
    pub failing: Vec<String>,
    /// Inner transport for addresses that do not fail.
    inner: Option<LocalTransport>,
    pub attempts: Mutex<Vec<String>>,
}

impl FailingTransport {
    /// Fail every send.
    pub fn all() -> Self {
        Self {
            failing: Vec::new(),
            inner: None,
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Fail only the listed addresses; forward the rest to a loopback queue.
    pub fn only(
        failing: Vec<String>,
    ) -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (inner, rx) = LocalTransport::new();
        (
            Self {
                failing,
                inner: Some(inner),
                attempts: Mutex::new(Vec::new()),
            },
            rx,
        )
    }
}

#[async_trait]
impl Transport for FailingTransport {
    async fn send(&self, address: &str, text: &str) -> Result<(), TransportError> {
        self.attempts.lock().await.push(address.to_string());
        let fails = self.failing.is_empty() || self.failing.iter().any(|a| a == address);
        if fails {
            return Err(TransportError::DeliveryFailed {
                address: address.to_string(),
                reason: "simulated failure".into(),
            });
        }
        match &self.inner {
            Some(inner) => inner.send(address, text).await,
            None => Ok(()),
        }
    }
}
