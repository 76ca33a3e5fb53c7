//! Error types for the Quorum domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Quorum operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Transport errors ---
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    // --- Persistent store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Registry errors ---
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    // --- Orchestration errors ---
    #[error("Orchestration error: {0}")]
    Orchestration(#[from] OrchestrationError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Delivery failed to {address}: {reason}")]
    DeliveryFailed { address: String, reason: String },

    #[error("Transport not connected: {0}")]
    NotConnected(String),

    #[error("Send timed out to {0}")]
    Timeout(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Failed to serialize record: {0}")]
    Serialization(String),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry file unreadable: {path} — {reason}")]
    Unreadable { path: String, reason: String },

    #[error("Registry file malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("No responder agents available")]
    NoAgents,

    #[error("Unknown request: {0}")]
    UnknownRequest(String),

    #[error("Unknown session: {0}")]
    UnknownSession(String),
}
