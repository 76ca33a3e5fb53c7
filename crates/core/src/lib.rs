//! # Quorum Core
//!
//! Domain types, seams, and error definitions for the Quorum orchestration
//! engine. Every other crate depends inward on this one.
//!
//! ## Design Philosophy
//!
//! The responder transport is defined as a trait here; implementations live
//! in their own crates (or in test code). This enables:
//! - Swapping delivery mechanisms without touching the orchestrator
//! - Easy testing with in-process loopback transports
//! - A clean dependency graph (all crates depend inward on core)

pub mod agent;
pub mod error;
pub mod event;
pub mod query;
pub mod transport;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentInfo, AgentRegistry, AgentStatus};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use query::{QueryAnalysis, analyze_query};
pub use transport::{LocalTransport, OutboundMessage, Transport};
