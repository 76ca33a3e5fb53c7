//! Session usage tracking — who helped, how much, and what share they get.
//!
//! A session accumulates per-agent usage over a user's interactions. Each
//! recorded usage recomputes normalized contribution percentages that
//! always sum to 100, with a floor-and-redistribute pass protecting low
//! performers from rounding to nothing while keeping the bulk of the pot
//! with agents that actually carried the session.

mod store;
mod tracker;

pub use store::SessionStore;
pub use tracker::{AgentUsage, PayoutShare, Session, SessionSummary, SessionTracker};
