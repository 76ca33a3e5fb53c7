//! Agent performance scoring — durable multi-dimensional profiles.
//!
//! Every collected response updates the responding agent's profile: sliding
//! sample windows feed recency-weighted sub-scores, a single overall score,
//! and a coarse trend. Derived facts (accuracy tier, speed tier, trend) are
//! pushed into the global reasoner so the selector can reason symbolically
//! about agents it has never scored directly.

pub mod engine;
pub mod profile;
pub mod quality;
pub mod store;

pub use engine::ScoringEngine;
pub use profile::{AgentProfile, PerformanceTrend, ResponseMetrics};
pub use quality::score_response_quality;
pub use store::ProfileStore;

/// Seed score for agents with no history — benefit of the doubt.
pub const PRIOR_SCORE: f64 = 0.75;
