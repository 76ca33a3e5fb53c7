//! Request orchestration: selection, fan-out, collection, synthesis.
//!
//! The [`Dispatcher`] is the single entry point. It owns the live request
//! table and drives each request through a fixed-deadline lifecycle,
//! updating the scoring engine and session tracker as responses arrive.

pub mod dispatcher;
pub mod request;
pub mod selector;
pub mod synthesizer;

pub use dispatcher::{CompletedResult, Dispatcher, DispatcherConfig, PollResult};
pub use request::{CollectedResponse, RequestPhase, RequestState};
pub use selector::{select_agents, SelectedAgent};
pub use synthesizer::{synthesize, AgentRating, NO_RESPONSE_MESSAGE};
