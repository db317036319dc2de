//! Core data model and adapter contracts for the driver-support conversation orchestrator.
//!
//! This crate provides the foundational types shared by every other crate in the
//! workspace:
//! - the conversation state machine's data model (`ConversationState`, `IntentType`,
//!   `Sentiment`, `NLUResult`, `TurnResult`)
//! - the six narrow adapter contracts the orchestrator and turn controller depend on
//!   (`traits` module) — no concrete provider lives here
//! - the crate-wide error taxonomy

pub mod error;
pub mod language;
pub mod state;
pub mod traits;

pub use error::{Error, Result};
pub use language::Language;
pub use state::{
    ConversationState, HistoryEntry, IntentType, NluResult, Role, Sentiment, SessionStatus,
    TurnResult,
};
pub use traits::{
    DataClient, Handoff, Recognizer, SessionGuard, SessionStore, StationInfo, SubscriptionStatus,
    SwapRecord, Synthesizer, Understander,
};
