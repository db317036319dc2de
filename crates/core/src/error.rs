//! Crate-wide error taxonomy.
//!
//! Adapter errors (`AdapterTimeout`, `AdapterUnavailable`, `RecognizerEmpty`) are
//! recovered inside the orchestrator and never reach a caller — they show up here
//! only so adapter implementations and the orchestrator share one vocabulary.
//! `SessionTerminal`, `InvalidInput` and `Internal` do surface to callers.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A turn arrived for a session that is `Completed` or `Escalated`.
    #[error("session {0} is terminal")]
    SessionTerminal(String),

    /// An adapter call exceeded its per-class deadline.
    #[error("adapter '{adapter}' timed out")]
    AdapterTimeout { adapter: &'static str },

    /// An adapter reported a non-recoverable error.
    #[error("adapter '{adapter}' unavailable: {detail}")]
    AdapterUnavailable { adapter: &'static str, detail: String },

    /// The recognizer returned empty text; treated as `handle_no_speech`.
    #[error("recognizer returned empty text")]
    RecognizerEmpty,

    /// Request was missing a required field; no session is created.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unexpected invariant violation. The session is escalated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Name of the adapter class for metrics/logging, when this is an adapter error.
    pub fn adapter_name(&self) -> Option<&'static str> {
        match self {
            Error::AdapterTimeout { adapter } => Some(adapter),
            Error::AdapterUnavailable { adapter, .. } => Some(adapter),
            _ => None,
        }
    }

    /// Whether this error should be recovered locally by the orchestrator (true) or
    /// surfaced to the transport caller (false).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::AdapterTimeout { .. } | Error::AdapterUnavailable { .. } | Error::RecognizerEmpty
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
