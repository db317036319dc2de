//! Real-time audio turn-taking loop for a single conversation.
//!
//! This crate is the bridge between raw audio and the conversation
//! orchestrator: [`vad`] classifies a buffer as speech-bearing or silent
//! with no I/O and no shared state; [`turn_controller`] drives the
//! per-session state machine (`Idle -> Greeting -> Listening -> Processing
//! -> Speaking -> {Listening|Terminal}`) that decides, chunk by chunk,
//! whether to keep listening, prompt proactively, or hand buffered audio to
//! the `Recognizer` and on to the `Orchestrator`.
//!
//! Text-only turns never touch this crate — they go straight to
//! `voice-agent-orchestrator::Orchestrator::handle_text`.

pub mod turn_controller;
pub mod vad;

pub use turn_controller::{
    AudioFrame, IngressSender, TurnController, TurnControllerState, TurnDeps, TurnOutput,
};
pub use vad::{detect, VadResult};

