//! Default adapter implementations.
//!
//! Every type here is the "mock responses" layer the orchestrator is wired
//! against out of the box: a regex/keyword-driven `Understander`, a
//! pass-through `Recognizer`, a byte-stuffing `Synthesizer`, a canned-data
//! `DataClient`, and a recording `Handoff`. A deployment swaps any of these
//! for a real provider without touching `voice-agent-orchestrator`.

mod data_client;
mod handoff;
mod recognizer;
mod synthesizer;
mod understander;

pub use data_client::StubDataClient;
pub use handoff::RecordingHandoff;
pub use recognizer::PassThroughRecognizer;
pub use synthesizer::StubSynthesizer;
pub use understander::RuleBasedUnderstander;
