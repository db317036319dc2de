//! HTTP and WebSocket transport for the driver-support conversation
//! orchestrator.
//!
//! This crate is the only place in the workspace allowed the transport
//! concerns the rest of the system stays free of: CORS, request parsing,
//! telephony webhook formatting, and the Prometheus scrape endpoint.
//! Everything here is a thin adapter onto `voice-agent-orchestrator` and
//! `voice-agent-pipeline` — no dialogue logic lives in a handler.

pub mod error;
pub mod http;
pub mod metrics;
pub mod state;
pub mod websocket;

pub use error::ServerError;
pub use http::create_router;
pub use metrics::init_metrics;
pub use state::AppState;
