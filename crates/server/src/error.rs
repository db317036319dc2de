//! Transport-level error taxonomy.
//!
//! `voice_agent_core::Error` already distinguishes recoverable adapter
//! failures (handled inside the orchestrator, never reach here) from the
//! few variants a caller can see (`SessionTerminal`, `InvalidInput`,
//! `Internal`). This enum wraps those plus the purely transport-side
//! failures (bad JSON, failed upgrade) behind one `IntoResponse` impl.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use voice_agent_core::Error as CoreError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Core(CoreError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ServerError::Core(CoreError::SessionTerminal(_)) => StatusCode::CONFLICT,
            ServerError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { detail: self.to_string() })).into_response()
    }
}
