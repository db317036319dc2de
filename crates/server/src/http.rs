//! REST endpoints: turn API, voice API, telephony webhook, health/metrics.

use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use voice_agent_core::Language;

use crate::error::ServerError;
use crate::state::AppState;
use crate::websocket::media_stream_ws;

/// Builds the full router: turn API, voice API, telephony, health, metrics.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.settings.server.cors_allowed_origins);

    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health))
        .route("/voice/process", post(voice_process))
        .route("/telephony/voice", post(telephony_voice))
        .route("/telephony/media-stream-ws", get(media_stream_ws))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    conversation_id: String,
    text: String,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    text: String,
    should_end: bool,
    needs_escalation: bool,
}

/// `POST /chat` — spec §6.1.
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ServerError> {
    let language = parse_language(request.language.as_deref())?;
    let result = state
        .orchestrator
        .handle_text(&request.conversation_id, &request.text, language)
        .await?;

    Ok(Json(ChatResponse {
        text: result.reply_text,
        should_end: result.should_end,
        needs_escalation: result.needs_escalation,
    }))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// `GET /health` — spec §6.1.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

#[derive(Debug, Deserialize)]
struct VoiceProcessRequest {
    conversation_id: String,
    audio_data: String,
    language: String,
}

#[derive(Debug, Serialize)]
struct VoiceProcessResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    transcribed_text: Option<String>,
    response_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio: Option<String>,
    proactive_prompt: bool,
    should_end: bool,
    needs_escalation: bool,
}

/// `POST /voice/process` — spec §6.2. One discrete utterance per request
/// (no streaming buffering/VAD, unlike the WebSocket path): recognize,
/// dispatch to the orchestrator, synthesize the reply.
async fn voice_process(
    State(state): State<AppState>,
    Json(request): Json<VoiceProcessRequest>,
) -> Result<Json<VoiceProcessResponse>, ServerError> {
    let language = Language::from_code(&request.language)
        .ok_or_else(|| ServerError::InvalidRequest(format!("unsupported language '{}'", request.language)))?;

    let audio = BASE64
        .decode(&request.audio_data)
        .map_err(|err| ServerError::InvalidRequest(format!("invalid base64 audio_data: {err}")))?;

    let transcribed = tokio::time::timeout(
        state.settings.timeouts.recognize(),
        state.recognizer.transcribe(&audio, language),
    )
    .await
    .map_err(|_| voice_agent_core::Error::AdapterTimeout { adapter: "recognizer" })??;

    let result = if transcribed.trim().is_empty() {
        state
            .orchestrator
            .handle_no_speech(&request.conversation_id, language)
            .await?
    } else {
        state
            .orchestrator
            .handle_text(&request.conversation_id, &transcribed, Some(language))
            .await?
    };

    let audio = tokio::time::timeout(
        state.settings.timeouts.synthesize(),
        state.synthesizer.synthesize(&result.reply_text, language),
    )
    .await
    .ok()
    .and_then(|r| r.ok())
    .map(|bytes| BASE64.encode(bytes));

    Ok(Json(VoiceProcessResponse {
        transcribed_text: if transcribed.trim().is_empty() { None } else { Some(transcribed) },
        response_text: result.reply_text,
        audio,
        proactive_prompt: result.proactive_prompt,
        should_end: result.should_end,
        needs_escalation: result.needs_escalation,
    }))
}

/// `POST /telephony/voice` — spec §6.2: a webhook the carrier calls at call
/// start. Returns a small instruction document telling the carrier to greet
/// the caller and open the bidirectional media stream for the rest of the
/// call.
async fn telephony_voice(State(state): State<AppState>) -> impl IntoResponse {
    let greeting = voice_agent_config::PromptTable::for_language(Language::English)
        .pick(voice_agent_config::PromptBucket::Greeting, "telephony", 0);
    let host = format!("{}:{}", state.settings.server.host, state.settings.server.port);
    let body = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <Instructions>\n  \
           <Say>{greeting}</Say>\n  \
           <Gather><Stream url=\"wss://{host}/telephony/media-stream-ws\"/></Gather>\n\
         </Instructions>\n"
    );
    (
        StatusCode::OK,
        [("Content-Type", "application/xml")],
        body,
    )
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.as_ref().map(|handle| handle.render()).unwrap_or_default()
}

fn parse_language(code: Option<&str>) -> Result<Option<Language>, ServerError> {
    match code {
        None => Ok(None),
        Some(code) => Language::from_code(code)
            .map(Some)
            .ok_or_else(|| ServerError::InvalidRequest(format!("unsupported language '{code}'"))),
    }
}
