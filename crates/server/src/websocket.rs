//! `GET /telephony/media-stream-ws` — the bidirectional streaming channel a
//! telephony carrier opens after `POST /telephony/voice` greets the caller.
//!
//! Framing is a small JSON-tagged enum over WebSocket text frames, audio
//! payloads carried as base64 inside it (mirroring how the teacher's own
//! `WsMessage` enum frames `Audio`/`ResponseAudio` alongside control
//! messages rather than splitting audio onto raw binary frames).

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use voice_agent_core::Language;
use voice_agent_pipeline::{AudioFrame, TurnController, TurnDeps, TurnOutput};

use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsMessage {
    /// Inbound framed audio chunk with its sample-rate metadata (spec §6.2).
    Audio { data: String, sample_rate: u32 },
    /// Outbound synthesized audio paired with the text it came from.
    Response {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        audio: Option<String>,
        should_end: bool,
        needs_escalation: bool,
    },
    Error { message: String },
}

#[derive(Debug, Deserialize)]
pub struct MediaStreamParams {
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

pub async fn media_stream_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<MediaStreamParams>,
) -> Response {
    let conversation_id = params.conversation_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let language = params
        .language
        .as_deref()
        .and_then(Language::from_code)
        .unwrap_or_default();
    ws.on_upgrade(move |socket| handle_socket(socket, state, conversation_id, language))
}

async fn handle_socket(socket: WebSocket, state: AppState, conversation_id: String, language: Language) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let deps = TurnDeps {
        orchestrator: state.orchestrator.clone(),
        recognizer: state.recognizer.clone(),
        synthesizer: state.synthesizer.clone(),
        session_store: state.session_store.clone(),
        settings: state.settings.clone(),
    };
    let (ingress, audio_rx) = TurnController::channel(&state.settings);
    let controller = TurnController::new(conversation_id.clone(), language, state.settings.vad.clone());

    let (output_tx, mut output_rx) = tokio::sync::mpsc::unbounded_channel::<TurnOutput>();
    let conversation_id_for_run = conversation_id.clone();
    let run_handle = tokio::spawn(async move {
        let result = controller
            .run(audio_rx, &deps, |out| {
                let _ = output_tx.send(out);
            })
            .await;
        if let Err(err) = result {
            tracing::warn!(conversation_id = %conversation_id_for_run, error = %err, "turn controller exited with an error");
        }
    });

    let forward_handle = tokio::spawn(async move {
        while let Some(out) = output_rx.recv().await {
            let msg = WsMessage::Response {
                text: out.reply_text,
                audio: if out.audio.is_empty() { None } else { Some(BASE64.encode(&out.audio)) },
                should_end: out.should_end,
                needs_escalation: out.needs_escalation,
            };
            let json = serde_json::to_string(&msg).unwrap_or_default();
            if ws_tx.send(Message::Text(json)).await.is_err() {
                break;
            }
            if out.should_end {
                break;
            }
        }
    });

    while let Some(message) = ws_rx.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<WsMessage>(&text) {
                Ok(WsMessage::Audio { data, sample_rate }) => match BASE64.decode(&data) {
                    Ok(bytes) => {
                        let samples = bytes_to_samples(&bytes);
                        ingress.try_send(AudioFrame { samples, sample_rate });
                    }
                    Err(err) => {
                        tracing::warn!(conversation_id = %conversation_id, error = %err, "failed to decode base64 audio chunk");
                    }
                },
                Ok(other) => {
                    tracing::debug!(conversation_id = %conversation_id, message = ?other, "ignoring unexpected client message");
                }
                Err(err) => {
                    tracing::warn!(conversation_id = %conversation_id, error = %err, "failed to parse WebSocket message");
                }
            },
            Ok(Message::Binary(bytes)) => {
                let samples = bytes_to_samples(&bytes);
                ingress.try_send(AudioFrame { samples, sample_rate: 16_000 });
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(conversation_id = %conversation_id, error = %err, "WebSocket read error");
                break;
            }
        }
    }

    // Dropping `ingress` here closes the channel, which is how the turn
    // controller is told the caller hung up (see `TurnController::run`'s
    // `None` branch).
    let dropped_chunks = ingress.dropped_chunks();
    drop(ingress);
    let _ = run_handle.await;
    forward_handle.abort();

    tracing::info!(conversation_id = %conversation_id, dropped_chunks, "media stream closed");
}

fn bytes_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}
