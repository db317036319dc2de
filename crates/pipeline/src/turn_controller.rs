//! The per-session audio turn controller (spec §4.3).
//!
//! States: `Idle -> Greeting -> Listening -> Processing -> Speaking ->
//! {Listening|Terminal}`. Modeled as an explicit enum driven one event at a
//! time by [`TurnController::run`] — no coroutine/closure nesting, per the
//! Design Notes. A caller (the server's WebSocket handler) owns the
//! transport and feeds inbound audio through an [`IngressSender`]; this
//! crate owns the timers, the VAD re-evaluation, and the hand-off to
//! `Recognizer`/`Orchestrator`/`Synthesizer`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};
use voice_agent_config::{PromptBucket, PromptTable, Settings, VadConfig};
use voice_agent_core::{
    Error, HistoryEntry, Language, Recognizer, Result, SessionStore, Synthesizer,
};
use voice_agent_orchestrator::Orchestrator;

use crate::vad;

/// One chunk of inbound mono PCM16 audio.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

/// `IDLE -> GREETING -> LISTENING -> PROCESSING -> SPEAKING -> {LISTENING|TERMINAL}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnControllerState {
    Idle,
    Greeting,
    Listening,
    Processing,
    Speaking,
    Terminal,
}

/// One bot utterance the controller produced, paired with its synthesized
/// audio. The server streams these back over the transport as they arrive.
#[derive(Debug, Clone)]
pub struct TurnOutput {
    pub transcribed_text: Option<String>,
    pub reply_text: String,
    pub audio: Vec<u8>,
    pub proactive_prompt: bool,
    pub should_end: bool,
    pub needs_escalation: bool,
}

/// Producer-side handle for feeding audio into a running [`TurnController`].
///
/// Wraps a bounded channel so the default backpressure policy ("drop with a
/// counter", spec §5) is enforced at the point chunks are ingested, not
/// inside the controller's own event loop. `BackpressurePolicy::Queue`
/// simply uses a deeper channel so `try_send` rarely fails.
#[derive(Clone)]
pub struct IngressSender {
    sender: mpsc::Sender<AudioFrame>,
    dropped: Arc<AtomicU64>,
}

impl IngressSender {
    /// Enqueues a frame; returns `false` (and bumps the drop counter) if the
    /// channel is full. Never blocks.
    pub fn try_send(&self, frame: AudioFrame) -> bool {
        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("turn_controller_dropped_chunks_total").increment(1);
                false
            }
        }
    }

    pub fn dropped_chunks(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Adapters the turn controller needs beyond the `Orchestrator` itself.
/// Recognizer/Synthesizer are the turn controller's own dependencies (the
/// `Orchestrator` never touches audio, per spec §4.1).
pub struct TurnDeps {
    pub orchestrator: Arc<Orchestrator>,
    pub recognizer: Arc<dyn Recognizer>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub session_store: Arc<dyn SessionStore>,
    pub settings: Arc<Settings>,
}

pub struct TurnController {
    conversation_id: String,
    language: Language,
    state: TurnControllerState,
    buffer: Vec<i16>,
    sample_rate: u32,
    speech_seen: bool,
    vad_cfg: VadConfig,
}

impl TurnController {
    pub fn new(conversation_id: impl Into<String>, language: Language, vad_cfg: VadConfig) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            language,
            state: TurnControllerState::Idle,
            buffer: Vec::new(),
            sample_rate: 16_000,
            speech_seen: false,
            vad_cfg,
        }
    }

    pub fn state(&self) -> TurnControllerState {
        self.state
    }

    /// Creates a bounded ingress channel sized per `Settings::server`'s
    /// backpressure policy, returning the producer handle and the receiver
    /// `run` consumes.
    pub fn channel(settings: &Settings) -> (IngressSender, mpsc::Receiver<AudioFrame>) {
        let depth = match settings.server.backpressure_policy {
            voice_agent_config::BackpressurePolicy::Drop => {
                settings.server.ingress_queue_depth.unwrap_or(1)
            }
            voice_agent_config::BackpressurePolicy::Queue => {
                settings.server.ingress_queue_depth.unwrap_or(64)
            }
        };
        let (sender, receiver) = mpsc::channel(depth.max(1));
        (
            IngressSender {
                sender,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            receiver,
        )
    }

    /// Drives the session end to end: greet, then alternate
    /// listening/processing/speaking until a terminal `TurnResult` or the
    /// ingress channel closes (the caller hung up / socket closed).
    /// Streams each bot utterance through `on_output` as it's produced.
    pub async fn run(
        mut self,
        mut audio_rx: mpsc::Receiver<AudioFrame>,
        deps: &TurnDeps,
        mut on_output: impl FnMut(TurnOutput),
    ) -> Result<()> {
        self.state = TurnControllerState::Greeting;
        let prompts = PromptTable::for_language(self.language);
        let greeting = prompts
            .pick(PromptBucket::Greeting, &self.conversation_id, 0)
            .to_string();
        let audio = self.synthesize(&greeting, deps).await.unwrap_or_default();
        on_output(TurnOutput {
            transcribed_text: None,
            reply_text: greeting,
            audio,
            proactive_prompt: false,
            should_end: false,
            needs_escalation: false,
        });
        self.state = TurnControllerState::Listening;

        let thresholds = &deps.settings.thresholds;

        // `deadline` marks when the *current* silence window elapses. It is
        // only pushed forward when a chunk is classified as speech — never
        // merely because a chunk arrived — so a continuous stream of
        // VAD-silent frames (the normal carrier case) lets the window
        // actually elapse instead of being reset on every `recv`.
        let mut deadline = tokio::time::Instant::now() + thresholds.silence_window();

        loop {
            if self.state != TurnControllerState::Listening {
                break;
            }

            tokio::select! {
                maybe_frame = audio_rx.recv() => {
                    match maybe_frame {
                        None => {
                            self.cancel(deps).await;
                            return Ok(());
                        }
                        Some(frame) => {
                            self.sample_rate = frame.sample_rate;
                            self.buffer.extend_from_slice(&frame.samples);
                            let result = vad::detect(&self.buffer, self.sample_rate, &self.vad_cfg);
                            if result.has_speech {
                                self.speech_seen = true;
                                deadline = tokio::time::Instant::now() + thresholds.end_of_utterance_silence();
                            }
                        }
                    }
                }
                _ = tokio::time::sleep_until(deadline) => {
                    if self.speech_seen {
                        self.on_end_of_utterance(deps, &mut on_output).await?;
                    } else {
                        self.on_silence_timeout(deps, &mut on_output).await?;
                    }
                    self.speech_seen = false;
                    deadline = tokio::time::Instant::now() + thresholds.silence_window();
                }
            }
        }

        Ok(())
    }

    async fn on_silence_timeout(
        &mut self,
        deps: &TurnDeps,
        on_output: &mut impl FnMut(TurnOutput),
    ) -> Result<()> {
        self.state = TurnControllerState::Processing;
        let result = deps
            .orchestrator
            .handle_no_speech(&self.conversation_id, self.language)
            .await?;

        self.state = TurnControllerState::Speaking;
        let audio = self.synthesize(&result.reply_text, deps).await.unwrap_or_default();
        on_output(TurnOutput {
            transcribed_text: None,
            reply_text: result.reply_text,
            audio,
            proactive_prompt: result.proactive_prompt,
            should_end: result.should_end,
            needs_escalation: result.needs_escalation,
        });

        if result.should_end {
            self.state = TurnControllerState::Terminal;
        } else {
            self.state = TurnControllerState::Listening;
        }
        Ok(())
    }

    async fn on_end_of_utterance(
        &mut self,
        deps: &TurnDeps,
        on_output: &mut impl FnMut(TurnOutput),
    ) -> Result<()> {
        self.state = TurnControllerState::Processing;
        let samples = std::mem::take(&mut self.buffer);
        self.speech_seen = false;
        let bytes = samples_to_bytes(&samples);

        let transcribed = match tokio::time::timeout(
            deps.settings.timeouts.recognize(),
            deps.recognizer.transcribe(&bytes, self.language),
        )
        .await
        {
            Ok(Ok(text)) => text,
            Ok(Err(err)) => {
                self.recover_locally(deps, "recognizer", err, on_output).await?;
                self.state = TurnControllerState::Listening;
                return Ok(());
            }
            Err(_) => {
                self.recover_locally(
                    deps,
                    "recognizer",
                    Error::AdapterTimeout { adapter: "recognizer" },
                    on_output,
                )
                .await?;
                self.state = TurnControllerState::Listening;
                return Ok(());
            }
        };

        // RecognizerEmpty (§7): no intelligible speech, treat as silence.
        let result = if transcribed.trim().is_empty() {
            deps.orchestrator
                .handle_no_speech(&self.conversation_id, self.language)
                .await?
        } else {
            deps.orchestrator
                .handle_text(&self.conversation_id, &transcribed, None)
                .await?
        };

        self.state = TurnControllerState::Speaking;
        let audio = self.synthesize(&result.reply_text, deps).await.unwrap_or_default();
        let reported_text = if transcribed.trim().is_empty() { None } else { Some(transcribed) };
        on_output(TurnOutput {
            transcribed_text: reported_text,
            reply_text: result.reply_text,
            audio,
            proactive_prompt: result.proactive_prompt,
            should_end: result.should_end,
            needs_escalation: result.needs_escalation,
        });

        if result.should_end {
            if !result.needs_escalation {
                self.speak_farewell(deps, on_output).await;
            }
            self.state = TurnControllerState::Terminal;
        } else {
            self.state = TurnControllerState::Listening;
        }
        Ok(())
    }

    async fn speak_farewell(&self, deps: &TurnDeps, on_output: &mut impl FnMut(TurnOutput)) {
        let prompts = PromptTable::for_language(self.language);
        let farewell = prompts
            .pick(PromptBucket::Farewell, &self.conversation_id, 0)
            .to_string();
        let audio = self.synthesize(&farewell, deps).await.unwrap_or_default();
        on_output(TurnOutput {
            transcribed_text: None,
            reply_text: farewell,
            audio,
            proactive_prompt: false,
            should_end: true,
            needs_escalation: false,
        });
    }

    async fn synthesize(&self, text: &str, deps: &TurnDeps) -> Option<Vec<u8>> {
        match tokio::time::timeout(
            deps.settings.timeouts.synthesize(),
            deps.synthesizer.synthesize(text, self.language),
        )
        .await
        {
            Ok(Ok(audio)) => Some(audio),
            Ok(Err(err)) => {
                warn!(conversation_id = %self.conversation_id, error = %err, "synthesizer failed");
                None
            }
            Err(_) => {
                warn!(conversation_id = %self.conversation_id, "synthesizer timed out");
                None
            }
        }
    }

    /// On-adapter-error recovery for the turn controller's own dependencies
    /// (Recognizer/Synthesizer): apologize, bump `retry_count`, and stay
    /// `Active` — mirrors `Orchestrator::recover_adapter_error` without
    /// routing through it, since the orchestrator never sees audio.
    async fn recover_locally(
        &self,
        deps: &TurnDeps,
        adapter: &'static str,
        err: Error,
        on_output: &mut impl FnMut(TurnOutput),
    ) -> Result<()> {
        metrics::counter!("orchestrator_adapter_failures_total", "adapter" => adapter).increment(1);
        info!(adapter, error = %err, "adapter call failed in turn controller, recovering locally");

        let reply = PromptTable::for_language(self.language)
            .pick(PromptBucket::AdapterApology, &self.conversation_id, 0)
            .to_string();
        let mut guard = deps.session_store.lock(&self.conversation_id).await?;
        guard.state_mut().retry_count += 1;
        guard.state_mut().history.push(HistoryEntry::bot(&reply));
        guard.commit().await?;
        drop(guard);

        let audio = self.synthesize(&reply, deps).await.unwrap_or_default();
        on_output(TurnOutput {
            transcribed_text: None,
            reply_text: reply,
            audio,
            proactive_prompt: false,
            should_end: false,
            needs_escalation: false,
        });
        Ok(())
    }

    /// Called when the ingress channel closes mid-session: the caller hung
    /// up or the socket closed. Idempotent via `ConversationState::cancel`.
    async fn cancel(&mut self, deps: &TurnDeps) {
        self.state = TurnControllerState::Terminal;
        match deps.session_store.lock(&self.conversation_id).await {
            Ok(mut guard) => {
                guard.state_mut().cancel();
                if let Err(err) = guard.commit().await {
                    warn!(conversation_id = %self.conversation_id, error = %err, "failed to commit cancellation");
                }
            }
            Err(err) => {
                warn!(conversation_id = %self.conversation_id, error = %err, "failed to lock session for cancellation");
            }
        }
    }
}

fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use voice_agent_adapters::{RecordingHandoff, RuleBasedUnderstander, StubDataClient};
    use voice_agent_core::Understander;
    use voice_agent_session::InMemorySessionStore;

    /// Always transcribes to a fixed utterance, regardless of the audio
    /// bytes — the VAD/buffering plumbing is exercised with a synthetic
    /// tone (see `loud_tone`), so the recognizer stub only needs to hand
    /// back *some* text once an end-of-utterance fires.
    struct FixedTextRecognizer(&'static str);

    #[async_trait]
    impl Recognizer for FixedTextRecognizer {
        async fn transcribe(&self, _audio: &[u8], _language: Language) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct NullSynthesizer;

    #[async_trait]
    impl Synthesizer for NullSynthesizer {
        async fn synthesize(&self, text: &str, _language: Language) -> Result<Vec<u8>> {
            Ok(text.as_bytes().to_vec())
        }
    }

    /// A loud alternating tone that `vad::detect` classifies as speech
    /// (mirrors the fixture in `vad`'s own tests).
    fn loud_tone(samples_per_cycle: usize, cycles: usize) -> Vec<i16> {
        let half = samples_per_cycle / 2;
        (0..(cycles * samples_per_cycle))
            .map(|i| if (i % samples_per_cycle) < half { 12_000i16 } else { -12_000i16 })
            .collect()
    }

    fn test_deps() -> TurnDeps {
        let understander: Arc<dyn Understander> = Arc::new(RuleBasedUnderstander::new());
        let data_client = Arc::new(StubDataClient::new());
        let handoff = Arc::new(RecordingHandoff::new());
        let session_store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let mut settings = Settings::default();
        settings.thresholds.silence_window_ms = 20;
        settings.thresholds.end_of_utterance_silence_ms = 20;
        let settings = Arc::new(settings);
        let orchestrator = Arc::new(Orchestrator::new(
            understander,
            data_client,
            handoff,
            session_store.clone(),
            settings.clone(),
        ));
        TurnDeps {
            orchestrator,
            recognizer: Arc::new(FixedTextRecognizer("find station")),
            synthesizer: Arc::new(NullSynthesizer),
            session_store,
            settings,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn silence_only_session_escalates_after_max_no_response() {
        let deps = test_deps();
        let controller = TurnController::new("conv-1", Language::English, VadConfig::default());
        let (sender, receiver) = mpsc::channel::<AudioFrame>(4);
        let outputs = Arc::new(std::sync::Mutex::new(Vec::<TurnOutput>::new()));
        let outputs_clone = outputs.clone();

        let handle = tokio::spawn(async move {
            controller
                .run(receiver, &deps, move |out| outputs_clone.lock().unwrap().push(out))
                .await
        });

        // Advance past the greeting, then past MAX_NO_RESPONSE+1 silence windows.
        for _ in 0..6 {
            tokio::time::advance(std::time::Duration::from_millis(25)).await;
        }
        drop(sender);
        handle.await.unwrap().unwrap();

        let outputs = outputs.lock().unwrap();
        // greeting + 3 proactive prompts + 1 terminal escalation
        assert!(outputs.len() >= 5, "expected greeting, proactive prompts and a terminal reply, got {}", outputs.len());
        let last = outputs.last().unwrap();
        assert!(last.needs_escalation);
        assert!(last.should_end);
    }

    #[tokio::test(start_paused = true)]
    async fn speech_then_silence_triggers_recognize_and_reply() {
        let deps = test_deps();
        let controller = TurnController::new("conv-2", Language::English, VadConfig::default());
        let (sender, receiver) = mpsc::channel::<AudioFrame>(4);
        let outputs = Arc::new(std::sync::Mutex::new(Vec::<TurnOutput>::new()));
        let outputs_clone = outputs.clone();

        let handle = tokio::spawn(async move {
            controller
                .run(receiver, &deps, move |out| outputs_clone.lock().unwrap().push(out))
                .await
        });

        tokio::time::advance(std::time::Duration::from_millis(5)).await;
        let loud_samples = loud_tone(80, 80);
        sender
            .send(AudioFrame { samples: loud_samples, sample_rate: 16_000 })
            .await
            .unwrap();

        tokio::time::advance(std::time::Duration::from_millis(30)).await;
        drop(sender);
        let _ = tokio::time::timeout(std::time::Duration::from_secs(1), handle).await;

        let outputs = outputs.lock().unwrap();
        assert!(outputs.len() >= 2, "expected at least greeting + one reply, got {}", outputs.len());
    }

    #[tokio::test(start_paused = true)]
    async fn continuous_silent_frames_after_speech_still_trigger_end_of_utterance() {
        // Regression test: a carrier that keeps sending VAD-silent frames
        // throughout the call (instead of going quiet) must not reset the
        // end-of-utterance timer on every `recv` — only speech-classified
        // frames may push the deadline forward.
        let deps = test_deps();
        let controller = TurnController::new("conv-3", Language::English, VadConfig::default());
        let (sender, receiver) = mpsc::channel::<AudioFrame>(16);
        let outputs = Arc::new(std::sync::Mutex::new(Vec::<TurnOutput>::new()));
        let outputs_clone = outputs.clone();

        let handle = tokio::spawn(async move {
            controller
                .run(receiver, &deps, move |out| outputs_clone.lock().unwrap().push(out))
                .await
        });

        tokio::time::advance(std::time::Duration::from_millis(5)).await;
        let loud_samples = loud_tone(80, 80);
        sender
            .send(AudioFrame { samples: loud_samples, sample_rate: 16_000 })
            .await
            .unwrap();

        // Keep the channel busy with silent frames for longer than
        // `end_of_utterance_silence_ms` (20ms in `test_deps`), well below
        // the VAD's silence threshold, arriving faster than the window.
        for _ in 0..8 {
            tokio::time::advance(std::time::Duration::from_millis(5)).await;
            let silent = vec![0i16; 80];
            if sender.send(AudioFrame { samples: silent, sample_rate: 16_000 }).await.is_err() {
                break;
            }
        }

        // The sender is still open — if recognize only ever fired because
        // the channel closed, this would still be empty.
        assert!(
            outputs.lock().unwrap().len() >= 2,
            "continuous post-speech silence should have triggered recognize before the channel closed"
        );

        drop(sender);
        let _ = tokio::time::timeout(std::time::Duration::from_secs(1), handle).await;
    }

    #[test]
    fn samples_to_bytes_round_trips_little_endian() {
        let samples = vec![1i16, -1, 256, -256];
        let bytes = samples_to_bytes(&samples);
        assert_eq!(bytes.len(), 8);
        let recovered: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        assert_eq!(recovered, samples);
    }
}
