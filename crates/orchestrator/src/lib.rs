//! The conversation orchestrator — the dialogue brain that turns recognized
//! text (or a synthetic "no-speech" signal) into a `TurnResult`.
//!
//! `Orchestrator` depends only on the adapter trait objects injected at
//! construction: no concrete provider, no global state.

mod handlers;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::timeout;
use tracing::{info, warn};
use voice_agent_config::{PromptBucket, PromptTable, Settings};
use voice_agent_core::{
    DataClient, Error, Handoff, HistoryEntry, IntentType, Language, NluResult, Result,
    SessionStore, Sentiment, TurnResult, Understander,
};

const REASON_AGENT_OR_ANGRY: &str = "user requested agent or is angry";
const REASON_LOW_CONFIDENCE: &str = "low confidence after multiple attempts";
const REASON_NO_RESPONSE: &str = "no response";

/// Consecutive-failure count per adapter class, used only to decide when to
/// elevate the recovery log line to `warn`. Reset on the adapter's next
/// successful call.
fn adapter_failure_counts() -> &'static Mutex<HashMap<&'static str, u32>> {
    static COUNTS: OnceLock<Mutex<HashMap<&'static str, u32>>> = OnceLock::new();
    COUNTS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn reset_adapter_failures(adapter: &'static str) {
    adapter_failure_counts().lock().remove(adapter);
}

/// Wires the six adapter contracts together and drives one turn at a time.
pub struct Orchestrator {
    understander: Arc<dyn Understander>,
    data_client: Arc<dyn DataClient>,
    handoff: Arc<dyn Handoff>,
    session_store: Arc<dyn SessionStore>,
    settings: Arc<Settings>,
}

impl Orchestrator {
    pub fn new(
        understander: Arc<dyn Understander>,
        data_client: Arc<dyn DataClient>,
        handoff: Arc<dyn Handoff>,
        session_store: Arc<dyn SessionStore>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            understander,
            data_client,
            handoff,
            session_store,
            settings,
        }
    }

    pub(crate) fn data_client(&self) -> &Arc<dyn DataClient> {
        &self.data_client
    }

    pub(crate) fn timeout_data(&self) -> Duration {
        self.settings.timeouts.data()
    }

    /// Drives one text turn through understanding, confidence gating, slot
    /// filling, and intent dispatch.
    pub async fn handle_text(
        &self,
        conversation_id: &str,
        text: &str,
        language: Option<Language>,
    ) -> Result<TurnResult> {
        if conversation_id.is_empty() {
            return Err(Error::InvalidInput("conversation_id must not be empty".into()));
        }

        let mut guard = self.session_store.lock(conversation_id).await?;
        if guard.state().is_terminal() {
            return Err(Error::SessionTerminal(conversation_id.to_string()));
        }

        if let Some(lang) = language {
            guard.state_mut().language = lang;
        }

        // Step 2: record the turn, reset the silence counter.
        guard.state_mut().history.push(HistoryEntry::user(text));
        guard.state_mut().no_response_count = 0;

        let turn_language = guard.state().language;
        let prompts = PromptTable::for_language(turn_language);

        // Step 3: understand.
        let nlu = match timeout(
            self.settings.timeouts.understand(),
            self.understander.analyze(text, turn_language),
        )
        .await
        {
            Ok(Ok(nlu)) => {
                reset_adapter_failures("understander");
                nlu
            }
            Ok(Err(err)) => return self.recover_adapter_error(&mut *guard, "understander", err).await,
            Err(_) => {
                return self
                    .recover_adapter_error(
                        &mut *guard,
                        "understander",
                        Error::AdapterTimeout { adapter: "understander" },
                    )
                    .await
            }
        };

        // Step 4: immediate-escalation gate.
        if self.should_immediately_escalate(text, &nlu) {
            return self
                .escalate(&mut *guard, &prompts, REASON_AGENT_OR_ANGRY, text)
                .await;
        }

        // Step 5: confidence gate.
        if nlu.confidence < self.settings.thresholds.confidence_threshold {
            guard.state_mut().retry_count += 1;
            if guard.state_mut().retry_count > self.settings.thresholds.max_retry {
                return self
                    .escalate(&mut *guard, &prompts, REASON_LOW_CONFIDENCE, text)
                    .await;
            }
            let retry_count = guard.state().retry_count;
            let reply = prompts
                .pick(PromptBucket::Clarification, conversation_id, retry_count)
                .to_string();
            guard.state_mut().history.push(HistoryEntry::bot(&reply));
            guard.commit().await?;
            return Ok(TurnResult::reply(reply));
        }

        // Step 6: slot merge. Intent latches before entities are merged so
        // entities apply to the intent just recognized this turn.
        if nlu.intent != IntentType::Unknown {
            guard.state_mut().current_intent = Some(nlu.intent);
        }
        guard.state_mut().merge_entities(nlu.entities);

        // Step 7: no latched intent yet — ask the caller to rephrase.
        if guard.state().current_intent.is_none() {
            let reply = prompts
                .pick(PromptBucket::Clarification, conversation_id, guard.state().retry_count)
                .to_string();
            guard.state_mut().history.push(HistoryEntry::bot(&reply));
            guard.commit().await?;
            return Ok(TurnResult::reply(reply));
        }

        // Step 8: dispatch. A `DataClient` failure is recovered the same way
        // as an `Understander` failure rather than surfaced to the caller.
        let result = match self.dispatch_intent(&mut *guard).await {
            Ok(result) => {
                reset_adapter_failures("data_client");
                result
            }
            Err(err) => return self.recover_adapter_error(&mut *guard, "data_client", err).await,
        };

        // Step 9: commit the turn's outcome.
        guard.state_mut().history.push(HistoryEntry::bot(&result.reply_text));
        if result.needs_escalation {
            guard.state_mut().escalate(
                result
                    .data
                    .as_ref()
                    .and_then(|d| d.get("escalation_reason"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("handler requested escalation")
                    .to_string(),
            );
            self.notify_handoff(&mut *guard).await;
        } else if result.should_end {
            guard.state_mut().complete();
        } else {
            guard.state_mut().retry_count = 0;
        }

        guard.commit().await?;
        Ok(result)
    }

    /// Drives a turn where the user did not speak: bumps the silence counter
    /// and either nudges with a proactive prompt or escalates.
    pub async fn handle_no_speech(
        &self,
        conversation_id: &str,
        language: Language,
    ) -> Result<TurnResult> {
        let mut guard = self.session_store.lock(conversation_id).await?;
        if guard.state().is_terminal() {
            return Err(Error::SessionTerminal(conversation_id.to_string()));
        }
        if guard.state().language != language {
            guard.state_mut().language = language;
        }

        guard.state_mut().no_response_count += 1;
        let count = guard.state().no_response_count;
        let prompts = PromptTable::for_language(language);

        if count > self.settings.thresholds.max_no_response {
            let reply = prompts
                .pick(PromptBucket::NoResponseEscalation, conversation_id, count)
                .to_string();
            guard.state_mut().history.push(HistoryEntry::bot(&reply));
            guard.state_mut().escalate(REASON_NO_RESPONSE);
            self.notify_handoff(&mut *guard).await;
            guard.commit().await?;
            return Ok(TurnResult::reply(reply).escalating());
        }

        let reply = prompts
            .pick(PromptBucket::ProactivePrompt, conversation_id, count)
            .to_string();
        guard.state_mut().history.push(HistoryEntry::bot(&reply));
        guard.commit().await?;
        Ok(TurnResult::reply(reply).proactive())
    }

    fn should_immediately_escalate(&self, text: &str, nlu: &NluResult) -> bool {
        if nlu.sentiment == Sentiment::Angry {
            return true;
        }
        let lowered = text.to_lowercase();
        self.settings
            .thresholds
            .agent_triggers
            .iter()
            .any(|trigger| lowered.contains(&trigger.to_lowercase()))
    }

    async fn escalate(
        &self,
        guard: &mut dyn voice_agent_core::SessionGuard,
        prompts: &PromptTable,
        reason: &'static str,
        last_user_text: &str,
    ) -> Result<TurnResult> {
        guard.state_mut().escalate(reason);
        let reply = prompts
            .pick(PromptBucket::NoResponseEscalation, &guard.state().conversation_id, 0)
            .to_string();
        guard.state_mut().history.push(HistoryEntry::bot(&reply));
        let conversation_id = guard.state().conversation_id.clone();
        let summary = format!("last user message: {last_user_text}");
        if let Err(err) = self.handoff.escalate(&conversation_id, &summary, reason).await {
            warn!(conversation_id = %conversation_id, error = %err, "handoff adapter failed during escalation");
        }
        metrics::counter!("orchestrator_escalations_total").increment(1);
        guard.commit().await?;
        Ok(TurnResult::reply(reply).escalating())
    }

    async fn notify_handoff(&self, guard: &mut dyn voice_agent_core::SessionGuard) {
        let conversation_id = guard.state().conversation_id.clone();
        let reason = guard
            .state()
            .escalation_reason
            .clone()
            .unwrap_or_else(|| "handler requested escalation".to_string());
        let summary = format!("conversation escalated: {reason}");
        if let Err(err) = self.handoff.escalate(&conversation_id, &summary, &reason).await {
            warn!(conversation_id = %conversation_id, error = %err, "handoff adapter failed during escalation");
        }
        metrics::counter!("orchestrator_escalations_total").increment(1);
    }

    /// Recovers an adapter failure locally: apologize, bump the retry
    /// counter, and stay `Active` — the caller only ever sees a
    /// `TurnResult`, never the underlying error.
    async fn recover_adapter_error(
        &self,
        guard: &mut dyn voice_agent_core::SessionGuard,
        adapter: &'static str,
        err: Error,
    ) -> Result<TurnResult> {
        metrics::counter!("orchestrator_adapter_failures_total", "adapter" => adapter).increment(1);
        let consecutive_failures = {
            let mut counts = adapter_failure_counts().lock();
            let count = counts.entry(adapter).or_insert(0);
            *count += 1;
            *count
        };
        if consecutive_failures >= self.settings.thresholds.adapter_failure_warn_threshold {
            warn!(adapter, error = %err, consecutive_failures, "adapter failure threshold crossed");
        } else {
            info!(adapter, error = %err, "adapter call failed, recovering locally");
        }
        guard.state_mut().retry_count += 1;
        let reply = PromptTable::for_language(guard.state().language)
            .pick(PromptBucket::AdapterApology, &guard.state().conversation_id, consecutive_failures)
            .to_string();
        guard.state_mut().history.push(HistoryEntry::bot(&reply));
        guard.commit().await?;
        Ok(TurnResult::reply(reply))
    }
}
