//! End-to-end scenarios driving `Orchestrator` against the stub adapters
//! and the in-memory session store — no mocking of either.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use voice_agent_adapters::{RecordingHandoff, RuleBasedUnderstander, StubDataClient};
use voice_agent_config::Settings;
use voice_agent_core::{IntentType, Language, NluResult, Result, Sentiment, Understander};
use voice_agent_orchestrator::Orchestrator;
use voice_agent_session::InMemorySessionStore;

/// Replays a fixed sequence of NLU results, one per call, regardless of the
/// text passed in. Lets a test pin exactly the confidence/intent/entities a
/// scenario needs without depending on the keyword heuristics.
struct ScriptedUnderstander {
    script: Mutex<VecDeque<NluResult>>,
}

impl ScriptedUnderstander {
    fn new(script: Vec<NluResult>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }
}

#[async_trait]
impl Understander for ScriptedUnderstander {
    async fn analyze(&self, _text: &str, _language: Language) -> Result<NluResult> {
        let next = self
            .script
            .lock()
            .pop_front()
            .expect("scripted understander called more times than scripted");
        Ok(next)
    }
}

fn low_confidence_result() -> NluResult {
    NluResult {
        intent: IntentType::Unknown,
        confidence: 0.3,
        entities: HashMap::new(),
        sentiment: Sentiment::Neutral,
    }
}

fn harness(
    understander: Arc<dyn Understander>,
) -> (Orchestrator, Arc<RecordingHandoff>, Arc<InMemorySessionStore>) {
    let data_client = Arc::new(StubDataClient::new());
    let handoff = Arc::new(RecordingHandoff::new());
    let session_store = Arc::new(InMemorySessionStore::new());
    let settings = Arc::new(Settings::default());
    let orchestrator = Orchestrator::new(
        understander,
        data_client,
        handoff.clone(),
        session_store.clone(),
        settings,
    );
    (orchestrator, handoff, session_store)
}

#[tokio::test]
async fn station_happy_path() {
    let (orchestrator, _handoff, _store) = harness(Arc::new(RuleBasedUnderstander::new()));

    let first = orchestrator
        .handle_text("conv-1", "find station", None)
        .await
        .unwrap();
    assert!(!first.should_end);

    let second = orchestrator
        .handle_text("conv-1", "Noida", None)
        .await
        .unwrap();
    assert_eq!(second.reply_text, "The nearest station is Station Noida at Main Road, Noida.");
    assert!(second.should_end);
    assert!(!second.needs_escalation);
}

#[tokio::test]
async fn escalation_on_anger() {
    let (orchestrator, handoff, store) = harness(Arc::new(RuleBasedUnderstander::new()));

    let result = orchestrator
        .handle_text("conv-2", "this is bad, I want an agent", None)
        .await
        .unwrap();

    assert!(result.needs_escalation);
    assert!(result.should_end);

    let escalations = handoff.escalations();
    assert_eq!(escalations.len(), 1);
    assert_eq!(escalations[0].reason, "user requested agent or is angry");

    let state = store.get_or_create("conv-2", Language::English).await.unwrap();
    assert_eq!(state.status, voice_agent_core::SessionStatus::Escalated);
}

#[tokio::test]
async fn retry_budget_escalates_on_third_low_confidence_turn() {
    let script = vec![
        low_confidence_result(),
        low_confidence_result(),
        low_confidence_result(),
    ];
    let (orchestrator, handoff, store) = harness(Arc::new(ScriptedUnderstander::new(script)));

    let first = orchestrator.handle_text("conv-3", "mumble one", None).await.unwrap();
    assert!(!first.needs_escalation);
    let state = store.get_or_create("conv-3", Language::English).await.unwrap();
    assert_eq!(state.retry_count, 1);

    let second = orchestrator.handle_text("conv-3", "mumble two", None).await.unwrap();
    assert!(!second.needs_escalation);
    let state = store.get_or_create("conv-3", Language::English).await.unwrap();
    assert_eq!(state.retry_count, 2);

    let third = orchestrator.handle_text("conv-3", "mumble three", None).await.unwrap();
    assert!(third.needs_escalation);

    let escalations = handoff.escalations();
    assert_eq!(escalations.len(), 1);
    assert_eq!(escalations[0].reason, "low confidence after multiple attempts");
}

#[tokio::test]
async fn no_response_escalates_after_the_fourth_silence_window() {
    let (orchestrator, handoff, _store) = harness(Arc::new(RuleBasedUnderstander::new()));

    let mut replies = Vec::new();
    for _ in 0..3 {
        let result = orchestrator
            .handle_no_speech("conv-4", Language::English)
            .await
            .unwrap();
        assert!(result.proactive_prompt);
        assert!(!result.needs_escalation);
        replies.push(result.reply_text);
    }
    assert!(replies.windows(2).any(|w| w[0] != w[1]), "proactive prompts should vary");

    let fourth = orchestrator
        .handle_no_speech("conv-4", Language::English)
        .await
        .unwrap();
    assert!(fourth.needs_escalation);
    assert!(fourth.should_end);

    let escalations = handoff.escalations();
    assert_eq!(escalations.len(), 1);
    assert_eq!(escalations[0].reason, "no response");
}

#[tokio::test]
async fn swap_history_reports_count_and_latest_timestamp() {
    let (orchestrator, _handoff, _store) = harness(Arc::new(RuleBasedUnderstander::new()));

    let result = orchestrator
        .handle_text("conv-5", "swap history yesterday", None)
        .await
        .unwrap();

    assert!(result.reply_text.contains('1'));
    assert!(result.reply_text.contains("2026-01-22 14:30"));
    assert!(result.should_end);
}

#[tokio::test]
async fn language_switch_draws_prompts_from_the_new_language_table() {
    const HINDI_CLARIFICATIONS: &[&str] = &[
        "माफ़ कीजिए, मुझे समझ नहीं आया। क्या आप दोबारा बता सकते हैं?",
        "क्षमा करें, क्या आप थोड़ा धीरे से दोबारा कह सकते हैं?",
    ];

    let script = vec![low_confidence_result(), low_confidence_result()];
    let (orchestrator, _handoff, store) = harness(Arc::new(ScriptedUnderstander::new(script)));

    orchestrator
        .handle_text("conv-6", "first message", None)
        .await
        .unwrap();

    let second = orchestrator
        .handle_text("conv-6", "दूसरा संदेश", Some(Language::Hindi))
        .await
        .unwrap();
    assert!(HINDI_CLARIFICATIONS.contains(&second.reply_text.as_str()));

    let state = store.get_or_create("conv-6", Language::Hindi).await.unwrap();
    assert_eq!(state.language, Language::Hindi);
    assert_eq!(state.history[0].text, "first message");
    assert_eq!(state.history[2].text, "दूसरा संदेश");
}
