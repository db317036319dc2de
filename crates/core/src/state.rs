//! Conversation data model shared by every adapter and the orchestrator.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::language::Language;

/// Closed set of intents the orchestrator can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    GetSwapHistory,
    ExplainInvoice,
    FindNearestStation,
    CheckAvailability,
    CheckSubscription,
    RenewSubscription,
    PricingInfo,
    LeaveInfo,
    FindDsk,
    Unknown,
}

impl IntentType {
    /// Slot name(s) an intent handler requires before it can dispatch.
    pub fn required_slots(&self) -> &'static [&'static str] {
        match self {
            IntentType::FindNearestStation => &["location"],
            IntentType::GetSwapHistory => &["date_range"],
            _ => &[],
        }
    }
}

impl std::fmt::Display for IntentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IntentType::GetSwapHistory => "get_swap_history",
            IntentType::ExplainInvoice => "explain_invoice",
            IntentType::FindNearestStation => "find_nearest_station",
            IntentType::CheckAvailability => "check_availability",
            IntentType::CheckSubscription => "check_subscription",
            IntentType::RenewSubscription => "renew_subscription",
            IntentType::PricingInfo => "pricing_info",
            IntentType::LeaveInfo => "leave_info",
            IntentType::FindDsk => "find_dsk",
            IntentType::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Closed sentiment classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Angry,
}

/// Result of running the `Understander` adapter over one utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NluResult {
    pub intent: IntentType,
    pub confidence: f32,
    #[serde(default)]
    pub entities: HashMap<String, serde_json::Value>,
    pub sentiment: Sentiment,
}

/// What a turn handler hands back to its caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResult {
    pub reply_text: String,
    pub should_end: bool,
    pub needs_escalation: bool,
    pub proactive_prompt: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl TurnResult {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            reply_text: text.into(),
            should_end: false,
            needs_escalation: false,
            proactive_prompt: false,
            data: None,
        }
    }

    pub fn ending(mut self) -> Self {
        self.should_end = true;
        self
    }

    pub fn escalating(mut self) -> Self {
        self.needs_escalation = true;
        self.should_end = true;
        self
    }

    pub fn proactive(mut self) -> Self {
        self.proactive_prompt = true;
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Speaker role of one `history` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Bot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Session lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    Completed,
    Escalated,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Escalated)
    }
}

/// One conversation, keyed by `conversation_id`.
///
/// `slots`/`history`/counters are mutated only by the turn that currently holds the
/// session's lock (`SessionStore::lock`) — see `voice-agent-session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub conversation_id: String,
    #[serde(default)]
    pub driver_id: Option<String>,
    pub language: Language,
    #[serde(default)]
    pub current_intent: Option<IntentType>,
    #[serde(default)]
    pub slots: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub no_response_count: u32,
    pub last_activity: DateTime<Utc>,
    /// Chunks dropped by the turn controller's backpressure policy.
    #[serde(default)]
    pub dropped_chunks: u64,
    #[serde(default)]
    pub escalation_reason: Option<String>,
}

impl ConversationState {
    pub fn new(conversation_id: impl Into<String>, language: Language) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            driver_id: None,
            language,
            current_intent: None,
            slots: HashMap::new(),
            status: SessionStatus::Active,
            history: Vec::new(),
            retry_count: 0,
            no_response_count: 0,
            last_activity: Utc::now(),
            dropped_chunks: 0,
            escalation_reason: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Merge NLU entities into slots, later values overwriting earlier ones for the
    /// same key.
    pub fn merge_entities(&mut self, entities: HashMap<String, serde_json::Value>) {
        for (key, value) in entities {
            self.slots.insert(key, value);
        }
    }

    pub fn escalate(&mut self, reason: impl Into<String>) {
        self.status = SessionStatus::Escalated;
        self.escalation_reason = Some(reason.into());
        self.current_intent = None;
        self.touch();
    }

    pub fn complete(&mut self) {
        self.status = SessionStatus::Completed;
        self.touch();
    }

    /// Externally-triggered cancellation (caller hung up, socket closed).
    /// A no-op on an already-terminal session, so repeated calls are safe.
    pub fn cancel(&mut self) {
        if self.is_terminal() {
            return;
        }
        self.status = SessionStatus::Completed;
        self.escalation_reason = Some("cancelled".to_string());
        self.current_intent = None;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_active_and_not_terminal() {
        let state = ConversationState::new("c1", Language::English);
        assert_eq!(state.status, SessionStatus::Active);
        assert!(!state.is_terminal());
        assert_eq!(state.retry_count, 0);
        assert_eq!(state.no_response_count, 0);
    }

    #[test]
    fn escalate_clears_latched_intent_and_sets_terminal() {
        let mut state = ConversationState::new("c1", Language::English);
        state.current_intent = Some(IntentType::FindNearestStation);
        state.escalate("user requested agent or is angry");
        assert!(state.is_terminal());
        assert_eq!(state.status, SessionStatus::Escalated);
        assert!(state.current_intent.is_none());
        assert_eq!(
            state.escalation_reason.as_deref(),
            Some("user requested agent or is angry")
        );
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut state = ConversationState::new("c1", Language::English);
        state.cancel();
        let first_touch = state.last_activity;
        assert_eq!(state.status, SessionStatus::Completed);
        assert_eq!(state.escalation_reason.as_deref(), Some("cancelled"));

        state.cancel();
        assert_eq!(state.status, SessionStatus::Completed);
        assert_eq!(state.last_activity, first_touch, "no-op on an already-terminal session");
    }

    #[test]
    fn merge_entities_overwrites_same_key() {
        let mut state = ConversationState::new("c1", Language::English);
        let mut first = HashMap::new();
        first.insert("location".to_string(), serde_json::json!("Delhi"));
        state.merge_entities(first);

        let mut second = HashMap::new();
        second.insert("location".to_string(), serde_json::json!("Noida"));
        state.merge_entities(second);

        assert_eq!(state.slots.get("location"), Some(&serde_json::json!("Noida")));
    }
}
