use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::warn;
use voice_agent_core::{Handoff, Result};

/// One recorded escalation, kept for assertions in tests that exercise the
/// orchestrator end to end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationRecord {
    pub conversation_id: String,
    pub summary: String,
    pub reason: String,
}

/// `Handoff` that logs and records escalations instead of delivering them to
/// a real queue or live transfer. Tests can inspect `escalations()` to assert
/// exactly one handoff occurred with the expected reason.
#[derive(Default)]
pub struct RecordingHandoff {
    escalations: Mutex<Vec<EscalationRecord>>,
}

impl RecordingHandoff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn escalations(&self) -> Vec<EscalationRecord> {
        self.escalations.lock().clone()
    }
}

#[async_trait]
impl Handoff for RecordingHandoff {
    async fn escalate(&self, conversation_id: &str, summary: &str, reason: &str) -> Result<()> {
        warn!(conversation_id, reason, "escalating session to a human agent");
        self.escalations.lock().push(EscalationRecord {
            conversation_id: conversation_id.to_string(),
            summary: summary.to_string(),
            reason: reason.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_each_escalation() {
        let handoff = RecordingHandoff::new();
        handoff
            .escalate("c1", "angry customer", "user requested agent or is angry")
            .await
            .unwrap();
        let records = handoff.escalations();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].conversation_id, "c1");
        assert_eq!(records[0].reason, "user requested agent or is angry");
    }
}
