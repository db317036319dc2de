use async_trait::async_trait;

use crate::Result;

/// Hands a session off to a human agent once the orchestrator has marked it
/// `Escalated`. Implementations own how the handoff is delivered (queue,
/// ticket, live transfer) — the orchestrator only needs to know it was
/// accepted.
#[async_trait]
pub trait Handoff: Send + Sync + 'static {
    async fn escalate(&self, conversation_id: &str, summary: &str, reason: &str) -> Result<()>;
}
