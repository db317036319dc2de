use async_trait::async_trait;
use tracing::info;
use voice_agent_core::{ConversationState, Language, Result, SessionGuard, SessionStore};

use crate::InMemorySessionStore;

/// Shows the substitution point for a networked session store without
/// actually wiring one. Delegates every operation to an in-memory store
/// while logging what a real backend would persist.
pub struct StubDurableSessionStore {
    inner: InMemorySessionStore,
    backend_name: &'static str,
}

impl StubDurableSessionStore {
    pub fn new(backend_name: &'static str) -> Self {
        Self {
            inner: InMemorySessionStore::new(),
            backend_name,
        }
    }
}

struct StubDurableGuard {
    inner: Box<dyn SessionGuard>,
    backend_name: &'static str,
}

#[async_trait]
impl SessionGuard for StubDurableGuard {
    fn state(&self) -> &ConversationState {
        self.inner.state()
    }

    fn state_mut(&mut self) -> &mut ConversationState {
        self.inner.state_mut()
    }

    async fn commit(&mut self) -> Result<()> {
        info!(
            backend = self.backend_name,
            conversation_id = %self.inner.state().conversation_id,
            status = ?self.inner.state().status,
            "would persist conversation state to durable backend"
        );
        self.inner.commit().await
    }
}

#[async_trait]
impl SessionStore for StubDurableSessionStore {
    async fn get_or_create(
        &self,
        conversation_id: &str,
        language: Language,
    ) -> Result<ConversationState> {
        self.inner.get_or_create(conversation_id, language).await
    }

    async fn save(&self, state: &ConversationState) -> Result<()> {
        info!(
            backend = self.backend_name,
            conversation_id = %state.conversation_id,
            "would persist conversation state to durable backend"
        );
        self.inner.save(state).await
    }

    async fn lock(&self, conversation_id: &str) -> Result<Box<dyn SessionGuard>> {
        // A real backend would take a distributed lease here instead of an
        // in-process mutex, e.g. a Redis `SET NX PX` or a row-level lock.
        let inner = self.inner.lock(conversation_id).await?;
        Ok(Box::new(StubDurableGuard {
            inner,
            backend_name: self.backend_name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delegates_to_in_memory_backend() {
        let store = StubDurableSessionStore::new("redis");
        store.get_or_create("c1", Language::English).await.unwrap();
        {
            let mut guard = store.lock("c1").await.unwrap();
            guard.state_mut().retry_count = 1;
            guard.commit().await.unwrap();
        }
        let state = store.get_or_create("c1", Language::English).await.unwrap();
        assert_eq!(state.retry_count, 1);
    }
}
