use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use voice_agent_core::{ConversationState, Language, Result, SessionGuard, SessionStore};

/// In-memory `SessionStore`, keyed by conversation id.
///
/// The directory (which ids exist) is guarded by a `parking_lot::RwLock` for
/// cheap concurrent reads; each session's state lives behind its own
/// `tokio::sync::Mutex` so `lock` serializes turns for one conversation
/// without blocking any other conversation (Design Note: "per-session lock,
/// not a global lock").
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Arc<AsyncMutex<ConversationState>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, conversation_id: &str, language: Language) -> Arc<AsyncMutex<ConversationState>> {
        if let Some(existing) = self.sessions.read().get(conversation_id) {
            return existing.clone();
        }
        let mut sessions = self.sessions.write();
        sessions
            .entry(conversation_id.to_string())
            .or_insert_with(|| {
                Arc::new(AsyncMutex::new(ConversationState::new(
                    conversation_id,
                    language,
                )))
            })
            .clone()
    }
}

struct MemorySessionGuard {
    guard: OwnedMutexGuard<ConversationState>,
}

#[async_trait]
impl SessionGuard for MemorySessionGuard {
    fn state(&self) -> &ConversationState {
        &self.guard
    }

    fn state_mut(&mut self) -> &mut ConversationState {
        &mut self.guard
    }

    async fn commit(&mut self) -> Result<()> {
        // The guard mutates the shared cell directly; nothing left to flush.
        Ok(())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(
        &self,
        conversation_id: &str,
        language: Language,
    ) -> Result<ConversationState> {
        let cell = self.entry(conversation_id, language);
        let state = cell.lock().await;
        Ok(state.clone())
    }

    async fn save(&self, state: &ConversationState) -> Result<()> {
        let cell = self.entry(&state.conversation_id, state.language);
        let mut guard = cell.lock().await;
        *guard = state.clone();
        Ok(())
    }

    async fn lock(&self, conversation_id: &str) -> Result<Box<dyn SessionGuard>> {
        let cell = self.entry(conversation_id, Language::default());
        let guard = cell.lock_owned().await;
        Ok(Box::new(MemorySessionGuard { guard }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_or_create_persists_across_calls() {
        let store = InMemorySessionStore::new();
        let first = store.get_or_create("c1", Language::English).await.unwrap();
        assert_eq!(first.conversation_id, "c1");

        {
            let mut guard = store.lock("c1").await.unwrap();
            guard.state_mut().retry_count = 2;
            guard.commit().await.unwrap();
        }

        let second = store.get_or_create("c1", Language::English).await.unwrap();
        assert_eq!(second.retry_count, 2);
    }

    #[tokio::test]
    async fn different_ids_do_not_share_state() {
        let store = InMemorySessionStore::new();
        {
            let mut guard = store.lock("a").await.unwrap();
            guard.state_mut().retry_count = 1;
            guard.commit().await.unwrap();
        }
        {
            let mut guard = store.lock("b").await.unwrap();
            guard.state_mut().retry_count = 9;
            guard.commit().await.unwrap();
        }

        let a = store.get_or_create("a", Language::English).await.unwrap();
        let b = store.get_or_create("b", Language::English).await.unwrap();
        assert_eq!(a.retry_count, 1);
        assert_eq!(b.retry_count, 9);
    }

    #[tokio::test]
    async fn concurrent_turns_on_same_id_serialize() {
        let store = Arc::new(InMemorySessionStore::new());
        store.get_or_create("c1", Language::English).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut guard = store.lock("c1").await.unwrap();
                guard.state_mut().retry_count += 1;
                guard.commit().await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let state = store.get_or_create("c1", Language::English).await.unwrap();
        assert_eq!(state.retry_count, 20);
    }
}
