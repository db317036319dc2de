use async_trait::async_trait;

use crate::{ConversationState, Language, Result};

/// Exclusive, RAII-style access to one session's state for the duration of a
/// turn. Mutate through `state_mut`, then call `commit` before the guard is
/// dropped to persist the change; dropping without committing still
/// releases the lock but abandons the mutation.
///
/// A closure-based `with_lock(id, fn)` would make `SessionStore` generic
/// over `fn`'s return type and therefore not object-safe — `Arc<dyn
/// SessionStore>` could never be constructed. This guard gives the
/// orchestrator the same "hold the lock across the whole turn, including
/// adapter calls" semantics while keeping the trait a valid trait object.
#[async_trait]
pub trait SessionGuard: Send {
    fn state(&self) -> &ConversationState;
    fn state_mut(&mut self) -> &mut ConversationState;
    async fn commit(&mut self) -> Result<()>;
}

/// Persists and serializes access to `ConversationState`.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Load the session if it exists, otherwise create and persist a fresh one.
    async fn get_or_create(&self, conversation_id: &str, language: Language) -> Result<ConversationState>;

    async fn save(&self, state: &ConversationState) -> Result<()>;

    /// Acquire exclusive access to the named session. Two turns for the same
    /// id can never interleave; turns on different ids never contend.
    async fn lock(&self, conversation_id: &str) -> Result<Box<dyn SessionGuard>>;
}
