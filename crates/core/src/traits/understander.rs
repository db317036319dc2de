use async_trait::async_trait;

use crate::{Language, NluResult, Result};

/// Extracts intent, entities and sentiment from a user's utterance.
#[async_trait]
pub trait Understander: Send + Sync + 'static {
    async fn analyze(&self, text: &str, language: Language) -> Result<NluResult>;
}
