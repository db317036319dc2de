use async_trait::async_trait;

use crate::{Language, Result};

/// Converts reply text into audio (text-to-speech).
#[async_trait]
pub trait Synthesizer: Send + Sync + 'static {
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>>;
}
