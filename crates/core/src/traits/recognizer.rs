use async_trait::async_trait;

use crate::{Language, Result};

/// Converts recorded audio into text (speech-to-text).
///
/// An empty return is not an error — it means no intelligible speech was found,
/// and the orchestrator routes it through `handle_no_speech` rather than retrying
/// the same handler. A real recognizer never returns `Err` for "nothing heard".
#[async_trait]
pub trait Recognizer: Send + Sync + 'static {
    async fn transcribe(&self, audio: &[u8], language: Language) -> Result<String>;
}
