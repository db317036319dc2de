use async_trait::async_trait;
use voice_agent_core::{Language, Recognizer, Result};

/// Treats the inbound audio buffer as UTF-8 text and returns it verbatim,
/// trimmed. Stands in for a real speech-to-text model: callers that feed it
/// real PCM bytes will get back an empty (or garbled) string, which is
/// exactly the "no intelligible speech" case the orchestrator already
/// handles via `handle_no_speech`.
#[derive(Default)]
pub struct PassThroughRecognizer;

impl PassThroughRecognizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Recognizer for PassThroughRecognizer {
    async fn transcribe(&self, audio: &[u8], _language: Language) -> Result<String> {
        Ok(String::from_utf8_lossy(audio).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_trimmed_text() {
        let recognizer = PassThroughRecognizer::new();
        let text = recognizer
            .transcribe(b"  find station  ", Language::English)
            .await
            .unwrap();
        assert_eq!(text, "find station");
    }

    #[tokio::test]
    async fn empty_buffer_yields_empty_text() {
        let recognizer = PassThroughRecognizer::new();
        let text = recognizer.transcribe(b"", Language::English).await.unwrap();
        assert!(text.is_empty());
    }
}
