use async_trait::async_trait;
use voice_agent_core::{Language, Result, Synthesizer};

/// Stands in for a real text-to-speech model by stuffing the reply text into
/// the audio payload verbatim. Good enough for exercising the turn
/// controller's `SPEAKING` transition and response plumbing end-to-end
/// without a model dependency.
#[derive(Default)]
pub struct StubSynthesizer;

impl StubSynthesizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Synthesizer for StubSynthesizer {
    async fn synthesize(&self, text: &str, _language: Language) -> Result<Vec<u8>> {
        Ok(text.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_text_as_bytes() {
        let synthesizer = StubSynthesizer::new();
        let audio = synthesizer.synthesize("hello", Language::English).await.unwrap();
        assert_eq!(audio, b"hello".to_vec());
    }
}
