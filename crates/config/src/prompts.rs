//! Static, language-indexed prompt tables.
//!
//! Selection within a bucket is deterministic given `(conversation_id, counter)`
//! so a session never hears the same proactive prompt twice in a row while
//! still being reproducible for tests.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use voice_agent_core::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptBucket {
    Greeting,
    Clarification,
    NoResponseEscalation,
    Farewell,
    ProactivePrompt,
    /// Localized apology for a recovered `AdapterTimeout`/`AdapterUnavailable`
    /// (spec §7, §4.3) — never spoken in English to a Hindi session.
    AdapterApology,
}

/// One language's worth of canned utterances, grouped by bucket.
#[derive(Debug, Clone)]
pub struct PromptTable {
    greeting: Vec<&'static str>,
    clarification: Vec<&'static str>,
    no_response_escalation: Vec<&'static str>,
    farewell: Vec<&'static str>,
    proactive_prompt: Vec<&'static str>,
    adapter_apology: Vec<&'static str>,
}

impl PromptTable {
    pub fn for_language(language: Language) -> Self {
        match language {
            Language::English => Self::english(),
            Language::Hindi => Self::hindi(),
        }
    }

    fn english() -> Self {
        Self {
            greeting: vec![
                "Hello, this is the driver support assistant. How can I help you today?",
            ],
            clarification: vec![
                "I'm sorry, I didn't quite catch that. Could you please repeat?",
                "Sorry, could you say that again, a little more slowly?",
            ],
            no_response_escalation: vec![
                "I haven't heard from you, so I'm connecting you with a support agent now.",
            ],
            farewell: vec!["Thank you for calling driver support. Goodbye."],
            proactive_prompt: vec![
                "Are you still there? Please let me know how I can help.",
                "I'm still listening whenever you're ready.",
                "Take your time — just let me know what you need.",
            ],
            adapter_apology: vec![
                "Sorry, I'm having trouble processing that right now. Could you try again?",
            ],
        }
    }

    fn hindi() -> Self {
        Self {
            greeting: vec!["नमस्ते, यह ड्राइवर सहायता सेवा है। मैं आपकी कैसे मदद कर सकता हूँ?"],
            clarification: vec![
                "माफ़ कीजिए, मुझे समझ नहीं आया। क्या आप दोबारा बता सकते हैं?",
                "क्षमा करें, क्या आप थोड़ा धीरे से दोबारा कह सकते हैं?",
            ],
            no_response_escalation: vec![
                "मुझे आपकी आवाज़ नहीं सुनाई दी, इसलिए मैं अभी आपको एक सहायता अधिकारी से जोड़ रहा हूँ।",
            ],
            farewell: vec!["ड्राइवर सहायता से संपर्क करने के लिए धन्यवाद। अलविदा।"],
            proactive_prompt: vec![
                "क्या आप अभी भी वहाँ हैं? कृपया बताएं मैं कैसे मदद कर सकता हूँ।",
                "मैं अभी भी सुन रहा हूँ, जब आप तैयार हों।",
                "आराम से बताइए आपको क्या चाहिए।",
            ],
            adapter_apology: vec![
                "क्षमा करें, अभी इसे संसाधित करने में दिक्कत हो रही है। क्या आप दोबारा कोशिश कर सकते हैं?",
            ],
        }
    }

    fn bucket(&self, bucket: PromptBucket) -> &[&'static str] {
        match bucket {
            PromptBucket::Greeting => &self.greeting,
            PromptBucket::Clarification => &self.clarification,
            PromptBucket::NoResponseEscalation => &self.no_response_escalation,
            PromptBucket::Farewell => &self.farewell,
            PromptBucket::ProactivePrompt => &self.proactive_prompt,
            PromptBucket::AdapterApology => &self.adapter_apology,
        }
    }

    /// Deterministically pick one prompt from `bucket`, varying by
    /// `conversation_id` and `counter` so repeated calls within a session
    /// don't repeat the same line while staying reproducible.
    pub fn pick(&self, bucket: PromptBucket, conversation_id: &str, counter: u32) -> &'static str {
        let choices = self.bucket(bucket);
        debug_assert!(!choices.is_empty(), "prompt bucket must never be empty");
        if choices.len() == 1 {
            return choices[0];
        }
        let mut hasher = DefaultHasher::new();
        conversation_id.hash(&mut hasher);
        counter.hash(&mut hasher);
        let index = (hasher.finish() as usize) % choices.len();
        choices[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_bucket_has_at_least_one_entry_per_language() {
        for language in [Language::English, Language::Hindi] {
            let table = PromptTable::for_language(language);
            for bucket in [
                PromptBucket::Greeting,
                PromptBucket::Clarification,
                PromptBucket::NoResponseEscalation,
                PromptBucket::Farewell,
                PromptBucket::ProactivePrompt,
                PromptBucket::AdapterApology,
            ] {
                assert!(!table.bucket(bucket).is_empty());
            }
        }
    }

    #[test]
    fn pick_is_deterministic_given_same_inputs() {
        let table = PromptTable::for_language(Language::English);
        let a = table.pick(PromptBucket::ProactivePrompt, "conv-1", 1);
        let b = table.pick(PromptBucket::ProactivePrompt, "conv-1", 1);
        assert_eq!(a, b);
    }

    #[test]
    fn pick_varies_by_counter_within_a_session() {
        let table = PromptTable::for_language(Language::English);
        let picks: Vec<_> = (0..3)
            .map(|n| table.pick(PromptBucket::ProactivePrompt, "conv-1", n))
            .collect();
        assert!(picks.windows(2).any(|w| w[0] != w[1]));
    }
}
