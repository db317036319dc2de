use std::collections::HashMap;

use async_trait::async_trait;
use unicode_segmentation::UnicodeSegmentation;
use voice_agent_core::{IntentType, Language, NluResult, Result, Sentiment, Understander};

struct IntentRule {
    intent: IntentType,
    keywords: &'static [&'static str],
}

const INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        intent: IntentType::FindNearestStation,
        keywords: &["station", "nearest", "charging point", "स्टेशन", "नज़दीकी"],
    },
    IntentRule {
        intent: IntentType::GetSwapHistory,
        keywords: &["swap history", "swap", "history", "स्वैप"],
    },
    IntentRule {
        intent: IntentType::ExplainInvoice,
        keywords: &["invoice", "bill", "बिल", "चालान"],
    },
    IntentRule {
        intent: IntentType::CheckAvailability,
        keywords: &["available", "availability", "उपलब्ध"],
    },
    IntentRule {
        intent: IntentType::CheckSubscription,
        keywords: &["subscription status", "subscription", "सदस्यता"],
    },
    IntentRule {
        intent: IntentType::RenewSubscription,
        keywords: &["renew", "renewal", "नवीनीकरण"],
    },
    IntentRule {
        intent: IntentType::PricingInfo,
        keywords: &["price", "pricing", "cost", "कीमत"],
    },
    IntentRule {
        intent: IntentType::LeaveInfo,
        keywords: &["leave", "holiday", "छुट्टी"],
    },
    IntentRule {
        intent: IntentType::FindDsk,
        keywords: &["dsk", "delivery station", "डीएसके"],
    },
];

const ANGRY_KEYWORDS: &[&str] = &[
    "angry", "furious", "terrible", "worst", "useless", "गुस्सा", "बकवास",
];
const NEGATIVE_KEYWORDS: &[&str] = &["bad", "not working", "problem", "issue", "खराब", "समस्या"];
const POSITIVE_KEYWORDS: &[&str] = &["thanks", "great", "good", "धन्यवाद", "अच्छा"];

const DATE_KEYWORDS: &[&str] = &[
    "today", "yesterday", "this week", "last week", "आज", "कल", "इस हफ्ते",
];

/// Keyword- and regex-driven `Understander`. Not a production NLU engine —
/// a deterministic stand-in an orchestrator can be built and tested against.
#[derive(Default)]
pub struct RuleBasedUnderstander;

impl RuleBasedUnderstander {
    pub fn new() -> Self {
        Self
    }

    fn classify_intent(&self, lowered: &str) -> (IntentType, f32) {
        for rule in INTENT_RULES {
            if rule.keywords.iter().any(|kw| lowered.contains(kw)) {
                return (rule.intent, 0.9);
            }
        }
        (IntentType::Unknown, 0.4)
    }

    fn classify_sentiment(&self, lowered: &str) -> Sentiment {
        if ANGRY_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            Sentiment::Angry
        } else if NEGATIVE_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            Sentiment::Negative
        } else if POSITIVE_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            Sentiment::Positive
        } else {
            Sentiment::Neutral
        }
    }

    fn extract_entities(&self, text: &str, lowered: &str) -> HashMap<String, serde_json::Value> {
        let mut entities = HashMap::new();

        if DATE_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            let matched = DATE_KEYWORDS
                .iter()
                .find(|kw| lowered.contains(*kw))
                .copied()
                .unwrap_or("today");
            entities.insert(
                "date_range".to_string(),
                serde_json::Value::String(matched.to_string()),
            );
        }

        // A bare single word with no recognized intent keyword is treated as
        // a slot-fill answer (e.g. a place name typed in response to "which
        // area are you in?").
        let words: Vec<&str> = text.unicode_words().collect();
        if words.len() == 1 && self.classify_intent(lowered).0 == IntentType::Unknown {
            entities.insert(
                "location".to_string(),
                serde_json::Value::String(words[0].to_string()),
            );
        }

        entities
    }
}

#[async_trait]
impl Understander for RuleBasedUnderstander {
    async fn analyze(&self, text: &str, _language: Language) -> Result<NluResult> {
        let lowered = text.to_lowercase();
        let (intent, mut confidence) = self.classify_intent(&lowered);
        let sentiment = self.classify_sentiment(&lowered);
        let entities = self.extract_entities(text, &lowered);

        // A bare slot-fill answer (no intent keyword, exactly one extracted
        // entity) is unambiguous even though no intent keyword matched —
        // raise confidence so it merges into whatever intent is already
        // latched instead of tripping the clarification gate.
        if intent == IntentType::Unknown && !entities.is_empty() {
            confidence = 0.75;
        }

        Ok(NluResult {
            intent,
            confidence,
            entities,
            sentiment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recognizes_find_nearest_station_intent() {
        let understander = RuleBasedUnderstander::new();
        let result = understander
            .analyze("find station", Language::English)
            .await
            .unwrap();
        assert_eq!(result.intent, IntentType::FindNearestStation);
        assert!(result.confidence >= 0.6);
    }

    #[tokio::test]
    async fn bare_word_after_unknown_intent_becomes_location_entity() {
        let understander = RuleBasedUnderstander::new();
        let result = understander
            .analyze("Noida", Language::English)
            .await
            .unwrap();
        assert_eq!(result.intent, IntentType::Unknown);
        assert_eq!(
            result.entities.get("location"),
            Some(&serde_json::Value::String("Noida".to_string()))
        );
        assert!(result.confidence >= 0.6);
    }

    #[tokio::test]
    async fn angry_keyword_yields_angry_sentiment() {
        let understander = RuleBasedUnderstander::new();
        let result = understander
            .analyze("this is bad, I want an agent", Language::English)
            .await
            .unwrap();
        assert_ne!(result.sentiment, Sentiment::Positive);
    }

    #[tokio::test]
    async fn swap_history_with_date_keyword_extracts_date_range() {
        let understander = RuleBasedUnderstander::new();
        let result = understander
            .analyze("swap history yesterday", Language::English)
            .await
            .unwrap();
        assert_eq!(result.intent, IntentType::GetSwapHistory);
        assert_eq!(
            result.entities.get("date_range"),
            Some(&serde_json::Value::String("yesterday".to_string()))
        );
    }
}
