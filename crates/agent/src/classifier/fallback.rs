//! Tier 4: structural fallback
//!
//! A short ladder over high-salience words. It never fails: when nothing
//! matches the utterance becomes a chat turn.

use shadow_core::{ClassificationTier, Intent, IntentType};
use shadow_text_processing::EntityExtractor;

use super::keywords::with_message_entities;

struct Rung {
    words: &'static [&'static str],
    intent_type: IntentType,
    action: &'static str,
    target: &'static str,
}

const LADDER: &[Rung] = &[
    Rung {
        words: &["weather", "temperature", "forecast"],
        intent_type: IntentType::Knowledge,
        action: "get_weather",
        target: "current location",
    },
    Rung {
        words: &["message", "tell", "send", "notify"],
        intent_type: IntentType::Messaging,
        action: "send_message",
        target: "contact",
    },
    Rung {
        words: &["remind", "alarm", "timer", "schedule"],
        intent_type: IntentType::Scheduling,
        action: "set_reminder",
        target: "task",
    },
    Rung {
        words: &["open", "close", "start", "run"],
        intent_type: IntentType::Automation,
        action: "open_app",
        target: "application",
    },
];

/// Placeholder targets the fallback uses when it knows nothing better
pub const PLACEHOLDER_TARGETS: &[&str] = &["current location", "contact", "task", "application", "user"];

/// Tier 4 ladder
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackLadder {
    entities: EntityExtractor,
}

impl FallbackLadder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&self, text: &str, confidence: f32) -> Intent {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let rung = LADDER
            .iter()
            .find(|rung| rung.words.iter().any(|w| words.contains(w)));

        let intent = match rung {
            Some(rung) => {
                let intent = Intent::new(rung.intent_type, rung.action, ClassificationTier::Fallback)
                    .with_target(rung.target);
                self.with_entities(intent, text)
            }
            None => Intent::new(IntentType::Chat, "respond", ClassificationTier::Fallback).with_target("user"),
        };

        intent
            .with_confidence(confidence)
            .with_param("query", text.trim())
            .with_rationale("structural fallback")
    }

    /// Entities a rung's handler needs; placeholders stay when none are found
    fn with_entities(&self, intent: Intent, text: &str) -> Intent {
        let entities = &self.entities;
        match intent.action.as_str() {
            "get_weather" => match entities.location(text) {
                Some(city) => intent.with_target(city.clone()).with_param("location", city),
                None => intent,
            },
            "send_message" => with_message_entities(intent, entities, text),
            "set_reminder" => match entities.time_expression(text) {
                Some(expr) => intent.with_param("time_expression", expr),
                None => intent,
            },
            _ => intent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_order() {
        let ladder = FallbackLadder::new();
        let intent = ladder.classify("will the forecast change", 0.3);
        assert_eq!(intent.action, "get_weather");
        assert_eq!(intent.target, "current location");

        let intent = ladder.classify("please notify my boss", 0.3);
        assert_eq!(intent.intent_type, IntentType::Messaging);
        assert_eq!(intent.target, "contact");

        let intent = ladder.classify("schedule something", 0.3);
        assert_eq!(intent.action, "set_reminder");

        let intent = ladder.classify("run the thing", 0.3);
        assert_eq!(intent.intent_type, IntentType::Automation);
    }

    #[test]
    fn test_default_is_chat() {
        let intent = FallbackLadder::new().classify("how are you doing", 0.3);
        assert_eq!(intent.intent_type, IntentType::Chat);
        assert_eq!(intent.action, "respond");
        assert_eq!(intent.confidence, 0.3);
        assert_eq!(intent.param("query"), Some("how are you doing"));
        assert_eq!(intent.tier, ClassificationTier::Fallback);
    }

    #[test]
    fn test_weather_keeps_known_city() {
        let intent = FallbackLadder::new().classify("temperature berlin", 0.3);
        assert_eq!(intent.target, "Berlin");
    }

    #[test]
    fn test_message_keeps_recipient_and_body() {
        let ladder = FallbackLadder::new();
        let intent = ladder.classify("send a message to Ali saying I'm late", 0.3);
        assert_eq!(intent.intent_type, IntentType::Messaging);
        assert_eq!(intent.target, "Ali");
        assert_eq!(intent.param("contact"), Some("Ali"));
        assert_eq!(intent.param("message"), Some("I'm late"));
        assert_eq!(intent.param("platform"), Some("whatsapp"));

        let intent = ladder.classify("message Ali saying running late", 0.3);
        assert_eq!(intent.param("contact"), Some("Ali"));
        assert_eq!(intent.param("message"), Some("running late"));

        let intent = ladder.classify("send a text to mom saying hi", 0.3);
        assert_eq!(intent.param("contact"), Some("mom"));
        assert_eq!(intent.param("platform"), Some("sms"));
    }

    #[test]
    fn test_schedule_keeps_time_expression() {
        let intent = FallbackLadder::new().classify("schedule the dentist tomorrow", 0.3);
        assert_eq!(intent.action, "set_reminder");
        assert_eq!(intent.param("time_expression"), Some("tomorrow"));
    }

    #[test]
    fn test_whole_words() {
        // "brunch" contains "run"
        let intent = FallbackLadder::new().classify("brunch ideas", 0.3);
        assert_eq!(intent.intent_type, IntentType::Chat);
    }
}
