//! Elliptical follow-ups
//!
//! "what about Paris" or "and in Tokyo?" only make sense against the
//! previous turn: the last actionable intent is repeated with the new
//! target.

use once_cell::sync::Lazy;
use regex::Regex;

use shadow_core::{ClassificationTier, Intent};
use shadow_text_processing::canonical_location;

use crate::context::ContextSnapshot;

static FOLLOW_UP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:(?:what|how)\s+about|and\s+(?:in|for|at|about))\s+(.+?)[\s?.!]*$").unwrap()
});

/// Resolves follow-ups against conversation context
#[derive(Debug, Clone, Copy, Default)]
pub struct FollowUpResolver;

impl FollowUpResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(&self, text: &str, context: &ContextSnapshot, confidence: f32) -> Option<Intent> {
        let subject = FOLLOW_UP.captures(text)?.get(1)?.as_str().trim();
        if subject.is_empty() {
            return None;
        }
        let previous = context.last_actionable()?;

        let mut intent = Intent::new(previous.intent_type, previous.action.clone(), ClassificationTier::FollowUp)
            .with_confidence(confidence)
            .with_rationale(format!("follow-up to {}", previous));

        intent = match previous.action.as_str() {
            "get_weather" => {
                let location = canonical_location(subject);
                intent.with_target(location.clone()).with_param("location", location)
            }
            "get_stock" => {
                let symbol = subject.to_uppercase();
                intent.with_target(symbol.clone()).with_param("symbol", symbol)
            }
            "search_web" => intent.with_target(subject).with_param("query", subject),
            "get_news" | "get_fact" => intent.with_target(subject).with_param("topic", subject),
            _ => intent.with_target(subject),
        };
        Some(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextStore;
    use shadow_core::IntentType;

    fn after(action: &str, target: &str) -> ContextSnapshot {
        let store = ContextStore::new(5, 3);
        store.update(
            "first",
            &Intent::new(IntentType::Knowledge, action, ClassificationTier::Pattern).with_target(target),
        );
        store.update(
            "tell me a joke",
            &Intent::new(IntentType::Chat, "respond", ClassificationTier::Fallback),
        );
        store.snapshot()
    }

    #[test]
    fn test_weather_follow_up() {
        let intent = FollowUpResolver::new()
            .resolve("what about paris?", &after("get_weather", "London"), 0.85)
            .unwrap();
        assert_eq!(intent.action, "get_weather");
        assert_eq!(intent.target, "Paris");
        assert_eq!(intent.tier, ClassificationTier::FollowUp);
        assert_eq!(intent.confidence, 0.85);
    }

    #[test]
    fn test_and_in_form() {
        let intent = FollowUpResolver::new()
            .resolve("and in Tokyo", &after("get_weather", "London"), 0.85)
            .unwrap();
        assert_eq!(intent.target, "Tokyo");
    }

    #[test]
    fn test_needs_previous_intent() {
        let empty = ContextSnapshot::default();
        assert!(FollowUpResolver::new().resolve("what about paris", &empty, 0.85).is_none());
        assert!(FollowUpResolver::new()
            .resolve("paris is nice", &after("get_weather", "London"), 0.85)
            .is_none());
    }
}
