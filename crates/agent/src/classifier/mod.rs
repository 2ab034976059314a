//! Intent Classifier
//!
//! Escalates through increasingly expensive stages and stops at the first
//! confident answer:
//!
//! ```text
//! reminder fast-path ─┐
//! Tier 1 patterns     ├─> Intent
//! Tier 2 keywords     │
//! follow-up context   │
//! Tier 3 AI           │
//! Tier 4 fallback  ───┘  (always answers)
//! ```
//!
//! Classification never fails. Every stage that cannot produce a
//! confident intent hands over to the next one.

pub mod ai;
pub mod fallback;
pub mod follow_up;
pub mod keywords;
pub mod patterns;

use std::sync::Arc;
use std::time::Duration;

use shadow_config::constants::classifier::{FOLLOW_UP_CONFIDENCE, REMINDER_CONFIDENCE};
use shadow_config::ClassifierConfig;
use shadow_core::{ClassificationTier, Intent, IntentType, Language, LanguageModel};
use shadow_text_processing::ReminderParser;

use crate::context::ContextSnapshot;

pub use ai::{parse_response, AiClassification, AiClassifier};
pub use fallback::{FallbackLadder, PLACEHOLDER_TARGETS};
pub use follow_up::FollowUpResolver;
pub use keywords::{KeywordScore, KeywordScorer};
pub use patterns::PatternMatcher;

/// Confidence of a reminder that still needs a time
const UNTIMED_REMINDER_CONFIDENCE: f32 = 0.7;

/// Four-tier classifier with reminder fast-path
pub struct IntentClassifier {
    config: ClassifierConfig,
    reminders: ReminderParser,
    patterns: PatternMatcher,
    keywords: KeywordScorer,
    follow_ups: FollowUpResolver,
    ai: Option<AiClassifier>,
    fallback: FallbackLadder,
}

impl IntentClassifier {
    /// Deterministic tiers only; see [`IntentClassifier::with_llm`]
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            reminders: ReminderParser::new(),
            patterns: PatternMatcher::new(),
            keywords: KeywordScorer::new(),
            follow_ups: FollowUpResolver::new(),
            ai: None,
            fallback: FallbackLadder::new(),
        }
    }

    /// Enable Tier 3 with `llm` (ignored when `ai_enabled` is off)
    pub fn with_llm(mut self, llm: Arc<dyn LanguageModel>) -> Self {
        if self.config.ai_enabled {
            let timeout = Duration::from_secs(self.config.ai_timeout_secs);
            self.ai = Some(AiClassifier::new(llm, timeout));
        }
        self
    }

    pub fn has_ai(&self) -> bool {
        self.ai.is_some()
    }

    /// Classify one (normalized) utterance
    pub async fn classify(&self, text: &str, language: Language, context: &ContextSnapshot) -> Intent {
        let text = text.trim();
        if text.is_empty() {
            return Intent::new(IntentType::Chat, "respond", ClassificationTier::Fallback)
                .with_rationale("empty input");
        }

        let intent = self.run_tiers(text, language, context).await;
        metrics::counter!("shadow_classifications_total", "tier" => intent.tier.as_str()).increment(1);
        tracing::debug!(
            tier = intent.tier.as_str(),
            intent_type = %intent.intent_type,
            action = %intent.action,
            target = %intent.target,
            confidence = intent.confidence,
            language = language.code(),
            "Classified utterance"
        );
        intent
    }

    async fn run_tiers(&self, text: &str, language: Language, context: &ContextSnapshot) -> Intent {
        if let Some(intent) = self.reminder(text, language) {
            return intent;
        }

        if let Some(intent) = self.patterns.classify(text) {
            if intent.confidence > self.config.pattern_threshold {
                return intent;
            }
            tracing::debug!(
                action = %intent.action,
                confidence = intent.confidence,
                "Pattern match not confident enough"
            );
        }

        if let Some(intent) = self.keywords.classify(text, self.config.keyword_threshold) {
            return intent;
        }

        if let Some(intent) = self.follow_ups.resolve(text, context, FOLLOW_UP_CONFIDENCE) {
            return intent;
        }

        if let Some(ai) = &self.ai {
            if let Some(intent) = ai.classify(text, language, context).await {
                return intent;
            }
        }

        self.fallback.classify(text, self.config.fallback_confidence)
    }

    /// Reminder fast-path, bypassing the general tiers
    fn reminder(&self, text: &str, language: Language) -> Option<Intent> {
        if !self.reminders.is_reminder(text, language) {
            return None;
        }
        let parsed = self.reminders.parse(text, language)?;
        let confidence = if parsed.has_time() {
            REMINDER_CONFIDENCE
        } else {
            UNTIMED_REMINDER_CONFIDENCE
        };
        Some(
            Intent::new(IntentType::Scheduling, "set_reminder", ClassificationTier::Reminder)
                .with_target(parsed.message.clone())
                .with_params(parsed.to_parameters())
                .with_confidence(confidence)
                .with_rationale(format!("{} reminder phrasing", language.name())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shadow_core::{Message, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedLlm {
        reply: String,
        calls: AtomicUsize,
    }

    impl CannedLlm {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for CannedLlm {
        async fn ask(&self, _messages: &[Message]) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    fn classifier(llm: Arc<CannedLlm>) -> IntentClassifier {
        IntentClassifier::new(ClassifierConfig::default()).with_llm(llm)
    }

    #[tokio::test]
    async fn test_confident_pattern_skips_ai() {
        let llm = CannedLlm::new("{}");
        let intent = classifier(llm.clone())
            .classify("what's the weather like in London", Language::English, &ContextSnapshot::default())
            .await;
        assert_eq!(intent.action, "get_weather");
        assert_eq!(intent.target, "London");
        assert!(intent.confidence >= 0.8);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reminder_fast_path() {
        let llm = CannedLlm::new("{}");
        let intent = classifier(llm.clone())
            .classify("remind me to call mom in 10 minutes", Language::English, &ContextSnapshot::default())
            .await;
        assert_eq!(intent.tier, ClassificationTier::Reminder);
        assert_eq!(intent.param("message"), Some("call mom"));
        assert_eq!(intent.param("relative_minutes"), Some("10"));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ai_result_used_when_deterministic_tiers_fail() {
        let llm = CannedLlm::new(
            r#"{"intent_type": "messaging", "confidence": 0.94, "action": "send_message", "target": "Sarah", "parameters": {"message": "approved"}, "reasoning": "notify"}"#,
        );
        let intent = classifier(llm.clone())
            .classify("let sarah know it is approved", Language::English, &ContextSnapshot::default())
            .await;
        assert_eq!(intent.tier, ClassificationTier::Ai);
        assert_eq!(intent.intent_type, IntentType::Messaging);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_ai_falls_back_to_chat() {
        let llm = CannedLlm::new("{\"intent_type\": \"chat\", \"confid");
        let intent = classifier(llm.clone())
            .classify("how are you doing", Language::English, &ContextSnapshot::default())
            .await;
        assert_eq!(intent.tier, ClassificationTier::Fallback);
        assert_eq!(intent.intent_type, IntentType::Chat);
        assert_eq!(intent.confidence, 0.3);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_ai_is_never_called() {
        let llm = CannedLlm::new("{}");
        let config = ClassifierConfig {
            ai_enabled: false,
            ..Default::default()
        };
        let classifier = IntentClassifier::new(config).with_llm(llm.clone());
        assert!(!classifier.has_ai());
        classifier
            .classify("how are you doing", Language::English, &ContextSnapshot::default())
            .await;
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_garbage_stays_in_closed_set() {
        let classifier = IntentClassifier::new(ClassifierConfig::default());
        let inputs = ["", "   ", "!!!???", "ۓۓۓ", "\u{0}\u{1}", "a", "12:99 pm remind", "what about", "زه"];
        for input in inputs {
            let intent = classifier
                .classify(input, Language::English, &ContextSnapshot::default())
                .await;
            assert!(IntentType::ALL.contains(&intent.intent_type));
            assert!((0.0..=1.0).contains(&intent.confidence));
        }
    }
}
