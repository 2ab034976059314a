//! Conversation Context Store
//!
//! Session-scoped memory carried across turns:
//! - current topic (target of the last non-chat intent)
//! - FIFO window of recent intent summaries
//! - mood inferred from lexical cues, reset to neutral after a run of
//!   turns without any cue
//! - explicit user preferences, never evicted
//!
//! Every mutation goes through one mutex so concurrent turns (text and
//! voice) cannot interleave inside an update.

use std::collections::{BTreeMap, VecDeque};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use shadow_core::{Intent, IntentSummary, IntentType, Mood};

/// Intent summaries shown by [`ContextStore::get_state`]
const STATE_RECENT: usize = 3;

// Checked in order; the first category with a hit wins
const MOOD_CUES: &[(Mood, &[&str])] = &[
    (Mood::Urgent, &["now", "quick", "quickly", "immediately", "asap", "emergency", "urgent"]),
    (Mood::Casual, &["maybe", "perhaps", "when you can", "no rush"]),
    (Mood::Frustrated, &["why", "not working", "error", "problem", "fix"]),
    (Mood::Happy, &["thanks", "thank you", "great", "awesome", "perfect"]),
];

/// Read-only view handed to the classifier
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextSnapshot {
    pub current_topic: Option<String>,
    /// Oldest first
    pub recent_intents: Vec<IntentSummary>,
    pub mood: Mood,
}

impl ContextSnapshot {
    /// Most recent intent that did something other than chat
    pub fn last_actionable(&self) -> Option<&IntentSummary> {
        self.recent_intents
            .iter()
            .rev()
            .find(|s| !matches!(s.intent_type, IntentType::Chat | IntentType::Unknown))
    }

    /// The last `n` summaries rendered as `action->target`
    pub fn recent_actions(&self, n: usize) -> Vec<String> {
        let skip = self.recent_intents.len().saturating_sub(n);
        self.recent_intents
            .iter()
            .skip(skip)
            .map(ToString::to_string)
            .collect()
    }
}

/// Conversation summary exposed to callers and the chat prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub current_topic: Option<String>,
    pub mood: Mood,
    pub recent_actions: Vec<String>,
    pub interaction_count: u64,
    pub preferences: BTreeMap<String, String>,
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "topic: {}; mood: {}; recent actions: [{}]; interactions: {}",
            self.current_topic.as_deref().unwrap_or("none"),
            self.mood.as_str(),
            self.recent_actions.join(", "),
            self.interaction_count,
        )?;
        if !self.preferences.is_empty() {
            let prefs: Vec<String> = self
                .preferences
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, "; preferences: {}", prefs.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ContextInner {
    current_topic: Option<String>,
    recent_intents: VecDeque<IntentSummary>,
    mood: Mood,
    calm_turns: u32,
    interaction_count: u64,
    preferences: BTreeMap<String, String>,
}

/// Thread-safe conversation context
#[derive(Debug)]
pub struct ContextStore {
    window: usize,
    mood_decay_turns: u32,
    inner: Mutex<ContextInner>,
}

impl ContextStore {
    /// `window` bounds the recent-intent FIFO; `mood_decay_turns` of 0
    /// keeps a detected mood until another cue replaces it
    pub fn new(window: usize, mood_decay_turns: u32) -> Self {
        Self {
            window: window.max(1),
            mood_decay_turns,
            inner: Mutex::new(ContextInner::default()),
        }
    }

    /// Record one finished classification
    pub fn update(&self, utterance: &str, intent: &Intent) {
        let mut inner = self.inner.lock();
        inner.interaction_count += 1;

        inner.recent_intents.push_back(intent.summary());
        while inner.recent_intents.len() > self.window {
            inner.recent_intents.pop_front();
        }

        if intent.intent_type != IntentType::Chat {
            let target = intent.target.trim();
            inner.current_topic = (!target.is_empty()).then(|| target.to_string());
        }

        match detect_mood(utterance) {
            Some(mood) => {
                inner.mood = mood;
                inner.calm_turns = 0;
            }
            None => {
                inner.calm_turns += 1;
                if self.mood_decay_turns > 0 && inner.calm_turns >= self.mood_decay_turns {
                    inner.mood = Mood::Neutral;
                }
            }
        }

        tracing::debug!(
            action = %intent.action,
            topic = ?inner.current_topic,
            mood = inner.mood.as_str(),
            window = inner.recent_intents.len(),
            "Context updated"
        );
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        let inner = self.inner.lock();
        ContextSnapshot {
            current_topic: inner.current_topic.clone(),
            recent_intents: inner.recent_intents.iter().cloned().collect(),
            mood: inner.mood,
        }
    }

    pub fn get_state(&self) -> ConversationState {
        let inner = self.inner.lock();
        let skip = inner.recent_intents.len().saturating_sub(STATE_RECENT);
        ConversationState {
            current_topic: inner.current_topic.clone(),
            mood: inner.mood,
            recent_actions: inner
                .recent_intents
                .iter()
                .skip(skip)
                .map(ToString::to_string)
                .collect(),
            interaction_count: inner.interaction_count,
            preferences: inner.preferences.clone(),
        }
    }

    pub fn set_preference(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.lock().preferences.insert(key.into(), value.into());
    }

    pub fn preference(&self, key: &str) -> Option<String> {
        self.inner.lock().preferences.get(key).cloned()
    }

    pub fn mood(&self) -> Mood {
        self.inner.lock().mood
    }
}

impl Default for ContextStore {
    fn default() -> Self {
        use shadow_config::constants::{assistant, classifier};
        Self::new(classifier::CONTEXT_WINDOW, assistant::MOOD_DECAY_TURNS)
    }
}

/// First mood category whose cue appears as whole words
fn detect_mood(utterance: &str) -> Option<Mood> {
    let words: Vec<String> = utterance
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();
    let padded = format!(" {} ", words.join(" "));

    MOOD_CUES
        .iter()
        .find(|(_, cues)| cues.iter().any(|cue| padded.contains(&format!(" {} ", cue))))
        .map(|(mood, _)| *mood)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadow_core::ClassificationTier;

    fn intent(action: &str, target: &str) -> Intent {
        Intent::new(IntentType::Knowledge, action, ClassificationTier::Pattern).with_target(target)
    }

    #[test]
    fn test_fifo_keeps_last_five_in_order() {
        let store = ContextStore::new(5, 3);
        for i in 0..8 {
            store.update("hello", &intent(&format!("a{}", i), "x"));
        }
        let snapshot = store.snapshot();
        let actions: Vec<&str> = snapshot.recent_intents.iter().map(|s| s.action.as_str()).collect();
        assert_eq!(actions, vec!["a3", "a4", "a5", "a6", "a7"]);
        assert_eq!(store.get_state().interaction_count, 8);
    }

    #[test]
    fn test_topic_ignores_chat() {
        let store = ContextStore::new(5, 3);
        store.update("weather in london", &intent("get_weather", "London"));
        store.update(
            "tell me a joke",
            &Intent::new(IntentType::Chat, "respond", ClassificationTier::Fallback).with_target("user"),
        );
        assert_eq!(store.snapshot().current_topic.as_deref(), Some("London"));
        assert_eq!(store.snapshot().last_actionable().map(|s| s.action.as_str()), Some("get_weather"));
    }

    #[test]
    fn test_mood_cues_and_decay() {
        let store = ContextStore::new(5, 2);
        store.update("why is this not working", &intent("a", "b"));
        assert_eq!(store.mood(), Mood::Frustrated);

        // "know" must not trigger the "now" cue
        store.update("i know", &intent("a", "b"));
        assert_eq!(store.mood(), Mood::Frustrated);
        store.update("ok", &intent("a", "b"));
        assert_eq!(store.mood(), Mood::Neutral);

        store.update("thank you", &intent("a", "b"));
        assert_eq!(store.mood(), Mood::Happy);
    }

    #[test]
    fn test_sticky_mood_without_decay() {
        let store = ContextStore::new(5, 0);
        store.update("do it now", &intent("a", "b"));
        for _ in 0..10 {
            store.update("fine", &intent("a", "b"));
        }
        assert_eq!(store.mood(), Mood::Urgent);
    }

    #[test]
    fn test_state_shows_last_three_and_preferences() {
        let store = ContextStore::default();
        for target in ["London", "Paris", "Tokyo", "Lahore"] {
            store.update("weather", &intent("get_weather", target));
        }
        store.set_preference("units", "metric");

        let state = store.get_state();
        assert_eq!(
            state.recent_actions,
            vec!["get_weather->Paris", "get_weather->Tokyo", "get_weather->Lahore"]
        );
        assert_eq!(state.current_topic.as_deref(), Some("Lahore"));
        let rendered = state.to_string();
        assert!(rendered.contains("topic: Lahore"));
        assert!(rendered.contains("units=metric"));
    }
}
