//! Tier 2: keyword scoring
//!
//! Each action owns a keyword set. Its score is the fraction of that set
//! found in the text as whole words or phrases; the best score wins and
//! is accepted by the classifier only above the keyword threshold.

use once_cell::sync::Lazy;
use regex::Regex;

use shadow_core::{ClassificationTier, Intent, IntentType};
use shadow_text_processing::EntityExtractor;

const KEYWORD_TABLE: &[(&str, IntentType, &[&str])] = &[
    ("send_message", IntentType::Messaging, &["send", "text", "message", "whatsapp", "sms"]),
    (
        "get_weather",
        IntentType::Knowledge,
        &["weather", "temperature", "forecast", "rain", "sunny", "cloudy"],
    ),
    (
        "get_stock",
        IntentType::Knowledge,
        &["stock", "price", "share", "crypto", "bitcoin", "ethereum"],
    ),
    (
        "search_web",
        IntentType::Knowledge,
        &["search", "google", "look up", "find", "information about"],
    ),
    (
        "set_reminder",
        IntentType::Scheduling,
        &["remind", "reminder", "timer", "alarm", "schedule"],
    ),
    ("open_app", IntentType::Automation, &["open", "launch", "start", "application"]),
    ("get_time", IntentType::Knowledge, &["time", "clock", "what time"]),
    ("get_date", IntentType::Knowledge, &["date", "today", "what date"]),
    ("joke", IntentType::Chat, &["joke", "funny", "make me laugh"]),
];

static MESSAGE_BODY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:saying|that says|that)\s+(.+)$").unwrap());

static APP_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:open|launch|start)\s+(?:the\s+|my\s+)?(?:application\s+|app\s+)?([\w.-]+)").unwrap()
});

/// Best-scoring action before thresholding
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordScore {
    pub action: &'static str,
    pub intent_type: IntentType,
    pub score: f32,
}

/// Tier 2 scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordScorer {
    entities: EntityExtractor,
}

impl KeywordScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest-scoring action; ties go to the earlier table entry
    pub fn best(&self, text: &str) -> Option<KeywordScore> {
        let padded = padded_words(text);
        let mut best: Option<KeywordScore> = None;

        for &(action, intent_type, keywords) in KEYWORD_TABLE {
            let hits = keywords
                .iter()
                .filter(|k| padded.contains(&format!(" {} ", k)))
                .count();
            if hits == 0 {
                continue;
            }
            let score = hits as f32 / keywords.len() as f32;
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(KeywordScore {
                    action,
                    intent_type,
                    score,
                });
            }
        }
        best
    }

    /// Score `text` and build the intent when the score clears `threshold`
    pub fn classify(&self, text: &str, threshold: f32) -> Option<Intent> {
        let best = self.best(text)?;
        if best.score <= threshold {
            tracing::debug!(action = best.action, score = best.score, "Keyword score below threshold");
            return None;
        }

        let intent = Intent::new(best.intent_type, best.action, ClassificationTier::Keyword)
            .with_confidence(best.score)
            .with_rationale(format!("keyword score {:.2}", best.score));
        Some(self.with_entities(intent, text))
    }

    /// Attach the entities the chosen action needs
    fn with_entities(&self, intent: Intent, text: &str) -> Intent {
        let entities = &self.entities;
        match intent.action.as_str() {
            "send_message" => with_message_entities(intent, entities, text),
            "get_weather" => {
                let location = entities
                    .location(text)
                    .unwrap_or_else(|| "current location".to_string());
                intent
                    .with_target(location.clone())
                    .with_param("location", location)
            }
            "get_stock" => match entities.stock_symbol(text) {
                Some(symbol) => intent.with_target(symbol.clone()).with_param("symbol", symbol),
                None => intent,
            },
            "search_web" => intent.with_target(text.trim()).with_param("query", text.trim()),
            "set_reminder" => match entities.time_expression(text) {
                Some(expr) => intent.with_param("time_expression", expr),
                None => intent,
            },
            "open_app" => match APP_NAME.captures(text).and_then(|c| c.get(1)) {
                Some(app) => {
                    let app = app.as_str().to_lowercase();
                    intent.with_target(app.clone()).with_param("app", app)
                }
                None => intent,
            },
            _ => intent,
        }
    }
}

/// Attach recipient, platform and body to a messaging intent
///
/// The target is only replaced when a recipient is found.
pub fn with_message_entities(intent: Intent, entities: &EntityExtractor, text: &str) -> Intent {
    let mut intent = intent.with_param("platform", entities.platform(text));
    if let Some(contact) = entities.contact(text) {
        intent = intent.with_target(contact.clone()).with_param("contact", contact);
    }
    match message_body(text) {
        Some(body) => intent.with_param("message", body),
        None => intent,
    }
}

/// Message body: quoted text, else whatever follows "saying"/"that"
pub fn message_body(text: &str) -> Option<String> {
    let entities = EntityExtractor::new();
    entities
        .quoted(text)
        .into_iter()
        .find(|q| !q.trim().is_empty())
        .or_else(|| {
            MESSAGE_BODY
                .captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
        })
        .filter(|b| !b.is_empty())
}

/// Lowercased words joined by single spaces, padded on both ends
fn padded_words(text: &str) -> String {
    let words: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();
    format!(" {} ", words.join(" "))
}
