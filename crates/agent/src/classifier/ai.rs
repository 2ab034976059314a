//! Tier 3: AI-backed classification
//!
//! One request per utterance carrying the text, recent context and a
//! wall-clock summary. The reply is parsed strictly as JSON first, then
//! leniently as `key: value` lines. Anything that does not yield a
//! complete classification inside the closed intent set is discarded.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Local, Timelike, Weekday};
use serde::Deserialize;
use serde_json::Value;

use shadow_config::constants::classifier::PROMPT_RECENT_INTENTS;
use shadow_core::{ClassificationTier, Error, Intent, IntentType, Language, LanguageModel, Message, Parameters};

use crate::context::ContextSnapshot;

const TAXONOMY: &str = r#"INTENT TYPES:
- messaging: send_message (target: contact; parameters: message, platform)
- knowledge: get_weather (target: location), get_stock (target: ticker symbol), get_news, search_web, get_fact (target: topic), get_time, get_date
- scheduling: set_reminder (target: task; parameters: message, time), set_timer (parameters: time), set_alarm (parameters: time), list_reminders, cancel_reminder (parameters: task_id)
- automation: open_app (target: application), volume_up, volume_down, mute, brightness_up, brightness_down, lock
- system: sleep, shutdown, restart
- file_operations: list_files, read_file, search_files, create_file (target: path)
- web_operations: open_url (target: url), web_search (target: query)
- chat: respond
- unknown

RESPONSE FORMAT (JSON only):
{"intent_type": "<one of the types above>", "confidence": 0.0-1.0, "action": "<action>", "target": "<primary entity>", "parameters": {}, "reasoning": "<short explanation>", "urgency": "casual|normal|urgent"}

EXAMPLES:
Query: "Let Sarah know the project is approved"
{"intent_type": "messaging", "confidence": 0.94, "action": "send_message", "target": "Sarah", "parameters": {"message": "The project is approved"}, "reasoning": "User wants to notify Sarah", "urgency": "normal"}

Query: "What's the latest with Tesla stock?"
{"intent_type": "knowledge", "confidence": 0.97, "action": "get_stock", "target": "TSLA", "parameters": {"symbol": "TSLA"}, "reasoning": "Current stock information for Tesla", "urgency": "normal"}

Query: "I want to wake up at 7 tomorrow"
{"intent_type": "scheduling", "confidence": 0.95, "action": "set_alarm", "target": "wake up", "parameters": {"time": "07:00"}, "reasoning": "Wake-up alarm for tomorrow morning", "urgency": "normal"}

Query: "Can you find that file I was working on yesterday?"
{"intent_type": "file_operations", "confidence": 0.90, "action": "search_files", "target": "recent work file", "parameters": {"pattern": "work"}, "reasoning": "Locate a recently edited file", "urgency": "normal"}

Query: "How are you today?"
{"intent_type": "chat", "confidence": 0.92, "action": "respond", "target": "user", "parameters": {}, "reasoning": "Small talk", "urgency": "casual"}"#;

/// Classification decoded from an AI reply
#[derive(Debug, Clone, PartialEq)]
pub struct AiClassification {
    pub intent_type: IntentType,
    pub confidence: f32,
    pub action: String,
    pub target: String,
    pub parameters: Parameters,
    pub reasoning: String,
    pub urgency: Option<String>,
}

impl AiClassification {
    pub fn into_intent(self) -> Intent {
        let mut intent = Intent::new(self.intent_type, self.action, ClassificationTier::Ai)
            .with_target(self.target)
            .with_params(self.parameters)
            .with_confidence(self.confidence)
            .with_rationale(self.reasoning);
        if let Some(urgency) = self.urgency.filter(|u| !u.trim().is_empty()) {
            intent = intent.with_param("urgency", urgency);
        }
        intent
    }
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    intent_type: String,
    confidence: Value,
    action: String,
    target: Value,
    parameters: Value,
    reasoning: String,
    #[serde(default)]
    urgency: Option<String>,
}

/// Parse an AI reply: strict JSON, then `key: value` lines
///
/// Returns `None` when neither form yields every required field or the
/// intent type is outside the closed set.
pub fn parse_response(raw: &str) -> Option<AiClassification> {
    parse_json(raw).or_else(|| parse_lines(raw))
}

fn parse_json(raw: &str) -> Option<AiClassification> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    let parsed: RawClassification = match serde_json::from_str(&raw[start..=end]) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!(error = %e, "AI reply is not valid classification JSON");
            return None;
        }
    };

    let parameters = match parsed.parameters {
        Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| (k, value_text(&v)))
            .filter(|(_, v)| !v.is_empty())
            .collect(),
        _ => Parameters::new(),
    };

    build(
        &parsed.intent_type,
        confidence_of(&parsed.confidence)?,
        parsed.action,
        value_text(&parsed.target),
        parameters,
        parsed.reasoning,
        parsed.urgency,
    )
}

fn parse_lines(raw: &str) -> Option<AiClassification> {
    let mut fields = std::collections::HashMap::new();
    for line in raw.lines() {
        let line = line.trim().trim_start_matches(['-', '*']).trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().trim_matches(['"', '\'']).to_lowercase();
        let value = value.trim().trim_end_matches(',').trim().trim_matches(['"', '\'']).trim();
        fields.entry(key).or_insert_with(|| value.to_string());
    }

    let confidence = fields
        .get("confidence")
        .and_then(|c| c.parse::<f32>().ok())?;
    build(
        fields.get("intent_type")?,
        confidence,
        fields.get("action")?.clone(),
        fields.get("target")?.clone(),
        Parameters::new(),
        fields.get("reasoning").cloned().unwrap_or_default(),
        fields.get("urgency").cloned(),
    )
}

fn build(
    intent_type: &str,
    confidence: f32,
    action: String,
    target: String,
    parameters: Parameters,
    reasoning: String,
    urgency: Option<String>,
) -> Option<AiClassification> {
    let Some(intent_type) = IntentType::parse_label(intent_type) else {
        tracing::warn!(label = intent_type, "AI returned an intent type outside the closed set");
        return None;
    };
    let action = action.trim().to_string();
    if action.is_empty() {
        return None;
    }
    let confidence = if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };

    Some(AiClassification {
        intent_type,
        confidence,
        action,
        target: target.trim().to_string(),
        parameters,
        reasoning,
        urgency,
    })
}

fn confidence_of(value: &Value) -> Option<f32> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn time_of_day(hour: u32) -> &'static str {
    match hour {
        5..=11 => "morning",
        12..=16 => "afternoon",
        17..=20 => "evening",
        _ => "night",
    }
}

/// Classification prompt for one utterance
pub fn build_prompt(text: &str, language: Language, context: &ContextSnapshot, now: DateTime<Local>) -> String {
    let weekend = matches!(now.weekday(), Weekday::Sat | Weekday::Sun);
    format!(
        "You are the intent interpreter of a personal assistant. Work out what the user wants done \
         and which entities the request mentions.\n\n\
         CONTEXT:\n\
         - Current topic: {topic}\n\
         - Recent actions: [{recent}]\n\
         - User mood: {mood}\n\
         - Language: {language}\n\
         - Time of day: {time_of_day}\n\
         - Day of week: {day}\n\
         - Weekend: {weekend}\n\n\
         {TAXONOMY}\n\n\
         Query: \"{text}\"",
        topic = context.current_topic.as_deref().unwrap_or("None"),
        recent = context.recent_actions(PROMPT_RECENT_INTENTS).join(", "),
        mood = context.mood.as_str(),
        language = language.name(),
        time_of_day = time_of_day(now.hour()),
        day = now.format("%A"),
        weekend = if weekend { "yes" } else { "no" },
        text = text.replace('"', "'"),
    )
}

/// Tier 3 classifier
pub struct AiClassifier {
    llm: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl AiClassifier {
    pub fn new(llm: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// One classification request; `None` on any failure
    pub async fn classify(&self, text: &str, language: Language, context: &ContextSnapshot) -> Option<Intent> {
        let prompt = build_prompt(text, language, context, Local::now());
        let messages = [Message::system(prompt), Message::user(text)];

        let reply = match tokio::time::timeout(self.timeout, self.llm.ask(&messages)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(Error::RateLimited(reason))) => {
                tracing::warn!(%reason, "AI classification skipped, budget exhausted");
                return None;
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "AI classification failed");
                return None;
            }
            Err(_) => {
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "AI classification timed out");
                return None;
            }
        };

        match parse_response(&reply) {
            Some(parsed) => Some(parsed.into_intent()),
            None => {
                tracing::warn!(model = self.llm.model_name(), "Unparseable AI classification");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_strict_json_inside_prose() {
        let reply = r#"Sure! Here you go:
{"intent_type": "knowledge", "confidence": 0.9, "action": "get_weather", "target": "Paris",
 "parameters": {"location": "Paris", "days": 2}, "reasoning": "weather request", "urgency": "urgent"}"#;
        let parsed = parse_response(reply).unwrap();
        assert_eq!(parsed.intent_type, IntentType::Knowledge);
        assert_eq!(parsed.target, "Paris");
        assert_eq!(parsed.parameters.get("days").map(String::as_str), Some("2"));

        let intent = parsed.into_intent();
        assert_eq!(intent.tier, ClassificationTier::Ai);
        assert_eq!(intent.urgency(), shadow_core::Urgency::High);
    }

    #[test]
    fn test_aliases_accepted() {
        let reply = r#"{"intent_type": "file_operations", "confidence": "0.8", "action": "list_files",
            "target": "documents", "parameters": null, "reasoning": "listing"}"#;
        let parsed = parse_response(reply).unwrap();
        assert_eq!(parsed.intent_type, IntentType::FileOps);
        assert_eq!(parsed.confidence, 0.8);
        assert!(parsed.parameters.is_empty());
    }

    #[test]
    fn test_lenient_lines() {
        let reply = "intent_type: scheduling\nconfidence: 0.7\naction: set_timer\ntarget: \"tea\"\nreasoning: timer";
        let parsed = parse_response(reply).unwrap();
        assert_eq!(parsed.intent_type, IntentType::Scheduling);
        assert_eq!(parsed.action, "set_timer");
        assert_eq!(parsed.target, "tea");
    }

    #[test]
    fn test_rejects_incomplete_or_unknown() {
        assert!(parse_response("{not json at all").is_none());
        assert!(parse_response(r#"{"intent_type": "knowledge", "confidence": 0.9}"#).is_none());
        assert!(parse_response(
            r#"{"intent_type": "banking", "confidence": 0.9, "action": "pay", "target": "bill", "parameters": {}, "reasoning": "x"}"#
        )
        .is_none());
        assert!(parse_response("I think the user wants the weather").is_none());
    }

    #[test]
    fn test_out_of_range_confidence_is_clamped() {
        let reply = r#"{"intent_type": "chat", "confidence": 7, "action": "respond", "target": "", "parameters": {}, "reasoning": ""}"#;
        assert_eq!(parse_response(reply).unwrap().confidence, 1.0);

        let reply = r#"{"intent_type": "chat", "confidence": -0.4, "action": "respond", "target": "", "parameters": {}, "reasoning": ""}"#;
        assert_eq!(parse_response(reply).unwrap().confidence, 0.0);
    }

    #[test]
    fn test_prompt_carries_context() {
        let context = ContextSnapshot {
            current_topic: Some("London".into()),
            ..Default::default()
        };
        let now = Local.with_ymd_and_hms(2026, 10, 17, 19, 45, 0).unwrap();
        let prompt = build_prompt("what about \"Paris\"", Language::English, &context, now);
        assert!(prompt.contains("Current topic: London"));
        assert!(prompt.contains("Time of day: evening"));
        assert!(prompt.contains("Day of week: Saturday"));
        assert!(prompt.contains("Weekend: yes"));
        assert!(prompt.contains("Query: \"what about 'Paris'\""));
    }
}
