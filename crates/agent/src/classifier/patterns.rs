//! Tier 1: deterministic pattern table
//!
//! Rules are tried in table order against the lowercased text (stock rules
//! against the original text, since tickers are recognised by case). The
//! first rule that matches wins and its coverage, matched length over
//! text length, sets the confidence.

use once_cell::sync::Lazy;
use regex::Regex;

use shadow_config::constants::classifier::{COVERAGE_FLOOR, COVERAGE_STEPS};
use shadow_core::{ClassificationTier, Intent, IntentType};
use shadow_text_processing::canonical_location;

use crate::timeparse::{duration_of, parse_clock};

struct PatternRule {
    action: &'static str,
    intent_type: IntentType,
    pattern: Regex,
    /// Name of each capture group, in order
    groups: &'static [&'static str],
    case_sensitive: bool,
}

fn rule(
    action: &'static str,
    intent_type: IntentType,
    pattern: &str,
    groups: &'static [&'static str],
) -> PatternRule {
    PatternRule {
        action,
        intent_type,
        pattern: Regex::new(pattern).unwrap(),
        groups,
        case_sensitive: false,
    }
}

fn cased(rule: PatternRule) -> PatternRule {
    PatternRule {
        case_sensitive: true,
        ..rule
    }
}

const CLOCK: &str = r"(\d{1,2}:\d{2}\s*(?:am|pm)?)";

// Specific phrasings before generic ones: first match wins
static RULES: Lazy<Vec<PatternRule>> = Lazy::new(|| {
    use IntentType::{Knowledge, Scheduling};
    vec![
        // Weather
        rule("get_weather", Knowledge, r"what'?s? the weather like in ([\w\s]+)", &["location"]),
        rule("get_weather", Knowledge, r"how'?s? the weather in ([\w\s]+)", &["location"]),
        rule("get_weather", Knowledge, r"is it (?:raining|sunny|cold|hot) in ([\w\s]+)", &["location"]),
        rule(
            "get_weather",
            Knowledge,
            r"(?:weather|forecast|temperature)\s+(?:in|at|for)\s+([\w\s]+)",
            &["location"],
        ),
        // Stocks: keywords in any case, ticker in capitals
        cased(rule(
            "get_stock",
            Knowledge,
            r"(?i:what'?s? (?:the )?(?:stock|share) price of )([A-Z]{1,5})\b",
            &["symbol"],
        )),
        cased(rule("get_stock", Knowledge, r"(?i:how much is )([A-Z]{1,5})(?i: stock)", &["symbol"])),
        cased(rule(
            "get_stock",
            Knowledge,
            r"(?i:(?:stock|share|price)\s+(?:of|for)\s+)([A-Z]{1,5})\b",
            &["symbol"],
        )),
        cased(rule("get_stock", Knowledge, r"\b([A-Z]{1,5})(?i: (?:stock|price|share))", &["symbol"])),
        // Local clock and calendar
        rule("get_time", Knowledge, r"what time is it|what(?:'s|s| is)? the time|tell me the time", &[]),
        rule(
            "get_date",
            Knowledge,
            r"what(?:'s|s| is)? (?:the date|today'?s date)|what day is (?:it|today)",
            &[],
        ),
        // News
        rule("get_news", Knowledge, r"what'?s? the latest news about (.+)", &["topic"]),
        rule("get_news", Knowledge, r"tell me news about (.+)", &["topic"]),
        rule("get_news", Knowledge, r"(?:news|headlines)\s+(?:about|on)\s+(\w+)", &["topic"]),
        // Reminders
        rule(
            "set_reminder",
            Scheduling,
            r"(?:set|create)\s+(?:a\s+)?reminder\s+(?:for|in)\s+(\d+)\s*(minute|min|hour|hr)s?\s*(.+)",
            &["amount", "unit", "message"],
        ),
        rule(
            "set_reminder",
            Scheduling,
            r"remind me to (.+) in (\d+)\s*(minute|min|hour|hr)s?",
            &["message", "amount", "unit"],
        ),
        rule("set_reminder", Scheduling, &format!(r"remind me about (.+) at {CLOCK}"), &["message", "time"]),
        rule("set_reminder", Scheduling, &format!(r"set reminder for (.+) at {CLOCK}"), &["message", "time"]),
        // Timers and alarms
        rule(
            "set_timer",
            Scheduling,
            r"set(?:\s+a)? timer for (\d+)\s*(minute|min|hour|hr|second|sec)s?",
            &["amount", "unit"],
        ),
        rule("set_timer", Scheduling, r"timer for (\d+)\s*(minute|min|hour|hr)s?", &["amount", "unit"]),
        rule("set_timer", Scheduling, r"countdown (\d+)\s*(minute|min|hour|hr)s?", &["amount", "unit"]),
        rule("set_alarm", Scheduling, &format!(r"set(?:\s+an?)? alarm for {CLOCK}"), &["time"]),
        rule("set_alarm", Scheduling, &format!(r"wake me up at {CLOCK}"), &["time"]),
        rule("set_alarm", Scheduling, &format!(r"alarm at {CLOCK}"), &["time"]),
        // Managing scheduled items
        rule("list_reminders", Scheduling, r"(?:list|show)\s+(?:my\s+)?(?:reminders|timers|alarms)", &[]),
        rule("list_reminders", Scheduling, r"what (?:reminders|timers) do i have", &[]),
        rule("cancel_reminder", Scheduling, r"cancel\s+(?:reminder|timer|alarm)\s*#?(\d+)", &["task_id"]),
        rule("cancel_reminder", Scheduling, r"stop\s+(?:reminder|timer|alarm)\s*#?(\d+)", &["task_id"]),
        // Facts
        rule("get_fact", Knowledge, r"tell me a fact about (.+)", &["topic"]),
        rule("get_fact", Knowledge, r"interesting fact about (.+)", &["topic"]),
        rule("get_fact", Knowledge, r"did you know about (.+)", &["topic"]),
        // Search last: its phrasings are the most generic
        rule("search_web", Knowledge, r"search the web for (.+)", &["query"]),
        rule("search_web", Knowledge, r"find information about (.+)", &["query"]),
        rule("search_web", Knowledge, r"(?:search|look up|find|google)\s+(.+)", &["query"]),
        rule("search_web", Knowledge, r"what is (.+)", &["query"]),
    ]
});

/// Confidence for a given coverage
pub fn coverage_confidence(coverage: f32) -> f32 {
    COVERAGE_STEPS
        .iter()
        .find(|(above, _)| coverage > *above)
        .map(|(_, confidence)| *confidence)
        .unwrap_or(COVERAGE_FLOOR)
}

/// Tier 1 matcher
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternMatcher;

impl PatternMatcher {
    pub fn new() -> Self {
        Self
    }

    /// First matching rule as an intent, or `None`
    pub fn classify(&self, text: &str) -> Option<Intent> {
        let original = text.trim();
        let lower = original.to_lowercase();

        RULES.iter().find_map(|rule| {
            let haystack = if rule.case_sensitive { original } else { lower.as_str() };
            let caps = rule.pattern.captures(haystack)?;
            let matched = caps.get(0)?;
            let total = haystack.chars().count().max(1);
            let coverage = matched.as_str().chars().count() as f32 / total as f32;
            let confidence = coverage_confidence(coverage);

            let mut intent = Intent::new(rule.intent_type, rule.action, ClassificationTier::Pattern)
                .with_confidence(confidence)
                .with_rationale(format!("pattern '{}' covered {:.2}", rule.pattern.as_str(), coverage));

            for (i, name) in rule.groups.iter().enumerate() {
                if let Some(value) = caps.get(i + 1) {
                    let value = value.as_str().trim();
                    if !value.is_empty() {
                        intent = intent.with_param(*name, value);
                    }
                }
            }
            Some(finish(intent))
        })
    }
}

/// Derive target and scheduler parameters from raw captures
fn finish(mut intent: Intent) -> Intent {
    if let Some(location) = intent.param("location").map(canonical_location) {
        intent.parameters.insert("location".into(), location.clone());
        intent.target = location;
    } else if let Some(symbol) = intent.param("symbol").map(str::to_uppercase) {
        intent.parameters.insert("symbol".into(), symbol.clone());
        intent.target = symbol;
    } else if let Some(value) = intent
        .param("query")
        .or_else(|| intent.param("topic"))
        .or_else(|| intent.param("message"))
        .map(str::to_string)
    {
        intent.target = value;
    }

    let delay = match (intent.param("amount"), intent.param("unit")) {
        (Some(amount), Some(unit)) => duration_of(amount, unit),
        _ => None,
    };
    if let Some(delay) = delay {
        let secs = delay.as_secs();
        intent.parameters.insert("delay_seconds".into(), secs.to_string());
        intent
            .parameters
            .insert("relative_minutes".into(), secs.div_ceil(60).to_string());
    }

    if let Some(time) = intent.param("time").map(str::to_string) {
        if let Some(at) = parse_clock(&time) {
            intent.parameters.insert("at_time".into(), at.format("%H:%M").to_string());
        }
        intent.parameters.insert("time_expression".into(), time);
    }
    intent
}
