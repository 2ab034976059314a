//! Multilingual reminder parsing
//!
//! Reminder requests skip the general classifier: keyword sets per language
//! decide whether an utterance is a reminder at all, and the parser then
//! pulls out the reminder text and either a relative delay ("in 10
//! minutes") or a wall-clock time ("at 7:30 pm").
//!
//! English has dedicated phrasings. Urdu and Pashto use a generic
//! number+unit scan with keyword and filler words trimmed from both ends
//! of the remaining text, which matches their verb-final word order.

use std::time::Duration;

use chrono::NaiveTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use shadow_core::{Language, Parameters, When};

const UNIT_ALTERNATION: &str = "minutes|minute|mins|min|minat|daqiqe|daqiqa|hours|hour|hrs|hr|ghante|ghanta|saat|seconds|second|secs|sec|منٹ|دقیقې|گھنٹے|ساعت|سیکنڈ";

const MINUTE_UNITS: &[&str] = &["minutes", "minute", "mins", "min", "minat", "daqiqe", "daqiqa", "منٹ", "دقیقې"];
const HOUR_UNITS: &[&str] = &["hours", "hour", "hrs", "hr", "ghante", "ghanta", "saat", "گھنٹے", "ساعت"];
const SECOND_UNITS: &[&str] = &["seconds", "second", "secs", "sec", "سیکنڈ"];

const ENGLISH_KEYWORDS: &[&str] = &[
    "remind me",
    "reminder to",
    "reminder for",
    "reminder in",
    "don't let me forget",
];
const URDU_KEYWORDS: &[&str] = &["yaad", "yad dila", "reminder", "یاد"];
const PASHTO_KEYWORDS: &[&str] = &["yadawal", "yadona", "یادونه", "یاد"];

// Trimmed from either end of the leftover text in the generic path
const FILLER_WORDS: &[&str] = &[
    // English
    "please", "remind", "me", "to", "about", "in", "after", "set", "create", "a", "reminder",
    "for", "don't", "let", "forget",
    // Roman Urdu
    "mujhe", "mje", "baad", "ke", "ki", "ka", "ko", "yaad", "yad", "dilao", "dilana", "dila",
    "do", "karna", "main", "mein",
    // Roman Pashto
    "ma", "ta", "pas", "wrusta", "yadawal", "yadona", "kra", "kawa", "rata",
    // Urdu script
    "مجھے", "بعد", "کے", "کی", "یاد", "دلاؤ", "دلانا", "میں",
    // Pashto script
    "ما", "ته", "وروسته", "یادونه", "کړه", "راته",
];

static RELATIVE_AFTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)remind me (?:to|about) (.+?)\s+in\s+(\d+)\s*({UNIT_ALTERNATION})\b"
    ))
    .unwrap()
});

static RELATIVE_BEFORE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)remind me in (\d+)\s*({UNIT_ALTERNATION})\s+(?:to|about)\s+(.+)"
    ))
    .unwrap()
});

static AT_CLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)remind me (?:to|about) (.+?)\s+at\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b").unwrap()
});

static SET_REMINDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)(?:set|create)\s+(?:a\s+)?reminder\s+(?:for|in)\s+(\d+)\s*({UNIT_ALTERNATION})\b\s*(?:to\s+|about\s+)?(.*)"
    ))
    .unwrap()
});

static NO_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)remind me (?:to|about) (.+)").unwrap());

static NUMBER_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)(\d+)\s*({UNIT_ALTERNATION})\b")).unwrap()
});

// Managing existing reminders is not creating one
static MANAGEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:list|show|cancel|stop|delete|remove)\s+(?:all\s+)?(?:my\s+|the\s+)?(?:reminders?|timers?|alarms?)\b|\bwhat (?:reminders|timers|alarms) do i have\b",
    )
    .unwrap()
});

/// A reminder request pulled out of an utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedReminder {
    /// What to remind about
    pub message: String,
    /// When to fire; `None` when the user gave no time
    #[serde(skip)]
    pub when: Option<When>,
    /// Time phrase as the user said it
    pub time_expression: Option<String>,
}

impl ParsedReminder {
    /// Relative delay rounded up to whole minutes
    pub fn relative_minutes(&self) -> Option<u64> {
        match self.when {
            Some(When::After(delay)) => Some(delay.as_secs().div_ceil(60)),
            _ => None,
        }
    }

    pub fn has_time(&self) -> bool {
        self.when.is_some()
    }

    /// Intent parameters: `message`, `relative_minutes`, `delay_seconds`,
    /// `at_time` and `time_expression` where known
    pub fn to_parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        if !self.message.is_empty() {
            params.insert("message".to_string(), self.message.clone());
        }
        match self.when {
            Some(When::After(delay)) => {
                params.insert(
                    "relative_minutes".to_string(),
                    delay.as_secs().div_ceil(60).to_string(),
                );
                params.insert("delay_seconds".to_string(), delay.as_secs().to_string());
            }
            Some(When::At(time)) => {
                params.insert("at_time".to_string(), time.format("%H:%M").to_string());
            }
            None => {}
        }
        if let Some(expr) = &self.time_expression {
            params.insert("time_expression".to_string(), expr.clone());
        }
        params
    }
}

/// Keyword gate and parser for reminder requests
#[derive(Debug, Clone, Copy, Default)]
pub struct ReminderParser;

impl ReminderParser {
    pub fn new() -> Self {
        Self
    }

    /// Does `text` ask to create a reminder?
    ///
    /// Checks the keyword set of `language` plus English. Requests to list
    /// or cancel reminders are excluded.
    pub fn is_reminder(&self, text: &str, language: Language) -> bool {
        let lower = text.to_lowercase();
        if MANAGEMENT.is_match(&lower) {
            return false;
        }

        let local: &[&str] = match language {
            Language::English => &[],
            Language::Urdu => URDU_KEYWORDS,
            Language::Pashto => PASHTO_KEYWORDS,
        };
        ENGLISH_KEYWORDS
            .iter()
            .chain(local.iter())
            .any(|keyword| contains_phrase(&lower, keyword))
    }

    /// Extract reminder text and time
    ///
    /// Returns `None` only when nothing usable is left, i.e. neither a
    /// message nor a time.
    pub fn parse(&self, text: &str, language: Language) -> Option<ParsedReminder> {
        let text = ascii_digits(text.trim());

        let parsed = parse_english(&text).or_else(|| parse_generic(&text));
        if let Some(reminder) = &parsed {
            tracing::debug!(
                language = %language,
                message = %reminder.message,
                when = ?reminder.when,
                "Parsed reminder"
            );
        }
        parsed
    }
}

fn parse_english(text: &str) -> Option<ParsedReminder> {
    if let Some(caps) = RELATIVE_AFTER.captures(text) {
        let delay = to_duration(&caps[2], &caps[3])?;
        let expr = format!("in {} {}", &caps[2], &caps[3]);
        return Some(relative(&caps[1], delay, &expr));
    }

    if let Some(caps) = RELATIVE_BEFORE.captures(text) {
        let delay = to_duration(&caps[1], &caps[2])?;
        let expr = format!("in {} {}", &caps[1], &caps[2]);
        return Some(relative(&caps[3], delay, &expr));
    }

    if let Some(caps) = AT_CLOCK.captures(text) {
        let hour: u32 = caps[2].parse().ok()?;
        let minute: u32 = caps.get(3).map_or(Ok(0), |m| m.as_str().parse()).ok()?;
        let meridiem = caps.get(4).map(|m| m.as_str().to_lowercase());
        let time = clock_time(hour, minute, meridiem.as_deref());
        let expr = text[caps.get(1)?.end()..caps.get(0)?.end()].trim().to_lowercase();
        return Some(ParsedReminder {
            message: clean_message(&caps[1]),
            when: time.map(When::At),
            time_expression: Some(expr),
        });
    }

    if let Some(caps) = SET_REMINDER.captures(text) {
        let delay = to_duration(&caps[1], &caps[2])?;
        let expr = format!("in {} {}", &caps[1], &caps[2]);
        return Some(relative(&caps[3], delay, &expr));
    }

    if let Some(caps) = NO_TIME.captures(text) {
        // A time phrased some other way is still worth a generic scan
        if NUMBER_UNIT.is_match(&caps[1]) {
            return None;
        }
        return Some(ParsedReminder {
            message: clean_message(&caps[1]),
            when: None,
            time_expression: None,
        });
    }

    None
}

fn parse_generic(text: &str) -> Option<ParsedReminder> {
    let (when, expr, remainder) = match NUMBER_UNIT.captures(text) {
        Some(caps) => {
            let span = caps.get(0)?;
            let delay = to_duration(&caps[1], &caps[2]);
            let remainder = format!("{} {}", &text[..span.start()], &text[span.end()..]);
            (delay.map(When::After), Some(span.as_str().to_lowercase()), remainder)
        }
        None => (None, None, text.to_string()),
    };

    let message = trim_fillers(&remainder);
    if message.is_empty() && when.is_none() {
        return None;
    }
    Some(ParsedReminder {
        message,
        when,
        time_expression: expr,
    })
}

fn relative(message: &str, delay: Duration, expr: &str) -> ParsedReminder {
    ParsedReminder {
        message: clean_message(message),
        when: Some(When::After(delay)),
        time_expression: Some(expr.trim().to_lowercase()),
    }
}

fn to_duration(amount: &str, unit: &str) -> Option<Duration> {
    let amount: u64 = amount.parse().ok()?;
    let unit = unit.to_lowercase();
    let unit = unit.as_str();
    let seconds = if MINUTE_UNITS.contains(&unit) {
        amount.checked_mul(60)?
    } else if HOUR_UNITS.contains(&unit) {
        amount.checked_mul(3600)?
    } else if SECOND_UNITS.contains(&unit) {
        amount
    } else {
        return None;
    };
    Some(Duration::from_secs(seconds))
}

fn clock_time(hour: u32, minute: u32, meridiem: Option<&str>) -> Option<NaiveTime> {
    let hour = match meridiem {
        Some("pm") if hour < 12 => hour + 12,
        Some("am") if hour == 12 => 0,
        _ => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn clean_message(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .trim()
        .to_string()
}

fn trim_fillers(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let is_filler = |w: &&str| {
        let w = w
            .trim_matches(|c: char| c.is_ascii_punctuation() && c != '\'')
            .to_lowercase();
        FILLER_WORDS.contains(&w.as_str())
    };

    let start = words.iter().position(|w| !is_filler(w)).unwrap_or(words.len());
    let end = words.iter().rposition(|w| !is_filler(w)).map_or(start, |i| i + 1);
    clean_message(&words[start..end.max(start)].join(" "))
}

fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    // Native-script keywords are substrings; Roman ones need word boundaries
    if !phrase.is_ascii() {
        return haystack.contains(phrase);
    }
    haystack.match_indices(phrase).any(|(pos, _)| {
        let before = haystack[..pos].chars().next_back();
        let after = haystack[pos + phrase.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Map Arabic-Indic and Extended Arabic-Indic digits to ASCII
fn ascii_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{0660}'..='\u{0669}' => char::from(b'0' + (c as u32 - 0x0660) as u8),
            '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (c as u32 - 0x06F0) as u8),
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ReminderParser {
        ReminderParser::new()
    }

    #[test]
    fn test_keyword_gate() {
        let p = parser();
        assert!(p.is_reminder("remind me to call mom in 10 minutes", Language::English));
        assert!(p.is_reminder("Don't let me forget the keys", Language::English));
        assert!(p.is_reminder("mujhe 10 minute baad yaad dilao", Language::Urdu));
        assert!(p.is_reminder("ما ته یادونه راکړه", Language::Pashto));
        assert!(!p.is_reminder("what's the weather in London", Language::English));
        // Urdu keywords are not consulted for English
        assert!(!p.is_reminder("yaad", Language::English));
    }

    #[test]
    fn test_management_phrases_are_excluded() {
        let p = parser();
        assert!(!p.is_reminder("show my reminders", Language::English));
        assert!(!p.is_reminder("cancel reminder 3", Language::English));
        assert!(!p.is_reminder("what reminders do i have", Language::English));
    }

    #[test]
    fn test_relative_after_message() {
        let r = parser()
            .parse("remind me to call mom in 10 minutes", Language::English)
            .unwrap();
        assert_eq!(r.message, "call mom");
        assert_eq!(r.relative_minutes(), Some(10));
        assert_eq!(r.time_expression.as_deref(), Some("in 10 minutes"));

        let params = r.to_parameters();
        assert_eq!(params["message"], "call mom");
        assert_eq!(params["relative_minutes"], "10");
        assert_eq!(params["delay_seconds"], "600");
    }

    #[test]
    fn test_message_containing_in() {
        let r = parser()
            .parse("remind me to check in on dad in 2 hours", Language::English)
            .unwrap();
        assert_eq!(r.message, "check in on dad");
        assert_eq!(r.relative_minutes(), Some(120));
    }

    #[test]
    fn test_relative_before_message() {
        let r = parser()
            .parse("remind me in 45 seconds to stir the pot", Language::English)
            .unwrap();
        assert_eq!(r.message, "stir the pot");
        assert_eq!(r.when, Some(When::After(Duration::from_secs(45))));
        assert_eq!(r.relative_minutes(), Some(1));
    }

    #[test]
    fn test_clock_time() {
        let r = parser()
            .parse("remind me about the meeting at 7:30 pm", Language::English)
            .unwrap();
        assert_eq!(r.message, "the meeting");
        assert_eq!(r.when, Some(When::At(NaiveTime::from_hms_opt(19, 30, 0).unwrap())));
        assert_eq!(r.to_parameters()["at_time"], "19:30");
    }

    #[test]
    fn test_set_reminder_phrase() {
        let r = parser()
            .parse("set a reminder for 5 min to take the pills", Language::English)
            .unwrap();
        assert_eq!(r.message, "take the pills");
        assert_eq!(r.relative_minutes(), Some(5));
    }

    #[test]
    fn test_missing_time() {
        let r = parser()
            .parse("remind me to buy milk", Language::English)
            .unwrap();
        assert_eq!(r.message, "buy milk");
        assert!(!r.has_time());
        assert!(!r.to_parameters().contains_key("relative_minutes"));
    }

    #[test]
    fn test_roman_urdu_generic() {
        let r = parser()
            .parse("mujhe 10 minute baad ammi ko call karne ki yaad dilao", Language::Urdu)
            .unwrap();
        assert_eq!(r.message, "ammi ko call karne");
        assert_eq!(r.relative_minutes(), Some(10));
    }

    #[test]
    fn test_urdu_script_with_native_digits() {
        let r = parser()
            .parse("مجھے ۱۵ منٹ بعد یاد دلاؤ", Language::Urdu)
            .unwrap();
        assert_eq!(r.relative_minutes(), Some(15));
    }

    #[test]
    fn test_pashto_hours() {
        let r = parser()
            .parse("ما ته 2 ساعت وروسته یادونه", Language::Pashto)
            .unwrap();
        assert_eq!(r.relative_minutes(), Some(120));
    }
}
