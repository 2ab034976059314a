//! Entity extraction
//!
//! Pulls the values handlers need out of free text:
//! - contact names ("send a message to Ali")
//! - messaging platform (WhatsApp or SMS)
//! - locations from the city gazetteer
//! - stock tickers and crypto names
//! - time expressions ("at 7:30 pm", "in 10 minutes", "tomorrow")
//! - bare numbers and quoted text
//!
//! # Example
//!
//! ```ignore
//! use shadow_text_processing::entities::EntityExtractor;
//!
//! let entities = EntityExtractor::new().extract("send \"on my way\" to Ali on whatsapp");
//! assert_eq!(entities.contact.as_deref(), Some("Ali"));
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use shadow_config::constants::gazetteer::{
    canonical_city, CRYPTO_NAMES, SUPPORTED_CITIES, SUPPORTED_STOCK_SYMBOLS,
};
use shadow_core::Parameters;

/// Platform used when the text names none
pub const DEFAULT_PLATFORM: &str = "whatsapp";

static CONTACT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:to|for)\s+(?:my\s+|the\s+)?(\w+)").unwrap());

// "message Ali saying ..." with no "to"
static ADDRESSEE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:message|text|whatsapp|sms|tell|notify)\s+(?:my\s+|the\s+)?(\w+)\s+(?:saying|that)\b")
        .unwrap()
});

// Captures that are never a recipient
const NOT_A_CONTACT: &[&str] = &["a", "an", "message", "text", "sms", "whatsapp", "me", "them", "it"];

static TICKER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{1,5}(?:-USD)?\b").unwrap());

// Ordered: clock time, relative duration, hour with meridiem, day part
static TIME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\b\d{1,2}:\d{2}\s*(?:am|pm)?\b").unwrap(),
        Regex::new(r"(?i)\b(?:in\s+)?\d+\s*(?:minute|min|hour|hr|second|sec)s?\b").unwrap(),
        Regex::new(r"(?i)\b(?:at\s+)?\d{1,2}\s*(?:am|pm)\b").unwrap(),
        Regex::new(r"(?i)\b(?:tomorrow|today|tonight|morning|afternoon|evening)\b").unwrap(),
    ]
});

static NUMBER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+\b").unwrap());

static QUOTED_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]*)""#).unwrap());

static SMS_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(?:sms|text)\b").unwrap());

// Trailing words dropped from a captured location ("London today")
static LOCATION_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+(?:today|tomorrow|tonight|this week|now|please)\s*$").unwrap());

/// Entities found in a single utterance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    pub contact: Option<String>,
    pub platform: Option<String>,
    pub location: Option<String>,
    pub stock_symbol: Option<String>,
    pub time_expression: Option<String>,
    pub numbers: Vec<String>,
    pub quoted: Vec<String>,
}

impl ExtractedEntities {
    /// Flatten into intent parameters
    ///
    /// Lists are joined with commas; absent values are omitted.
    pub fn to_parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        let singles = [
            ("contact", &self.contact),
            ("platform", &self.platform),
            ("location", &self.location),
            ("symbol", &self.stock_symbol),
            ("time_expression", &self.time_expression),
        ];
        for (key, value) in singles {
            if let Some(value) = value {
                params.insert(key.to_string(), value.clone());
            }
        }
        if !self.numbers.is_empty() {
            params.insert("numbers".to_string(), self.numbers.join(","));
        }
        if !self.quoted.is_empty() {
            params.insert("quoted_text".to_string(), self.quoted.join(","));
        }
        params
    }
}

/// Rule-based entity extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityExtractor;

impl EntityExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Run every extractor over `text`
    pub fn extract(&self, text: &str) -> ExtractedEntities {
        ExtractedEntities {
            contact: self.contact(text),
            platform: self.explicit_platform(text).map(str::to_string),
            location: self.location(text),
            stock_symbol: self.stock_symbol(text),
            time_expression: self.time_expression(text),
            numbers: self.numbers(text),
            quoted: self.quoted(text),
        }
    }

    /// Recipient after "to" or "for", else the word addressed directly
    /// before "saying"
    pub fn contact(&self, text: &str) -> Option<String> {
        CONTACT_PATTERN
            .captures(text)
            .or_else(|| ADDRESSEE_PATTERN.captures(text))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|name| !NOT_A_CONTACT.contains(&name.to_lowercase().as_str()))
    }

    /// Platform named in the text, if any
    pub fn explicit_platform(&self, text: &str) -> Option<&'static str> {
        if text.to_lowercase().contains("whatsapp") {
            Some("whatsapp")
        } else if SMS_PATTERN.is_match(text) {
            Some("sms")
        } else {
            None
        }
    }

    /// Platform named in the text, defaulting to WhatsApp
    pub fn platform(&self, text: &str) -> &'static str {
        self.explicit_platform(text).unwrap_or(DEFAULT_PLATFORM)
    }

    /// First gazetteer city mentioned as whole words
    pub fn location(&self, text: &str) -> Option<String> {
        let lower = format!(" {} ", normalize_spacing(&text.to_lowercase()));
        SUPPORTED_CITIES
            .iter()
            .filter_map(|city| {
                let needle = format!(" {} ", city.to_lowercase());
                lower.find(&needle).map(|pos| (pos, *city))
            })
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, city)| city.to_string())
    }

    /// Ticker symbol or crypto name mentioned in the text
    ///
    /// Crypto names win over tickers; known tickers win over unknown
    /// uppercase words. Tickers are matched case-sensitively.
    pub fn stock_symbol(&self, text: &str) -> Option<String> {
        let lower = text.to_lowercase();
        if let Some((_, symbol)) = CRYPTO_NAMES
            .iter()
            .find(|(name, _)| lower.split(|c: char| !c.is_alphanumeric()).any(|w| w == *name))
        {
            return Some(symbol.to_string());
        }

        let tickers: Vec<&str> = TICKER_PATTERN
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(|t| *t != "I" && *t != "A")
            .collect();
        tickers
            .iter()
            .find(|t| SUPPORTED_STOCK_SYMBOLS.contains(t))
            .or_else(|| tickers.first())
            .map(|t| t.to_string())
    }

    /// First time expression, lowercased
    pub fn time_expression(&self, text: &str) -> Option<String> {
        TIME_PATTERNS
            .iter()
            .find_map(|p| p.find(text))
            .map(|m| m.as_str().trim().to_lowercase())
    }

    pub fn numbers(&self, text: &str) -> Vec<String> {
        NUMBER_PATTERN
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    pub fn quoted(&self, text: &str) -> Vec<String> {
        QUOTED_PATTERN
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

/// Canonical spelling of a captured place name
///
/// Gazetteer cities keep their canonical spelling; anything else is
/// title-cased after trailing time words are dropped.
pub fn canonical_location(raw: &str) -> String {
    let trimmed = LOCATION_TAIL.replace(raw.trim(), "");
    let trimmed = normalize_spacing(trimmed.trim());
    match canonical_city(&trimmed) {
        Some(city) => city.to_string(),
        None => title_case(&trimmed),
    }
}

/// Uppercase the first letter of each word, lowercase the rest
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_spacing(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
