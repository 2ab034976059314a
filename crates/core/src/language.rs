//! Language definitions for English, Urdu and Pashto
//!
//! Urdu and Pashto are written natively in Arabic script but are often typed
//! in Latin transliteration ("Roman Urdu", "Roman Pashto"). Script helpers in
//! this module only look at code points; vocabulary-based detection lives in
//! the text processing crate.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::Error;

/// Supported languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ur")]
    Urdu,
    #[serde(rename = "ps")]
    Pashto,
}

impl Language {
    /// ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Urdu => "ur",
            Self::Pashto => "ps",
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Urdu => "Urdu",
            Self::Pashto => "Pashto",
        }
    }

    /// Neural TTS voice used when speaking this language
    pub fn voice(&self) -> &'static str {
        match self {
            Self::English => "en-US-ChristopherNeural",
            Self::Urdu => "ur-PK-AsadNeural",
            Self::Pashto => "ps-AF-GulNawazNeural",
        }
    }

    /// Native script of the language
    pub fn script(&self) -> Script {
        match self {
            Self::English => Script::Latin,
            Self::Urdu | Self::Pashto => Script::Arabic,
        }
    }

    /// Check if this language uses right-to-left script
    pub fn is_rtl(&self) -> bool {
        matches!(self.script(), Script::Arabic)
    }

    /// Parse from string (case-insensitive, accepts codes and names)
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "en" | "eng" | "english" => Some(Self::English),
            "ur" | "urd" | "urdu" => Some(Self::Urdu),
            "ps" | "pus" | "pashto" | "pushto" => Some(Self::Pashto),
            _ => None,
        }
    }

    /// Get all supported languages
    pub fn all() -> &'static [Language] {
        &[Self::English, Self::Urdu, Self::Pashto]
    }

    /// Look up a stock phrase in this language.
    ///
    /// Keys: `greeting`, `how_are_you`, `thank_you`, `goodbye`, `yes`, `no`,
    /// `please`, `sorry`.
    pub fn common_phrase(&self, key: &str) -> Option<&'static str> {
        let phrase = match (self, key) {
            (Self::English, "greeting") => "Hello",
            (Self::English, "how_are_you") => "How are you?",
            (Self::English, "thank_you") => "Thank you",
            (Self::English, "goodbye") => "Goodbye",
            (Self::English, "yes") => "Yes",
            (Self::English, "no") => "No",
            (Self::English, "please") => "Please",
            (Self::English, "sorry") => "Sorry",

            (Self::Urdu, "greeting") => "السلام علیکم",
            (Self::Urdu, "how_are_you") => "آپ کیسے ہیں؟",
            (Self::Urdu, "thank_you") => "شکریہ",
            (Self::Urdu, "goodbye") => "خدا حافظ",
            (Self::Urdu, "yes") => "جی ہاں",
            (Self::Urdu, "no") => "نہیں",
            (Self::Urdu, "please") => "براہ کرم",
            (Self::Urdu, "sorry") => "معاف کیجئے گا",

            (Self::Pashto, "greeting") => "سلام",
            (Self::Pashto, "how_are_you") => "تاسو څنګه یاست؟",
            (Self::Pashto, "thank_you") => "مننه",
            (Self::Pashto, "goodbye") => "خدای پامان",
            (Self::Pashto, "yes") => "هو",
            (Self::Pashto, "no") => "نه",
            (Self::Pashto, "please") => "لطفاً",
            (Self::Pashto, "sorry") => "وبخښئ",

            _ => return None,
        };
        Some(phrase)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_loose(s).ok_or_else(|| Error::UnsupportedLanguage(s.to_string()))
    }
}

/// Letters that exist in Pashto orthography but not in Urdu
pub const PASHTO_SPECIFIC_LETTERS: &[char] = &['ښ', 'ړ', 'ګ', 'ڼ'];

/// Script systems relevant to the supported languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Script {
    Latin,
    Arabic,
}

impl Script {
    /// Unicode block for this script (basic block only)
    pub fn unicode_range(&self) -> (u32, u32) {
        match self {
            Self::Latin => (0x0000, 0x007F),
            Self::Arabic => (0x0600, 0x06FF),
        }
    }

    /// Check if a character belongs to this script
    pub fn contains_char(&self, c: char) -> bool {
        let code = c as u32;
        let (start, end) = self.unicode_range();
        code >= start && code <= end
    }

    /// Check whether any character of `text` belongs to this script
    pub fn appears_in(&self, text: &str) -> bool {
        text.chars().any(|c| self.contains_char(c))
    }

    /// Detect the dominant script among letters of `text`
    pub fn detect(text: &str) -> Option<Self> {
        let (mut latin, mut arabic) = (0usize, 0usize);
        for c in text.chars().filter(|c| c.is_alphabetic()) {
            if Self::Arabic.contains_char(c) {
                arabic += 1;
            } else if Self::Latin.contains_char(c) {
                latin += 1;
            }
        }
        match (latin, arabic) {
            (0, 0) => None,
            (l, a) if a >= l => Some(Self::Arabic),
            _ => Some(Self::Latin),
        }
    }
}
