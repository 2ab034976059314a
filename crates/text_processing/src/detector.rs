//! Language detection
//!
//! Classifies text as English, Urdu or Pashto without external calls:
//!
//! 1. Native script: Arabic-block characters decide directly, Pashto-only
//!    letters (ښ ړ ګ ڼ) select Pashto, anything else Urdu.
//! 2. Roman transliteration: at least two distinct lexicon hits and no
//!    Arabic-block characters.
//! 3. Statistical: Roman lexicon token share, then a trigram model
//!    (`whatlang`) restricted to English and Urdu.
//! 4. The previously active language.
//!
//! Detection never fails; ambiguous input resolves to step 4.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use unicode_segmentation::UnicodeSegmentation;
use whatlang::{Detector, Lang};

use shadow_core::{Language, Script, PASHTO_SPECIFIC_LETTERS};

use crate::lexicon::{distinct_hits, token_hits, ROMAN_PASHTO, ROMAN_URDU};

/// Minimum distinct Roman lexicon hits before trusting transliteration
pub const MIN_ROMAN_HITS: usize = 2;

/// Share of tokens a Roman lexicon must own to win the statistical step
const STATISTICAL_MIN_SHARE: f32 = 0.25;

// Pashto has no trigram profile; Roman input never reaches Urdu here
static TRIGRAMS: Lazy<Detector> = Lazy::new(|| Detector::with_allowlist(vec![Lang::Eng, Lang::Urd]));

/// How a language decision was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMethod {
    NativeScript,
    RomanLexicon,
    Statistical,
    Previous,
}

/// Detection outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub language: Language,
    pub method: DetectionMethod,
}

/// Stateful language detector
///
/// Remembers the active language so empty or ambiguous input keeps the
/// conversation in the language it was already using.
#[derive(Debug)]
pub struct LanguageDetector {
    current: RwLock<Language>,
}

impl LanguageDetector {
    pub fn new(initial: Language) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    /// Currently active language
    pub fn current(&self) -> Language {
        *self.current.read()
    }

    /// Explicitly switch the active language
    pub fn set_current(&self, language: Language) {
        *self.current.write() = language;
    }

    /// Detect the language of `text`
    pub fn detect(&self, text: &str) -> Language {
        self.detect_with_method(text).language
    }

    /// Detect and report which step decided
    ///
    /// A confident decision also becomes the new active language.
    pub fn detect_with_method(&self, text: &str) -> Detection {
        let detection = classify(text).unwrap_or(Detection {
            language: self.current(),
            method: DetectionMethod::Previous,
        });

        if detection.method != DetectionMethod::Previous {
            self.set_current(detection.language);
        }

        tracing::debug!(
            language = %detection.language,
            method = ?detection.method,
            "Language detected"
        );

        detection
    }

    /// Roman Urdu check used by the normalizer and the reminder fast-path
    pub fn is_roman_urdu(text: &str) -> bool {
        roman_scores(text).0 >= MIN_ROMAN_HITS && !Script::Arabic.appears_in(text)
    }

    /// Roman Pashto check
    pub fn is_roman_pashto(text: &str) -> bool {
        roman_scores(text).1 >= MIN_ROMAN_HITS && !Script::Arabic.appears_in(text)
    }
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new(Language::default())
    }
}

/// Stateless classification; `None` means "keep the previous language"
fn classify(text: &str) -> Option<Detection> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(language) = native_script_language(text) {
        return Some(Detection {
            language,
            method: DetectionMethod::NativeScript,
        });
    }

    let tokens = tokenize(text);
    let urdu = distinct_hits(&tokens, ROMAN_URDU);
    let pashto = distinct_hits(&tokens, ROMAN_PASHTO);
    if urdu.max(pashto) >= MIN_ROMAN_HITS {
        // Ties go to Urdu, the larger lexicon
        let language = if pashto > urdu {
            Language::Pashto
        } else {
            Language::Urdu
        };
        return Some(Detection {
            language,
            method: DetectionMethod::RomanLexicon,
        });
    }

    statistical_language(text, &tokens).map(|language| Detection {
        language,
        method: DetectionMethod::Statistical,
    })
}

fn native_script_language(text: &str) -> Option<Language> {
    if !Script::Arabic.appears_in(text) {
        return None;
    }
    if text.chars().any(|c| PASHTO_SPECIFIC_LETTERS.contains(&c)) {
        Some(Language::Pashto)
    } else {
        Some(Language::Urdu)
    }
}

/// Roman lexicon share first, then the trigram model
fn statistical_language(text: &str, tokens: &[String]) -> Option<Language> {
    if tokens.is_empty() {
        return None;
    }

    let total = tokens.len() as f32;
    let urdu = token_hits(tokens, ROMAN_URDU) as f32 / total;
    let pashto = token_hits(tokens, ROMAN_PASHTO) as f32 / total;
    if urdu.max(pashto) >= STATISTICAL_MIN_SHARE {
        return Some(if pashto > urdu {
            Language::Pashto
        } else {
            Language::Urdu
        });
    }

    if !text.chars().any(char::is_alphabetic) {
        return None;
    }
    let info = TRIGRAMS.detect(text)?;
    tracing::trace!(lang = ?info.lang(), confidence = info.confidence(), "Trigram guess");
    match info.lang() {
        Lang::Eng => Some(Language::English),
        Lang::Urd => Some(Language::Urdu),
        _ => None,
    }
}

fn roman_scores(text: &str) -> (usize, usize) {
    let tokens = tokenize(text);
    (
        distinct_hits(&tokens, ROMAN_URDU),
        distinct_hits(&tokens, ROMAN_PASHTO),
    )
}

/// Lowercased word tokens
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}
