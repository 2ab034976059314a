//! Spelling normalization for romanized Urdu and Pashto
//!
//! Speech recognizers and users spell transliterated words inconsistently
//! ("kese", "kaisey", "kesay" for "kaise"). Each table maps a canonical
//! spelling to its variants; matching is whole-word and case-insensitive.
//!
//! Tables are validated when the normalizer is built: a variant may not be
//! another entry's canonical spelling, and no variant may belong to two
//! entries. Together these keep `normalize` idempotent.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use shadow_core::{Language, Script};

/// Canonical spelling and its accepted variants
pub type VariantTable = &'static [(&'static str, &'static [&'static str])];

pub const URDU_VARIANTS: VariantTable = &[
    ("kaise", &["kese", "kaisey", "kesay", "kaisay"]),
    ("theek", &["thik", "theik", "teek"]),
    ("shukriya", &["shukria", "shukariya", "shukrya"]),
    ("salam", &["salaam", "slaam"]),
    ("alaikum", &["alaykum", "alikum", "alaikom"]),
    ("aap", &["ap"]),
    ("nahi", &["nahin", "nai", "nahee"]),
    ("acha", &["achha", "accha"]),
    ("zaroor", &["zarur"]),
    ("kya", &["kia", "kyaa"]),
    ("yaad", &["yad"]),
    ("bilkul", &["bilkool"]),
];

pub const PASHTO_VARIANTS: VariantTable = &[
    ("yast", &["yaste", "yasti"]),
    ("kaw", &["kawe", "kawi"]),
    ("manana", &["manena", "manina"]),
    ("mehrbani", &["mehrabi", "meherbani"]),
    ("khaire", &["khair"]),
    ("tsanga", &["sanga", "tsenga"]),
];

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z']+").unwrap());

/// Table rejected at construction
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("variant '{variant}' of '{owner}' is the canonical form of another entry")]
    VariantIsCanonical { owner: String, variant: String },

    #[error("variant '{variant}' is claimed by both '{first}' and '{second}'")]
    DuplicateVariant {
        variant: String,
        first: String,
        second: String,
    },
}

/// Whole-word variant normalizer for romanized input
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    urdu: HashMap<String, String>,
    pashto: HashMap<String, String>,
}

impl TextNormalizer {
    /// Build from the built-in tables
    pub fn new() -> Result<Self, TableError> {
        Self::with_tables(URDU_VARIANTS, PASHTO_VARIANTS)
    }

    /// Build from custom tables, validating both
    pub fn with_tables(urdu: VariantTable, pashto: VariantTable) -> Result<Self, TableError> {
        Ok(Self {
            urdu: build_lookup(urdu)?,
            pashto: build_lookup(pashto)?,
        })
    }

    /// Replace known misspellings with canonical spellings
    ///
    /// English input and native-script input pass through unchanged.
    /// Casing of words that are not replaced is preserved.
    pub fn normalize(&self, text: &str, language: Language) -> String {
        let lookup = match language {
            Language::English => return text.to_string(),
            Language::Urdu => &self.urdu,
            Language::Pashto => &self.pashto,
        };
        if Script::Arabic.appears_in(text) {
            return text.to_string();
        }

        let normalized = WORD.replace_all(text, |caps: &Captures| {
            let word = &caps[0];
            lookup
                .get(&word.to_lowercase())
                .cloned()
                .unwrap_or_else(|| word.to_string())
        });

        if normalized != text {
            tracing::trace!(original = text, normalized = %normalized, "Normalized text");
        }
        normalized.into_owned()
    }
}

fn build_lookup(table: VariantTable) -> Result<HashMap<String, String>, TableError> {
    let mut lookup: HashMap<String, String> = HashMap::new();

    for (canonical, variants) in table {
        for variant in *variants {
            if table.iter().any(|(other, _)| other == variant) {
                return Err(TableError::VariantIsCanonical {
                    owner: canonical.to_string(),
                    variant: variant.to_string(),
                });
            }
            if let Some(first) = lookup.get(*variant) {
                return Err(TableError::DuplicateVariant {
                    variant: variant.to_string(),
                    first: first.clone(),
                    second: canonical.to_string(),
                });
            }
            lookup.insert(variant.to_string(), canonical.to_string());
        }
    }

    Ok(lookup)
}
