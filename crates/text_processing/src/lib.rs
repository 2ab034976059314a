//! Text processing for the Shadow assistant
//!
//! This crate provides the language front-end that runs before intent
//! classification:
//! - **Language detection**: native script, Roman Urdu/Pashto lexicons and a
//!   statistical fallback, with memory of the active language
//! - **Normalization**: whole-word spelling variants for romanized input
//! - **Entity extraction**: contacts, platforms, cities, tickers, times
//! - **Reminder parsing**: multilingual reminder fast-path
//!
//! # Example
//!
//! ```ignore
//! use shadow_core::Language;
//! use shadow_text_processing::{LanguageDetector, TextNormalizer};
//!
//! let detector = LanguageDetector::new(Language::English);
//! let normalizer = TextNormalizer::new()?;
//!
//! let language = detector.detect("ap kese ho");
//! let text = normalizer.normalize("ap kese ho", language);
//! assert_eq!(text, "aap kaise ho");
//! ```

pub mod detector;
pub mod entities;
pub mod lexicon;
pub mod normalizer;
pub mod reminder;

pub use detector::{Detection, DetectionMethod, LanguageDetector};
pub use entities::{canonical_location, title_case, EntityExtractor, ExtractedEntities};
pub use normalizer::{TableError, TextNormalizer};
pub use reminder::{ParsedReminder, ReminderParser};
