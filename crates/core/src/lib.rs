//! Core traits and types for the Shadow assistant
//!
//! This crate provides foundational types used across all other crates:
//! - Language definitions (English, Urdu, Pashto)
//! - Intent types and the closed intent taxonomy
//! - Capability call contract
//! - Chat message types for the completion service
//! - Traits for pluggable backends (LLM, capabilities, speech)
//! - Error types

pub mod capability;
pub mod error;
pub mod intent;
pub mod language;
pub mod llm_types;
pub mod traits;

pub use capability::{
    CapabilityResult, FileAction, KnowledgeQuery, ScheduleKind, ScheduleRequest, When,
};
pub use error::{Error, Result};
pub use intent::{
    ClassificationTier, Intent, IntentSummary, IntentType, Mood, Parameters, Urgency,
};
pub use language::{Language, Script, PASHTO_SPECIFIC_LETTERS};
pub use llm_types::{Message, Role};

pub use traits::{
    Automation, FileOps, KnowledgeService, LanguageModel, Messenger, Scheduler, SpeechIo,
};
