//! Core traits for the assistant
//!
//! Every external collaborator sits behind one of these traits so that real
//! and no-op implementations can be chosen once at startup and swapped for
//! mocks in tests.
//!
//! ```text
//! Language Models:
//!   - LanguageModel: ask(messages) -> text
//!
//! Capabilities:
//!   - Messenger: outbound messages
//!   - Scheduler: reminders, timers, alarms
//!   - KnowledgeService: weather, stocks, news, search, facts
//!   - Automation: apps, system controls, URLs
//!   - FileOps: sandboxed file access
//!
//! Speech:
//!   - SpeechIo: listen() / speak()
//! ```

mod capabilities;
mod llm;
mod speech;

pub use capabilities::{Automation, FileOps, KnowledgeService, Messenger, Scheduler};
pub use llm::LanguageModel;
pub use speech::SpeechIo;
