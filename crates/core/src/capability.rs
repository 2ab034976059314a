//! Capability call contract
//!
//! Every external handler answers with a [`CapabilityResult`]. The dispatcher
//! relies on `success`, `message` and `error` only.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use chrono::NaiveTime;

/// Normalized outcome of a capability call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CapabilityResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            message: String::new(),
            error: Some(error),
        }
    }

    /// Error text, falling back to the message when no error was attached
    pub fn error_text(&self) -> &str {
        self.error.as_deref().unwrap_or(&self.message)
    }
}

/// Kind of scheduled item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    Reminder,
    Timer,
    Alarm,
}

impl ScheduleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reminder => "reminder",
            Self::Timer => "timer",
            Self::Alarm => "alarm",
        }
    }
}

/// When a scheduled item fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum When {
    /// Relative delay from now
    After(Duration),
    /// Next occurrence of a wall-clock time
    At(NaiveTime),
}

/// Request sent to a [`crate::Scheduler`]
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRequest {
    pub kind: ScheduleKind,
    pub message: String,
    pub when: When,
}

impl ScheduleRequest {
    pub fn reminder(message: impl Into<String>, when: When) -> Self {
        Self {
            kind: ScheduleKind::Reminder,
            message: message.into(),
            when,
        }
    }

    pub fn timer(duration: Duration) -> Self {
        Self {
            kind: ScheduleKind::Timer,
            message: String::new(),
            when: When::After(duration),
        }
    }

    pub fn alarm(at: NaiveTime) -> Self {
        Self {
            kind: ScheduleKind::Alarm,
            message: String::new(),
            when: When::At(at),
        }
    }
}

/// Lookup sent to a [`crate::KnowledgeService`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnowledgeQuery {
    Weather { location: String },
    Stock { symbol: String },
    News { topic: String },
    Search { query: String },
    Fact { topic: String },
}

impl KnowledgeQuery {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Weather { .. } => "weather",
            Self::Stock { .. } => "stock",
            Self::News { .. } => "news",
            Self::Search { .. } => "search",
            Self::Fact { .. } => "fact",
        }
    }
}

/// File operation sent to a [`crate::FileOps`] service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    List { dir: String },
    Read { path: String },
    Search { pattern: String },
    Create { path: String, contents: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_constructors() {
        let ok = CapabilityResult::ok("done");
        assert!(ok.success);
        assert_eq!(ok.error_text(), "done");

        let failed = CapabilityResult::failure("boom");
        assert!(!failed.success);
        assert_eq!(failed.error_text(), "boom");
    }

    #[test]
    fn test_result_ignores_extra_fields() {
        let parsed: CapabilityResult =
            serde_json::from_str(r#"{"success":true,"message":"sent","extra":42}"#).unwrap();
        assert_eq!(parsed, CapabilityResult::ok("sent"));
    }
}
