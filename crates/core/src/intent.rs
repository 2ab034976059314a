//! Intent types produced by the classifier
//!
//! An [`Intent`] is created once per utterance and never mutated after the
//! classifier hands it over. Only its [`IntentSummary`] outlives the turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Handler-specific parameters (message body, time expression, platform...)
pub type Parameters = BTreeMap<String, String>;

/// Closed set of intent categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    Messaging,
    Knowledge,
    Scheduling,
    Automation,
    System,
    FileOps,
    Web,
    Chat,
    Unknown,
}

impl IntentType {
    pub const ALL: [IntentType; 9] = [
        Self::Messaging,
        Self::Knowledge,
        Self::Scheduling,
        Self::Automation,
        Self::System,
        Self::FileOps,
        Self::Web,
        Self::Chat,
        Self::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Messaging => "messaging",
            Self::Knowledge => "knowledge",
            Self::Scheduling => "scheduling",
            Self::Automation => "automation",
            Self::System => "system",
            Self::FileOps => "file_ops",
            Self::Web => "web",
            Self::Chat => "chat",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a label coming from an untrusted source.
    ///
    /// Accepts the long forms `file_operations` and `web_operations` used in
    /// the classification prompt. Returns `None` for anything outside the set.
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "messaging" => Some(Self::Messaging),
            "knowledge" => Some(Self::Knowledge),
            "scheduling" => Some(Self::Scheduling),
            "automation" => Some(Self::Automation),
            "system" => Some(Self::System),
            "file_ops" | "file_operations" => Some(Self::FileOps),
            "web" | "web_operations" => Some(Self::Web),
            "chat" => Some(Self::Chat),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Coerce any label into the closed set
    pub fn coerce(label: &str) -> Self {
        Self::parse_label(label).unwrap_or(Self::Unknown)
    }
}

impl std::fmt::Display for IntentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which classifier stage produced an intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationTier {
    Reminder,
    Pattern,
    Keyword,
    FollowUp,
    Ai,
    Fallback,
}

impl ClassificationTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reminder => "reminder",
            Self::Pattern => "pattern",
            Self::Keyword => "keyword",
            Self::FollowUp => "follow_up",
            Self::Ai => "ai",
            Self::Fallback => "fallback",
        }
    }
}

/// Coarse urgency used for template selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    High,
    Medium,
    #[default]
    Low,
}

impl Urgency {
    /// Map free-form urgency words (including the prompt's casual/normal/urgent)
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "high" | "urgent" | "critical" => Self::High,
            "medium" | "normal" => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// User mood inferred from lexical cues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Urgent,
    Casual,
    Frustrated,
    Happy,
    #[default]
    Neutral,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::Casual => "casual",
            Self::Frustrated => "frustrated",
            Self::Happy => "happy",
            Self::Neutral => "neutral",
        }
    }
}

/// Structured classifier output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(rename = "type")]
    pub intent_type: IntentType,
    pub action: String,
    pub target: String,
    pub parameters: Parameters,
    pub confidence: f32,
    /// Diagnostics only, never shown to the user
    pub rationale: String,
    pub tier: ClassificationTier,
}

impl Intent {
    pub fn new(intent_type: IntentType, action: impl Into<String>, tier: ClassificationTier) -> Self {
        Self {
            intent_type,
            action: action.into(),
            target: String::new(),
            parameters: Parameters::new(),
            confidence: 0.0,
            rationale: String::new(),
            tier,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_params(mut self, params: Parameters) -> Self {
        self.parameters.extend(params);
        self
    }

    /// Set confidence, clamped to [0, 1]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    /// Look up a parameter, ignoring empty values
    pub fn param(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Urgency tag carried in the parameters, `low` when absent
    pub fn urgency(&self) -> Urgency {
        self.param("urgency")
            .map(Urgency::from_label)
            .unwrap_or_default()
    }

    pub fn summary(&self) -> IntentSummary {
        IntentSummary {
            intent_type: self.intent_type,
            action: self.action.clone(),
            target: self.target.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// What the context store keeps of an intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentSummary {
    pub intent_type: IntentType,
    pub action: String,
    pub target: String,
    pub timestamp: DateTime<Utc>,
}

impl std::fmt::Display for IntentSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", self.action, self.target)
    }
}
