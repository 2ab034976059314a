//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use shadow_core::Language;

use crate::constants::{assistant, classifier, endpoints, rate_limits, timeouts};
use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Assistant identity and language
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Intent classifier thresholds
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// AI completion backend
    #[serde(default)]
    pub llm: LlmSettings,

    /// AI request budgets
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Handler timeouts and chat retry policy
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Real or no-op capability selection
    #[serde(default)]
    pub capabilities: CapabilitiesConfig,

    /// Outbound message queue
    #[serde(default)]
    pub queue: QueueConfig,

    /// Front-end surface
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_assistant()?;
        self.validate_classifier()?;
        self.validate_rate_limit()?;
        self.validate_dispatch()?;
        self.validate_llm()?;
        Ok(())
    }

    fn validate_assistant(&self) -> Result<(), ConfigError> {
        if Language::from_str_loose(&self.assistant.default_language).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "assistant.default_language".to_string(),
                message: format!(
                    "Unsupported language '{}', expected one of en, ur, ps",
                    self.assistant.default_language
                ),
            });
        }
        Ok(())
    }

    fn validate_classifier(&self) -> Result<(), ConfigError> {
        let c = &self.classifier;
        let thresholds = [
            ("classifier.pattern_threshold", c.pattern_threshold),
            ("classifier.keyword_threshold", c.keyword_threshold),
            ("classifier.min_dispatch_confidence", c.min_dispatch_confidence),
            ("classifier.fallback_confidence", c.fallback_confidence),
        ];
        for (field, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: format!("Must be between 0.0 and 1.0, got {}", value),
                });
            }
        }

        if c.context_window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "classifier.context_window".to_string(),
                message: "Must keep at least one intent".to_string(),
            });
        }

        Ok(())
    }

    fn validate_rate_limit(&self) -> Result<(), ConfigError> {
        let r = &self.rate_limit;
        if r.requests_per_minute == 0 || r.requests_per_day == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit".to_string(),
                message: "Budgets must be greater than zero".to_string(),
            });
        }
        if r.requests_per_minute > r.requests_per_day {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit.requests_per_minute".to_string(),
                message: format!(
                    "Per-minute budget {} exceeds per-day budget {}",
                    r.requests_per_minute, r.requests_per_day
                ),
            });
        }
        Ok(())
    }

    fn validate_dispatch(&self) -> Result<(), ConfigError> {
        let d = &self.dispatch;
        if d.handler_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "dispatch.handler_timeout_secs".to_string(),
                message: "Every handler call needs a timeout".to_string(),
            });
        }
        if d.chat_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "dispatch.chat_timeout_secs".to_string(),
                message: "Chat fallback needs a timeout".to_string(),
            });
        }
        if d.chat_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "dispatch.chat_retries".to_string(),
                message: "At least one chat attempt is required".to_string(),
            });
        }
        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        if self.llm.provider == LlmProvider::None {
            return Ok(());
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::MissingField("llm.model".to_string()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm.temperature".to_string(),
                message: format!("Must be between 0.0 and 2.0, got {}", self.llm.temperature),
            });
        }
        Ok(())
    }

    /// Default language as a typed value
    pub fn default_language(&self) -> Language {
        Language::from_str_loose(&self.assistant.default_language).unwrap_or_default()
    }
}

/// Assistant identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Name used in the chat persona
    #[serde(default = "default_assistant_name")]
    pub name: String,

    /// Language used before anything has been detected
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Calm turns after which mood resets to neutral (0 keeps mood sticky)
    #[serde(default = "default_mood_decay_turns")]
    pub mood_decay_turns: u32,
}

fn default_assistant_name() -> String {
    assistant::NAME.to_string()
}
fn default_language() -> String {
    assistant::DEFAULT_LANGUAGE.to_string()
}
fn default_mood_decay_turns() -> u32 {
    assistant::MOOD_DECAY_TURNS
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: default_assistant_name(),
            default_language: default_language(),
            mood_decay_turns: default_mood_decay_turns(),
        }
    }
}

/// Classifier thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_pattern_threshold")]
    pub pattern_threshold: f32,

    #[serde(default = "default_keyword_threshold")]
    pub keyword_threshold: f32,

    #[serde(default = "default_min_dispatch_confidence")]
    pub min_dispatch_confidence: f32,

    #[serde(default = "default_fallback_confidence")]
    pub fallback_confidence: f32,

    /// Escalate to the AI tier when deterministic tiers are not confident
    #[serde(default = "default_true")]
    pub ai_enabled: bool,

    /// Timeout for one AI classification request
    #[serde(default = "default_classify_timeout")]
    pub ai_timeout_secs: u64,

    /// Intent summaries kept in conversation context
    #[serde(default = "default_context_window")]
    pub context_window: usize,
}

fn default_pattern_threshold() -> f32 {
    classifier::PATTERN_THRESHOLD
}
fn default_keyword_threshold() -> f32 {
    classifier::KEYWORD_THRESHOLD
}
fn default_min_dispatch_confidence() -> f32 {
    classifier::MIN_DISPATCH_CONFIDENCE
}
fn default_fallback_confidence() -> f32 {
    classifier::FALLBACK_CONFIDENCE
}
fn default_classify_timeout() -> u64 {
    timeouts::CLASSIFY_SECS
}
fn default_context_window() -> usize {
    classifier::CONTEXT_WINDOW
}
fn default_true() -> bool {
    true
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            pattern_threshold: default_pattern_threshold(),
            keyword_threshold: default_keyword_threshold(),
            min_dispatch_confidence: default_min_dispatch_confidence(),
            fallback_confidence: default_fallback_confidence(),
            ai_enabled: true,
            ai_timeout_secs: default_classify_timeout(),
            context_window: default_context_window(),
        }
    }
}

/// Supported completion providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Ollama,
    OpenAI,
    Azure,
    /// No AI backend: tier 3 is skipped and chat answers with a fixed message
    None,
}

/// AI completion backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default)]
    pub provider: LlmProvider,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// API key (for cloud providers)
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Transport-level request timeout
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Retries for network failures inside the backend
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

fn default_llm_model() -> String {
    "qwen2.5:3b-instruct-q4_K_M".to_string()
}
fn default_llm_endpoint() -> String {
    endpoints::OLLAMA_DEFAULT.to_string()
}
fn default_max_tokens() -> usize {
    512
}
fn default_temperature() -> f32 {
    0.3
}
fn default_llm_timeout() -> u64 {
    timeouts::CHAT_SECS
}
fn default_max_retries() -> u32 {
    1
}
fn default_initial_backoff_ms() -> u64 {
    250
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_llm_model(),
            endpoint: default_llm_endpoint(),
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

/// AI request budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    #[serde(default = "default_requests_per_day")]
    pub requests_per_day: u32,
}

fn default_requests_per_minute() -> u32 {
    rate_limits::REQUESTS_PER_MINUTE
}
fn default_requests_per_day() -> u32 {
    rate_limits::REQUESTS_PER_DAY
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            requests_per_day: default_requests_per_day(),
        }
    }
}

/// Handler timeouts and chat retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_handler_timeout")]
    pub handler_timeout_secs: u64,

    #[serde(default = "default_chat_timeout")]
    pub chat_timeout_secs: u64,

    /// Chat fallback attempts
    #[serde(default = "default_chat_retries")]
    pub chat_retries: u32,

    #[serde(default = "default_chat_backoff")]
    pub chat_backoff_ms: u64,

    /// Extra attempts made by `safe_handle_query` after a generic failure
    #[serde(default = "default_turn_retries")]
    pub turn_retries: u32,
}

fn default_handler_timeout() -> u64 {
    timeouts::HANDLER_SECS
}
fn default_chat_timeout() -> u64 {
    timeouts::CHAT_SECS
}
fn default_chat_retries() -> u32 {
    timeouts::CHAT_RETRIES
}
fn default_chat_backoff() -> u64 {
    timeouts::CHAT_BACKOFF_MS
}
fn default_turn_retries() -> u32 {
    2
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            handler_timeout_secs: default_handler_timeout(),
            chat_timeout_secs: default_chat_timeout(),
            chat_retries: default_chat_retries(),
            chat_backoff_ms: default_chat_backoff(),
            turn_retries: default_turn_retries(),
        }
    }
}

/// Whether a capability talks to a real backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityMode {
    Real,
    #[default]
    Noop,
}

/// Capability selection and backend details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilitiesConfig {
    #[serde(default)]
    pub messaging: MessagingConfig,

    #[serde(default = "default_real")]
    pub scheduler: CapabilityMode,

    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    #[serde(default)]
    pub automation: AutomationConfig,

    #[serde(default)]
    pub file_ops: FileOpsConfig,
}

fn default_real() -> CapabilityMode {
    CapabilityMode::Real
}

impl Default for CapabilitiesConfig {
    fn default() -> Self {
        Self {
            messaging: MessagingConfig::default(),
            scheduler: default_real(),
            knowledge: KnowledgeConfig::default(),
            automation: AutomationConfig::default(),
            file_ops: FileOpsConfig::default(),
        }
    }
}

/// Messaging backend
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessagingConfig {
    #[serde(default)]
    pub mode: CapabilityMode,

    /// Webhook receiving `{platform, contact, message}` JSON
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Knowledge backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default)]
    pub mode: CapabilityMode,

    #[serde(default = "default_weather_endpoint")]
    pub weather_endpoint: String,

    #[serde(default = "default_search_endpoint")]
    pub search_endpoint: String,

    /// Quote endpoint; `{symbol}` is substituted
    #[serde(default)]
    pub stock_endpoint: Option<String>,
}

fn default_weather_endpoint() -> String {
    endpoints::WEATHER_DEFAULT.to_string()
}
fn default_search_endpoint() -> String {
    endpoints::SEARCH_DEFAULT.to_string()
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            mode: CapabilityMode::default(),
            weather_endpoint: default_weather_endpoint(),
            search_endpoint: default_search_endpoint(),
            stock_endpoint: None,
        }
    }
}

/// Automation backend
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AutomationConfig {
    #[serde(default)]
    pub mode: CapabilityMode,

    /// Applications `open_app` may launch
    #[serde(default)]
    pub allowed_apps: Vec<String>,

    /// Permit shutdown/restart/sleep
    #[serde(default)]
    pub allow_power_actions: bool,
}

/// File operations backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOpsConfig {
    #[serde(default)]
    pub mode: CapabilityMode,

    /// Root directory every path is resolved against
    #[serde(default = "default_file_root")]
    pub root: String,

    /// Maximum bytes returned by `read_file`
    #[serde(default = "default_max_read_bytes")]
    pub max_read_bytes: usize,
}

fn default_file_root() -> String {
    ".".to_string()
}
fn default_max_read_bytes() -> usize {
    4096
}

impl Default for FileOpsConfig {
    fn default() -> Self {
        Self {
            mode: CapabilityMode::default(),
            root: default_file_root(),
            max_read_bytes: default_max_read_bytes(),
        }
    }
}

/// Outbound message queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,
}

fn default_queue_capacity() -> usize {
    100
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_queue_capacity(),
        }
    }
}

/// Front-end surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    #[default]
    Cli,
    Http,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub mode: ServerMode,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mode: ServerMode::default(),
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_request_timeout(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Export Prometheus metrics at /metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from files and environment
///
/// Priority: env vars > config/{env} > config/default > defaults
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    // Load default config
    builder = builder.add_source(File::with_name("config/default").required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix("SHADOW")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    tracing::debug!(
        provider = ?settings.llm.provider,
        language = %settings.assistant.default_language,
        "Settings loaded"
    );

    Ok(settings)
}
