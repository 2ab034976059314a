//! Centralized constants for the assistant
//!
//! Single source of truth for default thresholds, budgets and gazetteers.
//! Settings defaults point here; code that needs a fixed table (cities,
//! symbols) reads it directly.

/// Classifier thresholds and confidence steps
pub mod classifier {
    /// Tier 1 result is returned immediately above this confidence
    pub const PATTERN_THRESHOLD: f32 = 0.8;

    /// Tier 2 result is accepted above this keyword score
    pub const KEYWORD_THRESHOLD: f32 = 0.6;

    /// Intents below this confidence are sent to chat
    pub const MIN_DISPATCH_CONFIDENCE: f32 = 0.3;

    /// Confidence attached to the structural fallback
    pub const FALLBACK_CONFIDENCE: f32 = 0.3;

    /// Confidence of a context-resolved follow-up ("what about Paris")
    pub const FOLLOW_UP_CONFIDENCE: f32 = 0.85;

    /// Confidence of the reminder fast-path when a time was found
    pub const REMINDER_CONFIDENCE: f32 = 0.9;

    /// Coverage step function: (coverage above, confidence)
    pub const COVERAGE_STEPS: [(f32, f32); 2] = [(0.8, 0.95), (0.5, 0.85)];

    /// Confidence when coverage is at or below every step
    pub const COVERAGE_FLOOR: f32 = 0.75;

    /// Number of intent summaries kept in context
    pub const CONTEXT_WINDOW: usize = 5;

    /// Intent summaries shown to the AI classifier
    pub const PROMPT_RECENT_INTENTS: usize = 3;
}

/// AI request budgets
pub mod rate_limits {
    pub const REQUESTS_PER_MINUTE: u32 = 55;
    pub const REQUESTS_PER_DAY: u32 = 1400;
}

/// Timeouts and retry policy
pub mod timeouts {
    /// Per-call timeout for capability handlers
    pub const HANDLER_SECS: u64 = 10;

    /// Timeout for the chat fallback completion
    pub const CHAT_SECS: u64 = 25;

    /// Chat fallback attempts before surfacing failure
    pub const CHAT_RETRIES: u32 = 2;

    /// Pause between chat fallback attempts
    pub const CHAT_BACKOFF_MS: u64 = 1000;

    /// Timeout for a single AI classification request
    pub const CLASSIFY_SECS: u64 = 15;
}

/// Default service endpoints
pub mod endpoints {
    pub const OLLAMA_DEFAULT: &str = "http://localhost:11434";
    pub const OPENAI_DEFAULT: &str = "https://api.openai.com/v1";
    pub const WEATHER_DEFAULT: &str = "https://wttr.in";
    pub const SEARCH_DEFAULT: &str = "https://api.duckduckgo.com";
}

/// Fixed entity gazetteers
pub mod gazetteer {
    /// Cities recognised by the location extractor
    pub const SUPPORTED_CITIES: &[&str] = &[
        "London",
        "New York",
        "Paris",
        "Tokyo",
        "Sydney",
        "Berlin",
        "Mumbai",
        "Dubai",
        "Singapore",
        "Toronto",
        "Moscow",
        "Cairo",
        "Rome",
        "Madrid",
    ];

    /// Ticker symbols recognised by the stock extractor
    pub const SUPPORTED_STOCK_SYMBOLS: &[&str] = &[
        "AAPL", "GOOGL", "MSFT", "AMZN", "TSLA", "META", "NVDA", "NFLX", "BTC", "ETH", "DOGE",
        "SPY", "QQQ", "BTC-USD", "ETH-USD",
    ];

    /// Crypto names mapped to their symbols
    pub const CRYPTO_NAMES: &[(&str, &str)] = &[
        ("bitcoin", "BTC"),
        ("ethereum", "ETH"),
        ("dogecoin", "DOGE"),
        ("doge", "DOGE"),
    ];

    /// Look up a city case-insensitively, returning its canonical spelling
    pub fn canonical_city(name: &str) -> Option<&'static str> {
        let name = name.trim();
        SUPPORTED_CITIES
            .iter()
            .copied()
            .find(|city| city.eq_ignore_ascii_case(name))
    }
}

/// Assistant identity
pub mod assistant {
    pub const NAME: &str = "Shadow";
    pub const DEFAULT_LANGUAGE: &str = "ur";
    /// Calm turns after which a detected mood resets to neutral
    pub const MOOD_DECAY_TURNS: u32 = 3;
}
