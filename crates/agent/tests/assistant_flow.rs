//! End-to-end turns through the assistant with mock backends

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use shadow_agent::{Assistant, EMPTY_INPUT_REPLY, GENERIC_ERROR_REPLY};
use shadow_config::{CapabilitiesConfig, RateLimitConfig, Settings};
use shadow_core::{
    CapabilityResult, ClassificationTier, IntentType, KnowledgeQuery, KnowledgeService, Language,
    LanguageModel, Message, Messenger, Result, ScheduleRequest, Scheduler, SpeechIo, When,
};
use shadow_llm::{RateLimitedModel, RateLimiter};
use shadow_tools::CapabilityRegistry;

const RATE_LIMIT_REPLY: &str = "I've reached my free API limit for now. Please try again in a minute.";

struct MockLlm {
    reply: String,
    calls: AtomicUsize,
}

impl MockLlm {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for MockLlm {
    async fn ask(&self, _messages: &[Message]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[derive(Default)]
struct MockKnowledge {
    queries: Mutex<Vec<KnowledgeQuery>>,
}

#[async_trait]
impl KnowledgeService for MockKnowledge {
    async fn lookup(&self, query: KnowledgeQuery) -> Result<CapabilityResult> {
        let reply = match &query {
            KnowledgeQuery::Weather { location } => format!("{}: +12°C", location),
            other => format!("{} result", other.kind()),
        };
        self.queries.lock().push(query);
        Ok(CapabilityResult::ok(reply))
    }
}

struct StalledKnowledge;

#[async_trait]
impl KnowledgeService for StalledKnowledge {
    async fn lookup(&self, _query: KnowledgeQuery) -> Result<CapabilityResult> {
        std::future::pending().await
    }
}

#[derive(Default)]
struct PanickingKnowledge {
    calls: AtomicUsize,
}

#[async_trait]
impl KnowledgeService for PanickingKnowledge {
    async fn lookup(&self, _query: KnowledgeQuery) -> Result<CapabilityResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        panic!("backend blew up");
    }
}

#[derive(Default)]
struct MockScheduler {
    requests: Mutex<Vec<ScheduleRequest>>,
}

#[async_trait]
impl Scheduler for MockScheduler {
    async fn schedule(&self, request: ScheduleRequest) -> Result<CapabilityResult> {
        self.requests.lock().push(request);
        Ok(CapabilityResult::ok("Reminder #1 set."))
    }

    async fn list(&self) -> Result<CapabilityResult> {
        Ok(CapabilityResult::ok("Nothing scheduled."))
    }

    async fn cancel(&self, task_id: u64) -> Result<CapabilityResult> {
        Ok(CapabilityResult::ok(format!("Cancelled #{}.", task_id)))
    }
}

#[derive(Default)]
struct MockMessenger {
    sent: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn send_message(&self, platform: &str, contact: &str, body: &str) -> Result<CapabilityResult> {
        self.sent
            .lock()
            .push((platform.to_string(), contact.to_string(), body.to_string()));
        Ok(CapabilityResult::ok("sent"))
    }
}

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.assistant.default_language = "en".to_string();
    settings
}

#[tokio::test]
async fn test_weather_resolves_without_ai() {
    let llm = MockLlm::new("{}");
    let knowledge = Arc::new(MockKnowledge::default());
    let assistant = Assistant::builder(settings())
        .llm(llm.clone())
        .registry(CapabilityRegistry::noop().with_knowledge(knowledge.clone()))
        .build()
        .unwrap();

    let turn = assistant.handle_turn("what's the weather like in London").await;
    let intent = turn.intent.unwrap();

    assert_eq!(intent.intent_type, IntentType::Knowledge);
    assert_eq!(intent.action, "get_weather");
    assert_eq!(intent.target, "London");
    assert!(intent.confidence >= 0.8);
    assert_eq!(llm.calls(), 0);
    assert_eq!(turn.language, Language::English);
    assert_eq!(turn.reply, "Here's what I found: London: +12°C");
    assert_eq!(
        *knowledge.queries.lock(),
        vec![KnowledgeQuery::Weather {
            location: "London".into()
        }]
    );
}

#[tokio::test]
async fn test_reminder_fast_path() {
    let llm = MockLlm::new("{}");
    let scheduler = Arc::new(MockScheduler::default());
    let assistant = Assistant::builder(settings())
        .llm(llm.clone())
        .registry(CapabilityRegistry::noop().with_scheduler(scheduler.clone()))
        .build()
        .unwrap();

    let turn = assistant.handle_turn("remind me to call mom in 10 minutes").await;
    let intent = turn.intent.unwrap();

    assert_eq!(intent.tier, ClassificationTier::Reminder);
    assert_eq!(intent.param("message"), Some("call mom"));
    assert_eq!(intent.param("relative_minutes"), Some("10"));
    assert_eq!(llm.calls(), 0);

    let requests = scheduler.requests.lock();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].message, "call mom");
    assert_eq!(requests[0].when, When::After(Duration::from_secs(600)));
}

#[tokio::test]
async fn test_empty_input() {
    let llm = MockLlm::new("{}");
    let assistant = Assistant::builder(settings()).llm(llm.clone()).build().unwrap();

    for input in ["", "   "] {
        let turn = assistant.handle_turn(input).await;
        assert_eq!(turn.reply, EMPTY_INPUT_REPLY);
        assert!(turn.intent.is_none());
    }
    assert_eq!(llm.calls(), 0);
    assert_eq!(assistant.get_state().interaction_count, 0);
}

#[tokio::test]
async fn test_follow_up_carries_topic() {
    let knowledge = Arc::new(MockKnowledge::default());
    let assistant = Assistant::builder(settings())
        .registry(CapabilityRegistry::noop().with_knowledge(knowledge.clone()))
        .build()
        .unwrap();

    let first = assistant.handle_turn("weather in London").await;
    assert_eq!(first.intent.unwrap().target, "London");
    assert_eq!(assistant.get_state().current_topic.as_deref(), Some("London"));

    let second = assistant.handle_turn("what about Paris").await;
    let intent = second.intent.unwrap();
    assert_eq!(intent.action, "get_weather");
    assert_eq!(intent.target, "Paris");
    assert_eq!(intent.tier, ClassificationTier::FollowUp);
    assert_eq!(assistant.get_state().current_topic.as_deref(), Some("Paris"));
    assert!(second.reply.contains("Paris: +12°C"));
}

#[tokio::test]
async fn test_malformed_ai_reply_falls_back_to_chat() {
    let llm = MockLlm::new("sorry, I cannot produce { json");
    let assistant = Assistant::builder(settings()).llm(llm.clone()).build().unwrap();

    let turn = assistant.handle_turn("blorp zizzle wug").await;
    let intent = turn.intent.unwrap();

    assert_eq!(intent.intent_type, IntentType::Chat);
    assert_eq!(intent.confidence, 0.3);
    assert_eq!(intent.tier, ClassificationTier::Fallback);
    // One classification attempt, one chat reply
    assert_eq!(llm.calls(), 2);
    assert_eq!(turn.reply, "sorry, I cannot produce { json");
}

#[tokio::test]
async fn test_garbage_never_escapes_the_taxonomy() {
    let llm = MockLlm::new(r#"{"intent_type": "teleport", "confidence": 0.99, "action": "beam", "target": "mars", "parameters": {}, "reasoning": "x"}"#);
    let assistant = Assistant::builder(settings()).llm(llm).build().unwrap();

    for input in ["%%%", "zzz qqq", "\u{1F600}\u{1F600}", "12345", "ا ب ت"] {
        let turn = assistant.handle_turn(input).await;
        let intent = turn.intent.unwrap();
        assert!(IntentType::ALL.contains(&intent.intent_type), "{input}");
        assert!(!turn.reply.is_empty());
    }
}

#[tokio::test]
async fn test_missing_recipient_asks_instead_of_sending() {
    let messenger = Arc::new(MockMessenger::default());
    let assistant = Assistant::builder(settings())
        .registry(CapabilityRegistry::noop().with_messenger(messenger.clone()))
        .build()
        .unwrap();

    let reply = assistant.handle_query("send a whatsapp text message").await;
    assert_eq!(reply, "Who should I send the message to?");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(messenger.sent.lock().is_empty());
}

#[tokio::test]
async fn test_message_is_queued_then_delivered() {
    let messenger = Arc::new(MockMessenger::default());
    let assistant = Assistant::builder(settings())
        .registry(CapabilityRegistry::noop().with_messenger(messenger.clone()))
        .build()
        .unwrap();

    let reply = assistant
        .handle_query("send a whatsapp text message to Ali saying running late")
        .await;
    assert_eq!(reply, "Queued message to Ali via whatsapp.");

    for _ in 0..100 {
        if assistant.queue_stats().delivered() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(assistant.queue_stats().delivered(), 1);
    assert_eq!(assistant.queue_stats().pending(), 0);
    assert_eq!(
        *messenger.sent.lock(),
        vec![("whatsapp".to_string(), "Ali".to_string(), "running late".to_string())]
    );
}

#[tokio::test]
async fn test_plain_message_request_reaches_the_recipient() {
    let messenger = Arc::new(MockMessenger::default());
    let assistant = Assistant::builder(settings())
        .registry(CapabilityRegistry::noop().with_messenger(messenger.clone()))
        .build()
        .unwrap();

    let turn = assistant.handle_turn("send a message to Ali saying I'm late").await;
    let intent = turn.intent.unwrap();
    assert_eq!(intent.tier, ClassificationTier::Fallback);
    assert_eq!(intent.intent_type, IntentType::Messaging);
    assert_eq!(turn.reply, "Queued message to Ali via whatsapp.");

    let reply = assistant.handle_query("message Ali saying running late").await;
    assert_eq!(reply, "Queued message to Ali via whatsapp.");

    for _ in 0..100 {
        if assistant.queue_stats().delivered() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(
        *messenger.sent.lock(),
        vec![
            ("whatsapp".to_string(), "Ali".to_string(), "I'm late".to_string()),
            ("whatsapp".to_string(), "Ali".to_string(), "running late".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_chat_stops_when_budget_is_spent() {
    let mut settings = settings();
    settings.classifier.ai_enabled = false;
    let limiter = Arc::new(RateLimiter::init(RateLimitConfig {
        requests_per_minute: 1,
        requests_per_day: 10,
    }));
    let inner = MockLlm::new("Hello from the model");
    let llm = Arc::new(RateLimitedModel::new(inner.clone(), limiter.clone()));
    let assistant = Assistant::builder(settings)
        .llm(llm)
        .rate_limiter(limiter)
        .build()
        .unwrap();

    assert_eq!(assistant.handle_query("blorp zizzle wug").await, "Hello from the model");
    assert_eq!(assistant.handle_query("blorp zizzle wug").await, RATE_LIMIT_REPLY);
    assert_eq!(inner.calls(), 1);

    let usage = assistant.rate_limit_usage().unwrap();
    assert_eq!(usage.minute, 1);
    assert_eq!(usage.minute_limit, 1);
}

#[tokio::test]
async fn test_chat_without_backend_is_reported() {
    let assistant = Assistant::builder(settings()).build().unwrap();
    let reply = assistant.handle_query("blorp zizzle wug").await;
    assert!(reply.starts_with("Sorry, I can't chat right now"), "{reply}");
}

#[tokio::test(start_paused = true)]
async fn test_stalled_capability_times_out() {
    let assistant = Assistant::builder(settings())
        .registry(CapabilityRegistry::noop().with_knowledge(Arc::new(StalledKnowledge)))
        .build()
        .unwrap();

    let reply = assistant.handle_query("weather in London").await;
    assert_eq!(
        reply,
        "That took too long. Please check your internet connection and try again."
    );
}

#[tokio::test(start_paused = true)]
async fn test_unexpected_failure_is_retried_then_reported() {
    let knowledge = Arc::new(PanickingKnowledge::default());
    let assistant = Assistant::builder(settings())
        .registry(CapabilityRegistry::noop().with_knowledge(knowledge.clone()))
        .build()
        .unwrap();

    let reply = assistant.safe_handle_query("weather in London").await;
    assert_eq!(reply, GENERIC_ERROR_REPLY);
    // First attempt plus two retries
    assert_eq!(knowledge.calls.load(Ordering::SeqCst), 3);

    let reply = assistant.handle_query("").await;
    assert_eq!(reply, EMPTY_INPUT_REPLY);
}

#[tokio::test]
async fn test_language_switch_and_preferences() {
    let assistant = Assistant::builder(settings()).build().unwrap();
    assert_eq!(assistant.current_language(), Language::English);

    assert!(assistant.set_language("ps"));
    assert_eq!(assistant.current_language(), Language::Pashto);
    assert!(!assistant.set_language("fr"));
    assert_eq!(assistant.current_language(), Language::Pashto);

    assistant.set_preference("units", "metric");
    assert_eq!(
        assistant.get_state().preferences.get("units").map(String::as_str),
        Some("metric")
    );
}

#[tokio::test]
async fn test_context_keeps_last_actions() {
    let assistant = Assistant::builder(settings()).build().unwrap();
    for city in ["London", "Paris", "Tokyo", "Berlin", "Rome", "Madrid", "Cairo"] {
        assistant.handle_query(&format!("weather in {}", city)).await;
    }
    let state = assistant.get_state();
    assert_eq!(state.interaction_count, 7);
    assert_eq!(
        state.recent_actions,
        vec!["get_weather->Rome", "get_weather->Madrid", "get_weather->Cairo"]
    );
}

#[derive(Default)]
struct ScriptedSpeech {
    heard: Mutex<VecDeque<Option<(String, Language)>>>,
    spoken: Mutex<Vec<(String, Language)>>,
}

#[async_trait]
impl SpeechIo for ScriptedSpeech {
    async fn listen(&self) -> Option<(String, Language)> {
        let next = self.heard.lock().pop_front();
        match next {
            Some(heard) => heard,
            None => std::future::pending().await,
        }
    }

    async fn speak(&self, text: &str, language: Language) -> bool {
        self.spoken.lock().push((text.to_string(), language));
        true
    }
}

#[tokio::test]
async fn test_voice_loop_skips_silence_and_speaks_replies() {
    let knowledge = Arc::new(MockKnowledge::default());
    let assistant = Assistant::builder(settings())
        .registry(CapabilityRegistry::noop().with_knowledge(knowledge))
        .build()
        .unwrap();

    let speech = ScriptedSpeech::default();
    speech.heard.lock().extend([
        None,
        Some(("weather in London".to_string(), Language::English)),
        None,
    ]);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let stop = async {
        for _ in 0..200 {
            if !speech.spoken.lock().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let _ = shutdown_tx.send(true);
    };
    tokio::join!(assistant.run_voice_loop(&speech, shutdown_rx), stop);

    let spoken = speech.spoken.lock();
    assert_eq!(spoken.len(), 1);
    assert!(spoken[0].0.contains("London: +12°C"));
    assert_eq!(spoken[0].1, Language::English);
}

/// Hears one utterance after a long pause, then nothing
#[derive(Default)]
struct SlowSpeech {
    listens: AtomicUsize,
    spoken: Mutex<Vec<(String, Language)>>,
}

#[async_trait]
impl SpeechIo for SlowSpeech {
    async fn listen(&self) -> Option<(String, Language)> {
        if self.listens.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_secs(120)).await;
            Some(("what time is it".to_string(), Language::English))
        } else {
            std::future::pending().await
        }
    }

    async fn speak(&self, text: &str, language: Language) -> bool {
        self.spoken.lock().push((text.to_string(), language));
        true
    }
}

#[tokio::test(start_paused = true)]
async fn test_announcement_does_not_drop_utterance() {
    let registry = CapabilityRegistry::from_settings(&CapabilitiesConfig::default(), Duration::from_secs(1)).unwrap();
    let assistant = Assistant::builder(settings()).registry(registry).build().unwrap();
    assistant.handle_query("set a timer for 1 minute").await;

    let speech = SlowSpeech::default();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let stop = async {
        for _ in 0..300 {
            if speech.spoken.lock().len() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        let _ = shutdown_tx.send(true);
    };
    tokio::join!(assistant.run_voice_loop(&speech, shutdown_rx), stop);

    let spoken = speech.spoken.lock();
    assert_eq!(spoken.len(), 2);
    assert_eq!(spoken[0].0, "Your timer is done.");
    assert!(!spoken[1].0.is_empty());
    // The utterance heard after the announcement was still answered
    assert_eq!(assistant.get_state().interaction_count, 2);
    assert_eq!(speech.listens.load(Ordering::SeqCst), 2);
}
