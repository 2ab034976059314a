//! Dispatcher
//!
//! Routes a classified intent to exactly one handler. Handlers check their
//! required parameters first and ask a clarifying question when something
//! is missing. Every capability call runs under a timeout. Low-confidence
//! intents skip the handlers and go straight to chat.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;

use shadow_config::DispatchConfig;
use shadow_core::{
    CapabilityResult, FileAction, Intent, KnowledgeQuery, Language, LanguageModel, Message,
    Parameters, ScheduleKind, ScheduleRequest, When,
};
use shadow_tools::knowledge::{current_date, current_time};
use shadow_tools::CapabilityRegistry;

use crate::classifier::PLACEHOLDER_TARGETS;
use crate::composer::{ActionCategory, Question};
use crate::context::ConversationState;
use crate::queue::{MessageQueue, OutboundMessage};
use crate::timeparse::parse_when;

/// Platform used when the user names none
pub const DEFAULT_PLATFORM: &str = "whatsapp";

/// What a handler did with an intent
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Capability ran and reported success
    Completed {
        category: ActionCategory,
        result: CapabilityResult,
    },
    /// Message handed to the outbound queue
    Queued { contact: String, platform: String },
    /// A required parameter is missing
    Clarify(Question),
    /// Reply from the chat fallback
    Chat(String),
    TimedOut,
    RateLimited,
    Failed {
        category: ActionCategory,
        error: String,
    },
}

impl DispatchOutcome {
    /// Short label for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Queued { .. } => "queued",
            Self::Clarify(_) => "clarify",
            Self::Chat(_) => "chat",
            Self::TimedOut => "timeout",
            Self::RateLimited => "rate_limited",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::TimedOut)
    }
}

/// Routes intents to capabilities or the chat fallback
pub struct Dispatcher {
    registry: CapabilityRegistry,
    queue: MessageQueue,
    llm: Option<Arc<dyn LanguageModel>>,
    config: DispatchConfig,
    min_confidence: f32,
    assistant_name: String,
}

impl Dispatcher {
    pub fn new(
        registry: CapabilityRegistry,
        queue: MessageQueue,
        config: DispatchConfig,
        min_confidence: f32,
    ) -> Self {
        Self {
            registry,
            queue,
            llm: None,
            config,
            min_confidence,
            assistant_name: shadow_config::constants::assistant::NAME.to_string(),
        }
    }

    /// Backend for the chat fallback
    pub fn with_llm(mut self, llm: Arc<dyn LanguageModel>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_assistant_name(mut self, name: impl Into<String>) -> Self {
        self.assistant_name = name.into();
        self
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn queue(&self) -> &MessageQueue {
        &self.queue
    }

    /// Run `intent`; `text` is the user's original utterance
    pub async fn dispatch(
        &self,
        intent: &Intent,
        text: &str,
        state: &ConversationState,
        language: Language,
    ) -> DispatchOutcome {
        let category = if intent.confidence < self.min_confidence {
            tracing::debug!(
                confidence = intent.confidence,
                floor = self.min_confidence,
                "Low confidence, routing to chat"
            );
            ActionCategory::Chat
        } else {
            ActionCategory::of(intent.intent_type)
        };

        let outcome = match category {
            ActionCategory::Messaging => self.messaging(intent),
            ActionCategory::Scheduling => self.scheduling(intent).await,
            ActionCategory::Knowledge => self.knowledge(intent, text, state, language).await,
            ActionCategory::Automation => self.automation(intent).await,
            ActionCategory::Files => self.files(intent, text, state, language).await,
            ActionCategory::Chat => self.chat(text, state, language).await,
        };

        metrics::counter!(
            "shadow_dispatch_total",
            "handler" => category.as_str(),
            "outcome" => outcome.label()
        )
        .increment(1);
        tracing::info!(
            handler = category.as_str(),
            action = %intent.action,
            outcome = outcome.label(),
            "Dispatched"
        );
        outcome
    }

    fn messaging(&self, intent: &Intent) -> DispatchOutcome {
        let Some(contact) = intent
            .param("contact")
            .map(str::to_string)
            .or_else(|| meaningful_target(intent))
        else {
            return DispatchOutcome::Clarify(Question::Recipient);
        };
        let Some(body) = first_param(intent, &["message", "body", "quoted_text"]) else {
            return DispatchOutcome::Clarify(Question::MessageBody);
        };
        let platform = intent
            .param("platform")
            .map(str::to_lowercase)
            .unwrap_or_else(|| DEFAULT_PLATFORM.to_string());

        let message = OutboundMessage {
            platform: platform.clone(),
            contact: contact.clone(),
            body: body.to_string(),
        };
        match self.queue.enqueue(message) {
            Ok(()) => DispatchOutcome::Queued { contact, platform },
            Err(e) => {
                tracing::error!(error = %e, "Could not queue message");
                DispatchOutcome::Failed {
                    category: ActionCategory::Messaging,
                    error: e.to_string(),
                }
            }
        }
    }

    async fn scheduling(&self, intent: &Intent) -> DispatchOutcome {
        let scheduler = &self.registry.scheduler;
        let category = ActionCategory::Scheduling;

        match intent.action.as_str() {
            "list_reminders" | "list_timers" | "list_alarms" => {
                self.call(category, scheduler.list()).await
            }
            "cancel_reminder" | "cancel_timer" | "cancel_alarm" => {
                let id = first_param(intent, &["task_id", "id"])
                    .map(str::to_string)
                    .or_else(|| meaningful_target(intent))
                    .and_then(|raw| raw.trim().trim_start_matches('#').parse::<u64>().ok());
                match id {
                    Some(id) => self.call(category, scheduler.cancel(id)).await,
                    None => DispatchOutcome::Clarify(Question::ReminderId),
                }
            }
            "set_timer" => match requested_time(intent) {
                Some(When::After(duration)) => {
                    self.call(category, scheduler.schedule(ScheduleRequest::timer(duration)))
                        .await
                }
                _ => DispatchOutcome::Clarify(Question::TimerDuration),
            },
            "set_alarm" => match requested_time(intent) {
                Some(when) => {
                    let request = ScheduleRequest {
                        kind: ScheduleKind::Alarm,
                        message: first_param(intent, &["message", "label"])
                            .unwrap_or_default()
                            .to_string(),
                        when,
                    };
                    self.call(category, scheduler.schedule(request)).await
                }
                None => DispatchOutcome::Clarify(Question::AlarmTime),
            },
            _ => {
                let Some(message) = intent
                    .param("message")
                    .map(str::to_string)
                    .or_else(|| meaningful_target(intent))
                else {
                    return DispatchOutcome::Clarify(Question::ReminderSubject);
                };
                let Some(when) = requested_time(intent) else {
                    return DispatchOutcome::Clarify(Question::ReminderTime);
                };
                self.call(category, scheduler.schedule(ScheduleRequest::reminder(message, when)))
                    .await
            }
        }
    }

    async fn knowledge(
        &self,
        intent: &Intent,
        text: &str,
        state: &ConversationState,
        language: Language,
    ) -> DispatchOutcome {
        let category = ActionCategory::Knowledge;
        let query = match intent.action.as_str() {
            "get_time" => {
                return DispatchOutcome::Completed {
                    category,
                    result: CapabilityResult::ok(current_time(Local::now())),
                }
            }
            "get_date" => {
                return DispatchOutcome::Completed {
                    category,
                    result: CapabilityResult::ok(current_date(Local::now())),
                }
            }
            "get_weather" => KnowledgeQuery::Weather {
                location: first_param(intent, &["location", "city"])
                    .map(str::to_string)
                    .or_else(|| meaningful_target(intent))
                    .unwrap_or_else(|| "current location".to_string()),
            },
            "get_stock" | "get_crypto" => {
                let symbol = first_param(intent, &["symbol"])
                    .map(str::to_string)
                    .or_else(|| meaningful_target(intent));
                match symbol {
                    Some(symbol) => KnowledgeQuery::Stock {
                        symbol: symbol.to_uppercase(),
                    },
                    None => return DispatchOutcome::Clarify(Question::StockSymbol),
                }
            }
            "get_news" => KnowledgeQuery::News {
                topic: first_param(intent, &["topic"])
                    .map(str::to_string)
                    .or_else(|| meaningful_target(intent))
                    .unwrap_or_else(|| "latest".to_string()),
            },
            "search_web" | "search" | "web_search" => {
                match first_param(intent, &["query"])
                    .map(str::to_string)
                    .or_else(|| meaningful_target(intent))
                {
                    Some(query) => KnowledgeQuery::Search { query },
                    None => return DispatchOutcome::Clarify(Question::SearchQuery),
                }
            }
            "get_fact" | "get_definition" => {
                match first_param(intent, &["topic"])
                    .map(str::to_string)
                    .or_else(|| meaningful_target(intent))
                {
                    Some(topic) => KnowledgeQuery::Fact { topic },
                    None => return DispatchOutcome::Clarify(Question::SearchQuery),
                }
            }
            other => {
                tracing::debug!(action = other, "No knowledge handler, routing to chat");
                return self.chat(text, state, language).await;
            }
        };
        self.call(category, self.registry.knowledge.lookup(query)).await
    }

    async fn automation(&self, intent: &Intent) -> DispatchOutcome {
        let action = match intent.action.as_str() {
            "search_web" | "search" => "web_search",
            "open_website" | "browse" => "open_url",
            "launch_app" | "open_application" => "open_app",
            other => other,
        };

        let mut params: Parameters = intent.parameters.clone();
        if let Some(target) = meaningful_target(intent) {
            params.entry("target".to_string()).or_insert(target);
        }
        let has = |keys: &[&str]| {
            keys.iter()
                .any(|k| params.get(*k).is_some_and(|v| !v.trim().is_empty()))
        };

        let missing = match action {
            "open_app" if !has(&["app", "target"]) => Some(Question::Application),
            "open_url" if !has(&["url", "target"]) => Some(Question::Website),
            "web_search" if !has(&["query", "target"]) => Some(Question::SearchQuery),
            _ => None,
        };
        if let Some(question) = missing {
            return DispatchOutcome::Clarify(question);
        }

        self.call(
            ActionCategory::Automation,
            self.registry.automation.automate(action, &params),
        )
        .await
    }

    async fn files(
        &self,
        intent: &Intent,
        text: &str,
        state: &ConversationState,
        language: Language,
    ) -> DispatchOutcome {
        let path = first_param(intent, &["path", "file", "folder"])
            .map(str::to_string)
            .or_else(|| meaningful_target(intent));

        let action = match intent.action.as_str() {
            "list_files" | "list_folder" | "open_folder" => FileAction::List {
                dir: path.unwrap_or_else(|| ".".to_string()),
            },
            "read_file" | "open_file" => match path {
                Some(path) => FileAction::Read { path },
                None => return DispatchOutcome::Clarify(Question::FilePath),
            },
            "search_files" | "find_file" | "find_files" => {
                match first_param(intent, &["pattern", "query", "name"])
                    .map(str::to_string)
                    .or_else(|| meaningful_target(intent))
                {
                    Some(pattern) => FileAction::Search { pattern },
                    None => return DispatchOutcome::Clarify(Question::SearchQuery),
                }
            }
            "create_file" | "write_file" => match path {
                Some(path) => FileAction::Create {
                    path,
                    contents: first_param(intent, &["contents", "content", "text"])
                        .unwrap_or_default()
                        .to_string(),
                },
                None => return DispatchOutcome::Clarify(Question::FilePath),
            },
            other => {
                tracing::debug!(action = other, "No file handler, routing to chat");
                return self.chat(text, state, language).await;
            }
        };
        self.call(ActionCategory::Files, self.registry.file_ops.run(action))
            .await
    }

    /// Chat fallback with bounded retries
    ///
    /// A rate-limited backend stops the retries at once. A timed-out call is
    /// abandoned and its result is ignored.
    async fn chat(&self, text: &str, state: &ConversationState, language: Language) -> DispatchOutcome {
        let Some(llm) = &self.llm else {
            return DispatchOutcome::Failed {
                category: ActionCategory::Chat,
                error: "no AI backend is configured".to_string(),
            };
        };

        let messages = [
            Message::system(chat_prompt(&self.assistant_name, state, language)),
            Message::user(text.trim()),
        ];
        let attempts = self.config.chat_retries.max(1);
        let limit = Duration::from_secs(self.config.chat_timeout_secs);
        let backoff = Duration::from_millis(self.config.chat_backoff_ms);

        let mut last = DispatchOutcome::TimedOut;
        for attempt in 1..=attempts {
            last = match tokio::time::timeout(limit, llm.ask(&messages)).await {
                Ok(Ok(reply)) if !reply.trim().is_empty() => {
                    return DispatchOutcome::Chat(reply.trim().to_string());
                }
                Ok(Ok(_)) => DispatchOutcome::Failed {
                    category: ActionCategory::Chat,
                    error: "empty reply".to_string(),
                },
                Ok(Err(e)) if e.is_rate_limited() => {
                    tracing::warn!("Chat fallback rate limited");
                    return DispatchOutcome::RateLimited;
                }
                Ok(Err(e)) if e.is_timeout() => DispatchOutcome::TimedOut,
                Ok(Err(e)) => DispatchOutcome::Failed {
                    category: ActionCategory::Chat,
                    error: e.to_string(),
                },
                Err(_) => DispatchOutcome::TimedOut,
            };

            tracing::warn!(attempt, attempts, outcome = last.label(), "Chat attempt failed");
            if attempt < attempts {
                tokio::time::sleep(backoff).await;
            }
        }
        last
    }

    /// Run one capability call under the handler timeout
    async fn call<F>(&self, category: ActionCategory, call: F) -> DispatchOutcome
    where
        F: Future<Output = shadow_core::Result<CapabilityResult>>,
    {
        let limit = Duration::from_secs(self.config.handler_timeout_secs);
        match tokio::time::timeout(limit, call).await {
            Ok(Ok(result)) if result.success => DispatchOutcome::Completed { category, result },
            Ok(Ok(result)) => {
                tracing::error!(handler = category.as_str(), error = result.error_text(), "Capability failed");
                DispatchOutcome::Failed {
                    category,
                    error: result.error_text().to_string(),
                }
            }
            Ok(Err(e)) if e.is_timeout() => DispatchOutcome::TimedOut,
            Ok(Err(e)) if e.is_rate_limited() => DispatchOutcome::RateLimited,
            Ok(Err(e)) => {
                tracing::error!(handler = category.as_str(), error = %e, "Capability error");
                DispatchOutcome::Failed {
                    category,
                    error: e.to_string(),
                }
            }
            Err(_) => {
                tracing::warn!(handler = category.as_str(), after = ?limit, "Capability timed out");
                DispatchOutcome::TimedOut
            }
        }
    }
}

/// System prompt for the chat fallback
pub fn chat_prompt(name: &str, state: &ConversationState, language: Language) -> String {
    let mut prompt = format!(
        "You are {}, a helpful AI assistant. Current context: {} Be conversational and helpful.",
        name, state
    );
    if language != Language::English {
        prompt.push_str(&format!(" Reply in {}.", language.name()));
    }
    prompt
}

fn first_param<'a>(intent: &'a Intent, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| intent.param(key))
}

/// Target unless it is empty or a fallback placeholder
fn meaningful_target(intent: &Intent) -> Option<String> {
    let target = intent.target.trim();
    if target.is_empty()
        || PLACEHOLDER_TARGETS
            .iter()
            .any(|p| p.eq_ignore_ascii_case(target))
    {
        None
    } else {
        Some(target.to_string())
    }
}

/// Time requested by a scheduling intent, in the shapes the tiers produce
fn requested_time(intent: &Intent) -> Option<When> {
    let seconds = |key: &str, scale: u64| {
        intent
            .param(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .and_then(|v| v.checked_mul(scale))
            .filter(|v| *v > 0)
            .map(|v| When::After(Duration::from_secs(v)))
    };

    seconds("delay_seconds", 1)
        .or_else(|| seconds("relative_minutes", 60))
        .or_else(|| {
            ["at_time", "time", "duration", "time_expression"]
                .iter()
                .filter_map(|key| intent.param(key))
                .find_map(parse_when)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::NaiveTime;
    use shadow_core::{ClassificationTier, Error, IntentType, KnowledgeService, Messenger, Result, Scheduler};

    #[derive(Default)]
    struct CountingScheduler {
        scheduled: parking_lot::Mutex<Vec<ScheduleRequest>>,
        cancelled: AtomicUsize,
    }

    #[async_trait]
    impl Scheduler for CountingScheduler {
        async fn schedule(&self, request: ScheduleRequest) -> Result<CapabilityResult> {
            self.scheduled.lock().push(request);
            Ok(CapabilityResult::ok("scheduled #1"))
        }

        async fn list(&self) -> Result<CapabilityResult> {
            Ok(CapabilityResult::ok("nothing scheduled"))
        }

        async fn cancel(&self, _task_id: u64) -> Result<CapabilityResult> {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
            Ok(CapabilityResult::ok("cancelled"))
        }
    }

    struct SlowKnowledge;

    #[async_trait]
    impl KnowledgeService for SlowKnowledge {
        async fn lookup(&self, _query: KnowledgeQuery) -> Result<CapabilityResult> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(CapabilityResult::ok("late"))
        }
    }

    struct FailingKnowledge;

    #[async_trait]
    impl KnowledgeService for FailingKnowledge {
        async fn lookup(&self, _query: KnowledgeQuery) -> Result<CapabilityResult> {
            Ok(CapabilityResult::failure("service down"))
        }
    }

    struct NullMessenger;

    #[async_trait]
    impl Messenger for NullMessenger {
        async fn send_message(&self, _p: &str, _c: &str, _b: &str) -> Result<CapabilityResult> {
            Ok(CapabilityResult::ok("sent"))
        }
    }

    struct ScriptedLlm {
        calls: AtomicUsize,
        fail_first: usize,
        error: fn() -> Error,
    }

    #[async_trait]
    impl LanguageModel for ScriptedLlm {
        async fn ask(&self, _messages: &[Message]) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err((self.error)())
            } else {
                Ok("Hello there!".to_string())
            }
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn dispatcher(registry: CapabilityRegistry) -> Dispatcher {
        let (queue, _worker) = MessageQueue::spawn(4, Arc::new(NullMessenger), Duration::from_secs(1));
        Dispatcher::new(registry, queue, DispatchConfig::default(), 0.3)
    }

    fn state() -> ConversationState {
        ConversationState {
            current_topic: None,
            mood: Default::default(),
            recent_actions: Vec::new(),
            interaction_count: 0,
            preferences: Default::default(),
        }
    }

    fn intent(intent_type: IntentType, action: &str) -> Intent {
        Intent::new(intent_type, action, ClassificationTier::Pattern).with_confidence(0.9)
    }

    #[tokio::test]
    async fn test_low_confidence_goes_to_chat_only() {
        let scheduler = Arc::new(CountingScheduler::default());
        let llm = Arc::new(ScriptedLlm {
            calls: AtomicUsize::new(0),
            fail_first: 0,
            error: || Error::Llm("unused".into()),
        });
        let d = dispatcher(CapabilityRegistry::noop().with_scheduler(scheduler.clone())).with_llm(llm.clone());

        let low = intent(IntentType::Scheduling, "set_timer")
            .with_param("delay_seconds", "60")
            .with_confidence(0.2);
        let outcome = d.dispatch(&low, "set a timer", &state(), Language::English).await;

        assert_eq!(outcome, DispatchOutcome::Chat("Hello there!".into()));
        assert!(scheduler.scheduled.lock().is_empty());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_recipient_asks() {
        let d = dispatcher(CapabilityRegistry::noop());
        let send = intent(IntentType::Messaging, "send_message").with_target("contact");
        let outcome = d.dispatch(&send, "send a message", &state(), Language::English).await;
        assert_eq!(outcome, DispatchOutcome::Clarify(Question::Recipient));

        let send = intent(IntentType::Messaging, "send_message").with_param("contact", "Ali");
        let outcome = d.dispatch(&send, "message ali", &state(), Language::English).await;
        assert_eq!(outcome, DispatchOutcome::Clarify(Question::MessageBody));
    }

    #[tokio::test]
    async fn test_message_is_queued() {
        let d = dispatcher(CapabilityRegistry::noop());
        let send = intent(IntentType::Messaging, "send_message")
            .with_param("contact", "Ali")
            .with_param("message", "running late");
        let outcome = d.dispatch(&send, "", &state(), Language::English).await;
        assert_eq!(
            outcome,
            DispatchOutcome::Queued {
                contact: "Ali".into(),
                platform: "whatsapp".into()
            }
        );
    }

    #[tokio::test]
    async fn test_scheduling_reads_every_time_shape() {
        let scheduler = Arc::new(CountingScheduler::default());
        let d = dispatcher(CapabilityRegistry::noop().with_scheduler(scheduler.clone()));

        let reminder = intent(IntentType::Scheduling, "set_reminder")
            .with_param("message", "call mom")
            .with_param("relative_minutes", "10");
        assert!(matches!(
            d.dispatch(&reminder, "", &state(), Language::English).await,
            DispatchOutcome::Completed { .. }
        ));

        let alarm = intent(IntentType::Scheduling, "set_alarm").with_param("time", "7:30 am");
        d.dispatch(&alarm, "", &state(), Language::English).await;

        let scheduled = scheduler.scheduled.lock();
        assert_eq!(scheduled[0].when, When::After(Duration::from_secs(600)));
        assert_eq!(scheduled[0].message, "call mom");
        assert_eq!(
            scheduled[1].when,
            When::At(NaiveTime::from_hms_opt(7, 30, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_reminder_without_time_asks() {
        let d = dispatcher(CapabilityRegistry::noop());
        let reminder = intent(IntentType::Scheduling, "set_reminder").with_param("message", "call mom");
        assert_eq!(
            d.dispatch(&reminder, "", &state(), Language::English).await,
            DispatchOutcome::Clarify(Question::ReminderTime)
        );

        let cancel = intent(IntentType::Scheduling, "cancel_reminder").with_target("task");
        assert_eq!(
            d.dispatch(&cancel, "", &state(), Language::English).await,
            DispatchOutcome::Clarify(Question::ReminderId)
        );
    }

    #[tokio::test]
    async fn test_cancel_by_id() {
        let scheduler = Arc::new(CountingScheduler::default());
        let d = dispatcher(CapabilityRegistry::noop().with_scheduler(scheduler.clone()));
        let cancel = intent(IntentType::Scheduling, "cancel_reminder").with_param("task_id", "#3");
        d.dispatch(&cancel, "", &state(), Language::English).await;
        assert_eq!(scheduler.cancelled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_capability_times_out() {
        let d = dispatcher(CapabilityRegistry::noop().with_knowledge(Arc::new(SlowKnowledge)));
        let weather = intent(IntentType::Knowledge, "get_weather").with_target("London");
        let outcome = d.dispatch(&weather, "", &state(), Language::English).await;
        assert_eq!(outcome, DispatchOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_soft_failure_carries_error() {
        let d = dispatcher(CapabilityRegistry::noop().with_knowledge(Arc::new(FailingKnowledge)));
        let weather = intent(IntentType::Knowledge, "get_weather").with_target("London");
        let outcome = d.dispatch(&weather, "", &state(), Language::English).await;
        assert_eq!(
            outcome,
            DispatchOutcome::Failed {
                category: ActionCategory::Knowledge,
                error: "service down".into()
            }
        );
    }

    #[tokio::test]
    async fn test_local_time_needs_no_service() {
        let d = dispatcher(CapabilityRegistry::noop());
        let time = intent(IntentType::Knowledge, "get_time");
        assert!(matches!(
            d.dispatch(&time, "", &state(), Language::English).await,
            DispatchOutcome::Completed { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_chat_retries_then_succeeds() {
        let llm = Arc::new(ScriptedLlm {
            calls: AtomicUsize::new(0),
            fail_first: 1,
            error: || Error::Llm("connection reset".into()),
        });
        let d = dispatcher(CapabilityRegistry::noop()).with_llm(llm.clone());
        let chat = intent(IntentType::Chat, "respond");
        let outcome = d.dispatch(&chat, "hi", &state(), Language::English).await;
        assert_eq!(outcome, DispatchOutcome::Chat("Hello there!".into()));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_stops_retries() {
        let llm = Arc::new(ScriptedLlm {
            calls: AtomicUsize::new(0),
            fail_first: 10,
            error: || Error::RateLimited("minute budget".into()),
        });
        let d = dispatcher(CapabilityRegistry::noop()).with_llm(llm.clone());
        let chat = intent(IntentType::Chat, "respond");
        let outcome = d.dispatch(&chat, "hi", &state(), Language::English).await;
        assert_eq!(outcome, DispatchOutcome::RateLimited);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_chat_prompt() {
        let prompt = chat_prompt("Shadow", &state(), Language::Urdu);
        assert!(prompt.starts_with("You are Shadow, a helpful AI assistant. Current context: topic: none"));
        assert!(prompt.ends_with("Reply in Urdu."));
    }
}
