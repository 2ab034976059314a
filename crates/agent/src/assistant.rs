//! The assistant turn handler
//!
//! One turn runs detect, normalize, classify, update context, dispatch and
//! compose in sequence. Every external call is a suspension point, so
//! concurrent turns from different channels interleave without blocking
//! each other. The context store serializes its own updates.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{mpsc, watch};

use shadow_config::Settings;
use shadow_core::{Intent, Language, LanguageModel, Mood, SpeechIo, Urgency};
use shadow_llm::{LlmFactory, RateLimitUsage, RateLimiter};
use shadow_text_processing::{LanguageDetector, TextNormalizer};
use shadow_tools::{CapabilityRegistry, Notification};

use crate::classifier::IntentClassifier;
use crate::composer::ResponseComposer;
use crate::context::{ContextStore, ConversationState};
use crate::dispatcher::Dispatcher;
use crate::queue::{MessageQueue, QueueStats};
use crate::AgentError;

/// Reply to empty input
pub const EMPTY_INPUT_REPLY: &str = "I didn't catch that. Could you please repeat?";

/// Reply when a turn failed unexpectedly
pub const GENERIC_ERROR_REPLY: &str =
    "I encountered an error processing your request. Please try again.";

const TURN_RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Result of one user turn
#[derive(Debug, Clone)]
pub struct Turn {
    pub reply: String,
    /// Language the reply is in
    pub language: Language,
    /// `None` when no classification ran
    pub intent: Option<Intent>,
    /// The turn hit the generic error path
    pub failed: bool,
}

impl Turn {
    fn reply_only(reply: &str, language: Language) -> Self {
        Self {
            reply: reply.to_string(),
            language,
            intent: None,
            failed: false,
        }
    }

    fn failure(language: Language) -> Self {
        Self {
            failed: true,
            ..Self::reply_only(GENERIC_ERROR_REPLY, language)
        }
    }
}

/// Builder for [`Assistant`]
pub struct AssistantBuilder {
    settings: Settings,
    llm: Option<Arc<dyn LanguageModel>>,
    registry: Option<CapabilityRegistry>,
    limiter: Option<Arc<RateLimiter>>,
}

impl AssistantBuilder {
    /// AI backend for Tier 3 and the chat fallback
    pub fn llm(mut self, llm: Arc<dyn LanguageModel>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Capability services; defaults to all no-op
    pub fn registry(mut self, registry: CapabilityRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Budget shared with the AI backend, reported by [`Assistant::rate_limit_usage`]
    pub fn rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Assemble the assistant and start the message queue worker
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Result<Assistant, AgentError> {
        let settings = self.settings;
        settings.validate()?;

        let registry = self.registry.unwrap_or_else(CapabilityRegistry::noop);
        let handler_timeout = Duration::from_secs(settings.dispatch.handler_timeout_secs);
        let (queue, _worker) =
            MessageQueue::spawn(settings.queue.capacity, registry.messenger.clone(), handler_timeout);

        let mut classifier = IntentClassifier::new(settings.classifier.clone());
        let mut dispatcher = Dispatcher::new(
            registry,
            queue,
            settings.dispatch.clone(),
            settings.classifier.min_dispatch_confidence,
        )
        .with_assistant_name(settings.assistant.name.clone());

        if let Some(llm) = self.llm {
            tracing::info!(model = llm.model_name(), "AI backend attached");
            classifier = classifier.with_llm(llm.clone());
            dispatcher = dispatcher.with_llm(llm);
        } else {
            tracing::info!("No AI backend, deterministic tiers only");
        }

        Ok(Assistant {
            detector: LanguageDetector::new(settings.default_language()),
            normalizer: TextNormalizer::new()?,
            classifier,
            context: ContextStore::new(
                settings.classifier.context_window,
                settings.assistant.mood_decay_turns,
            ),
            dispatcher,
            composer: ResponseComposer::new(),
            limiter: self.limiter,
            turn_retries: settings.dispatch.turn_retries,
        })
    }
}

/// The assistant core
pub struct Assistant {
    detector: LanguageDetector,
    normalizer: TextNormalizer,
    classifier: IntentClassifier,
    context: ContextStore,
    dispatcher: Dispatcher,
    composer: ResponseComposer,
    limiter: Option<Arc<RateLimiter>>,
    turn_retries: u32,
}

impl Assistant {
    pub fn builder(settings: Settings) -> AssistantBuilder {
        AssistantBuilder {
            settings,
            llm: None,
            registry: None,
            limiter: None,
        }
    }

    /// Wire everything from settings: rate-limited AI backend and the
    /// configured capability services
    pub fn from_settings(settings: Settings) -> Result<Self, AgentError> {
        let limiter = Arc::new(RateLimiter::init(settings.rate_limit));
        let llm = LlmFactory::create_rate_limited(&settings.llm, limiter.clone())?;
        let registry = CapabilityRegistry::from_settings(
            &settings.capabilities,
            Duration::from_secs(settings.dispatch.handler_timeout_secs),
        )?;

        let mut builder = Self::builder(settings).registry(registry).rate_limiter(limiter);
        if let Some(llm) = llm {
            builder = builder.llm(llm);
        }
        builder.build()
    }

    /// Reply to one user utterance
    pub async fn handle_query(&self, text: &str) -> String {
        self.handle_turn(text).await.reply
    }

    /// Like [`Assistant::handle_query`], keeping the language and intent
    ///
    /// Always returns a reply, even if a stage panics.
    pub async fn handle_turn(&self, text: &str) -> Turn {
        match AssertUnwindSafe(self.run_turn(text)).catch_unwind().await {
            Ok(turn) => turn,
            Err(_) => {
                tracing::error!("Turn aborted unexpectedly");
                Turn::failure(self.detector.current())
            }
        }
    }

    /// [`Assistant::handle_query`] with retries after a generic failure
    pub async fn safe_handle_query(&self, text: &str) -> String {
        self.safe_handle_turn(text).await.reply
    }

    pub async fn safe_handle_turn(&self, text: &str) -> Turn {
        let mut turn = self.handle_turn(text).await;
        let mut retries = 0;
        while turn.failed && retries < self.turn_retries {
            retries += 1;
            tracing::warn!(retry = retries, "Retrying failed turn");
            tokio::time::sleep(TURN_RETRY_PAUSE).await;
            turn = self.handle_turn(text).await;
        }
        turn
    }

    async fn run_turn(&self, text: &str) -> Turn {
        let text = text.trim();
        if text.is_empty() {
            return Turn::reply_only(EMPTY_INPUT_REPLY, self.detector.current());
        }

        let language = self.detector.detect(text);
        let normalized = self.normalizer.normalize(text, language);

        let snapshot = self.context.snapshot();
        let intent = self.classifier.classify(&normalized, language, &snapshot).await;
        self.context.update(text, &intent);

        let state = self.context.get_state();
        let outcome = self.dispatcher.dispatch(&intent, text, &state, language).await;

        let urgency = self.urgency(&intent);
        let reply = self.composer.compose(&outcome, urgency, language.code());
        if reply.is_empty() {
            tracing::error!(outcome = outcome.label(), "Composer produced an empty reply");
            return Turn::failure(language);
        }

        tracing::debug!(
            language = language.code(),
            action = %intent.action,
            outcome = outcome.label(),
            "Turn complete"
        );
        Turn {
            reply,
            language,
            intent: Some(intent),
            failed: false,
        }
    }

    /// Intent urgency, raised to high while the user sounds urgent
    fn urgency(&self, intent: &Intent) -> Urgency {
        if self.context.mood() == Mood::Urgent {
            Urgency::High
        } else {
            intent.urgency()
        }
    }

    /// Switch the active language; unsupported codes are rejected
    pub fn set_language(&self, code: &str) -> bool {
        match Language::from_str_loose(code) {
            Some(language) => {
                self.detector.set_current(language);
                tracing::info!(language = language.code(), "Language switched");
                true
            }
            None => {
                tracing::warn!(code, "Unsupported language");
                false
            }
        }
    }

    pub fn current_language(&self) -> Language {
        self.detector.current()
    }

    pub fn set_preference(&self, key: impl Into<String>, value: impl Into<String>) {
        self.context.set_preference(key, value);
    }

    pub fn get_state(&self) -> ConversationState {
        self.context.get_state()
    }

    /// AI budget used in the current windows, if a limiter is attached
    pub fn rate_limit_usage(&self) -> Option<RateLimitUsage> {
        self.limiter.as_ref().map(|l| l.usage())
    }

    pub fn queue_stats(&self) -> &Arc<QueueStats> {
        self.dispatcher.queue().stats()
    }

    /// Scheduler announcements; `None` after the first call
    pub fn take_notifications(&self) -> Option<mpsc::UnboundedReceiver<Notification>> {
        self.dispatcher.registry().take_notifications()
    }

    /// Listen, answer and speak until `shutdown` turns true
    ///
    /// Silence or failed recognition is skipped. Scheduler announcements are
    /// spoken as they arrive without abandoning the listen in progress.
    pub async fn run_voice_loop(&self, speech: &dyn SpeechIo, mut shutdown: watch::Receiver<bool>) {
        let mut notifications = self.take_notifications();
        let mut listening = speech.listen();
        tracing::info!("Voice loop started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                Some(notification) = next_notification(&mut notifications) => {
                    let text = notification.announcement();
                    if !speech.speak(&text, self.current_language()).await {
                        tracing::warn!("Could not speak notification");
                    }
                }
                heard = &mut listening => {
                    if let Some((text, _)) = heard {
                        let turn = self.safe_handle_turn(&text).await;
                        if !speech.speak(&turn.reply, turn.language).await {
                            tracing::warn!(language = turn.language.code(), "Could not speak reply");
                        }
                    }
                    listening = speech.listen();
                }
            }
        }
        tracing::info!("Voice loop stopped");
    }
}

async fn next_notification(
    rx: &mut Option<mpsc::UnboundedReceiver<Notification>>,
) -> Option<Notification> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
