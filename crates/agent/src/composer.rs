//! Response Composer
//!
//! Turns a dispatch outcome into user-facing text. Templates are keyed by
//! (template kind, language code) and carry high/medium/low urgency
//! variants. A language without a template falls back to English.

use std::collections::HashMap;

use shadow_core::{IntentType, Language, Urgency};

use crate::dispatcher::DispatchOutcome;

/// Language every template must exist in
pub const FALLBACK_LANGUAGE: &str = "en";

/// Handler family an intent belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionCategory {
    Messaging,
    Scheduling,
    Knowledge,
    Automation,
    Files,
    Chat,
}

impl ActionCategory {
    pub const ALL: [ActionCategory; 6] = [
        Self::Messaging,
        Self::Scheduling,
        Self::Knowledge,
        Self::Automation,
        Self::Files,
        Self::Chat,
    ];

    pub fn of(intent_type: IntentType) -> Self {
        match intent_type {
            IntentType::Messaging => Self::Messaging,
            IntentType::Scheduling => Self::Scheduling,
            IntentType::Knowledge => Self::Knowledge,
            IntentType::Automation | IntentType::System | IntentType::Web => Self::Automation,
            IntentType::FileOps => Self::Files,
            IntentType::Chat | IntentType::Unknown => Self::Chat,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Messaging => "messaging",
            Self::Scheduling => "scheduling",
            Self::Knowledge => "knowledge",
            Self::Automation => "automation",
            Self::Files => "files",
            Self::Chat => "chat",
        }
    }
}

/// Clarifying questions asked instead of calling a capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Question {
    Recipient,
    MessageBody,
    ReminderSubject,
    ReminderTime,
    TimerDuration,
    AlarmTime,
    ReminderId,
    StockSymbol,
    SearchQuery,
    Application,
    Website,
    FilePath,
}

impl Question {
    pub const ALL: [Question; 12] = [
        Self::Recipient,
        Self::MessageBody,
        Self::ReminderSubject,
        Self::ReminderTime,
        Self::TimerDuration,
        Self::AlarmTime,
        Self::ReminderId,
        Self::StockSymbol,
        Self::SearchQuery,
        Self::Application,
        Self::Website,
        Self::FilePath,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKey {
    Success(ActionCategory),
    Failure(ActionCategory),
    Queued,
    Timeout,
    RateLimited,
    Ask(Question),
}

impl TemplateKey {
    /// Every key the composer can be asked for
    pub fn all() -> Vec<TemplateKey> {
        let mut keys = vec![Self::Queued, Self::Timeout, Self::RateLimited];
        for category in ActionCategory::ALL {
            keys.push(Self::Success(category));
            keys.push(Self::Failure(category));
        }
        keys.extend(Question::ALL.into_iter().map(Self::Ask));
        keys
    }
}

/// Phrasings per urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variants {
    pub high: &'static str,
    pub medium: &'static str,
    pub low: &'static str,
}

impl Variants {
    const fn new(high: &'static str, medium: &'static str, low: &'static str) -> Self {
        Self { high, medium, low }
    }

    const fn same(text: &'static str) -> Self {
        Self::new(text, text, text)
    }

    pub fn pick(&self, urgency: Urgency) -> &'static str {
        match urgency {
            Urgency::High => self.high,
            Urgency::Medium => self.medium,
            Urgency::Low => self.low,
        }
    }
}

type Table = &'static [(TemplateKey, Variants)];

use ActionCategory as C;
use TemplateKey as K;

const ENGLISH: Table = &[
    (K::Success(C::Messaging), Variants::new("Sent. {message}", "Done, {message}", "All done! {message}")),
    (K::Success(C::Scheduling), Variants::new("{message}", "Done. {message}", "All set! {message}")),
    (K::Success(C::Knowledge), Variants::new("{message}", "{message}", "Here's what I found: {message}")),
    (K::Success(C::Automation), Variants::new("{message}", "Done. {message}", "Sure thing. {message}")),
    (K::Success(C::Files), Variants::new("{message}", "{message}", "Here you go:\n{message}")),
    (K::Success(C::Chat), Variants::same("{message}")),
    (
        K::Failure(C::Messaging),
        Variants::new("Message failed: {error}", "Sorry, I couldn't send the message: {error}", "Sorry, I couldn't send the message: {error}"),
    ),
    (
        K::Failure(C::Scheduling),
        Variants::new("Scheduling failed: {error}", "Sorry, I couldn't set that up: {error}", "Sorry, I couldn't set that up: {error}"),
    ),
    (
        K::Failure(C::Knowledge),
        Variants::new("Lookup failed: {error}", "Sorry, I couldn't find that: {error}", "Sorry, I couldn't find that: {error}"),
    ),
    (
        K::Failure(C::Automation),
        Variants::new("Failed: {error}", "Sorry, I couldn't do that: {error}", "Sorry, I couldn't do that: {error}"),
    ),
    (
        K::Failure(C::Files),
        Variants::new("File error: {error}", "Sorry, I couldn't access that file: {error}", "Sorry, I couldn't access that file: {error}"),
    ),
    (K::Failure(C::Chat), Variants::same("Sorry, I can't chat right now: {error}")),
    (K::Queued, Variants::same("Queued message to {contact} via {platform}.")),
    (K::Timeout, Variants::same("That took too long. Please check your internet connection and try again.")),
    (K::RateLimited, Variants::same("I've reached my free API limit for now. Please try again in a minute.")),
    (K::Ask(Question::Recipient), Variants::same("Who should I send the message to?")),
    (K::Ask(Question::MessageBody), Variants::same("What should the message say?")),
    (K::Ask(Question::ReminderSubject), Variants::same("What should I remind you about?")),
    (K::Ask(Question::ReminderTime), Variants::same("When should I remind you?")),
    (K::Ask(Question::TimerDuration), Variants::same("How long should the timer run?")),
    (K::Ask(Question::AlarmTime), Variants::same("What time should the alarm go off?")),
    (K::Ask(Question::ReminderId), Variants::same("Which reminder number should I cancel?")),
    (K::Ask(Question::StockSymbol), Variants::same("Which stock symbol should I look up?")),
    (K::Ask(Question::SearchQuery), Variants::same("What should I search for?")),
    (K::Ask(Question::Application), Variants::same("Which application should I open?")),
    (K::Ask(Question::Website), Variants::same("Which website should I open?")),
    (K::Ask(Question::FilePath), Variants::same("Which file do you mean?")),
];

const URDU: Table = &[
    (K::Success(C::Messaging), Variants::new("بھیج دیا۔ {message}", "ہو گیا، {message}", "سب ہو گیا! {message}")),
    (K::Success(C::Scheduling), Variants::new("{message}", "ہو گیا۔ {message}", "سب تیار ہے! {message}")),
    (K::Success(C::Knowledge), Variants::new("{message}", "{message}", "یہ معلومات ملی ہیں: {message}")),
    (K::Success(C::Automation), Variants::new("{message}", "ہو گیا۔ {message}", "جی ضرور۔ {message}")),
    (K::Success(C::Files), Variants::new("{message}", "{message}", "یہ رہا:\n{message}")),
    (K::Success(C::Chat), Variants::same("{message}")),
    (
        K::Failure(C::Messaging),
        Variants::new("پیغام نہیں گیا: {error}", "معذرت، پیغام نہیں بھیج سکا: {error}", "معذرت، پیغام نہیں بھیج سکا: {error}"),
    ),
    (
        K::Failure(C::Scheduling),
        Variants::new("شیڈول نہیں ہوا: {error}", "معذرت، یہ سیٹ نہیں کر سکا: {error}", "معذرت، یہ سیٹ نہیں کر سکا: {error}"),
    ),
    (
        K::Failure(C::Knowledge),
        Variants::new("معلومات نہیں ملیں: {error}", "معذرت، یہ معلوم نہیں کر سکا: {error}", "معذرت، یہ معلوم نہیں کر سکا: {error}"),
    ),
    (
        K::Failure(C::Automation),
        Variants::new("ناکام: {error}", "معذرت، یہ نہیں کر سکا: {error}", "معذرت، یہ نہیں کر سکا: {error}"),
    ),
    (
        K::Failure(C::Files),
        Variants::new("فائل کی خرابی: {error}", "معذرت، فائل تک رسائی نہیں ہو سکی: {error}", "معذرت، فائل تک رسائی نہیں ہو سکی: {error}"),
    ),
    (K::Failure(C::Chat), Variants::same("معذرت، ابھی بات نہیں ہو سکتی: {error}")),
    (K::Queued, Variants::same("{contact} کے لیے {platform} پر پیغام قطار میں ڈال دیا گیا۔")),
    (K::Timeout, Variants::same("جواب میں بہت دیر ہو گئی۔ براہ کرم اپنا انٹرنیٹ کنکشن چیک کریں اور دوبارہ کوشش کریں۔")),
    (K::RateLimited, Variants::same("میری مفت API کی حد ابھی پوری ہو گئی ہے۔ براہ کرم ایک منٹ بعد دوبارہ کوشش کریں۔")),
    (K::Ask(Question::Recipient), Variants::same("پیغام کس کو بھیجوں؟")),
    (K::Ask(Question::MessageBody), Variants::same("پیغام میں کیا لکھوں؟")),
    (K::Ask(Question::ReminderSubject), Variants::same("آپ کو کس بارے میں یاد دلاؤں؟")),
    (K::Ask(Question::ReminderTime), Variants::same("کب یاد دلاؤں؟")),
    (K::Ask(Question::TimerDuration), Variants::same("ٹائمر کتنی دیر کا لگاؤں؟")),
    (K::Ask(Question::AlarmTime), Variants::same("الارم کس وقت کا لگاؤں؟")),
    (K::Ask(Question::ReminderId), Variants::same("کون سا ریمائنڈر نمبر منسوخ کروں؟")),
    (K::Ask(Question::StockSymbol), Variants::same("کون سا اسٹاک سمبل دیکھوں؟")),
    (K::Ask(Question::SearchQuery), Variants::same("کیا تلاش کروں؟")),
    (K::Ask(Question::Application), Variants::same("کون سی ایپ کھولوں؟")),
    (K::Ask(Question::Website), Variants::same("کون سی ویب سائٹ کھولوں؟")),
    (K::Ask(Question::FilePath), Variants::same("آپ کون سی فائل کی بات کر رہے ہیں؟")),
];

const PASHTO: Table = &[
    (K::Success(C::Messaging), Variants::new("ولېږل شو. {message}", "وشو، {message}", "ټول وشول! {message}")),
    (K::Success(C::Scheduling), Variants::new("{message}", "وشو. {message}", "ټول چمتو دي! {message}")),
    (K::Success(C::Knowledge), Variants::new("{message}", "{message}", "دا مې وموندل: {message}")),
    (K::Success(C::Automation), Variants::new("{message}", "وشو. {message}", "هو، حتماً. {message}")),
    (K::Success(C::Files), Variants::new("{message}", "{message}", "دلته دی:\n{message}")),
    (K::Success(C::Chat), Variants::same("{message}")),
    (
        K::Failure(C::Messaging),
        Variants::new("پیغام ونه لېږل شو: {error}", "بښنه غواړم، پیغام مې ونه شو لېږلی: {error}", "بښنه غواړم، پیغام مې ونه شو لېږلی: {error}"),
    ),
    (
        K::Failure(C::Scheduling),
        Variants::new("مهالوېش ونه شو: {error}", "بښنه غواړم، دا مې ونه شو ټاکلی: {error}", "بښنه غواړم، دا مې ونه شو ټاکلی: {error}"),
    ),
    (
        K::Failure(C::Knowledge),
        Variants::new("معلومات ونه موندل شول: {error}", "بښنه غواړم، دا مې ونه شو موندلی: {error}", "بښنه غواړم، دا مې ونه شو موندلی: {error}"),
    ),
    (
        K::Failure(C::Automation),
        Variants::new("ناکام: {error}", "بښنه غواړم، دا مې ونه شو کړای: {error}", "بښنه غواړم، دا مې ونه شو کړای: {error}"),
    ),
    (
        K::Failure(C::Files),
        Variants::new("د فایل ستونزه: {error}", "بښنه غواړم، فایل ته لاسرسی ونه شو: {error}", "بښنه غواړم، فایل ته لاسرسی ونه شو: {error}"),
    ),
    (K::Failure(C::Chat), Variants::same("بښنه غواړم، اوس خبرې نه شم کولی: {error}")),
    (K::Queued, Variants::same("{contact} ته د {platform} له لارې پیغام په کتار کې کېښودل شو.")),
    (K::Timeout, Variants::same("ځواب ډېر وځنډېد. مهرباني وکړئ خپل انټرنېټ وګورئ او بیا هڅه وکړئ.")),
    (K::RateLimited, Variants::same("زما وړیا API حد اوس بشپړ شوی. مهرباني وکړئ یوه دقیقه وروسته بیا هڅه وکړئ.")),
    (K::Ask(Question::Recipient), Variants::same("پیغام چا ته ولېږم؟")),
    (K::Ask(Question::MessageBody), Variants::same("په پیغام کې څه ولیکم؟")),
    (K::Ask(Question::ReminderSubject), Variants::same("د څه په اړه درته یادونه وکړم؟")),
    (K::Ask(Question::ReminderTime), Variants::same("کله درته یادونه وکړم؟")),
    (K::Ask(Question::TimerDuration), Variants::same("ټایمر د څومره وخت لپاره وټاکم؟")),
    (K::Ask(Question::AlarmTime), Variants::same("الارم د څو بجو لپاره وټاکم؟")),
    (K::Ask(Question::ReminderId), Variants::same("کومه یادونه لغوه کړم؟ شمېره یې ووایاست.")),
    (K::Ask(Question::StockSymbol), Variants::same("کوم سټاک سمبول وګورم؟")),
    (K::Ask(Question::SearchQuery), Variants::same("څه ولټوم؟")),
    (K::Ask(Question::Application), Variants::same("کوم اپلیکیشن خلاص کړم؟")),
    (K::Ask(Question::Website), Variants::same("کومه ویب پاڼه خلاصه کړم؟")),
    (K::Ask(Question::FilePath), Variants::same("کوم فایل مو په ذهن کې دی؟")),
];

/// Template-driven reply builder
#[derive(Debug, Clone)]
pub struct ResponseComposer {
    templates: HashMap<(TemplateKey, &'static str), Variants>,
}

impl ResponseComposer {
    pub fn new() -> Self {
        let mut templates = HashMap::new();
        for (language, table) in [(Language::English, ENGLISH), (Language::Urdu, URDU), (Language::Pashto, PASHTO)] {
            let code = language.code();
            for (key, variants) in table {
                templates.insert((*key, code), *variants);
            }
        }
        Self { templates }
    }

    /// Template for `key` in `language`, else in English
    pub fn template(&self, key: TemplateKey, language: &str, urgency: Urgency) -> &'static str {
        let code = Language::from_str_loose(language)
            .map(|l| l.code())
            .unwrap_or(FALLBACK_LANGUAGE);
        self.templates
            .get(&(key, code))
            .or_else(|| self.templates.get(&(key, FALLBACK_LANGUAGE)))
            .map(|v| v.pick(urgency))
            .unwrap_or("{message}")
    }

    /// Whether `language` has its own template for `key`
    pub fn has_template(&self, key: TemplateKey, language: &'static str) -> bool {
        self.templates.contains_key(&(key, language))
    }

    /// Render `outcome` for a user speaking `language`
    pub fn compose(&self, outcome: &DispatchOutcome, urgency: Urgency, language: &str) -> String {
        let render = |key: TemplateKey, message: &str, error: &str| {
            self.template(key, language, urgency)
                .replace("{message}", message.trim())
                .replace("{error}", error.trim())
                .trim()
                .to_string()
        };

        match outcome {
            DispatchOutcome::Chat(text) => text.trim().to_string(),
            DispatchOutcome::Completed { category, result } => {
                render(TemplateKey::Success(*category), &result.message, "")
            }
            DispatchOutcome::Failed { category, error } => render(TemplateKey::Failure(*category), "", error),
            DispatchOutcome::Queued { contact, platform } => self
                .template(TemplateKey::Queued, language, urgency)
                .replace("{contact}", contact)
                .replace("{platform}", platform),
            DispatchOutcome::Clarify(question) => render(TemplateKey::Ask(*question), "", ""),
            DispatchOutcome::TimedOut => render(TemplateKey::Timeout, "", ""),
            DispatchOutcome::RateLimited => render(TemplateKey::RateLimited, "", ""),
        }
    }
}

impl Default for ResponseComposer {
    fn default() -> Self {
        Self::new()
    }
}
