//! Speech I/O trait

use async_trait::async_trait;

use crate::Language;

/// Speech input and output
///
/// Engines are external; the voice loop only needs these two calls. A failed
/// recognition yields `None` and is treated as "no input", never as an error.
#[async_trait]
pub trait SpeechIo: Send + Sync + 'static {
    /// Listen for one utterance, returning the text and its detected language
    async fn listen(&self) -> Option<(String, Language)>;

    /// Speak `text` in `language`; `false` when synthesis or playback failed
    async fn speak(&self, text: &str, language: Language) -> bool;
}
