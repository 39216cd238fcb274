//! Contextual prompt assembly
//!
//! Composes the final prompt string sent to the model service from a fixed
//! persona preamble, an intent-selected tone instruction, the topics the
//! user mentioned recently, and the current input. Assembly is infallible:
//! classification and extraction are total, and storage trouble degrades to
//! a prompt without a context line.

use crate::classifier::{classify, QueryIntent};
use crate::context::ContextExtractor;
use std::num::NonZeroUsize;
use tracing::debug;

pub mod cache;
pub use cache::PromptCache;

/// Default prompt cache capacity
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Fixed persona and style preamble, first line of every prompt
const PERSONA_PREAMBLE: &str = "You are an insightful and fast AI assistant. \
    Always prioritize clarity, brevity, and natural conversation.\n";

/// Tone instruction appended after the preamble, selected by intent
fn instruction_line(intent: QueryIntent) -> &'static str {
    match intent {
        QueryIntent::Definition => {
            "Define the term clearly. Use plain English, like you're teaching someone casually.\n"
        }
        QueryIntent::HowTo => {
            "Explain steps logically in bullet points. Use helpful examples if possible.\n"
        }
        QueryIntent::Summary => {
            "Summarize the key points simply, like you're recapping a meeting for a friend.\n"
        }
        QueryIntent::Reasoning => {
            "Give the main reason clearly. Contrast if needed, but stay concise.\n"
        }
        QueryIntent::General => {
            "Answer naturally. Be conversational, but avoid fluff. Contrast ideas where useful.\n"
        }
    }
}

/// Assembles contextual prompts behind a content-addressed cache
///
/// Owns its [`PromptCache`] instance; construct separate builders to get
/// isolated caches in tests.
pub struct PromptBuilder {
    extractor: ContextExtractor,
    cache: PromptCache,
}

impl PromptBuilder {
    /// Create a builder with the given extractor and cache capacity
    pub fn new(extractor: ContextExtractor, cache_capacity: NonZeroUsize) -> Self {
        Self {
            extractor,
            cache: PromptCache::new(cache_capacity),
        }
    }

    /// Build the full prompt for the current input
    ///
    /// The cache key is derived from the normalized input text only, so a
    /// repeated input returns the previously assembled prompt regardless of
    /// session or elapsed time; see [`cache`] for the contract.
    pub fn build_prompt(&self, session_id: &str, current_text: &str) -> String {
        let key = PromptCache::key(current_text);
        if let Some(hit) = self.cache.get(&key) {
            debug!("Prompt cache hit for session {}", session_id);
            return hit;
        }

        let intent = classify(current_text);
        let topics = self.extractor.extract_topics(session_id);
        debug!(
            "Assembling prompt: intent={}, {} topic(s)",
            intent,
            topics.len()
        );

        let mut prompt = String::from(PERSONA_PREAMBLE);
        prompt.push_str(instruction_line(intent));
        if !topics.is_empty() {
            prompt.push_str(&format!("Earlier, we discussed: {}.\n", topics.join(", ")));
        }
        prompt.push_str(&format!("User: {}\nAssistant:", current_text.trim()));

        self.cache.insert(key, prompt.clone());
        prompt
    }
}
