//! Conversational context extraction
//!
//! Surfaces the named entities a user mentioned recently so the prompt
//! builder can carry topics forward. The scan is bounded by a lookback over
//! user turns rather than by how many topics it finds, which keeps old
//! subjects from bleeding into new ones.

use crate::storage::{Role, SessionStore};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

pub mod tagger;
pub use tagger::{EntityCategory, EntityTagger, TaggedSpan};

/// Default number of user turns examined per extraction
pub const DEFAULT_LOOKBACK: usize = 5;

/// Extracts recent topics from a session's user turns
///
/// The entity tagger is injected at construction; pass a stub in tests.
pub struct ContextExtractor {
    store: Arc<SessionStore>,
    tagger: Arc<dyn EntityTagger>,
    lookback: usize,
}

impl ContextExtractor {
    /// Create an extractor over `store` using the given tagger capability
    ///
    /// `lookback` is the maximum number of user turns examined per call;
    /// values below 1 are clamped to 1.
    pub fn new(store: Arc<SessionStore>, tagger: Arc<dyn EntityTagger>, lookback: usize) -> Self {
        Self {
            store,
            tagger,
            lookback: lookback.max(1),
        }
    }

    /// Collect distinct place/organization/person topics from recent user turns
    ///
    /// Scans the session newest-first, examines at most `lookback` user
    /// turns, and deduplicates by first-seen order, so the most recent
    /// turn's entities lead the result. Returns an empty vector when the
    /// session has no user turns or none yield tagged entities.
    pub fn extract_topics(&self, session_id: &str) -> Vec<String> {
        let turns = self.store.list(session_id);

        let mut topics = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut examined = 0;

        for turn in turns.iter().rev() {
            if turn.role != Role::User {
                continue;
            }

            for span in self.tagger.tag(&turn.content) {
                let relevant = matches!(
                    span.category,
                    EntityCategory::Place | EntityCategory::Organization | EntityCategory::Person
                );
                if relevant && seen.insert(span.text.clone()) {
                    topics.push(span.text);
                }
            }

            examined += 1;
            if examined >= self.lookback {
                break;
            }
        }

        debug!(
            "Extracted {} topic(s) from {} user turn(s) in session {}",
            topics.len(),
            examined,
            session_id
        );

        topics
    }
}
