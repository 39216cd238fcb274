//! Entity tagger capability boundary
//!
//! The natural-language tagger itself is an external collaborator (a
//! heavyweight model loaded once at process start, fatal if unavailable).
//! This module only defines the seam: implementations are injected into the
//! [`ContextExtractor`](super::ContextExtractor) at construction so tests can
//! substitute a stub.

use serde::{Deserialize, Serialize};

/// Category assigned to a tagged span
///
/// The extractor only surfaces places, organizations, and people as topics;
/// anything else a tagger emits is carried as [`EntityCategory::Other`] and
/// filtered out downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityCategory {
    /// Geographic or political location
    Place,
    /// Company, institution, or other org
    Organization,
    /// Named person
    Person,
    /// Any other tagger-specific label
    Other,
}

/// A contiguous span of text the tagger labeled with a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedSpan {
    /// The span text exactly as it appeared in the input
    pub text: String,
    /// The tagger's category for the span
    pub category: EntityCategory,
}

impl TaggedSpan {
    /// Convenience constructor
    pub fn new(text: impl Into<String>, category: EntityCategory) -> Self {
        Self {
            text: text.into(),
            category,
        }
    }
}

/// Black-box named-entity tagging capability: text in, tagged spans out
///
/// Assumed available for the life of the process; tagging is synchronous
/// and infallible from this crate's point of view.
#[cfg_attr(test, mockall::automock)]
pub trait EntityTagger: Send + Sync {
    /// Tag every recognized entity span in `text`
    fn tag(&self, text: &str) -> Vec<TaggedSpan>;
}
