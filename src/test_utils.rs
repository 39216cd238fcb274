//! Test utilities for Parley
//!
//! Deterministic stand-ins for the external collaborators (entity tagger,
//! chat-completion model service) used across unit tests.

use crate::context::{EntityCategory, EntityTagger, TaggedSpan};
use crate::engine::{ChatModel, ModelMessage};
use crate::error::Result;
use async_trait::async_trait;

/// Tagger stub: labels every capitalized word as an organization
///
/// Crude but deterministic; good enough to drive extraction and dedup logic
/// without a real NER model.
pub struct UppercaseWordTagger;

impl EntityTagger for UppercaseWordTagger {
    fn tag(&self, text: &str) -> Vec<TaggedSpan> {
        text.split_whitespace()
            .filter(|word| word.chars().next().is_some_and(|c| c.is_ascii_uppercase()))
            .map(|word| {
                TaggedSpan::new(
                    word.trim_matches(|c: char| !c.is_alphanumeric()),
                    EntityCategory::Organization,
                )
            })
            .filter(|span| !span.text.is_empty())
            .collect()
    }
}

/// Tagger stub that never finds anything
pub struct SilentTagger;

impl EntityTagger for SilentTagger {
    fn tag(&self, _text: &str) -> Vec<TaggedSpan> {
        Vec::new()
    }
}

/// Model stub that always answers with a fixed reply
pub struct ScriptedModel {
    reply: String,
}

impl ScriptedModel {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, _messages: &[ModelMessage]) -> Result<String> {
        Ok(self.reply.clone())
    }
}

/// Model stub that always fails, for exercising the error-as-content path
pub struct UnreachableModel;

#[async_trait]
impl ChatModel for UnreachableModel {
    async fn complete(&self, _messages: &[ModelMessage]) -> Result<String> {
        Err(anyhow::anyhow!("connection refused"))
    }
}

/// Model stub that echoes back the prompt it was sent
///
/// Lets tests assert on exactly what reached the model boundary.
pub struct PromptEchoModel;

#[async_trait]
impl ChatModel for PromptEchoModel {
    async fn complete(&self, messages: &[ModelMessage]) -> Result<String> {
        Ok(messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default())
    }
}
