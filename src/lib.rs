//! Parley - context-aware prompt assembly and session history
//!
//! This library turns raw user input and prior session history into a
//! contextual prompt for a chat-completion model, and persists the
//! resulting conversation turns.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `storage`: durable, ordered log of chat turns keyed by session id
//! - `classifier`: pure mapping from free text to a query intent
//! - `context`: recent-topic extraction via an injected entity tagger
//! - `prompt`: prompt composition behind a bounded content-addressed cache
//! - `engine`: submit/regenerate orchestration against a model service
//! - `config`: configuration loading and validation
//! - `error`: error types and result aliases
//!
//! The interactive surface, the concrete model-service HTTP client, and the
//! entity tagger implementation all live outside this crate; [`ChatModel`]
//! and [`EntityTagger`] are their interface boundaries.
//!
//! # Example
//!
//! ```no_run
//! use parley::{ChatEngine, Config};
//! # use parley::{ChatModel, EntityTagger, ModelMessage, TaggedSpan};
//! # use std::sync::Arc;
//! # struct Tagger;
//! # impl EntityTagger for Tagger {
//! #     fn tag(&self, _text: &str) -> Vec<TaggedSpan> { Vec::new() }
//! # }
//! # struct Model;
//! # #[async_trait::async_trait]
//! # impl ChatModel for Model {
//! #     async fn complete(&self, _messages: &[ModelMessage]) -> parley::Result<String> {
//! #         Ok("hello".to_string())
//! #     }
//! # }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let engine = ChatEngine::from_config(&config, Arc::new(Tagger), Arc::new(Model))?;
//!
//!     let session = parley::new_session_id();
//!     let reply = engine.submit(&session, "What is gravity?").await?;
//!     println!("{}", reply);
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod logging;
pub mod prompt;
pub mod storage;

// Re-export commonly used types
pub use classifier::{classify, QueryIntent};
pub use config::Config;
pub use context::{ContextExtractor, EntityCategory, EntityTagger, TaggedSpan};
pub use engine::{new_session_id, ChatEngine, ChatModel, ModelMessage};
pub use error::{ParleyError, Result};
pub use prompt::PromptBuilder;
pub use storage::{Role, SessionStore, SessionSummary, Turn};

#[cfg(test)]
pub mod test_utils;
