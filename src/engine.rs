//! Chat turn orchestration
//!
//! Ties the store, the prompt builder, and the model-service boundary into
//! the submit/regenerate flows: a user input becomes a stored user turn, a
//! contextual prompt goes to the model in place of the raw input, and the
//! reply (or the error string standing in for one) is persisted as an
//! assistant turn so the conversation log stays linear and inspectable.
//!
//! The concrete HTTP client lives outside this crate; [`ChatModel`] is the
//! whole contract it must satisfy.

use crate::config::Config;
use crate::context::{ContextExtractor, EntityTagger};
use crate::error::{ParleyError, Result};
use crate::prompt::PromptBuilder;
use crate::storage::{Role, SessionStore, Turn};
use async_trait::async_trait;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// One message in the sequence handed to the model service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelMessage {
    /// Author role
    pub role: Role,
    /// Message text
    pub content: String,
}

impl From<&Turn> for ModelMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role,
            content: turn.content.clone(),
        }
    }
}

/// Chat-completion model service boundary
///
/// Accepts the ordered conversation history and returns a single reply
/// string. Implementations own their transport, timeouts, and retries;
/// this crate treats any successful response as opaque text and converts
/// failures into assistant content rather than propagating them.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce a reply for the given history
    async fn complete(&self, messages: &[ModelMessage]) -> Result<String>;
}

/// Generate a fresh opaque session identifier
///
/// # Examples
///
/// ```
/// let id = parley::engine::new_session_id();
/// assert_eq!(id.len(), 36);
/// ```
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Drives a conversation: persists turns, assembles prompts, queries the model
pub struct ChatEngine {
    store: Arc<SessionStore>,
    prompts: PromptBuilder,
    model: Arc<dyn ChatModel>,
    reuse_echoed_replies: bool,
}

impl ChatEngine {
    /// Create an engine over an existing store and prompt builder
    ///
    /// With `reuse_echoed_replies` enabled, a user input that byte-for-byte
    /// repeats an already-answered input (in any session) is answered with
    /// the stored reply without a model call.
    pub fn new(
        store: Arc<SessionStore>,
        prompts: PromptBuilder,
        model: Arc<dyn ChatModel>,
        reuse_echoed_replies: bool,
    ) -> Self {
        Self {
            store,
            prompts,
            model,
            reuse_echoed_replies,
        }
    }

    /// Assemble an engine from configuration and the two injected capabilities
    ///
    /// Opens the store at the configured path (or the default data-dir
    /// location) and wires the extractor and prompt builder with the
    /// configured lookback and cache capacity.
    pub fn from_config(
        config: &Config,
        tagger: Arc<dyn EntityTagger>,
        model: Arc<dyn ChatModel>,
    ) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(match &config.storage.db_path {
            Some(path) => SessionStore::new_with_path(path)?,
            None => SessionStore::new()?,
        });

        let extractor = ContextExtractor::new(store.clone(), tagger, config.context.lookback);
        let capacity = NonZeroUsize::new(config.prompt.cache_capacity).ok_or_else(|| {
            ParleyError::Config("prompt.cache_capacity must be at least 1".into())
        })?;
        let prompts = PromptBuilder::new(extractor, capacity);

        Ok(Self::new(
            store,
            prompts,
            model,
            config.engine.reuse_echoed_replies,
        ))
    }

    /// Handle one user input and return the assistant reply
    ///
    /// Appends the user turn, assembles the contextual prompt, sends the
    /// session history (with the final user message replaced by the prompt)
    /// to the model, and appends the reply. A model failure is stored and
    /// returned as an error-describing reply string, never raised; storage
    /// write failures do propagate so no turn is silently lost.
    pub async fn submit(&self, session_id: &str, user_text: &str) -> Result<String> {
        self.store.append(session_id, Role::User, user_text)?;
        info!("User turn stored in session {}", session_id);

        if self.reuse_echoed_replies {
            if let Some(reply) = self.store.find_echoed_reply(user_text) {
                info!("Reusing echoed reply for session {}", session_id);
                self.store.append(session_id, Role::Assistant, &reply)?;
                return Ok(reply);
            }
        }

        let prompt = self.prompts.build_prompt(session_id, user_text);
        let reply = self.query_model(session_id, prompt).await;

        self.store.append(session_id, Role::Assistant, &reply)?;
        Ok(reply)
    }

    /// Roll back the latest assistant turn and answer the question again
    ///
    /// Deletes the most recent assistant turn, rebuilds the prompt from the
    /// latest user turn, re-queries the model, and appends the new reply.
    /// Returns `Ok(None)` when the session holds no user turn to re-ask.
    pub async fn regenerate(&self, session_id: &str) -> Result<Option<String>> {
        self.store.delete_last_assistant_turn(session_id)?;

        let last_user = self
            .store
            .list(session_id)
            .into_iter()
            .rev()
            .find(|turn| turn.role == Role::User);
        let Some(last_user) = last_user else {
            warn!("Nothing to regenerate in session {}", session_id);
            return Ok(None);
        };

        info!("Regenerating reply in session {}", session_id);
        let prompt = self.prompts.build_prompt(session_id, &last_user.content);
        let reply = self.query_model(session_id, prompt).await;

        self.store.append(session_id, Role::Assistant, &reply)?;
        Ok(Some(reply))
    }

    /// Send the session history to the model with the contextual prompt
    /// substituted for the latest user message
    async fn query_model(&self, session_id: &str, prompt: String) -> String {
        let mut history: Vec<ModelMessage> = self
            .store
            .list(session_id)
            .iter()
            .map(ModelMessage::from)
            .collect();

        match history.iter().rposition(|m| m.role == Role::User) {
            Some(idx) => history[idx].content = prompt,
            // Degraded history read: fall back to the prompt alone
            None => history.push(ModelMessage {
                role: Role::User,
                content: prompt,
            }),
        }

        match self.model.complete(&history).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Model service failed for session {}: {}", session_id, e);
                format!("Error talking to model service: {}", e)
            }
        }
    }
}
