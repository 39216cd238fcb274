use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a stored turn's author
///
/// A session log only ever contains user and assistant turns; system-level
/// instructions are assembled on the fly by the prompt builder and never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A message typed by the user
    User,
    /// A reply produced by the model service (or an error string standing
    /// in for one)
    Assistant,
}

impl Role {
    /// The canonical lowercase name stored in the `role` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parse a role from its stored column value
    ///
    /// # Examples
    ///
    /// ```
    /// use parley::storage::Role;
    ///
    /// assert_eq!(Role::parse_str("user"), Some(Role::User));
    /// assert_eq!(Role::parse_str("tool"), None);
    /// ```
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored message in a conversation
///
/// Turns are immutable once stored; the only lifecycle transitions are
/// deletion of a whole session and removal of the most recent assistant
/// turn during regeneration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Store-assigned row identifier; breaks timestamp ties in insertion order
    pub id: i64,
    /// Opaque session identifier assigned by the caller
    pub session_id: String,
    /// Author of the turn
    pub role: Role,
    /// Message text; non-empty for user turns by caller contract
    pub content: String,
    /// Store-assigned insertion time, the sole ordering key within a session
    pub timestamp: DateTime<Utc>,
}

/// Derived per-session metadata for history listings
///
/// The title is the first user turn's content truncated to 40 characters
/// (with a trailing ellipsis when longer), or `"(no title)"` when the
/// session holds no user turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session identifier
    pub session_id: String,
    /// Display title derived from the first user turn
    pub title: String,
    /// Timestamp of the most recent turn in the session
    pub last_active: DateTime<Utc>,
}
