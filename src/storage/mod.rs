//! Durable session history storage
//!
//! This module implements the session-scoped turn log backed by SQLite.
//! A session exists implicitly as the set of turns sharing a `session_id`;
//! a session with zero turns is indistinguishable from one that never
//! existed.
//!
//! # Concurrency
//!
//! All operations serialize on a single connection behind a mutex. Each
//! public operation acquires the lock once and executes a single statement,
//! so every operation is atomic and concurrent callers cannot observe a
//! half-applied mutation. No ordering is arbitrated across operations beyond
//! that.
//!
//! # Error policy
//!
//! Write operations (`append`, `delete_session`, `delete_last_assistant_turn`)
//! fail closed with [`ParleyError::StorageUnavailable`] so a turn is never
//! silently lost. Read operations (`list`, `list_sessions`,
//! `find_echoed_reply`) degrade to empty results and log, since history is
//! best-effort for display.

use crate::error::{ParleyError, Result};
use anyhow::Context;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, error, warn};

pub mod types;
pub use types::{Role, SessionSummary, Turn};

/// Maximum title length in characters before truncation
const TITLE_MAX_CHARS: usize = 40;

/// Title used for sessions that hold no user turn
const NO_TITLE: &str = "(no title)";

/// Connection state guarded by the store lock
///
/// `last_stamp` implements the global monotonic clock: an append observing a
/// wall clock at or behind the previous stamp advances by one microsecond
/// instead, so stored timestamps never repeat or regress.
struct StoreInner {
    conn: Connection,
    last_stamp: DateTime<Utc>,
}

/// SQLite-backed store for conversation turns
pub struct SessionStore {
    inner: Mutex<StoreInner>,
}

impl SessionStore {
    /// Create a store at the default location in the user's data directory
    ///
    /// The path can be overridden with the `PARLEY_HISTORY_DB` environment
    /// variable, which makes it easy to point at a test DB or an alternate
    /// file without changing the application data dir.
    pub fn new() -> Result<Self> {
        if let Ok(override_path) = std::env::var("PARLEY_HISTORY_DB") {
            return Self::new_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("rs", "parley", "parley").ok_or_else(|| {
            ParleyError::StorageUnavailable("Could not determine data directory".into())
        })?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .context("Failed to create data directory")
            .map_err(|e| ParleyError::StorageUnavailable(e.to_string()))?;

        Self::new_with_path(data_dir.join("history.db"))
    }

    /// Create a store that uses the specified database path
    ///
    /// Primarily useful for tests where the default application data
    /// directory is not desirable (for example, using a temporary directory).
    ///
    /// # Examples
    ///
    /// ```
    /// use parley::storage::SessionStore;
    ///
    /// let store = SessionStore::new_with_path("/tmp/parley_doc_history.db").unwrap();
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        // Ensure parent directory exists so opening the DB file succeeds.
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| ParleyError::StorageUnavailable(e.to_string()))?;
        }

        let conn = Connection::open(&db_path)
            .context("Failed to open database")
            .map_err(|e| ParleyError::StorageUnavailable(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS turns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )
        .context("Failed to create turns table")
        .map_err(|e| ParleyError::StorageUnavailable(e.to_string()))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_turns_session
                ON turns (session_id, timestamp)",
            [],
        )
        .context("Failed to create session index")
        .map_err(|e| ParleyError::StorageUnavailable(e.to_string()))?;

        debug!("Session store opened at {}", db_path.display());

        Ok(Self {
            inner: Mutex::new(StoreInner {
                conn,
                last_stamp: Utc::now(),
            }),
        })
    }

    /// Append a turn to a session
    ///
    /// Assigns a fresh timestamp strictly greater than any stamp previously
    /// issued by this store, then inserts the row. Fails closed: on error
    /// nothing is written.
    ///
    /// User turn content must be non-empty by caller contract; assistant
    /// turns may carry an error-describing string in place of a reply.
    pub fn append(&self, session_id: &str, role: Role, content: &str) -> Result<Turn> {
        let mut inner = self.lock()?;

        let now = Utc::now();
        let stamp = if now > inner.last_stamp {
            now
        } else {
            inner.last_stamp + Duration::microseconds(1)
        };

        inner
            .conn
            .execute(
                "INSERT INTO turns (session_id, role, content, timestamp)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    session_id,
                    role.as_str(),
                    content,
                    stamp.to_rfc3339_opts(SecondsFormat::Micros, true)
                ],
            )
            .context("Failed to insert turn")
            .map_err(|e| ParleyError::StorageUnavailable(e.to_string()))?;

        inner.last_stamp = stamp;
        let id = inner.conn.last_insert_rowid();

        debug!(
            "Appended {} turn {} to session {} ({} chars)",
            role,
            id,
            session_id,
            content.len()
        );

        Ok(Turn {
            id,
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            timestamp: stamp,
        })
    }

    /// List all turns of a session in insertion order
    ///
    /// Returns an empty vector for an unknown session, and also when the
    /// store cannot be read (the condition is logged).
    pub fn list(&self, session_id: &str) -> Vec<Turn> {
        match self.try_list(session_id) {
            Ok(turns) => turns,
            Err(e) => {
                error!("Failed to list turns for session {}: {}", session_id, e);
                Vec::new()
            }
        }
    }

    fn try_list(&self, session_id: &str) -> Result<Vec<Turn>> {
        let inner = self.lock()?;

        let mut stmt = inner
            .conn
            .prepare(
                "SELECT id, role, content, timestamp FROM turns
                 WHERE session_id = ?1
                 ORDER BY timestamp ASC, id ASC",
            )
            .context("Failed to prepare list statement")?;

        let rows = stmt
            .query_map(params![session_id], |row| {
                let id: i64 = row.get(0)?;
                let role: String = row.get(1)?;
                let content: String = row.get(2)?;
                let stamp: String = row.get(3)?;
                Ok((id, role, content, stamp))
            })
            .context("Failed to query turns")?;

        let mut turns = Vec::new();
        for (id, role_str, content, stamp) in rows.flatten() {
            let Some(role) = Role::parse_str(&role_str) else {
                warn!("Skipping turn {} with unknown role {:?}", id, role_str);
                continue;
            };
            turns.push(Turn {
                id,
                session_id: session_id.to_string(),
                role,
                content,
                timestamp: parse_stamp(&stamp),
            });
        }

        Ok(turns)
    }

    /// List all sessions ordered by most recent activity
    ///
    /// Each summary carries a display title derived from the session's first
    /// user turn. Returns an empty vector when the store cannot be read.
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        match self.try_list_sessions() {
            Ok(sessions) => sessions,
            Err(e) => {
                error!("Failed to list sessions: {}", e);
                Vec::new()
            }
        }
    }

    fn try_list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let inner = self.lock()?;

        let mut stmt = inner
            .conn
            .prepare(
                "SELECT session_id, MAX(timestamp) AS last_active FROM turns
                 GROUP BY session_id
                 ORDER BY last_active DESC, MAX(id) DESC",
            )
            .context("Failed to prepare session listing")?;

        let rows = stmt
            .query_map([], |row| {
                let session_id: String = row.get(0)?;
                let last_active: String = row.get(1)?;
                Ok((session_id, last_active))
            })
            .context("Failed to query sessions")?;

        let mut sessions = Vec::new();
        for (session_id, last_active) in rows.flatten() {
            let first_user: Option<String> = inner
                .conn
                .query_row(
                    "SELECT content FROM turns
                     WHERE session_id = ?1 AND role = 'user'
                     ORDER BY timestamp ASC, id ASC
                     LIMIT 1",
                    params![session_id],
                    |row| row.get(0),
                )
                .optional()
                .context("Failed to query session title")?;

            sessions.push(SessionSummary {
                session_id,
                title: first_user.map_or_else(|| NO_TITLE.to_string(), |c| truncate_title(&c)),
                last_active: parse_stamp(&last_active),
            });
        }

        Ok(sessions)
    }

    /// Delete every turn of a session
    ///
    /// Idempotent: deleting an absent or already-empty session succeeds.
    pub fn delete_session(&self, session_id: &str) -> Result<()> {
        let inner = self.lock()?;

        let removed = inner
            .conn
            .execute("DELETE FROM turns WHERE session_id = ?1", params![session_id])
            .context("Failed to delete session")
            .map_err(|e| ParleyError::StorageUnavailable(e.to_string()))?;

        debug!("Deleted session {} ({} turns)", session_id, removed);
        Ok(())
    }

    /// Remove the single most recent assistant turn of a session
    ///
    /// Used for regeneration rollback. No-op when the session holds no
    /// assistant turn.
    pub fn delete_last_assistant_turn(&self, session_id: &str) -> Result<()> {
        let inner = self.lock()?;

        let removed = inner
            .conn
            .execute(
                "DELETE FROM turns WHERE id = (
                    SELECT id FROM turns
                    WHERE session_id = ?1 AND role = 'assistant'
                    ORDER BY timestamp DESC, id DESC
                    LIMIT 1
                 )",
                params![session_id],
            )
            .context("Failed to delete last assistant turn")
            .map_err(|e| ParleyError::StorageUnavailable(e.to_string()))?;

        debug!(
            "Rollback removed {} assistant turn(s) from session {}",
            removed, session_id
        );
        Ok(())
    }

    /// Find a previously stored reply to a byte-identical user input
    ///
    /// Scans every session for a user turn whose content exactly equals
    /// `user_text` (case-sensitive) and returns the content of the nearest
    /// assistant turn following it in that session. When several pairs
    /// qualify, the earliest matching user turn wins, then the earliest
    /// following reply. Returns `None` when no pair exists or the store
    /// cannot be read.
    pub fn find_echoed_reply(&self, user_text: &str) -> Option<String> {
        match self.try_find_echoed_reply(user_text) {
            Ok(reply) => reply,
            Err(e) => {
                error!("Failed to look up echoed reply: {}", e);
                None
            }
        }
    }

    fn try_find_echoed_reply(&self, user_text: &str) -> Result<Option<String>> {
        let inner = self.lock()?;

        let reply = inner
            .conn
            .query_row(
                "SELECT a.content
                 FROM turns u
                 JOIN turns a ON a.session_id = u.session_id
                 WHERE u.role = 'user' AND a.role = 'assistant'
                   AND u.content = ?1
                   AND (a.timestamp > u.timestamp
                        OR (a.timestamp = u.timestamp AND a.id > u.id))
                 ORDER BY u.timestamp ASC, u.id ASC, a.timestamp ASC, a.id ASC
                 LIMIT 1",
                params![user_text],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query echoed reply")?;

        if reply.is_some() {
            debug!("Echoed reply found for input ({} bytes)", user_text.len());
        }

        Ok(reply)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreInner>> {
        self.inner
            .lock()
            .map_err(|_| ParleyError::StorageUnavailable("store lock poisoned".into()).into())
    }
}

/// Parse a stored RFC 3339 stamp, falling back to now if unreadable
fn parse_stamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Truncate a title to [`TITLE_MAX_CHARS`] characters, appending an ellipsis
/// when longer
fn truncate_title(content: &str) -> String {
    if content.chars().count() > TITLE_MAX_CHARS {
        let mut title: String = content.chars().take(TITLE_MAX_CHARS).collect();
        title.push_str("...");
        title
    } else {
        content.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::tempdir;

    /// Helper: create a temporary store backed by a temp directory.
    ///
    /// Returns both the `SessionStore` and the `TempDir` so the caller keeps
    /// ownership of the directory (preventing it from being removed).
    fn create_test_store() -> (SessionStore, tempfile::TempDir) {
        let dir = tempdir().expect("failed to create tempdir");
        let db_path = dir.path().join("history.db");
        let store = SessionStore::new_with_path(db_path).expect("failed to create store");
        (store, dir)
    }

    #[test]
    fn test_new_store_creates_turns_table() {
        let dir = tempdir().expect("failed to create tempdir");
        let db_path = dir.path().join("history.db");
        let _store = SessionStore::new_with_path(&db_path).expect("failed to create store");

        let conn = Connection::open(&db_path).expect("open connection");
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='turns'",
                [],
                |r| r.get(0),
            )
            .expect("query row");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_append_then_list_round_trip() {
        let (store, _dir) = create_test_store();

        store.append("s1", Role::User, "Hello").expect("append failed");
        store
            .append("s1", Role::Assistant, "Hi there")
            .expect("append failed");

        let turns = store.list("s1");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "Hello");
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].content, "Hi there");
    }

    #[test]
    fn test_list_returns_append_order_under_interleaving() {
        let (store, _dir) = create_test_store();

        for i in 0..5 {
            store
                .append("a", Role::User, &format!("a-{}", i))
                .expect("append a failed");
            store
                .append("b", Role::User, &format!("b-{}", i))
                .expect("append b failed");
        }

        let turns = store.list("a");
        assert_eq!(turns.len(), 5);
        for (i, turn) in turns.iter().enumerate() {
            assert_eq!(turn.content, format!("a-{}", i));
        }
        for pair in turns.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
            assert!(pair[0].id < pair[1].id);
        }
    }

    #[test]
    fn test_append_assigns_strictly_increasing_timestamps() {
        let (store, _dir) = create_test_store();

        let mut stamps = Vec::new();
        for i in 0..50 {
            let turn = store
                .append("s1", Role::User, &format!("msg {}", i))
                .expect("append failed");
            stamps.push(turn.timestamp);
        }

        for pair in stamps.windows(2) {
            assert!(pair[0] < pair[1], "timestamps must strictly increase");
        }
    }

    #[test]
    fn test_list_unknown_session_is_empty_not_error() {
        let (store, _dir) = create_test_store();
        assert!(store.list("never-seen").is_empty());
    }

    #[test]
    fn test_delete_session_is_idempotent() {
        let (store, _dir) = create_test_store();
        store.append("s1", Role::User, "Hello").expect("append failed");

        store.delete_session("s1").expect("first delete failed");
        store.delete_session("s1").expect("second delete failed");
        assert!(store.list("s1").is_empty());

        // Deleting a session that never existed also succeeds
        store.delete_session("ghost").expect("ghost delete failed");
    }

    #[test]
    fn test_regeneration_rollback_replaces_last_reply() {
        let (store, _dir) = create_test_store();
        store.append("s1", Role::User, "Q").expect("append failed");
        store.append("s1", Role::Assistant, "A1").expect("append failed");

        store
            .delete_last_assistant_turn("s1")
            .expect("rollback failed");
        store.append("s1", Role::Assistant, "A2").expect("append failed");

        let contents: Vec<_> = store.list("s1").into_iter().map(|t| t.content).collect();
        assert_eq!(contents, vec!["Q".to_string(), "A2".to_string()]);
    }

    #[test]
    fn test_delete_last_assistant_turn_removes_only_latest() {
        let (store, _dir) = create_test_store();
        store.append("s1", Role::User, "Q1").expect("append failed");
        store.append("s1", Role::Assistant, "A1").expect("append failed");
        store.append("s1", Role::User, "Q2").expect("append failed");
        store.append("s1", Role::Assistant, "A2").expect("append failed");

        store
            .delete_last_assistant_turn("s1")
            .expect("rollback failed");

        let contents: Vec<_> = store.list("s1").into_iter().map(|t| t.content).collect();
        assert_eq!(
            contents,
            vec!["Q1".to_string(), "A1".to_string(), "Q2".to_string()]
        );
    }

    #[test]
    fn test_delete_last_assistant_turn_noop_without_assistant() {
        let (store, _dir) = create_test_store();
        store.append("s1", Role::User, "Q").expect("append failed");

        store
            .delete_last_assistant_turn("s1")
            .expect("rollback failed");
        assert_eq!(store.list("s1").len(), 1);

        // Also a no-op on an unknown session
        store
            .delete_last_assistant_turn("ghost")
            .expect("rollback on ghost failed");
    }

    #[test]
    fn test_list_sessions_orders_by_recency() {
        let (store, _dir) = create_test_store();
        store.append("old", Role::User, "First chat").expect("append failed");
        store.append("new", Role::User, "Second chat").expect("append failed");

        let sessions = store.list_sessions();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session_id, "new");
        assert_eq!(sessions[1].session_id, "old");

        // Touching the old session moves it back to the front
        store.append("old", Role::Assistant, "reply").expect("append failed");
        let sessions = store.list_sessions();
        assert_eq!(sessions[0].session_id, "old");
    }

    #[test]
    fn test_list_sessions_derives_titles() {
        let (store, _dir) = create_test_store();

        store.append("short", Role::User, "Hi").expect("append failed");

        let long = "x".repeat(45);
        store.append("long", Role::User, &long).expect("append failed");

        // A session whose only turn is an assistant turn has no title
        store
            .append("untitled", Role::Assistant, "orphan reply")
            .expect("append failed");

        let sessions = store.list_sessions();
        let title_of = |id: &str| {
            sessions
                .iter()
                .find(|s| s.session_id == id)
                .map(|s| s.title.clone())
                .expect("session not found")
        };

        assert_eq!(title_of("short"), "Hi");
        assert_eq!(title_of("long"), format!("{}...", "x".repeat(40)));
        assert_eq!(title_of("untitled"), "(no title)");
    }

    #[test]
    fn test_list_sessions_title_uses_first_user_turn() {
        let (store, _dir) = create_test_store();
        store
            .append("s1", Role::Assistant, "greeting from assistant")
            .expect("append failed");
        store.append("s1", Role::User, "actual question").expect("append failed");
        store.append("s1", Role::User, "follow-up").expect("append failed");

        let sessions = store.list_sessions();
        assert_eq!(sessions[0].title, "actual question");
    }

    #[test]
    fn test_list_sessions_empty_store() {
        let (store, _dir) = create_test_store();
        assert!(store.list_sessions().is_empty());
    }

    #[test]
    fn test_find_echoed_reply_prefers_earliest_match() {
        let (store, _dir) = create_test_store();

        store.append("a", Role::User, "Hi").expect("append failed");
        store.append("a", Role::Assistant, "Hello").expect("append failed");
        store.append("b", Role::User, "Hi").expect("append failed");
        store.append("b", Role::Assistant, "Hey there").expect("append failed");

        assert_eq!(store.find_echoed_reply("Hi"), Some("Hello".to_string()));
    }

    #[test]
    fn test_find_echoed_reply_is_case_sensitive() {
        let (store, _dir) = create_test_store();
        store.append("a", Role::User, "Hi").expect("append failed");
        store.append("a", Role::Assistant, "Hello").expect("append failed");

        assert_eq!(store.find_echoed_reply("hi"), None);
        assert_eq!(store.find_echoed_reply("Hi "), None);
    }

    #[test]
    fn test_find_echoed_reply_requires_following_reply() {
        let (store, _dir) = create_test_store();

        // Assistant turn precedes the matching user turn: no echo
        store.append("a", Role::Assistant, "unrelated").expect("append failed");
        store.append("a", Role::User, "Hi").expect("append failed");
        assert_eq!(store.find_echoed_reply("Hi"), None);

        // A reply appended later becomes visible
        store.append("a", Role::Assistant, "Hello").expect("append failed");
        assert_eq!(store.find_echoed_reply("Hi"), Some("Hello".to_string()));
    }

    #[test]
    fn test_find_echoed_reply_skips_unanswered_match() {
        let (store, _dir) = create_test_store();

        // Earliest matching user turn never got a reply; the later answered
        // pair in another session must win.
        store.append("a", Role::User, "Hi").expect("append failed");
        store.append("b", Role::User, "Hi").expect("append failed");
        store.append("b", Role::Assistant, "Hey there").expect("append failed");

        assert_eq!(store.find_echoed_reply("Hi"), Some("Hey there".to_string()));
    }

    #[test]
    fn test_truncate_title_respects_char_boundaries() {
        let multibyte = "é".repeat(45);
        let truncated = truncate_title(&multibyte);
        assert_eq!(truncated, format!("{}...", "é".repeat(40)));

        assert_eq!(truncate_title("short"), "short");
        let exact = "x".repeat(40);
        assert_eq!(truncate_title(&exact), exact);
    }

    #[test]
    #[serial]
    fn test_new_respects_env_override() {
        // Use nested path to ensure parent directory creation is exercised.
        let dir = tempdir().expect("failed to create tempdir");
        let db_path = dir.path().join("nested").join("history.db");
        env::set_var("PARLEY_HISTORY_DB", db_path.to_string_lossy().to_string());

        let store = SessionStore::new().expect("new failed with env override");
        store.append("s1", Role::User, "Hello").expect("append failed");
        assert!(db_path.exists());
        assert!(db_path.parent().unwrap().exists());

        env::remove_var("PARLEY_HISTORY_DB");
    }
}
