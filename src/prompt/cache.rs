//! Content-addressed prompt cache
//!
//! Keys are the SHA-256 digest of the normalized (trimmed, case-folded)
//! user input, so repeated inputs hit regardless of casing or surrounding
//! whitespace. The key carries no session identifier and no notion of time:
//! identical text typed in any session returns the cached prompt even when
//! the surrounding context has drifted. That reuse behavior is part of the
//! assembler's observable contract and is kept as-is.
//!
//! Capacity is injected and eviction is least-recently-used, so the cache
//! stays bounded under sustained varied input.

use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::Mutex;
use tracing::debug;

/// Bounded LRU mapping from normalized-input digest to assembled prompt
pub struct PromptCache {
    inner: Mutex<LruCache<String, String>>,
}

impl PromptCache {
    /// Create a cache holding at most `capacity` prompts
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Compute the cache key for a user input
    ///
    /// # Examples
    ///
    /// ```
    /// use parley::prompt::PromptCache;
    ///
    /// assert_eq!(PromptCache::key("  Hello "), PromptCache::key("hello"));
    /// assert_ne!(PromptCache::key("hello"), PromptCache::key("goodbye"));
    /// ```
    pub fn key(text: &str) -> String {
        let normalized = text.trim().to_lowercase();
        let digest = Sha256::digest(normalized.as_bytes());
        digest.iter().map(|byte| format!("{:02x}", byte)).collect()
    }

    /// Look up a cached prompt, marking it most recently used
    pub fn get(&self, key: &str) -> Option<String> {
        let mut cache = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache.get(key).cloned()
    }

    /// Store an assembled prompt, evicting the least recently used entry
    /// when full
    pub fn insert(&self, key: String, prompt: String) {
        let mut cache = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if cache.len() == cache.cap().get() {
            debug!("Prompt cache at capacity ({}), evicting", cache.cap());
        }
        cache.put(key, prompt);
    }

    /// Number of cached prompts
    pub fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
