//! Configuration management for Parley
//!
//! This module handles loading, parsing, and validating configuration
//! from YAML files, with per-section defaults so a missing or partial file
//! still yields a usable configuration.

use crate::error::{ParleyError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure for Parley
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Turn storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Context extraction configuration
    #[serde(default)]
    pub context: ContextConfig,

    /// Prompt assembly configuration
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Engine behavior configuration
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Turn storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file path; defaults to the user data directory when unset
    /// (the `PARLEY_HISTORY_DB` environment variable also overrides it)
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

/// Context extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Number of recent user turns examined per extraction
    #[serde(default = "default_lookback")]
    pub lookback: usize,
}

fn default_lookback() -> usize {
    crate::context::DEFAULT_LOOKBACK
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            lookback: default_lookback(),
        }
    }
}

/// Prompt assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Maximum number of cached prompts before LRU eviction
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_cache_capacity() -> usize {
    crate::prompt::DEFAULT_CACHE_CAPACITY
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
        }
    }
}

/// Engine behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Answer byte-identical repeated inputs with the stored reply instead
    /// of querying the model again
    #[serde(default = "default_reuse_echoed_replies")]
    pub reuse_echoed_replies: bool,
}

fn default_reuse_echoed_replies() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reuse_echoed_replies: default_reuse_echoed_replies(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// A missing file yields the default configuration; a present but
    /// malformed file is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| ParleyError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: Config = serde_yaml::from_str(&contents)
            .map_err(|e| ParleyError::Config(format!("cannot parse {}: {}", path.display(), e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate field ranges
    pub fn validate(&self) -> Result<()> {
        if self.context.lookback == 0 {
            return Err(ParleyError::Config("context.lookback must be at least 1".into()).into());
        }
        if self.prompt.cache_capacity == 0 {
            return Err(
                ParleyError::Config("prompt.cache_capacity must be at least 1".into()).into(),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().expect("default config must validate");
        assert_eq!(config.context.lookback, 5);
        assert_eq!(config.prompt.cache_capacity, 1024);
        assert!(config.engine.reuse_echoed_replies);
        assert!(config.storage.db_path.is_none());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load("/nonexistent/parley.yaml").expect("load failed");
        assert_eq!(config.context.lookback, 5);
    }

    #[test]
    fn test_load_partial_yaml_fills_defaults() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "context:\n  lookback: 3\n").expect("write failed");

        let config = Config::load(&path).expect("load failed");
        assert_eq!(config.context.lookback, 3);
        assert_eq!(config.prompt.cache_capacity, 1024);
    }

    #[test]
    fn test_load_full_yaml() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "storage:\n  db_path: /tmp/chat.db\ncontext:\n  lookback: 7\nprompt:\n  cache_capacity: 16\nengine:\n  reuse_echoed_replies: false\n",
        )
        .expect("write failed");

        let config = Config::load(&path).expect("load failed");
        assert_eq!(config.storage.db_path, Some(PathBuf::from("/tmp/chat.db")));
        assert_eq!(config.context.lookback, 7);
        assert_eq!(config.prompt.cache_capacity, 16);
        assert!(!config.engine.reuse_echoed_replies);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "context:\n  lookback: 0\n").expect("write failed");

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_cache_capacity() {
        let mut config = Config::default();
        config.prompt.cache_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_rejects_malformed_yaml() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "context: [not a map").expect("write failed");

        assert!(Config::load(&path).is_err());
    }
}
