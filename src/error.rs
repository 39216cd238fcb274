//! Error types for Parley
//!
//! This module defines all error types used throughout the crate,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Parley operations
///
/// This enum encompasses all possible errors that can occur during
/// configuration loading, turn storage, and prompt assembly. Classification
/// and context extraction are total functions and define no error kinds.
#[derive(Error, Debug)]
pub enum ParleyError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Durable store cannot be reached, opened, or written
    ///
    /// Write operations fail closed with this error and perform no partial
    /// mutation. Read operations never surface it; they degrade to empty
    /// results and log instead.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for Parley operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
