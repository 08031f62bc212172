//! Error types for noted.
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Result type alias for noted operations
pub type NotedResult<T> = Result<T, NotedError>;

/// Main error type for noted operations
#[derive(Error, Debug)]
pub enum NotedError {
    #[error("Validation error in {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    Other(String),
}

impl NotedError {
    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        NotedError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        NotedError::NotFound(what.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        NotedError::Conflict(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        NotedError::Config(message.into())
    }
}
