//! noted - personal Markdown notes with an append-only revision history.
//!
//! This library provides the core functionality for noted:
//! - Note files in a single directory (`note_store`)
//! - Immutable, timestamped revisions in SQLite (`database`)
//! - Filename stems and dates (`filename`)
//! - The note Markdown dialect (`markdown`)
//! - Searches and the directory-to-database sync (`search`, `sync`)
//!
//! # Feature Flags
//!
//! - `server`: Include the HTTP server (axum, tower-http) and the `noted` binary.
//! - `desktop`: Locate the configuration in the platform config directory.

pub mod config;
pub mod database;
pub mod error;
pub mod filename;
pub mod markdown;
pub mod models;
pub mod note_store;
pub mod notes;
pub mod search;
#[cfg(feature = "server")]
pub mod server;
pub mod sync;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use database::Database;
pub use error::{NotedError, NotedResult};
pub use models::{NoteRevision, TagKind, Tags};
pub use note_store::NoteStore;
