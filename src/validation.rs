//! Input validation for noted.
//!
//! This module provides validation functions for all user inputs.
//! All validators return NotedError::Validation on failure.

use chrono::{DateTime, Utc};

use crate::error::{NotedError, NotedResult};
use crate::models::format_timestamp;

pub const MAX_FILENAME_LENGTH: usize = 255;
pub const MAX_NOTE_CONTENT_LENGTH: usize = 1_000_000;
pub const MAX_SEARCH_QUERY_LENGTH: usize = 500;
pub const MAX_TAG_NAME_LENGTH: usize = 100;

/// Extension every note file carries
pub const NOTE_EXTENSION: &str = ".md";

/// Validate a bare note filename (no directory component).
///
/// Rejects empty names, names starting with `-`, path separators, `..`,
/// and control characters.
pub fn validate_filename(value: &str, field_name: &str) -> NotedResult<()> {
    if value.trim().is_empty() {
        return Err(NotedError::validation(field_name, "filename cannot be empty"));
    }
    if value.len() > MAX_FILENAME_LENGTH {
        return Err(NotedError::validation(
            field_name,
            format!(
                "filename exceeds maximum length of {} characters (got {})",
                MAX_FILENAME_LENGTH,
                value.len()
            ),
        ));
    }
    if value.starts_with('-') {
        return Err(NotedError::validation(field_name, "filename cannot start with '-'"));
    }
    if value.contains('/') || value.contains('\\') {
        return Err(NotedError::validation(
            field_name,
            "filename cannot contain path separators",
        ));
    }
    if value == "." || value.contains("..") {
        return Err(NotedError::validation(field_name, "filename cannot contain '..'"));
    }
    if value.chars().any(|c| c.is_control()) {
        return Err(NotedError::validation(
            field_name,
            "filename cannot contain control characters",
        ));
    }
    Ok(())
}

/// Validate a filename for a new note and give it the `.md` extension if missing.
pub fn normalize_note_filename(value: &str) -> NotedResult<String> {
    let trimmed = value.trim();
    validate_filename(trimmed, "filename")?;
    if trimmed.ends_with(NOTE_EXTENSION) {
        if trimmed.len() == NOTE_EXTENSION.len() {
            return Err(NotedError::validation("filename", "filename has no name before .md"));
        }
        Ok(trimmed.to_string())
    } else {
        let name = format!("{}{}", trimmed, NOTE_EXTENSION);
        validate_filename(&name, "filename")?;
        Ok(name)
    }
}

/// Validate note body size
pub fn validate_note_content(content: &str) -> NotedResult<()> {
    if content.len() > MAX_NOTE_CONTENT_LENGTH {
        return Err(NotedError::validation(
            "text",
            format!(
                "note exceeds maximum size of {} bytes (got {})",
                MAX_NOTE_CONTENT_LENGTH,
                content.len()
            ),
        ));
    }
    Ok(())
}

/// Normalize a revision timestamp to the stored form, e.g. `2022-09-10T11:01:00Z`.
///
/// Revisions are ordered by comparing timestamps as strings, so every
/// timestamp is converted to UTC with second precision. Any RFC 3339 offset
/// is accepted; fractional seconds are rejected.
pub fn normalize_timestamp(value: &str, field_name: &str) -> NotedResult<String> {
    let parsed = DateTime::parse_from_rfc3339(value).map_err(|e| {
        NotedError::validation(field_name, format!("timestamp must be RFC 3339: {}", e))
    })?;
    if parsed.timestamp_subsec_nanos() != 0 {
        return Err(NotedError::validation(
            field_name,
            "timestamp must not have fractional seconds",
        ));
    }
    Ok(format_timestamp(parsed.with_timezone(&Utc)))
}

/// Validate search query (None and empty are valid).
pub fn validate_search_query(query: Option<&str>) -> NotedResult<()> {
    if let Some(q) = query {
        if q.len() > MAX_SEARCH_QUERY_LENGTH {
            return Err(NotedError::validation(
                "search_query",
                format!(
                    "search query exceeds maximum length of {} characters (got {})",
                    MAX_SEARCH_QUERY_LENGTH,
                    q.len()
                ),
            ));
        }
    }
    Ok(())
}

/// Validate a keyword / attendee / speaker name.
pub fn validate_tag_name(name: &str) -> NotedResult<()> {
    if name.trim().is_empty() {
        return Err(NotedError::validation("tag_name", "tag name cannot be empty"));
    }
    if name.len() > MAX_TAG_NAME_LENGTH {
        return Err(NotedError::validation(
            "tag_name",
            format!(
                "tag name exceeds maximum length of {} characters (got {})",
                MAX_TAG_NAME_LENGTH,
                name.len()
            ),
        ));
    }
    Ok(())
}
