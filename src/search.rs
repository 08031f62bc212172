//! Search functionality for noted.
//!
//! This module provides search parsing and execution logic over the
//! revision database. Results are filenames, newest revision first.

use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::NotedResult;
use crate::filename::parse_filename;
use crate::models::TagKind;
use crate::validation::validate_search_query;

/// Parsed search input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSearch {
    /// Tag terms (kind, name) from `key:`, `present:` and `speaker:` tokens
    pub tag_terms: Vec<(TagKind, String)>,
    /// Dates (yyyymmdd) from `date:` tokens
    pub dates: Vec<String>,
    /// Free text matched against filenames
    pub free_text: String,
}

impl ParsedSearch {
    /// Check if search has any criteria
    pub fn is_empty(&self) -> bool {
        self.tag_terms.is_empty() && self.dates.is_empty() && self.free_text.is_empty()
    }
}

/// Parse search input.
///
/// Supports:
/// - `key:budget` (or `keyword:`) for keyword searches
/// - `present:alice` and `speaker:bob` for attendee / speaker searches
/// - `date:20221212` to restrict to notes with that date in their filename
/// - Free text for filename search
///
/// All criteria are combined with AND logic.
pub fn parse_search_input(search_input: &str) -> ParsedSearch {
    let mut parsed = ParsedSearch::default();
    let mut text_words = Vec::new();

    for word in search_input.split_whitespace() {
        let lower = word.to_lowercase();
        let (kind, value) = if let Some(v) = lower.strip_prefix("keyword:") {
            (Some(TagKind::Keyword), v)
        } else if let Some(v) = lower.strip_prefix("key:") {
            (Some(TagKind::Keyword), v)
        } else if let Some(v) = lower.strip_prefix("present:") {
            (Some(TagKind::Present), v)
        } else if let Some(v) = lower.strip_prefix("speaker:") {
            (Some(TagKind::Speaker), v)
        } else if let Some(v) = lower.strip_prefix("date:") {
            if !v.is_empty() {
                parsed.dates.push(v.to_string());
            }
            continue;
        } else {
            (None, "")
        };

        match kind {
            Some(kind) if !value.is_empty() => parsed.tag_terms.push((kind, value.to_string())),
            Some(_) => {}
            None => text_words.push(word.to_string()),
        }
    }

    parsed.free_text = text_words.join(" ");
    parsed
}

/// Filenames in the database matching a filename search string.
///
/// The string is lower-cased and a trailing `*` removed; an empty string
/// lists every note.
pub fn find_files_in_database(db: &Database, search_string: &str) -> NotedResult<Vec<String>> {
    validate_search_query(Some(search_string))?;
    let key = search_string.trim().to_lowercase();
    let key = key.strip_suffix('*').unwrap_or(&key);
    if key.is_empty() {
        return db.all_filenames();
    }
    db.find_by_filename(key, true)
}

/// Filenames whose revisions carry a keyword containing `keyword`.
pub fn find_files_by_key(db: &Database, keyword: &str) -> NotedResult<Vec<String>> {
    validate_search_query(Some(keyword))?;
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Ok(Vec::new());
    }
    db.find_by_tag(TagKind::Keyword, keyword, true)
}

/// Execute a combined search.
pub fn execute_search(db: &Database, search_input: &str) -> NotedResult<Vec<String>> {
    validate_search_query(Some(search_input))?;
    let parsed = parse_search_input(search_input);

    let mut results = find_files_in_database(db, &parsed.free_text)?;

    for (kind, name) in &parsed.tag_terms {
        let matching = db.find_by_tag(*kind, name, true)?;
        results.retain(|f| matching.contains(f));
    }

    if !parsed.dates.is_empty() {
        results.retain(|f| {
            let date = parse_filename(f).date;
            parsed.dates.iter().any(|d| *d == date)
        });
    }

    tracing::debug!("Search {:?} matched {} notes", search_input, results.len());
    Ok(results)
}
