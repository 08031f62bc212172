//! Note operations that touch both the note store and the revision log.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::database::Database;
use crate::error::{NotedError, NotedResult};
use crate::filename::filename_keywords;
use crate::markdown::NoteDocument;
use crate::models::{format_timestamp, now_timestamp, NoteRevision, Tags};
use crate::note_store::NoteStore;
use crate::validation::{
    normalize_note_filename, validate_filename, validate_note_content, NOTE_EXTENSION,
};

/// Tags for a note body: its metadata lines plus keywords implied by the filename.
pub fn note_tags(filename: &str, text: &str) -> Tags {
    let mut tags = NoteDocument::parse(text).tags;
    for keyword in filename_keywords(filename) {
        tags.add_keyword(&keyword);
    }
    tags
}

/// Timestamp for a new revision that sorts after `latest`.
///
/// Returns `candidate` unless `latest` is at or past it, in which case the
/// second after `latest` is used.
pub fn next_revision_timestamp(
    latest: Option<&NoteRevision>,
    candidate: &str,
) -> NotedResult<String> {
    match latest {
        Some(latest) if latest.timestamp.as_str() >= candidate => {
            let last = DateTime::parse_from_rfc3339(&latest.timestamp).map_err(|e| {
                NotedError::Other(format!(
                    "stored timestamp {} of {} is invalid: {}",
                    latest.timestamp, latest.filename, e
                ))
            })?;
            Ok(format_timestamp(last.with_timezone(&Utc) + Duration::seconds(1)))
        }
        _ => Ok(candidate.to_string()),
    }
}

/// Write a note to disk and append a revision for it.
///
/// Inputs are validated before the file is touched. When the latest revision
/// already has the current second, an identical body is not recorded again
/// and a different body is recorded one second after it.
pub fn store_note(
    store: &NoteStore,
    db: &Database,
    filename: &str,
    text: &str,
) -> NotedResult<NoteRevision> {
    validate_filename(filename, "filename")?;
    validate_note_content(text)?;

    let now = now_timestamp();
    let latest = db.latest(filename)?;
    if let Some(latest) = latest.as_ref() {
        if latest.timestamp >= now && latest.text == text {
            store.write(filename, text)?;
            tracing::debug!("{} unchanged since {}", filename, latest.timestamp);
            return Ok(latest.clone());
        }
    }
    let timestamp = next_revision_timestamp(latest.as_ref(), &now)?;

    store.write(filename, text)?;
    let revision = db.record(filename, &timestamp, text, &note_tags(filename, text))?;
    tracing::info!(
        "Stored {} ({} chars) as revision {}",
        filename,
        revision.chars(),
        revision.timestamp
    );
    Ok(revision)
}

/// Metadata supplied when creating a note
#[derive(Debug, Clone, Default)]
pub struct NewNote {
    pub filename: String,
    pub tags: Tags,
}

/// Result of creating a note
#[derive(Debug, Clone, Serialize)]
pub struct CreatedNote {
    pub filename: String,
    pub chars: usize,
}

/// Create a new note file from the standard template.
///
/// The filename is validated (a leading `-` is rejected) and given the
/// `.md` extension if needed. Existing files are never overwritten.
/// Nothing is recorded in the revision log until the note is stored or
/// the database is synced.
pub fn create_note(store: &NoteStore, new_note: &NewNote) -> NotedResult<CreatedNote> {
    let filename = normalize_note_filename(&new_note.filename)?;

    let mut doc = NoteDocument::new(filename.trim_end_matches(NOTE_EXTENSION));
    doc.tags = new_note.tags.clone();

    let text = doc.to_markdown();
    store.create(&filename, &text)?;
    tracing::info!("Created note {} ({} chars)", filename, text.chars().count());

    Ok(CreatedNote {
        chars: text.chars().count(),
        filename,
    })
}
