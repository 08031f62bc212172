//! Database sync: reconcile the notes directory into the revision log.
//!
//! Every note file whose content differs from its latest revision (or which
//! has no revision yet) gets a new revision stamped with the current time.
//! Unchanged files are skipped, so running the sync twice in a row inserts
//! nothing the second time.

use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::NotedResult;
use crate::filename::is_scratch_file;
use crate::models::now_timestamp;
use crate::note_store::NoteStore;
use crate::notes::{next_revision_timestamp, note_tags};
use crate::validation::validate_filename;

/// Summary of one sync run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Note files considered
    pub scanned: usize,
    /// Revisions appended
    pub inserted: usize,
    /// Files already matching their latest revision
    pub skipped: usize,
    /// Files ignored because of an excluded prefix, scratch name or unusable filename
    pub excluded: usize,
}

fn is_excluded(filename: &str, exclude_prefixes: &[String]) -> bool {
    is_scratch_file(filename)
        || exclude_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && filename.starts_with(prefix.as_str()))
}

/// Scan the store and append revisions for new or changed notes.
///
/// New revisions of one run share the same timestamp, except where a note
/// already has a revision at or after it. The first
/// unreadable file aborts the scan with its error; revisions appended
/// before that point are kept.
pub fn update_database(
    store: &NoteStore,
    db: &Database,
    exclude_prefixes: &[String],
) -> NotedResult<SyncSummary> {
    let timestamp = now_timestamp();
    let mut summary = SyncSummary::default();

    tracing::debug!(
        "Scanning {} for changed notes",
        store.notes_path().display()
    );

    for filename in store.list()? {
        if is_excluded(&filename, exclude_prefixes) {
            summary.excluded += 1;
            continue;
        }
        if let Err(e) = validate_filename(&filename, "filename") {
            tracing::warn!("Skipping {}: {}", filename, e);
            summary.excluded += 1;
            continue;
        }
        summary.scanned += 1;

        let text = store.read(&filename)?;
        let latest = db.latest(&filename)?;
        if latest.as_ref().is_some_and(|latest| latest.text == text) {
            summary.skipped += 1;
            continue;
        }

        let at = next_revision_timestamp(latest.as_ref(), &timestamp)?;
        db.record(&filename, &at, &text, &note_tags(&filename, &text))?;
        tracing::debug!("Note {} added to database", filename);
        summary.inserted += 1;
    }

    tracing::info!(
        "Database sync: {} scanned, {} inserted, {} unchanged, {} excluded",
        summary.scanned,
        summary.inserted,
        summary.skipped,
        summary.excluded
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tags;
    use tempfile::TempDir;

    fn setup() -> (NoteStore, Database, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = NoteStore::new(temp_dir.path()).unwrap();
        let db = Database::new_in_memory().unwrap();
        (store, db, temp_dir)
    }

    #[test]
    fn test_first_sync_records_every_note() {
        let (store, db, _temp) = setup();
        store.write("bob-20220902.md", "# one\n").unwrap();
        store.write("bob-20221212.md", "# two\n").unwrap();

        let summary = update_database(&store, &db, &[]).unwrap();
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.scanned, 2);
        assert_eq!(db.latest("bob-20220902.md").unwrap().unwrap().text, "# one\n");
    }

    #[test]
    fn test_second_sync_is_a_no_op() {
        let (store, db, _temp) = setup();
        store.write("bob-20220902.md", "# one\n").unwrap();
        store.write("bill-20220909.md", "# two\n").unwrap();

        update_database(&store, &db, &[]).unwrap();
        let second = update_database(&store, &db, &[]).unwrap();

        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(db.count().unwrap(), 2);
    }

    #[test]
    fn test_changed_file_gets_new_revision() {
        let (store, db, _temp) = setup();
        db.record("bob-20221212.md", "2022-12-12T10:00:00Z", "old", &Tags::default())
            .unwrap();
        store.write("bob-20221212.md", "new").unwrap();

        let summary = update_database(&store, &db, &[]).unwrap();
        assert_eq!(summary.inserted, 1);

        let history = db.history("bob-20221212.md").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].text, "new");
        assert_eq!(history[1].text, "old");
    }

    #[test]
    fn test_change_after_newer_revision_is_recorded_after_it() {
        let (store, db, _temp) = setup();
        db.record("bob-20221212.md", "2999-01-01T00:00:00Z", "old", &Tags::default())
            .unwrap();
        store.write("bob-20221212.md", "new").unwrap();

        let summary = update_database(&store, &db, &[]).unwrap();
        assert_eq!(summary.inserted, 1);
        let latest = db.latest("bob-20221212.md").unwrap().unwrap();
        assert_eq!(latest.text, "new");
        assert_eq!(latest.timestamp, "2999-01-01T00:00:01Z");
    }

    #[test]
    fn test_excluded_and_scratch_files_skipped() {
        let (store, db, _temp) = setup();
        store.write("crap-20221212.md", "scratch").unwrap();
        store.write(".#bob-20221212.md", "lock").unwrap();
        store.write("bob-20221212.md", "keep").unwrap();

        let summary = update_database(&store, &db, &["crap".to_string()]).unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.excluded, 2);
        assert_eq!(db.all_filenames().unwrap(), vec!["bob-20221212.md"]);
    }

    #[test]
    fn test_unusable_filename_does_not_stop_sync() {
        let (store, db, temp) = setup();
        std::fs::write(temp.path().join("-draft.md"), "draft").unwrap();
        std::fs::write(temp.path().join("notes..v2.md"), "v2").unwrap();
        store.write("bob-20221212.md", "keep").unwrap();

        let summary = update_database(&store, &db, &[]).unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.excluded, 2);
        assert_eq!(db.all_filenames().unwrap(), vec!["bob-20221212.md"]);
    }

    #[test]
    fn test_sync_extracts_tags() {
        let (store, db, _temp) = setup();
        store
            .write("bob-20221212.md", "# bob\n<? keywords: budget ?>\n<? speakers: alice ?>\n")
            .unwrap();

        update_database(&store, &db, &[]).unwrap();
        let found = db
            .find_by_tag(crate::models::TagKind::Speaker, "alice", false)
            .unwrap();
        assert_eq!(found, vec!["bob-20221212.md"]);
    }
}
