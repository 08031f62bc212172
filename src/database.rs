//! Revision database for noted.
//!
//! Every stored version of a note is kept as an immutable row keyed by
//! `(filename, timestamp)`. The [`Database`] type only offers inserts and
//! queries; the schema additionally installs triggers that abort any
//! `UPDATE` or `DELETE` on the `notes` table.
//!
//! Keywords, attendees (`present`) and speakers are stored in their own
//! tables and linked to revisions through join tables.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{NotedError, NotedResult};
use crate::models::{NoteRevision, TagKind, Tags};
use crate::validation::{normalize_timestamp, validate_filename, validate_tag_name};

/// Database wrapper for SQLite operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database file
    pub fn new<P: AsRef<Path>>(db_path: P) -> NotedResult<Self> {
        let conn = Connection::open(db_path.as_ref())?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let db = Self { conn };
        db.init_database()?;
        tracing::debug!("Opened revision database {}", db_path.as_ref().display());
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn new_in_memory() -> NotedResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_database()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_database(&self) -> NotedResult<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                body TEXT NOT NULL,
                UNIQUE (filename, timestamp)
            );

            CREATE TABLE IF NOT EXISTS keywords (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS present (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS speakers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS notes_keywords (
                note_id INTEGER NOT NULL,
                meta_id INTEGER NOT NULL,
                PRIMARY KEY (note_id, meta_id),
                FOREIGN KEY (note_id) REFERENCES notes (id),
                FOREIGN KEY (meta_id) REFERENCES keywords (id)
            );

            CREATE TABLE IF NOT EXISTS notes_present (
                note_id INTEGER NOT NULL,
                meta_id INTEGER NOT NULL,
                PRIMARY KEY (note_id, meta_id),
                FOREIGN KEY (note_id) REFERENCES notes (id),
                FOREIGN KEY (meta_id) REFERENCES present (id)
            );

            CREATE TABLE IF NOT EXISTS notes_speakers (
                note_id INTEGER NOT NULL,
                meta_id INTEGER NOT NULL,
                PRIMARY KEY (note_id, meta_id),
                FOREIGN KEY (note_id) REFERENCES notes (id),
                FOREIGN KEY (meta_id) REFERENCES speakers (id)
            );

            CREATE INDEX IF NOT EXISTS idx_notes_filename ON notes (filename);
            CREATE INDEX IF NOT EXISTS idx_notes_timestamp ON notes (timestamp);
            CREATE INDEX IF NOT EXISTS idx_keywords_name ON keywords (name);

            -- Revisions are an append-only log
            CREATE TRIGGER IF NOT EXISTS notes_no_update
            BEFORE UPDATE ON notes
            BEGIN
                SELECT RAISE(ABORT, 'note revisions are immutable');
            END;

            CREATE TRIGGER IF NOT EXISTS notes_no_delete
            BEFORE DELETE ON notes
            BEGIN
                SELECT RAISE(ABORT, 'note revisions are immutable');
            END;
            "#,
        )?;
        Ok(())
    }

    fn row_to_revision(row: &Row) -> rusqlite::Result<NoteRevision> {
        Ok(NoteRevision {
            id: row.get(0)?,
            filename: row.get(1)?,
            timestamp: row.get(2)?,
            text: row.get(3)?,
        })
    }

    /// Append a revision.
    ///
    /// `timestamp` may use any RFC 3339 offset; it is stored in UTC with
    /// second precision. The row and its tag links are written in one
    /// transaction. A row with the same `(filename, timestamp)` is never
    /// replaced: that case is reported as [`NotedError::Conflict`].
    pub fn record(
        &self,
        filename: &str,
        timestamp: &str,
        text: &str,
        tags: &Tags,
    ) -> NotedResult<NoteRevision> {
        validate_filename(filename, "filename")?;
        let timestamp = normalize_timestamp(timestamp, "timestamp")?;
        let timestamp = timestamp.as_str();

        let tx = self.conn.unchecked_transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM notes WHERE filename = ? AND timestamp = ?",
                params![filename, timestamp],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(NotedError::conflict(format!(
                "attempt to overwrite revision {} at {}",
                filename, timestamp
            )));
        }

        tx.execute(
            "INSERT INTO notes (filename, timestamp, body) VALUES (?, ?, ?)",
            params![filename, timestamp, text],
        )?;
        let note_id = tx.last_insert_rowid();

        for kind in TagKind::ALL {
            for name in tags.names(kind) {
                let name = name.trim();
                if validate_tag_name(name).is_err() {
                    tracing::debug!("Skipping invalid {} tag {:?}", kind.table(), name);
                    continue;
                }
                Self::link_tag(&tx, kind, name, note_id)?;
            }
        }

        tx.commit()?;
        tracing::debug!("Recorded revision {} of {} at {}", note_id, filename, timestamp);

        Ok(NoteRevision {
            id: note_id,
            filename: filename.to_string(),
            timestamp: timestamp.to_string(),
            text: text.to_string(),
        })
    }

    /// Create the tag if absent and link it to a revision
    fn link_tag(conn: &Connection, kind: TagKind, name: &str, note_id: i64) -> NotedResult<i64> {
        conn.execute(
            &format!("INSERT OR IGNORE INTO {} (name) VALUES (?)", kind.table()),
            params![name],
        )?;
        let meta_id: i64 = conn.query_row(
            &format!("SELECT id FROM {} WHERE name = ?", kind.table()),
            params![name],
            |row| row.get(0),
        )?;
        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} (note_id, meta_id) VALUES (?, ?)",
                kind.link_table()
            ),
            params![note_id, meta_id],
        )?;
        Ok(meta_id)
    }

    /// The most recent revision of a note
    pub fn latest(&self, filename: &str) -> NotedResult<Option<NoteRevision>> {
        let revision = self
            .conn
            .query_row(
                r#"
                SELECT id, filename, timestamp, body
                FROM notes
                WHERE filename = ?
                ORDER BY timestamp DESC, id DESC
                LIMIT 1
                "#,
                params![filename],
                Self::row_to_revision,
            )
            .optional()?;
        Ok(revision)
    }

    /// A specific revision of a note
    pub fn revision(&self, filename: &str, timestamp: &str) -> NotedResult<Option<NoteRevision>> {
        let timestamp = normalize_timestamp(timestamp, "timestamp")?;
        let revision = self
            .conn
            .query_row(
                "SELECT id, filename, timestamp, body FROM notes WHERE filename = ? AND timestamp = ?",
                params![filename, timestamp],
                Self::row_to_revision,
            )
            .optional()?;
        Ok(revision)
    }

    /// All revisions of a note, newest first
    pub fn history(&self, filename: &str) -> NotedResult<Vec<NoteRevision>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, filename, timestamp, body
            FROM notes
            WHERE filename = ?
            ORDER BY timestamp DESC, id DESC
            "#,
        )?;
        let revisions = stmt
            .query_map(params![filename], Self::row_to_revision)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(revisions)
    }

    /// Distinct filenames matching `filename`, newest revision first.
    ///
    /// With `wildcard` the match is a case-insensitive substring match;
    /// otherwise it is exact.
    pub fn find_by_filename(&self, filename: &str, wildcard: bool) -> NotedResult<Vec<String>> {
        let (operator, value) = if wildcard {
            ("LIKE", format!("%{}%", filename))
        } else {
            ("=", filename.replace('%', ""))
        };
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT filename
            FROM notes
            WHERE filename {} ?
            GROUP BY filename
            ORDER BY MAX(timestamp) DESC, filename
            "#,
            operator
        ))?;
        let names = stmt
            .query_map(params![value], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        tracing::debug!("Found {} notes for filename search {:?}", names.len(), filename);
        Ok(names)
    }

    /// Distinct filenames with a revision linked to a matching tag, newest first
    pub fn find_by_tag(&self, kind: TagKind, name: &str, wildcard: bool) -> NotedResult<Vec<String>> {
        let (operator, value) = if wildcard {
            ("LIKE", format!("%{}%", name))
        } else {
            ("=", name.replace('%', ""))
        };
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT n.filename
            FROM notes n
            WHERE n.id IN (
                SELECT l.note_id FROM {link} l
                JOIN {table} t ON l.meta_id = t.id
                WHERE t.name {op} ?
            )
            GROUP BY n.filename
            ORDER BY MAX(n.timestamp) DESC, n.filename
            "#,
            link = kind.link_table(),
            table = kind.table(),
            op = operator
        ))?;
        let names = stmt
            .query_map(params![value], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        tracing::debug!(
            "Found {} notes when searching {} for {:?}",
            names.len(),
            kind.table(),
            name
        );
        Ok(names)
    }

    /// Every filename with at least one revision, newest first
    pub fn all_filenames(&self) -> NotedResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT filename FROM notes GROUP BY filename ORDER BY MAX(timestamp) DESC, filename",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Tags linked to one revision
    pub fn tags_for(&self, revision_id: i64) -> NotedResult<Tags> {
        let mut tags = Tags::default();
        for kind in TagKind::ALL {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT t.name FROM {table} t JOIN {link} l ON l.meta_id = t.id WHERE l.note_id = ? ORDER BY t.name",
                table = kind.table(),
                link = kind.link_table()
            ))?;
            let names = stmt
                .query_map(params![revision_id], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            match kind {
                TagKind::Keyword => tags.keywords = names,
                TagKind::Present => tags.present = names,
                TagKind::Speaker => tags.speakers = names,
            }
        }
        Ok(tags)
    }

    /// Number of revision rows
    pub fn count(&self) -> NotedResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Close the database connection
    pub fn close(self) -> NotedResult<()> {
        self.conn
            .close()
            .map_err(|(_, e)| NotedError::Database(e))?;
        Ok(())
    }
}
