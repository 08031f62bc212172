//! File system note store.
//!
//! One Markdown file per note inside a single notes directory. The store
//! always holds the current version of each note; history lives in the
//! revision database.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use crate::error::{NotedError, NotedResult};
use crate::validation::{validate_filename, validate_note_content, NOTE_EXTENSION};

/// Directory-backed note store
#[derive(Debug, Clone)]
pub struct NoteStore {
    notes_path: PathBuf,
}

impl NoteStore {
    /// Open the store. The directory must already exist.
    pub fn new<P: AsRef<Path>>(notes_path: P) -> NotedResult<Self> {
        let notes_path = notes_path.as_ref().to_path_buf();
        if !notes_path.is_dir() {
            return Err(NotedError::config(format!(
                "notes directory {} does not exist",
                notes_path.display()
            )));
        }
        Ok(Self { notes_path })
    }

    pub fn notes_path(&self) -> &Path {
        &self.notes_path
    }

    fn path_for(&self, filename: &str) -> NotedResult<PathBuf> {
        validate_filename(filename, "filename")?;
        Ok(self.notes_path.join(filename))
    }

    /// All note filenames, most recently modified first.
    pub fn list(&self) -> NotedResult<Vec<String>> {
        let mut notes: Vec<(SystemTime, String)> = Vec::new();
        for entry in fs::read_dir(&self.notes_path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(NOTE_EXTENSION) || !entry.file_type()?.is_file() {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            notes.push((modified, name));
        }
        notes.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        tracing::debug!("Found {} notes in {}", notes.len(), self.notes_path.display());
        Ok(notes.into_iter().map(|(_, name)| name).collect())
    }

    /// Note filenames starting with `search` (case-insensitive), newest first.
    ///
    /// A trailing `*` is accepted and ignored; an empty search lists everything.
    pub fn find_files(&self, search: &str) -> NotedResult<Vec<String>> {
        let key = search.trim().to_lowercase();
        let key = key.strip_suffix('*').unwrap_or(&key).to_string();
        let found: Vec<String> = self
            .list()?
            .into_iter()
            .filter(|name| name.to_lowercase().starts_with(&key))
            .collect();
        tracing::debug!("Found {} files starting with '{}'", found.len(), key);
        Ok(found)
    }

    /// Read a note body.
    pub fn read(&self, filename: &str) -> NotedResult<String> {
        let path = self.path_for(filename)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("Unable to find note {}", filename);
                Err(NotedError::not_found(filename))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write a note body, replacing any existing content.
    pub fn write(&self, filename: &str, text: &str) -> NotedResult<()> {
        validate_note_content(text)?;
        let path = self.path_for(filename)?;
        fs::write(&path, text)?;
        tracing::debug!("Wrote {} bytes to {}", text.len(), path.display());
        Ok(())
    }

    /// Write a new note; fails with Conflict if the file already exists.
    pub fn create(&self, filename: &str, text: &str) -> NotedResult<()> {
        validate_note_content(text)?;
        let path = self.path_for(filename)?;
        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(NotedError::conflict(format!("{} already exists", filename)));
            }
            Err(e) => return Err(e.into()),
        };
        std::io::Write::write_all(&mut file, text.as_bytes())?;
        tracing::debug!("Created {} ({} bytes)", path.display(), text.len());
        Ok(())
    }

    pub fn exists(&self, filename: &str) -> bool {
        self.path_for(filename).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Last modification time of a note.
    pub fn modified_at(&self, filename: &str) -> NotedResult<DateTime<Utc>> {
        let path = self.path_for(filename)?;
        match fs::metadata(&path) {
            Ok(meta) => Ok(DateTime::<Utc>::from(meta.modified()?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(NotedError::not_found(filename)),
            Err(e) => Err(e.into()),
        }
    }

    /// Fully qualified path for a name.
    ///
    /// A name that already contains a separator is assumed to be qualified
    /// and returned unchanged.
    pub fn full_path(&self, name: &str) -> PathBuf {
        if name.contains('/') || name.contains('\\') {
            PathBuf::from(name)
        } else {
            self.notes_path.join(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_store() -> (NoteStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = NoteStore::new(temp_dir.path()).unwrap();
        (store, temp_dir)
    }

    fn set_mtime(path: &Path, secs: u64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    #[test]
    fn test_missing_directory_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = NoteStore::new(temp_dir.path().join("missing"));
        assert!(matches!(result, Err(NotedError::Config(_))));
    }

    #[test]
    fn test_write_then_read() {
        let (store, _temp) = create_store();
        store.write("bob-20221212.md", "# bob\n").unwrap();
        assert!(store.exists("bob-20221212.md"));
        assert_eq!(store.read("bob-20221212.md").unwrap(), "# bob\n");

        store.write("bob-20221212.md", "# bob v2\n").unwrap();
        assert_eq!(store.read("bob-20221212.md").unwrap(), "# bob v2\n");
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let (store, _temp) = create_store();
        assert!(matches!(store.read("nobody-20220101.md"), Err(NotedError::NotFound(_))));
        assert!(!store.exists("nobody-20220101.md"));
    }

    #[test]
    fn test_list_only_markdown_newest_first() {
        let (store, temp) = create_store();
        store.write("bob-20220902.md", "a").unwrap();
        store.write("bob-20221212.md", "b").unwrap();
        fs::write(temp.path().join("readme.txt"), "x").unwrap();
        fs::create_dir(temp.path().join("sub.md")).unwrap();
        set_mtime(&temp.path().join("bob-20220902.md"), 1_000);
        set_mtime(&temp.path().join("bob-20221212.md"), 2_000);

        assert_eq!(store.list().unwrap(), vec!["bob-20221212.md", "bob-20220902.md"]);
    }

    #[test]
    fn test_find_files_by_prefix() {
        let (store, _temp) = create_store();
        store.write("bob-20220902.md", "a").unwrap();
        store.write("Bill-20220909.md", "b").unwrap();

        assert_eq!(store.find_files("bo").unwrap(), vec!["bob-20220902.md"]);
        assert_eq!(store.find_files("BI*").unwrap(), vec!["Bill-20220909.md"]);
        assert_eq!(store.find_files("").unwrap().len(), 2);
    }

    #[test]
    fn test_create_refuses_overwrite() {
        let (store, _temp) = create_store();
        store.create("bob-20221212.md", "first").unwrap();
        let result = store.create("bob-20221212.md", "second");
        assert!(matches!(result, Err(NotedError::Conflict(_))));
        assert_eq!(store.read("bob-20221212.md").unwrap(), "first");
    }

    #[test]
    fn test_invalid_names_rejected() {
        let (store, temp) = create_store();
        assert!(matches!(
            store.create("-20221212.md", "x"),
            Err(NotedError::Validation { .. })
        ));
        assert!(store.write("../escape.md", "x").is_err());
        assert!(fs::read_dir(temp.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_full_path() {
        let (store, temp) = create_store();
        assert_eq!(store.full_path("bob-20221212.md"), temp.path().join("bob-20221212.md"));
        assert_eq!(store.full_path("/elsewhere/x.md"), PathBuf::from("/elsewhere/x.md"));
    }

    #[test]
    fn test_modified_at() {
        let (store, temp) = create_store();
        store.write("bob-20221212.md", "a").unwrap();
        set_mtime(&temp.path().join("bob-20221212.md"), 1_670_803_200);
        let modified = store.modified_at("bob-20221212.md").unwrap();
        assert_eq!(modified.timestamp(), 1_670_803_200);
        assert!(matches!(store.modified_at("x.md"), Err(NotedError::NotFound(_))));
    }
}
