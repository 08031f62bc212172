//! Data models for noted.
//!
//! This module defines the revision record stored in the database, the tag
//! kinds that can be attached to a revision, and timestamp helpers.
//! Timestamps are RFC 3339 UTC strings with second precision so that string
//! order equals time order.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Format a timestamp the way revisions are keyed, e.g. `2022-09-10T11:01:00Z`
pub fn format_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current time as a revision timestamp
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// An immutable snapshot of a note body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRevision {
    /// Surrogate row id, used by the tag join tables
    pub id: i64,
    /// Note filename (no directory), e.g. `bob-20221212.md`
    pub filename: String,
    /// RFC 3339 timestamp of this snapshot
    pub timestamp: String,
    /// Full note body at `timestamp`
    pub text: String,
}

impl NoteRevision {
    /// Body length in characters
    pub fn chars(&self) -> usize {
        self.text.chars().count()
    }
}

/// The three tag tables a revision can be linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Keyword,
    Present,
    Speaker,
}

impl TagKind {
    pub const ALL: [TagKind; 3] = [TagKind::Keyword, TagKind::Present, TagKind::Speaker];

    /// Name of the tag table
    pub fn table(self) -> &'static str {
        match self {
            TagKind::Keyword => "keywords",
            TagKind::Present => "present",
            TagKind::Speaker => "speakers",
        }
    }

    /// Name of the join table linking notes to this tag kind
    pub fn link_table(self) -> &'static str {
        match self {
            TagKind::Keyword => "notes_keywords",
            TagKind::Present => "notes_present",
            TagKind::Speaker => "notes_speakers",
        }
    }
}

/// Tags attached to a revision when it is recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub present: Vec<String>,
    #[serde(default)]
    pub speakers: Vec<String>,
}

impl Tags {
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.present.is_empty() && self.speakers.is_empty()
    }

    /// Names for one tag kind
    pub fn names(&self, kind: TagKind) -> &[String] {
        match kind {
            TagKind::Keyword => &self.keywords,
            TagKind::Present => &self.present,
            TagKind::Speaker => &self.speakers,
        }
    }

    /// Add a keyword unless it is empty or already present
    pub fn add_keyword(&mut self, keyword: &str) {
        let keyword = keyword.trim();
        if !keyword.is_empty() && !self.keywords.iter().any(|k| k == keyword) {
            self.keywords.push(keyword.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_format() {
        let t = Utc.with_ymd_and_hms(2022, 9, 10, 11, 1, 0).unwrap();
        assert_eq!(format_timestamp(t), "2022-09-10T11:01:00Z");
    }

    #[test]
    fn test_timestamps_sort_as_strings() {
        let earlier = format_timestamp(Utc.with_ymd_and_hms(2022, 9, 2, 23, 59, 59).unwrap());
        let later = format_timestamp(Utc.with_ymd_and_hms(2022, 12, 12, 0, 0, 0).unwrap());
        assert!(earlier < later);
    }

    #[test]
    fn test_tag_tables() {
        assert_eq!(TagKind::Keyword.table(), "keywords");
        assert_eq!(TagKind::Speaker.link_table(), "notes_speakers");
    }

    #[test]
    fn test_add_keyword_dedups() {
        let mut tags = Tags::default();
        tags.add_keyword("bob");
        tags.add_keyword(" bob ");
        tags.add_keyword("");
        assert_eq!(tags.keywords, vec!["bob".to_string()]);
        assert!(!tags.is_empty());
    }
}
