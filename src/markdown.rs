//! The note Markdown dialect.
//!
//! A note starts with a level-1 title, followed by metadata lines of the form
//! `<? keywords: a, b ?>` (also `present:` and `speakers:`), followed by
//! sections introduced by level-2 headings:
//!
//! ```text
//! # bob-20221212
//!
//! <? keywords: budget, planning ?>
//! <? present: bob, alice ?>
//!
//! ## Agenda
//!
//! Review the budget.
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Tags;

static KEYWORD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<\?.*keywords?:(.*)\?>$").unwrap());
static SPEAKER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<\?.*speakers?:(.*)\?>$").unwrap());
static PRESENT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<\?.*present:(.*)\?>$").unwrap());

/// A `## heading` and the text under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    pub body: String,
}

/// Structured view of a note body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteDocument {
    pub title: String,
    pub tags: Tags,
    pub sections: Vec<Section>,
}

fn split_metadata(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Drop blank lines around a section body, keeping indentation inside it.
fn trim_blank_lines(body: &str) -> String {
    let lines: Vec<&str> = body
        .lines()
        .skip_while(|line| line.trim().is_empty())
        .collect();
    lines.join("\n").trim_end().to_string()
}

impl NoteDocument {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Add or replace a section; empty headings are ignored.
    pub fn set_section(&mut self, heading: &str, body: &str) {
        let heading = heading.trim();
        if heading.is_empty() {
            tracing::warn!("Ignoring section with empty heading");
            return;
        }
        let body = trim_blank_lines(body);
        match self.sections.iter_mut().find(|s| s.heading == heading) {
            Some(section) => section.body = body,
            None => self.sections.push(Section {
                heading: heading.to_string(),
                body,
            }),
        }
    }

    /// Remove a section by heading. Returns whether it existed.
    pub fn remove_section(&mut self, heading: &str) -> bool {
        let before = self.sections.len();
        self.sections.retain(|s| s.heading != heading);
        self.sections.len() < before
    }

    /// Parse a note body. Never fails; unrecognised lines outside sections are dropped.
    ///
    /// A `# ` line is the title only before the first section. Section body
    /// lines are kept as written.
    pub fn parse(markdown: &str) -> Self {
        let mut doc = NoteDocument::default();
        let mut current: Option<(String, Vec<&str>)> = None;

        for raw in markdown.lines() {
            let line = raw.trim();
            if let (None, Some(title)) = (&current, line.strip_prefix("# ")) {
                doc.title = title.trim().to_string();
            } else if line.starts_with("<?") {
                if let Some(caps) = KEYWORD_PATTERN.captures(line) {
                    doc.tags.keywords.extend(split_metadata(&caps[1]));
                } else if let Some(caps) = SPEAKER_PATTERN.captures(line) {
                    doc.tags.speakers.extend(split_metadata(&caps[1]));
                } else if let Some(caps) = PRESENT_PATTERN.captures(line) {
                    doc.tags.present.extend(split_metadata(&caps[1]));
                }
            } else if let Some(heading) = line.strip_prefix("## ") {
                if let Some((h, lines)) = current.take() {
                    doc.set_section(&h, &lines.join("\n"));
                }
                current = Some((heading.trim().to_string(), Vec::new()));
            } else if let Some((_, lines)) = current.as_mut() {
                lines.push(raw);
            }
        }
        if let Some((h, lines)) = current {
            doc.set_section(&h, &lines.join("\n"));
        }
        doc
    }

    /// Render back to Markdown.
    pub fn to_markdown(&self) -> String {
        let mut lines = vec![format!("# {}\n", self.title)];
        if !self.tags.keywords.is_empty() {
            lines.push(format!("<? keywords: {} ?>", self.tags.keywords.join(", ")));
        }
        if !self.tags.present.is_empty() {
            lines.push(format!("<? present: {} ?>", self.tags.present.join(", ")));
        }
        if !self.tags.speakers.is_empty() {
            lines.push(format!("<? speakers: {} ?>", self.tags.speakers.join(", ")));
        }
        lines.push(String::new());
        for section in &self.sections {
            lines.push(format!("## {}\n\n{}", section.heading, section.body));
            lines.push(String::new());
        }
        lines.join("\n")
    }
}

/// Split a comma separated list from a form field, dropping empty entries.
pub fn word_list(words: &str) -> Vec<String> {
    split_metadata(words).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# Weekly sync\n\n<? keywords: budget, planning ?>\n<? present: bob; alice ?>\n<? speaker: bob ?>\n\n## Agenda\n\nReview the budget.\nAssign owners.\n\n## Actions\n\nbob: draft plan\n";

    #[test]
    fn test_parse_title_and_metadata() {
        let doc = NoteDocument::parse(SAMPLE);
        assert_eq!(doc.title, "Weekly sync");
        assert_eq!(doc.tags.keywords, vec!["budget", "planning"]);
        assert_eq!(doc.tags.present, vec!["bob", "alice"]);
        assert_eq!(doc.tags.speakers, vec!["bob"]);
    }

    #[test]
    fn test_parse_sections() {
        let doc = NoteDocument::parse(SAMPLE);
        assert_eq!(doc.sections.len(), 2);
        assert_eq!(doc.sections[0].heading, "Agenda");
        assert_eq!(doc.sections[0].body, "Review the budget.\nAssign owners.");
        assert_eq!(doc.sections[1].heading, "Actions");
        assert_eq!(doc.sections[1].body, "bob: draft plan");
    }

    #[test]
    fn test_render_then_parse_keeps_structure() {
        let mut doc = NoteDocument::new("bob-20221212");
        doc.tags.keywords = vec!["budget".into()];
        doc.tags.present = vec!["bob".into(), "alice".into()];
        doc.set_section("Notes", "first line\nsecond line");

        let text = doc.to_markdown();
        assert!(text.starts_with("# bob-20221212\n"));
        assert!(text.contains("<? keywords: budget ?>"));
        assert!(text.contains("<? present: bob, alice ?>"));
        assert!(!text.contains("speakers"));

        assert_eq!(NoteDocument::parse(&text), doc);
    }

    #[test]
    fn test_sections_replace_and_remove() {
        let mut doc = NoteDocument::new("t");
        doc.set_section("A", "one");
        doc.set_section("A", "two");
        doc.set_section("", "ignored");
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].body, "two");
        assert!(doc.remove_section("A"));
        assert!(!doc.remove_section("A"));
    }

    #[test]
    fn test_section_body_keeps_indentation() {
        let text = "# Title\n\n## Code\n\n    let x = 1;\n- item\n  - nested\n# not a title\n";
        let doc = NoteDocument::parse(text);
        assert_eq!(doc.title, "Title");
        assert_eq!(
            doc.sections[0].body,
            "    let x = 1;\n- item\n  - nested\n# not a title"
        );
        assert_eq!(NoteDocument::parse(&doc.to_markdown()), doc);
    }

    #[test]
    fn test_plain_text_has_no_metadata() {
        let doc = NoteDocument::parse("just some text\nwith no structure");
        assert!(doc.title.is_empty());
        assert!(doc.tags.is_empty());
        assert!(doc.sections.is_empty());
    }

    #[test]
    fn test_word_list() {
        assert_eq!(word_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(word_list("").is_empty());
    }
}
