//! Note filename conventions.
//!
//! Notes are named `{stem}-{yyyymmdd}.md`. The stem (leading alphabetic run)
//! groups related notes, e.g. `bob-20220902.md` and `bob-20221212.md`.

use once_cell::sync::Lazy;
use regex::Regex;

static STEM_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Za-z]+)").unwrap());

static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{8}").unwrap());

/// Strip any leading directory components (either separator style).
pub fn base_name(filename: &str) -> &str {
    filename.rsplit(['/', '\\']).next().unwrap_or(filename)
}

/// Return the grouping stem of a filename.
///
/// `None` when the name has no leading alphabetic run, e.g. `20221212.md`.
pub fn stem(filename: &str) -> Option<String> {
    STEM_PATTERN
        .captures(base_name(filename))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Filenames from `filenames` whose stem equals `wanted` (ASCII case-insensitive).
///
/// Input order is preserved. A `wanted` value that is not itself a stem
/// (empty, or not starting with a letter) matches nothing.
pub fn notes_by_stem<'a, I>(wanted: &str, filenames: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let Some(wanted) = stem(wanted.trim()) else {
        return Vec::new();
    };
    filenames
        .into_iter()
        .filter(|name| {
            stem(name)
                .map(|s| s.eq_ignore_ascii_case(&wanted))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Parts of a filename around its first 8-digit date run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilenameParts {
    pub prefix: String,
    pub date: String,
    pub postfix: String,
}

/// Split `prefix-yyyymmdd-postfix.md` into its parts.
///
/// The extension and the dashes next to the date are dropped. A name
/// without a date yields all-empty parts.
pub fn parse_filename(filename: &str) -> FilenameParts {
    let name = base_name(filename);
    let name = name.strip_suffix(".md").unwrap_or(name);
    let Some(m) = DATE_PATTERN.find(name) else {
        return FilenameParts::default();
    };
    let prefix = &name[..m.start()];
    let postfix = &name[m.end()..];
    FilenameParts {
        prefix: prefix.strip_suffix('-').unwrap_or(prefix).to_string(),
        date: m.as_str().to_string(),
        postfix: postfix.strip_prefix('-').unwrap_or(postfix).to_string(),
    }
}

/// Keywords implied by a filename.
///
/// The name (without extension) is split on `-`, or on spaces when it has
/// no dash. The first non-numeric part, the concatenated numeric parts (the
/// date) and the remaining words become keywords.
pub fn filename_keywords(filename: &str) -> Vec<String> {
    let name = base_name(filename);
    let name = name.strip_suffix(".md").unwrap_or(name);
    let items: Vec<&str> = if name.contains('-') {
        name.split('-').collect()
    } else {
        name.split(' ').collect()
    };

    let is_numeric = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());

    let mut keywords = Vec::new();
    let mut date_parts = Vec::new();
    let mut words = Vec::new();
    for (i, item) in items.iter().enumerate() {
        if is_numeric(item) {
            date_parts.push(*item);
        } else if i == 0 {
            keywords.push(item.trim().to_string());
        } else if !item.trim().is_empty() {
            words.push(item.trim());
        }
    }
    keywords.push(date_parts.concat());
    keywords.push(words.join(" "));
    keywords.retain(|k| !k.is_empty());
    keywords
}

/// Editor scratch and lock files (`#name#`, `.#name`) that never count as notes.
pub fn is_scratch_file(filename: &str) -> bool {
    let name = base_name(filename);
    name.starts_with('#') || name.starts_with(".#")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_of_dated_note() {
        assert_eq!(stem("bob-20221212.md").as_deref(), Some("bob"));
        assert_eq!(stem("bob-20220902.md").as_deref(), Some("bob"));
    }

    #[test]
    fn test_stem_strips_directories() {
        assert_eq!(stem("/home/me/notes/harry-20221212.md").as_deref(), Some("harry"));
        assert_eq!(stem("C:\\notes\\lesley-20220830.md").as_deref(), Some("lesley"));
    }

    #[test]
    fn test_stem_without_date() {
        assert_eq!(stem("ideas.md").as_deref(), Some("ideas"));
        assert_eq!(stem("todo").as_deref(), Some("todo"));
    }

    #[test]
    fn test_stem_stops_at_first_non_letter() {
        assert_eq!(stem("bob2-20221212.md").as_deref(), Some("bob"));
        assert_eq!(stem("team_sync-20230101.md").as_deref(), Some("team"));
    }

    #[test]
    fn test_no_alphabetic_prefix_is_no_match() {
        assert_eq!(stem("20221212.md"), None);
        assert_eq!(stem("-20221212.md"), None);
        assert_eq!(stem(""), None);
    }

    #[test]
    fn test_stem_is_deterministic() {
        for name in ["bob-20221212.md", "x.md", "99.md"] {
            assert_eq!(stem(name), stem(name));
        }
    }

    #[test]
    fn test_notes_by_stem() {
        let names: Vec<String> = [
            "bob-20221212.md",
            "bill-20220909.md",
            "bob-20220902.md",
            "bobby-20220101.md",
            "20221212.md",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let found = notes_by_stem("bob", &names);
        assert_eq!(found, vec!["bob-20221212.md".to_string(), "bob-20220902.md".to_string()]);

        let found = notes_by_stem("BOB", &names);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_notes_by_stem_accepts_filename() {
        let names = vec!["bob-20221212.md".to_string(), "bob-20220902.md".to_string()];
        assert_eq!(notes_by_stem("bob-20221212.md", &names).len(), 2);
    }

    #[test]
    fn test_notes_by_invalid_stem_is_empty() {
        let names = vec!["bob-20221212.md".to_string()];
        assert!(notes_by_stem("", &names).is_empty());
        assert!(notes_by_stem("2022", &names).is_empty());
    }

    #[test]
    fn test_parse_filename() {
        let parts = parse_filename("notes/bob-20221212-budget.md");
        assert_eq!(parts.prefix, "bob");
        assert_eq!(parts.date, "20221212");
        assert_eq!(parts.postfix, "budget");

        let parts = parse_filename("bob-20221212.md");
        assert_eq!(parts.prefix, "bob");
        assert_eq!(parts.postfix, "");

        assert_eq!(parse_filename("ideas.md"), FilenameParts::default());
    }

    #[test]
    fn test_filename_keywords() {
        assert_eq!(
            filename_keywords("bob-20221212.md"),
            vec!["bob".to_string(), "20221212".to_string()]
        );
        assert_eq!(
            filename_keywords("board-2022-12-12-budget-review.md"),
            vec!["board".to_string(), "20221212".to_string(), "budget review".to_string()]
        );
        assert_eq!(filename_keywords("20221212.md"), vec!["20221212".to_string()]);
    }

    #[test]
    fn test_scratch_files() {
        assert!(is_scratch_file("#bob-20221212.md#"));
        assert!(is_scratch_file(".#bob-20221212.md"));
        assert!(!is_scratch_file("bob-20221212.md"));
    }
}
