//! Sitemap outline parsing and ordering-metadata assignment.
//!
//! Stage 2 of the build pipeline. The sitemap is a flat, indentation-based
//! outline naming every page by title:
//!
//! ```text
//! # comment lines and blank lines are ignored
//! Home
//! Usage
//! \tInstallation
//! \t:Legacy installation
//! Reference
//! ```
//!
//! A leading tab nests an entry one level under the previous top-level entry;
//! a leading `:` keeps an entry out of the rendered navigation while still
//! building the page. Ordering assigns each matched page a fixed-width sort
//! key, its nesting level, its visibility flag, and a group label — declared
//! by top-level entries (from the matched page's own front matter) and
//! inherited by nested ones.
//!
//! ## Matching
//!
//! Every entry must match exactly one scanned page by case-insensitive full
//! title. Zero or multiple matches abort the build with an error naming the
//! title: a stale sitemap is a configuration error, not a warning.
//!
//! ## Sort Keys
//!
//! The major counter advances on top-level entries, the minor counter on
//! nested ones. Both are monotonic across the whole outline — the minor
//! counter is deliberately NOT reset when a new section starts, so keys read
//! `001.000`, `002.000`, `002.001`, `003.001`, … Positions stay unique and
//! ordered, which is all the consumer needs.

use crate::frontmatter::Metadata;
use crate::scan::{self, ContentSet};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SitemapError {
    #[error("sitemap entry \"{0}\" does not match any content page")]
    NotFound(String),
    #[error("sitemap entry \"{0}\" matches more than one content page")]
    MultipleMatches(String),
    #[error("top-level page \"{0}\" declares no group in its front matter")]
    MissingGroup(String),
}

/// One line of the outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    /// Page title, exclusion colon stripped.
    pub title: String,
    /// 0 for top-level entries, 1 for nested ones.
    pub level: u8,
    /// Hidden entries are built but left out of navigation display.
    pub hidden: bool,
}

/// Composite ordering counter, rendered fixed-width (`001.000`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey {
    pub major: u32,
    pub minor: u32,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}.{:03}", self.major, self.minor)
    }
}

/// Parse the outline text into entries. Blank lines and lines starting with
/// `#` are dropped; a leading tab marks a nested entry; a leading `:` marks a
/// hidden one.
pub fn parse_outline(text: &str) -> Vec<SitemapEntry> {
    text.lines()
        .filter(|line| !line.starts_with('#') && !line.trim().is_empty())
        .map(|line| {
            let level = u8::from(line.starts_with('\t'));
            let trimmed = line.trim();
            let (hidden, title) = match trimmed.strip_prefix(':') {
                Some(rest) => (true, rest),
                None => (false, trimmed),
            };
            SitemapEntry {
                title: title.to_string(),
                level,
                hidden,
            }
        })
        .collect()
}

/// Assign ordering metadata to every page named by the outline.
///
/// Mutates the matched pages' metadata in place — visibility flag, sort key
/// (as a literal string), nesting level, group, and zeroed figure/video/
/// listing/table counters — and returns the matched page indexes in outline
/// order. Assignment happens for every entry regardless of any build filter,
/// so partial builds still see a consistent sitemap.
pub fn order(set: &mut ContentSet, outline: &[SitemapEntry]) -> Result<Vec<usize>, SitemapError> {
    let mut key = SortKey::default();
    let mut group = String::from("General");
    let mut ordered = Vec::with_capacity(outline.len());

    for entry in outline {
        if entry.level == 0 {
            key.major += 1;
        } else {
            key.minor += 1;
        }

        let matches = scan::find_by_title(set, &entry.title);
        let index = match matches.as_slice() {
            [] => return Err(SitemapError::NotFound(entry.title.clone())),
            [index] => *index,
            _ => return Err(SitemapError::MultipleMatches(entry.title.clone())),
        };

        let page = &mut set.pages[index];
        if entry.level == 0 {
            group = page
                .meta
                .group()
                .ok_or_else(|| SitemapError::MissingGroup(entry.title.clone()))?
                .to_string();
        }

        page.meta.set("show", !entry.hidden);
        page.meta.set("sortkey", key.to_string());
        page.meta.set("level", u64::from(entry.level));
        page.meta.set("group", group.as_str());
        for counter in ["figures", "videos", "listings", "tables"] {
            page.meta.set(counter, 0u64);
        }

        ordered.push(index);
    }

    Ok(ordered)
}

/// Whether a page should be written to the staging tree under an optional
/// group filter. The configured home page is always staged; everything else
/// must match the filter case-insensitively. No filter stages everything.
pub fn should_stage(meta: &Metadata, group_filter: Option<&str>, home_title: &str) -> bool {
    let Some(filter) = group_filter else {
        return true;
    };
    let in_group = meta
        .group()
        .is_some_and(|g| g.to_lowercase() == filter.to_lowercase());
    let is_home = meta
        .title()
        .is_some_and(|t| t.to_lowercase() == home_title.to_lowercase());
    in_group || is_home
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::ContentPage;
    use std::path::PathBuf;

    fn page(title: &str, group: Option<&str>) -> ContentPage {
        let mut meta = Metadata::default();
        meta.set("title", title);
        if let Some(group) = group {
            meta.set("group", group);
        }
        ContentPage {
            path: PathBuf::from(format!("content/{}.md", title.to_lowercase())),
            meta,
            body: String::from("\nBody.\n"),
        }
    }

    fn set_of(pages: Vec<ContentPage>) -> ContentSet {
        ContentSet {
            pages,
            skipped: Vec::new(),
        }
    }

    #[test]
    fn outline_skips_blanks_and_comments() {
        let entries = parse_outline("# nav\n\nHome\n\t Sub\n:Hidden\n");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].title, "Home");
        assert_eq!(entries[1].level, 1);
        assert_eq!(entries[1].title, "Sub");
        assert!(entries[2].hidden);
        assert_eq!(entries[2].title, "Hidden");
    }

    #[test]
    fn nested_entry_inherits_group() {
        // The example from the ordering contract: Intro declares Basics,
        // Subtopic inherits it.
        let mut set = set_of(vec![page("Intro", Some("Basics")), page("Subtopic", None)]);
        let outline = parse_outline("Intro\n\tSubtopic\n");
        let ordered = order(&mut set, &outline).unwrap();

        assert_eq!(ordered, vec![0, 1]);
        let intro = &set.pages[0].meta;
        assert_eq!(intro.sortkey(), Some("001.000"));
        assert_eq!(intro.get_str("group"), Some("Basics"));
        assert_eq!(intro.get("level").and_then(|v| v.as_u64()), Some(0));

        let sub = &set.pages[1].meta;
        assert_eq!(sub.sortkey(), Some("001.001"));
        assert_eq!(sub.get_str("group"), Some("Basics"));
        assert_eq!(sub.get("level").and_then(|v| v.as_u64()), Some(1));
    }

    #[test]
    fn minor_counter_is_not_reset_per_section() {
        let mut set = set_of(vec![
            page("A", Some("One")),
            page("A1", None),
            page("B", Some("Two")),
            page("B1", None),
        ]);
        let outline = parse_outline("A\n\tA1\nB\n\tB1\n");
        order(&mut set, &outline).unwrap();

        let keys: Vec<_> = set
            .pages
            .iter()
            .map(|p| p.meta.sortkey().unwrap().to_string())
            .collect();
        assert_eq!(keys, vec!["001.000", "001.001", "002.001", "002.002"]);
    }

    #[test]
    fn sort_keys_are_monotonic_in_outline_order() {
        let mut set = set_of(vec![
            page("A", Some("G")),
            page("B", Some("G")),
            page("C", Some("G")),
        ]);
        let outline = parse_outline("A\nB\n\tC\n");
        let ordered = order(&mut set, &outline).unwrap();

        let keys: Vec<String> = ordered
            .iter()
            .map(|&i| set.pages[i].meta.sortkey().unwrap().to_string())
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn hidden_entry_clears_show_flag() {
        let mut set = set_of(vec![page("Secret", Some("G"))]);
        let outline = parse_outline(":Secret\n");
        order(&mut set, &outline).unwrap();

        assert_eq!(
            set.pages[0].meta.get("show").and_then(|v| v.as_bool()),
            Some(false)
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        let mut set = set_of(vec![page("Installation", Some("Usage"))]);
        let outline = parse_outline("INSTALLATION\n");
        assert!(order(&mut set, &outline).is_ok());
    }

    #[test]
    fn unmatched_title_aborts_naming_it() {
        let mut set = set_of(vec![page("Home", Some("G"))]);
        let outline = parse_outline("Missing Page\n");
        match order(&mut set, &outline) {
            Err(SitemapError::NotFound(title)) => assert_eq!(title, "Missing Page"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_titles_abort_naming_the_title() {
        let mut set = set_of(vec![page("Twin", Some("G")), page("Twin", Some("G"))]);
        let outline = parse_outline("Twin\n");
        assert!(matches!(
            order(&mut set, &outline),
            Err(SitemapError::MultipleMatches(t)) if t == "Twin"
        ));
    }

    #[test]
    fn top_level_page_without_group_is_fatal() {
        let mut set = set_of(vec![page("Loose", None)]);
        let outline = parse_outline("Loose\n");
        assert!(matches!(
            order(&mut set, &outline),
            Err(SitemapError::MissingGroup(t)) if t == "Loose"
        ));
    }

    #[test]
    fn counters_are_zeroed() {
        let mut set = set_of(vec![page("Home", Some("G"))]);
        order(&mut set, &parse_outline("Home\n")).unwrap();
        for counter in ["figures", "videos", "listings", "tables"] {
            assert_eq!(
                set.pages[0].meta.get(counter).and_then(|v| v.as_u64()),
                Some(0),
                "{counter} not zeroed"
            );
        }
    }

    #[test]
    fn group_filter_stages_group_and_home_only() {
        let mut advanced = Metadata::default();
        advanced.set("title", "Deep Dive");
        advanced.set("group", "Advanced");

        let mut basics = Metadata::default();
        basics.set("title", "Intro");
        basics.set("group", "Basics");

        let mut home = Metadata::default();
        home.set("title", "Home");
        home.set("group", "General");

        assert!(should_stage(&advanced, Some("advanced"), "Home"));
        assert!(!should_stage(&basics, Some("Advanced"), "Home"));
        assert!(should_stage(&home, Some("Advanced"), "Home"));
        assert!(should_stage(&basics, None, "Home"));
    }
}
