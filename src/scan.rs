//! Content discovery.
//!
//! Stage 1 of the build pipeline. Walks the content tree, collects Markdown
//! files, and parses each file's front-matter block into a [`ContentPage`].
//!
//! ## Exclusion Marker
//!
//! Any file or directory whose name starts with `_` is skipped, subtree
//! included. The staging mirror (`_content/`), shared layout directories
//! (`_layouts/`, `_includes/`) and other build artifacts all live behind the
//! marker, so a scan never picks up its own output.
//!
//! ## Error Policy
//!
//! A file that is not a well-formed content document — missing delimiters,
//! unparseable YAML, or no `title` key — is recorded as skipped with a reason
//! and the scan continues. Only I/O failures abort. A skipped page can never
//! be matched by the sitemap orderer, so dropping it here keeps every later
//! stage total.
//!
//! Result order follows the directory traversal (sorted by file name);
//! consumers rely only on title lookup, never on position.

use crate::frontmatter::{self, Metadata};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Path-name prefix that excludes a file or directory subtree from the scan.
pub const EXCLUSION_MARKER: char = '_';

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// A content page: source path plus parsed front matter and body.
#[derive(Debug, Clone, Serialize)]
pub struct ContentPage {
    pub path: PathBuf,
    pub meta: Metadata,
    #[serde(skip)]
    pub body: String,
}

/// A file the scanner rejected, with the reason it was rejected.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything a content scan found.
#[derive(Debug, Default, Serialize)]
pub struct ContentSet {
    pub pages: Vec<ContentPage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedFile>,
}

/// Walk `root` and collect every Markdown content page not behind the
/// exclusion marker.
pub fn scan(root: &Path) -> Result<ContentSet, ScanError> {
    let mut set = ContentSet::default();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !excluded(entry.file_name()));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_markdown(entry.path()) {
            continue;
        }
        let path = entry.path().to_path_buf();
        let text = std::fs::read_to_string(&path)?;
        match frontmatter::parse(&text) {
            Ok(doc) if doc.meta.title().is_some() => set.pages.push(ContentPage {
                path,
                meta: doc.meta,
                body: doc.body,
            }),
            Ok(_) => set.skipped.push(SkippedFile {
                path,
                reason: "front matter has no title".to_string(),
            }),
            Err(err) => set.skipped.push(SkippedFile {
                path,
                reason: err.to_string(),
            }),
        }
    }

    Ok(set)
}

/// Case-insensitive title lookup over a content set.
///
/// Returns the indexes of every page whose title matches. The sitemap orderer
/// requires exactly one; other callers may want the raw list.
pub fn find_by_title(set: &ContentSet, title: &str) -> Vec<usize> {
    let wanted = title.to_lowercase();
    set.pages
        .iter()
        .enumerate()
        .filter(|(_, page)| {
            page.meta
                .title()
                .is_some_and(|t| t.to_lowercase() == wanted)
        })
        .map(|(index, _)| index)
        .collect()
}

fn excluded(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with(EXCLUSION_MARKER)
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("md"))
        .unwrap_or(false)
}
