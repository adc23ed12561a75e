//! Post-build finishing passes over the compiled site.
//!
//! Stage 5 of the build pipeline, run after the external site compiler:
//!
//! - **URL rewriting** — root-relative `href`/`src` attributes in HTML and
//!   root-relative `url(...)` references in CSS gain the branch segment, so
//!   a build of branch `v2` serves correctly from `/v2/`. Protocol-relative
//!   URLs (`//cdn…`) are reported and left alone.
//! - **Minification** — optional per-file external compression with
//!   before/after size reporting.
//! - **Packaging** — optional tarball of the finished site, relocated into
//!   the site directory itself.
//! - **Dead-link checking** — optional run of the external checker against a
//!   locally served copy, with its CSV report parsed into failures.
//!
//! Traversals are split into a pure planning pass and an apply pass: the
//! rewrite logic itself ([`rewrite_html`], [`rewrite_css`]) never touches the
//! filesystem, which keeps it testable on plain strings.

use crate::tools::{ToolError, Toolchain};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum PostBuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("tool error: {0}")]
    Tool(#[from] ToolError),
}

static HTML_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?P<attr>href|src)\s*=\s*["'](?P<url>/[^"']*)["']"#)
        .expect("valid attribute-URL regex")
});

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(["'](?P<url>/[^"')]*)["']\)"#).expect("valid css-URL regex")
});

/// File classes the URL rewriter handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Html,
    Css,
}

/// One planned rewrite target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteTarget {
    pub path: PathBuf,
    pub kind: OutputKind,
}

/// Result of rewriting one file's content.
#[derive(Debug)]
pub struct Rewritten {
    pub content: String,
    pub replaced: usize,
    /// Protocol-relative URLs that were left untouched.
    pub skipped: Vec<String>,
}

/// Summary of a whole-tree rewrite pass.
#[derive(Debug, Default)]
pub struct RewriteReport {
    pub files: usize,
    pub replaced: usize,
    pub skipped: Vec<(PathBuf, String)>,
}

/// Walk the compiled output and list every file the rewriter applies to.
pub fn plan_rewrites(root: &Path) -> Result<Vec<RewriteTarget>, PostBuildError> {
    let mut targets = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(kind) = classify(entry.path()) else {
            continue;
        };
        targets.push(RewriteTarget {
            path: entry.path().to_path_buf(),
            kind,
        });
    }
    Ok(targets)
}

fn classify(path: &Path) -> Option<OutputKind> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    match ext.as_str() {
        "html" => Some(OutputKind::Html),
        "css" => Some(OutputKind::Css),
        _ => None,
    }
}

/// Prefix root-relative `href`/`src` attribute values with the branch
/// segment. Pure: returns the rewritten content plus the URLs it refused.
pub fn rewrite_html(content: &str, branch: &str) -> Rewritten {
    let mut replaced = 0;
    let mut skipped = Vec::new();
    let content = HTML_URL.replace_all(content, |caps: &regex::Captures| {
        let url = &caps["url"];
        if url.starts_with("//") {
            skipped.push(url.to_string());
            caps[0].to_string()
        } else {
            replaced += 1;
            format!("{}=\"/{branch}{url}\"", &caps["attr"])
        }
    });
    Rewritten {
        content: content.into_owned(),
        replaced,
        skipped,
    }
}

/// The CSS equivalent: root-relative `url(...)` references gain the branch
/// segment.
pub fn rewrite_css(content: &str, branch: &str) -> Rewritten {
    let mut replaced = 0;
    let mut skipped = Vec::new();
    let content = CSS_URL.replace_all(content, |caps: &regex::Captures| {
        let url = &caps["url"];
        if url.starts_with("//") {
            skipped.push(url.to_string());
            caps[0].to_string()
        } else {
            replaced += 1;
            format!("url('/{branch}{url}')")
        }
    });
    Rewritten {
        content: content.into_owned(),
        replaced,
        skipped,
    }
}

/// Apply the branch rewrite to every HTML and CSS file under `root`.
pub fn adjust_root_relative_urls(root: &Path, branch: &str) -> Result<RewriteReport, PostBuildError> {
    let mut report = RewriteReport::default();
    for target in plan_rewrites(root)? {
        let content = fs::read_to_string(&target.path)?;
        let rewritten = match target.kind {
            OutputKind::Html => rewrite_html(&content, branch),
            OutputKind::Css => rewrite_css(&content, branch),
        };
        if rewritten.replaced > 0 {
            fs::write(&target.path, &rewritten.content)?;
        }
        report.files += 1;
        report.replaced += rewritten.replaced;
        report
            .skipped
            .extend(rewritten.skipped.into_iter().map(|url| (target.path.clone(), url)));
    }
    Ok(report)
}

/// Before/after sizes of one minified file.
#[derive(Debug, Clone)]
pub struct MinifyStat {
    pub path: PathBuf,
    pub before: u64,
    pub after: u64,
}

impl MinifyStat {
    /// Size after minification as a percentage of the original.
    pub fn percent(&self) -> u64 {
        if self.before == 0 {
            100
        } else {
            self.after * 100 / self.before
        }
    }
}

/// Minify every HTML file under `root` in place.
pub fn minify_tree(
    toolchain: &impl Toolchain,
    root: &Path,
) -> Result<Vec<MinifyStat>, PostBuildError> {
    let mut stats = Vec::new();
    for target in plan_rewrites(root)? {
        if target.kind != OutputKind::Html {
            continue;
        }
        let before = fs::metadata(&target.path)?.len();
        toolchain.minify_html(&target.path)?;
        let after = fs::metadata(&target.path)?.len();
        stats.push(MinifyStat {
            path: target.path,
            before,
            after,
        });
    }
    Ok(stats)
}

/// Tar the finished site and move the archive into the site directory.
pub fn package_site(
    toolchain: &impl Toolchain,
    site_dir: &Path,
    archive_name: &str,
    exclude_from: Option<&Path>,
) -> Result<PathBuf, PostBuildError> {
    // Built next to the site first: the archive must not include itself.
    let scratch = site_dir
        .parent()
        .unwrap_or(site_dir)
        .join(archive_name);
    toolchain.create_archive(&scratch, site_dir, exclude_from)?;
    let target = site_dir.join(archive_name);
    fs::rename(&scratch, &target)?;
    Ok(target)
}

/// One failing link from the checker's report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLink {
    pub url: String,
    pub parent: String,
    pub warning: String,
    /// The checker's own validity verdict for the target.
    pub valid: bool,
}

/// Parse the link checker's CSV report.
///
/// The report opens with a 4-line preamble; data rows are `;`-separated.
/// Header rows (first column `urlname`) and rows with fewer than 6 columns
/// are skipped. Targets generated by a later build stage (`index.pdf`) and
/// mail addresses are expected to be unreachable and are ignored.
pub fn parse_link_report(report: &str) -> Vec<DeadLink> {
    report
        .lines()
        .skip(4)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(';').collect();
            if fields.len() < 6 || fields[0] == "urlname" {
                return None;
            }
            let url = fields[0];
            if url.ends_with("index.pdf") || url.starts_with("mailto:") {
                return None;
            }
            Some(DeadLink {
                url: url.to_string(),
                parent: fields[1].to_string(),
                warning: fields[3].to_string(),
                valid: fields[5].trim() == "True",
            })
        })
        .collect()
}

/// Run the external link checker against `url` and parse its report.
pub fn check_dead_links(
    toolchain: &impl Toolchain,
    url: &str,
) -> Result<Vec<DeadLink>, PostBuildError> {
    let report = toolchain.check_links(url)?;
    Ok(parse_link_report(&report))
}
