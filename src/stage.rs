//! Front-matter rewriting and page staging.
//!
//! Stage 3 of the build pipeline. For each ordered page this module:
//!
//! 1. patches empty-caption image references with a fallback caption,
//! 2. copies the assets referenced by the page's inline figure blocks into
//!    the staging mirror,
//! 3. re-emits the document with its rewritten front matter and hands it to
//!    the external Markdown processor — configured per invocation with the
//!    page's `img`/`lst`/`tbl` asset directories so relative references
//!    resolve without path juggling,
//! 4. links DOI references and strips the content-root segment from
//!    generated asset URLs,
//! 5. writes the result to the staged counterpart of the source path
//!    (`content/x/y.md` → `_content/x/y.md`).
//!
//! Inline figure blocks are fenced YAML spans:
//!
//! ```text
//! %--
//! figure:
//!  source: flowchart.png
//!  caption: The build flow.
//! --%
//! ```
//!
//! An unparseable block is reported as a warning and skipped; a missing
//! figure asset is fatal.

use crate::assets;
use crate::config::SiteConfig;
use crate::frontmatter::{self, Document};
use crate::scan::ContentPage;
use crate::tools::{ProcessorConfig, ToolError, Toolchain};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Caption substituted into image references with an empty alt text.
pub const FALLBACK_ALT: &str = "No alt text specified";

#[derive(Error, Debug)]
pub enum StageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tool error: {0}")]
    Tool(#[from] ToolError),
    #[error("asset error: {0}")]
    Asset(#[from] assets::AssetError),
    #[error("page {0} is outside the project directory")]
    OutsideProject(PathBuf),
    #[error("page {0} has no permalink in its front matter")]
    MissingPermalink(PathBuf),
}

/// Result of staging one page.
#[derive(Debug)]
pub struct StagedPage {
    pub target: PathBuf,
    /// Non-fatal conditions encountered along the way (invalid figure
    /// blocks), for the build log.
    pub warnings: Vec<String>,
}

static FIGURE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)%--(.*?)--%").expect("valid figure-block regex"));

static DOI_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"doi:(10\.\d{4,9}/[^\s<>"')\]]+)"#).expect("valid DOI regex")
});

/// Map a source path to its staging counterpart: the first path component
/// below the project directory gains the exclusion-marker prefix.
pub fn staged_path(project_dir: &Path, path: &Path) -> Result<PathBuf, StageError> {
    let rel = path
        .strip_prefix(project_dir)
        .map_err(|_| StageError::OutsideProject(path.to_path_buf()))?;
    let mut components = rel.components();
    let first = components
        .next()
        .ok_or_else(|| StageError::OutsideProject(path.to_path_buf()))?;
    let staged = format!("_{}", first.as_os_str().to_string_lossy());
    Ok(project_dir.join(staged).join(components.as_path()))
}

/// Replace empty-caption image references with the fallback caption.
pub fn fix_missing_alt(body: &str) -> String {
    body.replace("![](", &format!("![{FALLBACK_ALT}]("))
}

/// Figure sources referenced by the body's inline YAML blocks, plus warnings
/// for the blocks that would not parse.
#[derive(Debug, Default)]
pub struct FigureScan {
    pub sources: Vec<String>,
    pub warnings: Vec<String>,
}

pub fn scan_figure_blocks(body: &str) -> FigureScan {
    let mut scan = FigureScan::default();
    for caps in FIGURE_BLOCK.captures_iter(body) {
        let block = &caps[1];
        match serde_yaml::from_str::<serde_yaml::Value>(block) {
            Ok(value) => {
                if let Some(source) = value
                    .get("figure")
                    .and_then(|figure| figure.get("source"))
                    .and_then(|source| source.as_str())
                {
                    scan.sources.push(source.to_string());
                }
            }
            Err(_) => scan
                .warnings
                .push(format!("invalid YAML block: {}", block.trim())),
        }
    }
    scan
}

/// Link DOI references to their resolver.
pub fn resolve_dois(text: &str) -> String {
    DOI_REFERENCE
        .replace_all(text, |caps: &regex::Captures| {
            let doi = &caps[1];
            format!("<a href=\"https://doi.org/{doi}\">doi:{doi}</a>")
        })
        .into_owned()
}

/// Strip the content-root segment from generated asset URLs — staged assets
/// are served from the site root, not from under the content directory.
pub fn normalize_asset_urls(text: &str, content_root: &str) -> String {
    text.replace(&format!("![{content_root}/"), "![/")
        .replace(&format!("({content_root}/"), "(/")
}

/// Rewrite, convert, and write one page into the staging tree.
pub fn stage_page(
    project_dir: &Path,
    page: &ContentPage,
    config: &SiteConfig,
    toolchain: &impl Toolchain,
) -> Result<StagedPage, StageError> {
    let permalink = page
        .meta
        .permalink()
        .ok_or_else(|| StageError::MissingPermalink(page.path.clone()))?;
    let slug = permalink.strip_prefix('/').unwrap_or(permalink);
    let page_dir = page.path.parent().unwrap_or(project_dir);

    let body = fix_missing_alt(&page.body);

    let figures = scan_figure_blocks(&body);
    for source in &figures.sources {
        let from = page_dir.join("img").join(slug).join(source);
        let to = staged_path(project_dir, &from)?;
        assets::copy_file(&from, &to)?;
    }

    let processor = ProcessorConfig {
        source_paths: ["img", "lst", "tbl"]
            .iter()
            .map(|kind| page_dir.join(kind).join(slug))
            .collect(),
        code_template: "jekyll".to_string(),
        figure_template: "jekyll".to_string(),
        table_template: "kramdown".to_string(),
        anchor_headers: true,
        append_header_refs: true,
        markdown_filters: false,
    };

    let document = frontmatter::render(&Document {
        meta: page.meta.clone(),
        body,
    });
    let converted = toolchain.convert_markdown(&processor, &document)?;
    let converted = resolve_dois(&converted);
    let converted = normalize_asset_urls(&converted, &config.content_root);

    let target = staged_path(project_dir, &page.path)?;
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&target, converted)?;

    Ok(StagedPage {
        target,
        warnings: figures.warnings,
    })
}

/// Write revision metadata into a page's front matter.
///
/// Sets `gitinfo` (a revision link + date snippet) and `gitlink` (the page's
/// source URL). Does nothing when no repository URL is configured; leaves any
/// existing values alone for pages the version control system doesn't know.
pub fn refresh_revision(
    project_dir: &Path,
    page: &mut ContentPage,
    config: &SiteConfig,
    toolchain: &impl Toolchain,
) -> Result<(), StageError> {
    if config.repo_url.is_empty() {
        return Ok(());
    }
    let repo = config.repo_url.trim_end_matches('/');
    let rel = page.path.strip_prefix(project_dir).unwrap_or(&page.path);

    if let Some(revision) = toolchain.revision(&page.path)? {
        page.meta.set(
            "gitinfo",
            format!(
                "Revision <a href='{repo}/commit/{}'>#{}</a> on {}",
                revision.hash, revision.short, revision.date
            ),
        );
    }
    page.meta.set(
        "gitlink",
        format!("{repo}/blob/{}/{}", config.source_branch, rel.display()),
    );
    Ok(())
}
