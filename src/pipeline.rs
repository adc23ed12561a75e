//! Build orchestration.
//!
//! [`build`] runs the whole pipeline, strictly sequentially: branch
//! detection, staging-tree reset, resource staging, stylesheet compilation,
//! content scan, sitemap ordering, page staging, compiler-settings
//! generation, site compilation, and the post-build finishing passes. Every
//! stage must succeed before the next one starts; there is no concurrency
//! and no partial recovery — a failed build leaves the staging tree behind
//! for inspection and returns an error saying which stage gave up.
//!
//! Directory layout around a build, all siblings inside the project
//! directory:
//!
//! ```text
//! content/      source pages, resources, stylesheets
//! sitemap.txt   the outline
//! _content/     staging mirror (recreated every build)
//! _config.yml   generated compiler settings
//! _tmp/         compiler output
//! _site[/br]/   the finished site (branch-nested on a named branch)
//! ```

use crate::assets::{self, AssetError};
use crate::config::{LayoutStyle, SiteConfig};
use crate::output;
use crate::postbuild::{self, PostBuildError};
use crate::scan::{self, ScanError};
use crate::sitemap::{self, SitemapError};
use crate::stage::{self, StageError};
use crate::tools::{ToolError, Toolchain};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("sitemap error: {0}")]
    Sitemap(#[from] SitemapError),
    #[error("staging error: {0}")]
    Stage(#[from] StageError),
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),
    #[error("tool error: {0}")]
    Tool(#[from] ToolError),
    #[error("post-build error: {0}")]
    PostBuild(#[from] PostBuildError),
    #[error("failed to write compiler settings: {0}")]
    Settings(#[from] serde_yaml::Error),
    #[error("sitemap not found at {0}")]
    MissingSitemap(PathBuf),
    #[error("compiler output not found at {0} (build without --skip-compiler first)")]
    MissingCompilerOutput(PathBuf),
}

/// What a build should do, beyond the always-on scan/order/stage core.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub layout: LayoutStyle,
    /// Restrict staging to one group (plus the home page). Ordering metadata
    /// is still assigned to every page so partial builds stay consistent.
    pub group: Option<String>,
    /// Run the external site compiler. Off, the previous compiler output is
    /// post-processed instead — the debugging loop for everything after it.
    pub run_compiler: bool,
    pub minify: bool,
    pub tarball: bool,
    pub check_links: bool,
    /// Query version control for per-page revision metadata.
    pub refresh_revisions: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            layout: LayoutStyle::Inpage,
            group: None,
            run_compiler: true,
            minify: false,
            tarball: false,
            check_links: false,
            refresh_revisions: false,
        }
    }
}

/// Settings file consumed by the external site compiler.
#[derive(Debug, Serialize)]
struct CompilerSettings<'a> {
    notifications: bool,
    status: &'a str,
    pygments: bool,
    markdown: &'a str,
    source: &'a str,
    destination: &'a str,
}

/// Run the full pipeline. Returns the finished site directory —
/// `_site/<branch>` on a named branch, `_site` otherwise.
pub fn build(
    project_dir: &Path,
    config: &SiteConfig,
    options: &BuildOptions,
    toolchain: &impl Toolchain,
) -> Result<PathBuf, BuildError> {
    let content_root = project_dir.join(&config.content_root);
    let staging_name = format!("_{}", config.content_root);
    let staging_root = project_dir.join(&staging_name);

    let branch = toolchain.branch()?;
    let status = config.status_for(&branch);
    output::print_branch_line(&branch, &status);

    if staging_root.exists() {
        fs::remove_dir_all(&staging_root)?;
    }
    fs::create_dir_all(&staging_root)?;

    assets::copy_resources(
        &content_root,
        &staging_root,
        options.layout,
        &config.layout_template,
    )?;

    let css = toolchain.compile_styles(&content_root.join(&config.stylesheet))?;
    fs::write(staging_root.join("stylesheet.css"), css)?;

    let mut set = scan::scan(&content_root)?;
    output::print_scan_output(&set);

    let sitemap_path = project_dir.join("sitemap.txt");
    if !sitemap_path.exists() {
        return Err(BuildError::MissingSitemap(sitemap_path));
    }
    let outline = sitemap::parse_outline(&fs::read_to_string(&sitemap_path)?);
    let ordered = sitemap::order(&mut set, &outline)?;

    for &index in &ordered {
        if options.refresh_revisions {
            stage::refresh_revision(project_dir, &mut set.pages[index], config, toolchain)?;
        }
        let page = &set.pages[index];
        output::print_order_line(page);
        if sitemap::should_stage(&page.meta, options.group.as_deref(), &config.home_title) {
            let staged = stage::stage_page(project_dir, page, config, toolchain)?;
            output::print_stage_warnings(&staged.warnings);
        }
    }

    let settings = CompilerSettings {
        notifications: false,
        status: &status,
        pygments: true,
        markdown: "kramdown",
        source: &staging_name,
        destination: "_tmp",
    };
    fs::write(
        project_dir.join("_config.yml"),
        serde_yaml::to_string(&settings)?,
    )?;

    if options.run_compiler {
        toolchain.compile_site(project_dir)?;
    }

    let tmp = project_dir.join("_tmp");
    if !tmp.is_dir() {
        return Err(BuildError::MissingCompilerOutput(tmp));
    }

    let site_dir = if branch.is_empty() {
        project_dir.join("_site")
    } else {
        let report = postbuild::adjust_root_relative_urls(&tmp, &branch)?;
        output::print_rewrite_report(&report);
        project_dir.join("_site").join(&branch)
    };

    if site_dir.exists() {
        fs::remove_dir_all(&site_dir)?;
    }
    if let Some(parent) = site_dir.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(&tmp, &site_dir)?;

    if options.minify {
        let stats = postbuild::minify_tree(toolchain, &site_dir)?;
        output::print_minify_stats(&stats);
    }

    if options.tarball {
        let exclude = config
            .archive_exclude
            .as_ref()
            .map(|rel| project_dir.join(rel));
        postbuild::package_site(toolchain, &site_dir, &config.archive_name, exclude.as_deref())?;
    }

    if options.check_links {
        let url = format!("{}/{}", config.check_url.trim_end_matches('/'), branch);
        let links = postbuild::check_dead_links(toolchain, &url)?;
        output::print_link_report(&links);
    }

    Ok(site_dir)
}
