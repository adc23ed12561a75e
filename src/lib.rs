//! # Docstage
//!
//! A build pipeline for a Markdown documentation site with a manually curated
//! sitemap. Pages are ordinary Markdown files with YAML front matter; a flat
//! `sitemap.txt` outline defines their order, nesting, and grouping. Every
//! heavy transformation — Markdown conversion, stylesheet compilation, site
//! compilation, minification, link checking — is delegated to an external
//! tool, so the crate itself is discovery, metadata rewriting, and
//! orchestration.
//!
//! # Architecture: Sequential Build Pipeline
//!
//! A build runs as a strict sequence of stages over a staging tree:
//!
//! ```text
//! 1. Scan       content/    →  pages + front matter  (filesystem → structured data)
//! 2. Order      sitemap.txt →  sortkeys, groups, visibility written into metadata
//! 3. Stage      pages       →  _content/             (rewritten front matter + converted bodies)
//! 4. Compile    _content/   →  _tmp/                 (external site compiler)
//! 5. Finish     _tmp/       →  _site[/branch]/       (URL rewriting, minify, tarball, link check)
//! ```
//!
//! Stages 1–2 are pure in-memory transformations and independently testable;
//! stage 3 writes the staging mirror; stages 4–5 wrap external tools behind
//! the [`tools::Toolchain`] seam so the orchestration is testable with a
//! recording mock.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Stage 1 — walks the content tree, parses front matter, produces the content set |
//! | [`sitemap`] | Stage 2 — outline parsing and ordering-metadata assignment |
//! | [`stage`] | Stage 3 — front-matter rewriting, figure assets, processor invocation, staged writes |
//! | [`assets`] | shared-resource staging (includes, layouts, attachments, favicon, layout variant) |
//! | [`pipeline`] | stage 4 + orchestration — compiler settings, branch handling, the full build |
//! | [`postbuild`] | stage 5 — URL rewriting, minification, packaging, dead-link report parsing |
//! | [`frontmatter`] | front-matter block parsing and string-coerced re-serialization |
//! | [`config`] | `config.toml` loading, validation, and the stock config template |
//! | [`tools`] | external tool seam: the `Toolchain` trait and its subprocess implementation |
//! | [`output`] | CLI output formatting — pure line builders plus print wrappers |
//!
//! # Design Decisions
//!
//! ## External Tools, Not Libraries
//!
//! The site compiler, Markdown processor, LESS compiler, HTML compressor, and
//! link checker are all invoked as subprocesses. They are mature tools with
//! their own release cadences; wrapping them keeps this crate a thin
//! orchestrator and makes every one of them swappable from `config.toml`.
//! A non-zero exit from any of them aborts the build — a half-compiled tree
//! is worse than no tree.
//!
//! ## The Sitemap Is the Source of Truth
//!
//! Navigation order never comes from the filesystem. `sitemap.txt` names every
//! page by title; each title must match exactly one page, case-insensitively,
//! and any mismatch aborts the build naming the offending title. This makes a
//! stale sitemap a loud configuration error instead of a silently wrong menu.
//!
//! ## Front Matter Round-Trips as Strings
//!
//! Rewritten metadata is emitted as plain `key: value` lines. Sort keys like
//! `001.000` carry leading zeros and a literal dot; a structured YAML
//! re-serialization would turn them into numbers, so values are coerced to
//! strings on the way out and the sortkey stays a literal string end to end.

pub mod assets;
pub mod config;
pub mod frontmatter;
pub mod output;
pub mod pipeline;
pub mod postbuild;
pub mod scan;
pub mod sitemap;
pub mod stage;
pub mod tools;
