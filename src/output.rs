//! CLI output formatting for all pipeline stages.
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects. Non-fatal conditions
//! (skipped files, ignored URLs, invalid figure blocks) surface here and
//! only here; fatal ones travel as errors.

use crate::postbuild::{DeadLink, MinifyStat, RewriteReport};
use crate::scan::{ContentPage, ContentSet};

/// Branch banner printed at the start of a build.
pub fn format_branch_line(branch: &str, status: &str) -> Vec<String> {
    let name = if branch.is_empty() { "(none)" } else { branch };
    vec![format!("Branch: {name}"), format!("Status: {status}")]
}

/// Scan inventory: one line per page in traversal order, then the skipped
/// files with their reasons.
pub fn format_scan_output(set: &ContentSet) -> Vec<String> {
    let mut lines = vec![format!("Content ({} pages)", set.pages.len())];
    for (position, page) in set.pages.iter().enumerate() {
        lines.push(format!("+ {} ({})", page.path.display(), position + 1));
    }
    for skipped in &set.skipped {
        lines.push(format!(
            "! skipped {}: {}",
            skipped.path.display(),
            skipped.reason
        ));
    }
    lines
}

/// Ordering trace: nested entries are tab-indented under their section.
pub fn format_order_line(page: &ContentPage) -> String {
    let nested = page
        .meta
        .get("level")
        .and_then(|level| level.as_u64())
        .unwrap_or(0)
        > 0;
    let indent = if nested { "\t" } else { "" };
    format!(
        "{indent}-> {} ({})",
        page.meta.title().unwrap_or("(untitled)"),
        page.path.display()
    )
}

pub fn format_stage_warnings(warnings: &[String]) -> Vec<String> {
    warnings.iter().map(|w| format!("! {w}")).collect()
}

pub fn format_rewrite_report(report: &RewriteReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Adjusted {} root-relative URL(s) in {} file(s)",
        report.replaced, report.files
    )];
    for (path, url) in &report.skipped {
        lines.push(format!("Ignoring odd URL in {}: {url}", path.display()));
    }
    lines
}

/// Per-file minification result with sizes in kB and the size ratio.
pub fn format_minify_line(stat: &MinifyStat) -> String {
    format!(
        "Optimized: {} ({} kB -> {} kB, {}%)",
        stat.path.display(),
        stat.before / 1024,
        stat.after / 1024,
        stat.percent()
    )
}

pub fn format_link_report(links: &[DeadLink]) -> Vec<String> {
    let mut lines = Vec::new();
    for link in links {
        lines.push(link.url.clone());
        lines.push(format!("\tin {}", link.parent));
    }
    lines.push(format!("{} dead link(s) found", links.len()));
    lines
}

pub fn print_branch_line(branch: &str, status: &str) {
    print_lines(&format_branch_line(branch, status));
}

pub fn print_scan_output(set: &ContentSet) {
    print_lines(&format_scan_output(set));
}

pub fn print_order_line(page: &ContentPage) {
    println!("{}", format_order_line(page));
}

pub fn print_stage_warnings(warnings: &[String]) {
    print_lines(&format_stage_warnings(warnings));
}

pub fn print_rewrite_report(report: &RewriteReport) {
    print_lines(&format_rewrite_report(report));
}

pub fn print_minify_stats(stats: &[MinifyStat]) {
    for stat in stats {
        println!("{}", format_minify_line(stat));
    }
}

pub fn print_link_report(links: &[DeadLink]) {
    print_lines(&format_link_report(links));
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontmatter::Metadata;
    use crate::scan::SkippedFile;
    use std::path::PathBuf;

    fn page(title: &str, level: u64) -> ContentPage {
        let mut meta = Metadata::default();
        meta.set("title", title);
        meta.set("level", level);
        ContentPage {
            path: PathBuf::from("content/page.md"),
            meta,
            body: String::new(),
        }
    }

    #[test]
    fn scan_output_lists_pages_and_skips() {
        let set = ContentSet {
            pages: vec![page("Home", 0)],
            skipped: vec![SkippedFile {
                path: PathBuf::from("content/broken.md"),
                reason: "no front-matter block".to_string(),
            }],
        };

        let lines = format_scan_output(&set);
        assert_eq!(lines[0], "Content (1 pages)");
        assert_eq!(lines[1], "+ content/page.md (1)");
        assert!(lines[2].starts_with("! skipped content/broken.md"));
    }

    #[test]
    fn nested_order_lines_are_indented() {
        assert_eq!(
            format_order_line(&page("Home", 0)),
            "-> Home (content/page.md)"
        );
        assert_eq!(
            format_order_line(&page("Sub", 1)),
            "\t-> Sub (content/page.md)"
        );
    }

    #[test]
    fn minify_line_shows_size_ratio() {
        let stat = MinifyStat {
            path: PathBuf::from("_site/index.html"),
            before: 10 * 1024,
            after: 4 * 1024,
        };
        assert_eq!(
            format_minify_line(&stat),
            "Optimized: _site/index.html (10 kB -> 4 kB, 40%)"
        );
    }

    #[test]
    fn link_report_counts_failures() {
        let links = vec![DeadLink {
            url: "/missing/".to_string(),
            parent: "/index.html".to_string(),
            warning: "not found".to_string(),
            valid: false,
        }];
        let lines = format_link_report(&links);
        assert_eq!(lines.last().unwrap(), "1 dead link(s) found");
        assert_eq!(lines[1], "\tin /index.html");
    }

    #[test]
    fn empty_link_report_still_prints_count() {
        let lines = format_link_report(&[]);
        assert_eq!(lines, vec!["0 dead link(s) found"]);
    }
}
