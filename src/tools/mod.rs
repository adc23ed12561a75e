//! External tool invocation — every heavy transformation behind one seam.
//!
//! | Concern | Default tool |
//! |---|---|
//! | **Markdown conversion** | `academicmd` (stdin → stdout) |
//! | **Stylesheet compilation** | `lesscpy` (CSS on stdout) |
//! | **Site compilation** | `jekyll` (run in the project directory) |
//! | **HTML minification** | `htmlcompressor.jar` (in place) |
//! | **Packaging** | `tar` |
//! | **Link checking** | `linkchecker` (CSV on stdout) |
//! | **Branch / revision queries** | `git` |
//!
//! The module is split into:
//! - **Backend**: the [`Toolchain`] trait + [`SystemToolchain`], the
//!   subprocess implementation configured from `config.toml`
//! - A recording mock under `#[cfg(test)]` so pipeline logic is testable
//!   without any of the tools installed

pub mod backend;

pub use backend::{ProcessorConfig, Revision, SystemToolchain, ToolError, Toolchain};
