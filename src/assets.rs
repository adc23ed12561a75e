//! Shared-resource staging.
//!
//! Pages go through the rewrite/convert path; everything else the compiled
//! site needs — include fragments, layout templates, attachments, images, the
//! favicon — is copied verbatim from the content tree into the staging tree.
//! The layout variant selected for the build (`_layouts/<base>-<style>.html`)
//! is installed as the active layout (`_layouts/<base>.html`).
//!
//! Unlike the content scan, failures here are fatal: the site compiler cannot
//! produce anything sensible without its layouts and includes.

use crate::config::LayoutStyle;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to copy {from} to {to}: {source}")]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

/// Directories copied verbatim from the content root into the staging root.
const RESOURCE_DIRS: &[&str] = &["_includes", "_layouts", "attachments", "img"];

/// Files copied verbatim from the content root into the staging root.
const RESOURCE_FILES: &[&str] = &["favicon.ico"];

/// Copy the shared resources and install the selected layout variant.
pub fn copy_resources(
    content_root: &Path,
    staging_root: &Path,
    layout: LayoutStyle,
    layout_template: &str,
) -> Result<(), AssetError> {
    for dir in RESOURCE_DIRS {
        let from = content_root.join(dir);
        let to = staging_root.join(dir);
        copy_dir_recursive(&from, &to).map_err(|source| AssetError::CopyFailed {
            from,
            to,
            source,
        })?;
    }
    for file in RESOURCE_FILES {
        copy_file(&content_root.join(file), &staging_root.join(file))?;
    }

    let variant = format!("{layout_template}-{}.html", layout.as_str());
    let active = format!("{layout_template}.html");
    copy_file(
        &content_root.join("_layouts").join(variant),
        &staging_root.join("_layouts").join(active),
    )?;

    Ok(())
}

/// Copy a file, creating the target's parent directories as needed.
pub fn copy_file(from: &Path, to: &Path) -> Result<(), AssetError> {
    let copy = || -> std::io::Result<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(from, to)?;
        Ok(())
    };
    copy().map_err(|source| AssetError::CopyFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

/// Recursively copy a directory tree.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if from.is_dir() {
            copy_dir_recursive(&from, &to)?;
        } else {
            fs::copy(&from, &to)?;
        }
    }
    Ok(())
}
