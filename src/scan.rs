//! Directory scanning for batch ingestion.
//!
//! Walks a root directory, applies the `[scan]` include/exclude globs to
//! root-relative paths, and derives each document's reference and title
//! from its location and content.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use spec_harness_core::heading::split_heading;

use crate::config::ScanConfig;

/// One markdown file found under the scan root.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    /// Root-relative path with `/` separators and no extension.
    pub doc_ref: String,
    pub title: String,
    pub text: String,
}

pub fn scan_directory(root: &Path, scan: &ScanConfig) -> Result<Vec<ScannedFile>> {
    if !root.is_dir() {
        bail!("Scan root is not a directory: {}", root.display());
    }

    let include_set = build_globset(&scan.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(scan.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&default_excludes)?;

    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(scan.follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        files.push(read_file(path, relative)?);
    }

    files.sort_by(|a, b| a.doc_ref.cmp(&b.doc_ref));
    tracing::debug!(root = %root.display(), files = files.len(), "scan complete");
    Ok(files)
}

/// Read a single file, deriving its reference from `relative`.
pub fn read_file(path: &Path, relative: &Path) -> Result<ScannedFile> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let stem = file_stem(path);
    let title = first_h1(&text).unwrap_or_else(|| stem.clone());

    Ok(ScannedFile {
        path: path.to_path_buf(),
        doc_ref: doc_ref_for(relative),
        title,
        text,
    })
}

/// `guides/kernel.md` → `guides/kernel`.
pub fn doc_ref_for(relative: &Path) -> String {
    relative
        .with_extension("")
        .to_string_lossy()
        .replace('\\', "/")
}

/// Text of the first level-1 heading.
pub fn first_h1(text: &str) -> Option<String> {
    text.lines()
        .filter_map(split_heading)
        .find(|(level, title)| *level == 1 && !title.is_empty())
        .map(|(_, title)| title.to_string())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}
