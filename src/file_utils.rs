//! File classification and directory enumeration.

use crate::error::Result;
use crate::state::Entry;
use log::debug;
use rayon::prelude::*;
use regex::{Regex, RegexBuilder};
use std::fs;
use std::path::Path;

/// Formatting helpers for paths in log output.
pub trait PathExt {
    fn format_for_log(&self) -> String;
}

impl PathExt for Path {
    fn format_for_log(&self) -> String {
        format!("\"{}\"", self.display())
    }
}

/// Decides which directory items belong in the listing.
///
/// The pattern is matched case-insensitively against the file name only, so a
/// directory called `photos.jpg` never matches through its parent components.
#[derive(Debug, Clone)]
pub struct FileFilter {
    regex: Regex,
}

impl FileFilter {
    /// Compiles `pattern`. Fails with `DirError::InvalidPattern` on a bad expression.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self { regex })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Pattern-only check against a bare file name.
    pub fn matches_name(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// True iff `path` is a regular file and its name matches the pattern.
    pub fn is_supported_file(&self, path: &Path) -> bool {
        is_file(path)
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| self.matches_name(name))
                .unwrap_or(false)
    }
}

/// Existence + regular-file check, following symlinks. Ignores any filter.
pub fn is_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

/// True iff `path` is an existing, readable directory.
pub fn is_directory(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false) && fs::read_dir(path).is_ok()
}

/// Stats `dir/name` into an `Entry`.
pub fn stat_entry(dir: &Path, name: &str) -> Result<Entry> {
    let metadata = fs::metadata(dir.join(name))?;
    Ok(Entry::from_metadata(name.to_string(), &metadata)?)
}

/// Enumerates `dir` and returns an `Entry` for every supported regular file.
///
/// Entries come back ordered by name. Items that vanish or fail to stat between
/// enumeration and stat are skipped.
pub fn scan_directory(dir: &Path, filter: &FileFilter) -> Result<Vec<Entry>> {
    let start = std::time::Instant::now();

    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| filter.matches_name(name))
        .collect();
    names.sort();

    // stat はディレクトリサイズに比例するので rayon で並列化（順序は collect で保持される）
    let entries: Vec<Entry> = names
        .into_par_iter()
        .filter_map(|name| match stat_entry(dir, &name) {
            Ok(entry) if !entry.is_directory => Some(entry),
            Ok(_) => None,
            Err(e) => {
                debug!("Skipping {}: {}", name, e);
                None
            }
        })
        .collect();

    debug!(
        "Scanned {} ({} entries) in {:?}",
        dir.format_for_log(),
        entries.len(),
        start.elapsed()
    );
    Ok(entries)
}
