//! Page entries and output path validation.

use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path};
use std::sync::Arc;

use crate::BuildError;
use crate::render::{PageRenderer, ShellRenderer};

/// Extensions accepted for entry output paths.
pub const PAGE_EXTENSIONS: [&str; 2] = ["html", "htm"];

/// One page of the site.
#[derive(Clone)]
pub struct Entry {
    /// Output path relative to the output directory, e.g. `blog/post.html`.
    pub path: String,
    /// Renders the HTML document around the page.
    pub shell: Arc<dyn ShellRenderer>,
    /// Renders the page payload.
    pub page: Arc<dyn PageRenderer>,
}

impl Entry {
    /// Create an entry.
    pub fn new(
        path: impl Into<String>,
        shell: impl ShellRenderer + 'static,
        page: impl PageRenderer + 'static,
    ) -> Self {
        Self {
            path: path.into(),
            shell: Arc::new(shell),
            page: Arc::new(page),
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry").field("path", &self.path).finish_non_exhaustive()
    }
}

/// Check a single entry output path.
///
/// The path must be relative, stay inside the output directory and end with
/// `.html` or `.htm`.
pub fn validate_entry_path(path: &str) -> Result<(), BuildError> {
    if path.starts_with('/') {
        return Err(BuildError::AbsoluteEntryPath(path.to_owned()));
    }
    let escapes = Path::new(path)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_) | Component::RootDir));
    if escapes {
        return Err(BuildError::EntryPathOutsideOutDir(path.to_owned()));
    }
    let has_extension = PAGE_EXTENSIONS
        .iter()
        .any(|ext| path.strip_suffix(ext).is_some_and(|stem| stem.ends_with('.')));
    if !has_extension {
        return Err(BuildError::InvalidExtension(path.to_owned()));
    }
    Ok(())
}

/// Reject the first path that appears twice.
pub fn check_duplicate_paths<'a, I>(paths: I) -> Result<(), BuildError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for path in paths {
        if !seen.insert(path) {
            return Err(BuildError::DuplicateEntryPath(path.to_owned()));
        }
    }
    Ok(())
}

/// Validate every entry path, then check for duplicates.
pub fn validate_entries(entries: &[Entry]) -> Result<(), BuildError> {
    for entry in entries {
        validate_entry_path(&entry.path)?;
    }
    check_duplicate_paths(entries.iter().map(|e| e.path.as_str()))
}
