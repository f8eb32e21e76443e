//! Build errors.

use std::path::PathBuf;

use shelf_fragments::{DrainAllError, RenderError};

/// Error returned by the site builder.
///
/// Any error aborts the whole build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Entry path starts with `/`.
    #[error(
        "Entry path must not start with \"/\": \"{0}\". Paths are relative to the output directory."
    )]
    AbsoluteEntryPath(String),

    /// Entry path climbs out of the output directory.
    #[error("Entry path must stay inside the output directory: \"{0}\"")]
    EntryPathOutsideOutDir(String),

    /// Entry path has no page extension.
    #[error("Entry path must end with \".html\" or \".htm\": \"{0}\"")]
    InvalidExtension(String),

    /// Two entries share an output path.
    #[error("Duplicate entry path: \"{0}\"")]
    DuplicateEntryPath(String),

    /// Page or shell rendering failed.
    #[error("Failed to render {path}: {source}")]
    Render {
        /// Entry path.
        path: String,
        /// Render failure.
        source: RenderError,
    },

    /// One or more deferred fragments failed.
    #[error(transparent)]
    Fragments(#[from] DrainAllError),

    /// Writing output failed.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        /// File being written.
        path: PathBuf,
        /// I/O failure.
        source: std::io::Error,
    },
}
