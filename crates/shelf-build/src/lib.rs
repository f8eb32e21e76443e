//! Static site builds for shelf.
//!
//! A build takes an ordered list of [`Entry`] values, each naming an output
//! HTML path plus a page renderer and a shell renderer, and writes:
//!
//! - one HTML file per entry,
//! - one content-addressed payload file per entry,
//! - one content-addressed file per deferred fragment.
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> Result<(), shelf_build::BuildError> {
//! use std::path::Path;
//! use shelf_build::{BuildConfig, SiteBuilder, template_entry};
//!
//! let entries = vec![template_entry(Path::new("site"), "index.html", Path::new("index.txt"), None)];
//! let report = SiteBuilder::new(BuildConfig::default()).build(&entries).await?;
//! println!("{} pages", report.pages.len());
//! # Ok(())
//! # }
//! ```

mod base_path;
mod builder;
mod entry;
mod error;
mod render;
mod template;

pub use base_path::{strip_base_path, with_base_path};
pub use builder::{BuildConfig, BuildReport, FragmentReport, PageReport, SiteBuilder};
pub use entry::{Entry, PAGE_EXTENSIONS, check_duplicate_paths, validate_entries, validate_entry_path};
pub use error::BuildError;
pub use render::{
    APP_ENTRY_MARKER, CLIENT_MANIFEST_GLOBAL, PAYLOAD_PATH_PLACEHOLDER, PageRenderer,
    ShellContext, ShellRenderer,
};
pub use template::{
    DefaultShell, TemplatePage, TemplateShell, expand_directives, fill_shell, template_entry,
};
