//! Renderer interfaces for pages and HTML shells.

use shelf_fragments::{ByteStream, FragmentRegistry};

/// Build-time placeholder for the page payload path in a rendered shell.
pub const PAYLOAD_PATH_PLACEHOLDER: &str = "__SHELF_PAYLOAD_PATH__";

/// Element id marking where the client mounts the page.
pub const APP_ENTRY_MARKER: &str = "__SHELF_APP_ENTRY__";

/// Global holding the client manifest in the bootstrap script.
pub const CLIENT_MANIFEST_GLOBAL: &str = "__SHELF_CLIENT_MANIFEST__";

/// Renders a page payload.
///
/// The page may defer fragments into `registry` and embed their ids.
pub trait PageRenderer: Send + Sync {
    fn render_page(&self, registry: &FragmentRegistry) -> ByteStream;
}

impl<F> PageRenderer for F
where
    F: Fn(&FragmentRegistry) -> ByteStream + Send + Sync,
{
    fn render_page(&self, registry: &FragmentRegistry) -> ByteStream {
        self(registry)
    }
}

/// Input for rendering the HTML shell of one page.
#[derive(Debug, Clone)]
pub struct ShellContext {
    /// Path the client fetches the page payload from.
    ///
    /// [`PAYLOAD_PATH_PLACEHOLDER`] during builds.
    pub payload_path: String,
    /// Element id the client mounts into.
    pub app_marker: &'static str,
    /// Page payload to inline, when server-side rendering is enabled.
    pub ssr_content: Option<String>,
    /// Whether this is a static build rather than a dev request.
    pub build: bool,
}

impl ShellContext {
    /// Context for a static build.
    #[must_use]
    pub fn for_build(ssr_content: Option<String>) -> Self {
        Self {
            payload_path: PAYLOAD_PATH_PLACEHOLDER.to_owned(),
            app_marker: APP_ENTRY_MARKER,
            ssr_content,
            build: true,
        }
    }

    /// Context for a dev server request.
    #[must_use]
    pub fn for_dev(payload_path: String) -> Self {
        Self {
            payload_path,
            app_marker: APP_ENTRY_MARKER,
            ssr_content: None,
            build: false,
        }
    }
}

/// Renders the HTML document that loads a page.
pub trait ShellRenderer: Send + Sync {
    fn render_shell(&self, context: &ShellContext) -> ByteStream;
}

impl<F> ShellRenderer for F
where
    F: Fn(&ShellContext) -> ByteStream + Send + Sync,
{
    fn render_shell(&self, context: &ShellContext) -> ByteStream {
        self(context)
    }
}
