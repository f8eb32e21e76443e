//! File-backed page and shell renderers.
//!
//! Page templates are plain text files. A directive defers another template
//! into its own fragment and is replaced by the fragment's id:
//!
//! ```text
//! {{ defer "partials/nav.txt" }}
//! {{ defer "partials/comments.txt" name="Comments" }}
//! ```
//!
//! Deferred templates may defer further templates. Each file is deferred once
//! per registry, keyed by its resolved path.
//!
//! Shell templates are HTML files with `{{ payload_path }}`, `{{ app }}` and
//! `{{ bootstrap }}` slots.

use std::fmt::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use bytes::Bytes;
use futures::{StreamExt, stream};
use regex::{Captures, Regex};
use shelf_fragments::{ByteStream, FragmentRegistry, RenderError, RenderSource};

use crate::entry::Entry;
use crate::render::{CLIENT_MANIFEST_GLOBAL, PageRenderer, ShellContext, ShellRenderer};

static DEFER_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{\{\s*defer\s+"([^"]+)"(?:\s+name="([^"]*)")?\s*\}\}"#)
        .unwrap()
});

static SHELL_SLOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*(payload_path|app|bootstrap)\s*\}\}").unwrap()
});

/// Page payload rendered from a template file.
#[derive(Debug, Clone)]
pub struct TemplatePage {
    source_dir: PathBuf,
    file: PathBuf,
}

impl TemplatePage {
    /// Render `file`, resolving deferred templates against `source_dir`.
    pub fn new(source_dir: impl Into<PathBuf>, file: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            file: file.into(),
        }
    }
}

impl PageRenderer for TemplatePage {
    fn render_page(&self, registry: &FragmentRegistry) -> ByteStream {
        render_template(self.source_dir.clone(), self.file.clone(), registry.clone())
    }
}

/// Deferred fragment rendered from a template file.
struct TemplateFragment {
    source_dir: PathBuf,
    file: PathBuf,
}

impl RenderSource for TemplateFragment {
    fn render(&self, registry: &FragmentRegistry) -> ByteStream {
        render_template(self.source_dir.clone(), self.file.clone(), registry.clone())
    }
}

fn render_template(source_dir: PathBuf, file: PathBuf, registry: FragmentRegistry) -> ByteStream {
    stream::once(async move {
        let text = tokio::fs::read_to_string(&file).await?;
        let expanded = expand_directives(&text, &source_dir, &registry)?;
        Ok::<_, RenderError>(Bytes::from(expanded))
    })
    .boxed()
}

/// Replace every defer directive in `text` with a registered fragment id.
pub fn expand_directives(
    text: &str,
    source_dir: &Path,
    registry: &FragmentRegistry,
) -> Result<String, RenderError> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in DEFER_DIRECTIVE.captures_iter(text) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let relative = &caps[1];
        let name = caps.get(2).map(|m| m.as_str()).filter(|n| !n.is_empty());
        let file = resolve_template(source_dir, relative)?;

        let key = file.to_string_lossy().into_owned();
        let id = registry.register_with_key(
            &key,
            TemplateFragment {
                source_dir: source_dir.to_path_buf(),
                file,
            },
            name.or(Some(relative)),
        );

        out.push_str(&text[last..whole.start]);
        out.push_str(&id);
        last = whole.end;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Resolve a deferred template path, refusing paths that leave `source_dir`.
fn resolve_template(source_dir: &Path, relative: &str) -> Result<PathBuf, RenderError> {
    let mut resolved = source_dir.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            _ => {
                return Err(RenderError::failed(format!(
                    "deferred template must be a relative path inside the source directory: \"{relative}\""
                )));
            }
        }
    }
    Ok(resolved)
}

/// Shell rendered from an HTML template file.
#[derive(Debug, Clone)]
pub struct TemplateShell {
    file: PathBuf,
}

impl TemplateShell {
    /// Render the shell from `file`.
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }
}

impl ShellRenderer for TemplateShell {
    fn render_shell(&self, context: &ShellContext) -> ByteStream {
        let file = self.file.clone();
        let context = context.clone();
        stream::once(async move {
            let template = tokio::fs::read_to_string(&file).await?;
            Ok::<_, RenderError>(Bytes::from(fill_shell(&template, &context)))
        })
        .boxed()
    }
}

/// Substitute the shell slots in `template`.
pub fn fill_shell(template: &str, context: &ShellContext) -> String {
    SHELL_SLOT
        .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
            "payload_path" => context.payload_path.clone(),
            "app" => app_element(context),
            _ => bootstrap_script(context),
        })
        .into_owned()
}

/// Minimal built-in shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultShell;

impl ShellRenderer for DefaultShell {
    fn render_shell(&self, context: &ShellContext) -> ByteStream {
        let mut html = String::with_capacity(512);
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        html.push_str("<meta charset=\"utf-8\">\n");
        html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
        let _ = writeln!(
            html,
            "<link rel=\"preload\" href=\"{}\" as=\"fetch\" crossorigin>",
            context.payload_path
        );
        html.push_str("</head>\n<body>\n");
        html.push_str(&app_element(context));
        html.push('\n');
        html.push_str(&bootstrap_script(context));
        html.push_str("\n</body>\n</html>\n");
        shelf_fragments::stream_from_string(html)
    }
}

fn app_element(context: &ShellContext) -> String {
    let content = context.ssr_content.as_deref().unwrap_or_default();
    format!("<div id=\"{}\">{content}</div>", context.app_marker)
}

fn bootstrap_script(context: &ShellContext) -> String {
    let manifest = serde_json::json!({
        "payload": context.payload_path,
        "build": context.build,
    });
    format!("<script>window.{CLIENT_MANIFEST_GLOBAL} = {manifest};</script>")
}

/// Entry backed by template files.
///
/// `page` and `shell` are resolved against `source_dir`. Without a shell
/// template the [`DefaultShell`] is used.
pub fn template_entry(source_dir: &Path, path: &str, page: &Path, shell: Option<&Path>) -> Entry {
    let page = TemplatePage::new(source_dir, source_dir.join(page));
    match shell {
        Some(shell) => Entry::new(path, TemplateShell::new(source_dir.join(shell)), page),
        None => Entry::new(path, DefaultShell, page),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use shelf_fragments::{PAYLOAD_ID_PREFIX, drain_stream};
    use tempfile::TempDir;

    use super::*;
    use crate::render::{APP_ENTRY_MARKER, PAYLOAD_PATH_PLACEHOLDER};

    fn write(dir: &TempDir, relative: &str, content: &str) {
        let path = dir.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_expand_without_directives() {
        let registry = FragmentRegistry::new();
        let out = expand_directives("plain text", Path::new("/src"), &registry).unwrap();
        assert_eq!(out, "plain text");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_expand_registers_fragments() {
        let registry = FragmentRegistry::new();
        let text = r#"<a>{{ defer "nav.txt" }}</a><b>{{defer "side.txt" name="Side"}}</b>"#;
        let out = expand_directives(text, Path::new("/src"), &registry).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(out.starts_with(&format!("<a>{PAYLOAD_ID_PREFIX}nav_txt-")));
        assert!(out.contains(&format!("<b>{PAYLOAD_ID_PREFIX}Side-")));
        assert!(!out.contains("{{"));
    }

    #[test]
    fn test_same_file_deferred_once() {
        let registry = FragmentRegistry::new();
        let text = r#"{{ defer "nav.txt" }}|{{ defer "./nav.txt" }}|{{ defer "nav.txt" }}"#;
        let out = expand_directives(text, Path::new("/src"), &registry).unwrap();
        let parts: Vec<_> = out.split('|').collect();
        assert_eq!(parts[0], parts[1]);
        assert_eq!(parts[0], parts[2]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_parent_directory_rejected() {
        let registry = FragmentRegistry::new();
        let err = expand_directives(r#"{{ defer "../secret.txt" }}"#, Path::new("/src"), &registry)
            .unwrap_err();
        assert!(err.to_string().contains("../secret.txt"));
    }

    #[tokio::test]
    async fn test_template_page_reads_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, "pages/index.txt", r#"home {{ defer "parts/nav.txt" }}"#);
        write(&dir, "parts/nav.txt", "nav");

        let registry = FragmentRegistry::new();
        let page = TemplatePage::new(dir.path(), dir.path().join("pages/index.txt"));
        let payload = drain_stream(page.render_page(&registry)).await.unwrap();

        assert!(payload.starts_with("home shelf-payload/"));
        let fragments = registry.drain_all().collect_all().await.unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].content, "nav");
    }

    #[tokio::test]
    async fn test_missing_template_is_render_error() {
        let dir = TempDir::new().unwrap();
        let registry = FragmentRegistry::new();
        let page = TemplatePage::new(dir.path(), dir.path().join("missing.txt"));
        let err = drain_stream(page.render_page(&registry)).await.unwrap_err();
        assert!(matches!(err, RenderError::Io(_)));
    }

    #[test]
    fn test_fill_shell() {
        let context = ShellContext {
            payload_path: "/p.txt".to_owned(),
            app_marker: APP_ENTRY_MARKER,
            ssr_content: Some("<h1>hi</h1>".to_owned()),
            build: true,
        };
        let html = fill_shell(
            "<link href=\"{{ payload_path }}\">{{app}}{{ bootstrap }}{{ other }}",
            &context,
        );
        assert!(html.starts_with(
            "<link href=\"/p.txt\"><div id=\"__SHELF_APP_ENTRY__\"><h1>hi</h1></div>"
        ));
        assert!(html.contains("<script>window.__SHELF_CLIENT_MANIFEST__ = {"));
        assert!(html.contains("\"payload\":\"/p.txt\""));
        assert!(html.ends_with("</script>{{ other }}"));
    }

    #[tokio::test]
    async fn test_default_shell_contains_placeholder() {
        let html = drain_stream(DefaultShell.render_shell(&ShellContext::for_build(None)))
            .await
            .unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(&format!("href=\"{PAYLOAD_PATH_PLACEHOLDER}\"")));
        assert!(html.contains(APP_ENTRY_MARKER));
    }

    #[tokio::test]
    async fn test_template_entry_builds() {
        let dir = TempDir::new().unwrap();
        write(&dir, "index.txt", r#"hello {{ defer "card.txt" name="card" }}"#);
        write(&dir, "card.txt", "card body");
        write(&dir, "shell.html", "<html>{{ payload_path }}|{{ app }}</html>");
        let out = dir.path().join("out");

        let entries = vec![template_entry(
            dir.path(),
            "index.html",
            Path::new("index.txt"),
            Some(Path::new("shell.html")),
        )];
        let builder = crate::SiteBuilder::new(crate::BuildConfig {
            out_dir: out.clone(),
            ..crate::BuildConfig::default()
        });
        let report = builder.build(&entries).await.unwrap();

        let html = std::fs::read_to_string(out.join("index.html")).unwrap();
        assert!(html.starts_with(&format!("<html>{}|", report.pages[0].payload_path)));
        assert_eq!(report.fragments.len(), 1);
        assert_eq!(report.fragments[0].name.as_deref(), Some("card"));
    }
}
