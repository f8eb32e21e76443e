//! Static site builder.
//!
//! One build renders every entry against a shared fragment registry,
//! finalizes all fragments in a single pass, then writes:
//!
//! ```text
//! <out_dir>/<entry path>                       HTML shell
//! <out_dir>/shelf__/shelf-payload/<hash>.txt   page payloads and fragments
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use shelf_fragments::{
    DrainedFragment, FragmentRegistry, content_hash, drain_stream, finalize, module_path_for,
    payload_id_for,
};

use crate::BuildError;
use crate::base_path::with_base_path;
use crate::entry::{Entry, validate_entries};
use crate::render::{PAYLOAD_PATH_PLACEHOLDER, ShellContext};

/// Configuration for a static build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Directory all output is written to.
    pub out_dir: PathBuf,
    /// URL prefix the site is served under.
    pub base_path: String,
    /// Inline page payloads into the HTML shell.
    pub ssr: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("dist/public"),
            base_path: "/".to_owned(),
            ssr: false,
        }
    }
}

/// Summary of a finished build.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    /// Written pages, in entry order.
    pub pages: Vec<PageReport>,
    /// Written fragments, dependencies first.
    pub fragments: Vec<FragmentReport>,
    /// Fragments that kept their temporary id because of a cycle.
    pub cycles: Vec<String>,
    /// Temporary id -> final id.
    pub id_mapping: BTreeMap<String, String>,
}

/// A written page.
#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    /// Entry path of the HTML file.
    pub path: String,
    /// Public path of the page payload, including the base path.
    pub payload_path: String,
}

/// A written fragment.
#[derive(Debug, Clone, Serialize)]
pub struct FragmentReport {
    /// Final id.
    pub id: String,
    /// Name given at registration.
    pub name: Option<String>,
    /// Module path of the fragment file.
    pub path: String,
}

/// Rendered but not yet finalized page.
struct RenderedPage {
    payload: String,
    shell: String,
}

/// Builds a static site from page entries.
pub struct SiteBuilder {
    config: BuildConfig,
}

impl SiteBuilder {
    /// Create a builder.
    #[must_use]
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Builder configuration.
    #[must_use]
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Render, finalize and write every entry.
    ///
    /// Entry paths are validated before anything is rendered. Fragments
    /// from all entries are finalized together. The registry used for the
    /// build is cleared before returning.
    pub async fn build(&self, entries: &[Entry]) -> Result<BuildReport, BuildError> {
        validate_entries(entries)?;

        let registry = FragmentRegistry::new();
        let result = self.build_with(&registry, entries).await;
        registry.clear();
        result
    }

    async fn build_with(
        &self,
        registry: &FragmentRegistry,
        entries: &[Entry],
    ) -> Result<BuildReport, BuildError> {
        let mut rendered = Vec::with_capacity(entries.len());
        for entry in entries {
            rendered.push(self.render_entry(registry, entry).await?);
        }

        let fragments = drain_fragments(registry).await?;
        tracing::info!(
            pages = entries.len(),
            fragments = fragments.len(),
            "Finalizing payloads"
        );

        let (payloads, shells): (Vec<_>, Vec<_>) =
            rendered.into_iter().map(|r| (r.payload, r.shell)).unzip();
        let finalized = finalize(fragments, payloads);

        let mut report = BuildReport {
            cycles: finalized.cycles.iter().cloned().collect(),
            id_mapping: finalized.id_mapping.clone(),
            ..BuildReport::default()
        };

        let mut written = HashSet::new();
        for fragment in &finalized.fragments {
            let module_path = module_path_for(&fragment.final_id);
            if written.insert(fragment.final_id.as_str()) {
                self.write(&module_path, &fragment.content).await?;
            }
            report.fragments.push(FragmentReport {
                id: fragment.final_id.clone(),
                name: fragment.name.clone(),
                path: module_path,
            });
        }

        for ((entry, payload), shell) in entries.iter().zip(&finalized.pages).zip(&shells) {
            let module_path = module_path_for(&payload_id_for(&content_hash(payload)));
            let payload_path = with_base_path(&self.config.base_path, &module_path);
            let html = finalized
                .rewrite(shell)
                .replace(PAYLOAD_PATH_PLACEHOLDER, &payload_path);

            self.write(&module_path, payload).await?;
            self.write(&entry.path, &html).await?;
            report.pages.push(PageReport {
                path: entry.path.clone(),
                payload_path,
            });
        }

        Ok(report)
    }

    async fn render_entry(
        &self,
        registry: &FragmentRegistry,
        entry: &Entry,
    ) -> Result<RenderedPage, BuildError> {
        let render_error = |source| BuildError::Render {
            path: entry.path.clone(),
            source,
        };
        tracing::debug!(path = %entry.path, "Rendering page");

        let payload = drain_stream(entry.page.render_page(registry))
            .await
            .map_err(render_error)?;
        let context = ShellContext::for_build(self.config.ssr.then(|| payload.clone()));
        let shell = drain_stream(entry.shell.render_shell(&context))
            .await
            .map_err(render_error)?;

        Ok(RenderedPage { payload, shell })
    }

    /// Write `content` to `relative` (leading `/` ignored) under the output directory.
    async fn write(&self, relative: &str, content: &str) -> Result<(), BuildError> {
        let path = self.config.out_dir.join(relative.trim_start_matches('/'));
        write_file(&path, content).await
    }
}

/// Drain the registry until fragments deferred while draining are included.
async fn drain_fragments(registry: &FragmentRegistry) -> Result<Vec<DrainedFragment>, BuildError> {
    loop {
        let drained = registry.drain_all().collect_all().await?;
        if drained.len() >= registry.len() {
            return Ok(drained);
        }
        tracing::debug!(
            drained = drained.len(),
            registered = registry.len(),
            "Fragments deferred while draining, draining again"
        );
    }
}

async fn write_file(path: &Path, content: &str) -> Result<(), BuildError> {
    let write_error = |source| BuildError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
    }
    tokio::fs::write(path, content).await.map_err(write_error)?;
    tracing::info!(path = %path.display(), "Wrote file");
    Ok(())
}
