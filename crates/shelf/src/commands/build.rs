//! `shelf build` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use shelf_build::{BuildConfig, BuildReport, SiteBuilder};
use shelf_config::{CliSettings, Config};

use super::entries_from_config;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Path to configuration file (default: auto-discover shelf.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory (overrides config).
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// URL prefix the site is served under (overrides config).
    #[arg(long)]
    base_path: Option<String>,

    /// Inline rendered page content into the HTML shells.
    #[arg(long)]
    ssr: bool,

    /// Write a JSON build manifest to this file.
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl BuildArgs {
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            out_dir: self.out_dir,
            base_path: self.base_path,
            ssr: self.ssr.then_some(true),
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let build = &config.build;

        output.info(&format!("Source: {}", build.source_dir.display()));
        output.info(&format!("Output: {}", build.out_dir.display()));

        let builder = SiteBuilder::new(BuildConfig {
            out_dir: build.out_dir.clone(),
            base_path: build.base_path.clone(),
            ssr: build.ssr,
        });
        let report = builder.build(&entries_from_config(&config)?).await?;

        for id in &report.cycles {
            output.warning(&format!(
                "Warning: fragment {id} is part of a reference cycle and keeps its temporary id"
            ));
        }

        if let Some(path) = &self.manifest {
            write_manifest(path, &report)?;
            output.info(&format!("Manifest: {}", path.display()));
        }

        output.success(&format!(
            "Built {} page(s) and {} fragment(s) to {}",
            report.pages.len(),
            report.fragments.len(),
            build.out_dir.display()
        ));
        Ok(())
    }
}

fn write_manifest(path: &Path, report: &BuildReport) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(report)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)?;
    Ok(())
}
