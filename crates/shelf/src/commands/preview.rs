//! `shelf preview` command implementation.

use std::path::PathBuf;

use clap::Args;
use shelf_config::{CliSettings, Config};
use shelf_server::{run_preview_server, server_config_from_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the preview command.
#[derive(Args)]
pub(crate) struct PreviewArgs {
    /// Path to configuration file (default: auto-discover shelf.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl PreviewArgs {
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let out_dir = &config.build.out_dir;

        if !out_dir.is_dir() {
            return Err(CliError::Server(format!(
                "Output directory {} does not exist, run `shelf build` first",
                out_dir.display()
            )));
        }

        output.info(&format!("Serving: {}", out_dir.display()));
        output.address(
            "Preview server:",
            &config.server.host,
            config.server.port,
            &config.build.base_path,
        );

        run_preview_server(server_config_from_config(&config, Vec::new()))
            .await
            .map_err(|e| CliError::Server(e.to_string()))?;

        Ok(())
    }
}
