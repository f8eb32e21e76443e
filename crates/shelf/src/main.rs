//! shelf CLI - static site builder with deferred fragments.
//!
//! Provides commands for:
//! - `build`: Render all entries and write the static output
//! - `serve`: Start the dev server
//! - `preview`: Serve a previous build

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BuildArgs, PreviewArgs, ServeArgs};
use error::CliError;
use output::Output;

/// shelf - Static site builder with deferred fragments.
#[derive(Parser)]
#[command(name = "shelf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the static site.
    Build(BuildArgs),
    /// Start the dev server.
    Serve(ServeArgs),
    /// Serve the built site.
    Preview(PreviewArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Build(args) => args.verbose,
            Self::Serve(args) => args.verbose,
            Self::Preview(args) => args.verbose,
        }
    }

    async fn execute(self) -> Result<(), CliError> {
        match self {
            Self::Build(args) => args.execute().await,
            Self::Serve(args) => args.execute().await,
            Self::Preview(args) => args.execute().await,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = tokio::runtime::Runtime::new()
        .map_err(CliError::from)
        .and_then(|rt| rt.block_on(cli.command.execute()));

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
