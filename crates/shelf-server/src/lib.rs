//! HTTP servers for shelf sites.
//!
//! Two servers are provided:
//!
//! - the **dev server** renders pages on request; each payload render gets
//!   its own [`FragmentRegistry`](shelf_fragments::FragmentRegistry) and its
//!   deferred fragments are streamed from there,
//! - the **preview server** serves the output of a previous build.
//!
//! # Quick Start
//!
//! ```ignore
//! use shelf_server::{ServerConfig, run_dev_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         entries: vec![/* entries */],
//!         ..ServerConfig::default()
//!     };
//!     run_dev_server(config).await.unwrap();
//! }
//! ```
//!
//! # Routes
//!
//! ```text
//! dev:      GET <page> (Accept: text/html) ──► entry shell
//!           /.shelf/payload[/<entry>]      ──► streamed page payload
//!           /shelf__/<id>.txt              ──► deferred fragment
//!           anything else                  ──► public dir
//!
//! preview:  GET <page> (Accept: text/html) ──► built page, or index.html
//!           anything else                  ──► out dir
//! ```

mod app;
mod dev;
mod error;
mod preview;
mod router;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use shelf_build::Entry;

pub use dev::{PAYLOAD_CONTENT_TYPE, PAYLOAD_ENDPOINT};
pub use error::ServeError;
pub use router::{candidates_for, match_entry, resolve_entry};

use state::{DevState, PreviewState};

/// Server configuration.
#[derive(Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// URL prefix the site is served under.
    pub base_path: String,
    /// Build output directory, served by the preview server.
    pub out_dir: PathBuf,
    /// Static files served by the dev server.
    pub public_dir: Option<PathBuf>,
    /// Page entries rendered by the dev server.
    pub entries: Vec<Entry>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 7979,
            base_path: "/".to_owned(),
            out_dir: PathBuf::from("dist/public"),
            public_dir: None,
            entries: Vec::new(),
        }
    }
}

/// Run the dev server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address is invalid or the server fails to start.
pub async fn run_dev_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(DevState::new(config.entries, config.base_path));
    let app = app::dev_router(Arc::clone(&state), config.public_dir.as_deref());

    serve(&config.host, config.port, app).await?;

    state.clear();
    Ok(())
}

/// Run the preview server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address is invalid or the server fails to start.
pub async fn run_preview_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(PreviewState {
        out_dir: config.out_dir,
        base_path: config.base_path,
    });
    let app = app::preview_router(state);

    serve(&config.host, config.port, app).await
}

async fn serve(host: &str, port: u16, app: Router) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from_str(&format!("{host}:{port}"))?;
    tracing::info!(address = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from shelf config.
///
/// # Arguments
///
/// * `config` - Loaded shelf configuration
/// * `entries` - Page entries built from `config.entries`
#[must_use]
pub fn server_config_from_config(config: &shelf_config::Config, entries: Vec<Entry>) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        base_path: config.build.base_path.clone(),
        out_dir: config.build.out_dir.clone(),
        public_dir: config.build.public_dir.clone(),
        entries,
    }
}
