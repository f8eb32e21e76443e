//! `shelf.toml` loading.
//!
//! The file is looked up in the working directory and its ancestors unless a
//! path is given. Relative paths in it are resolved against the directory
//! containing it.
//!
//! ```toml
//! [server]
//! host = "${SHELF_HOST:-127.0.0.1}"
//! port = 7979
//!
//! [build]
//! source_dir = "site"
//! out_dir = "dist/public"
//! public_dir = "public"
//! base_path = "/"
//! ssr = false
//!
//! [[entries]]
//! path = "index.html"
//! page = "index.txt"
//! shell = "shell.html"
//! ```
//!
//! `server.host` and `build.base_path` may reference environment variables
//! as `${VAR}` or `${VAR:-default}`.

mod error;
mod expand;
mod file;

use std::path::{Path, PathBuf};

pub use error::ConfigError;

use file::ConfigFile;

/// Name of the config file.
pub const CONFIG_FILE_NAME: &str = "shelf.toml";

/// Command-line values that take precedence over the file.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// `--host`
    pub host: Option<String>,
    /// `--port`
    pub port: Option<u16>,
    /// `--out-dir`
    pub out_dir: Option<PathBuf>,
    /// `--base-path`
    pub base_path: Option<String>,
    /// `--ssr`
    pub ssr: Option<bool>,
}

impl CliSettings {
    fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(out_dir) = &self.out_dir {
            config.build.out_dir.clone_from(out_dir);
        }
        if let Some(base_path) = &self.base_path {
            config.build.base_path.clone_from(base_path);
        }
        if let Some(ssr) = self.ssr {
            config.build.ssr = ssr;
        }
    }
}

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Dev and preview server settings.
    pub server: ServerConfig,
    /// Build settings with absolute paths.
    pub build: BuildConfig,
    /// Page entries, in output order.
    pub entries: Vec<EntryConfig>,
    /// File the configuration was read from, if any.
    pub config_path: Option<PathBuf>,
}

/// Server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Build settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Directory page and shell templates are read from.
    pub source_dir: PathBuf,
    /// Directory build output is written to.
    pub out_dir: PathBuf,
    /// Static files served as-is by the dev server.
    pub public_dir: Option<PathBuf>,
    /// URL prefix the site is served under.
    pub base_path: String,
    /// Inline page payloads into HTML shells.
    pub ssr: bool,
}

/// One page entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryConfig {
    /// Output path relative to the output directory.
    pub path: String,
    /// Page template, relative to the source directory.
    pub page: PathBuf,
    /// Shell template, relative to the source directory.
    pub shell: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::resolve(ConfigFile::default(), Path::new("."))
    }
}

impl Config {
    /// Load the configuration and apply command-line overrides.
    ///
    /// Without `config_path`, `shelf.toml` is searched for from the working
    /// directory upwards; if none is found the defaults are used with paths
    /// relative to the working directory.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let path = match config_path {
            Some(path) if !path.is_file() => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Some(path) => Some(path.to_path_buf()),
            None => find_config_file(&std::env::current_dir()?),
        };
        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::resolve(ConfigFile::default(), &std::env::current_dir()?),
        };

        if let Some(settings) = cli_settings {
            settings.apply(&mut config);
            config.check_server()?;
            config.check_build()?;
        }
        Ok(config)
    }

    /// Read and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        let mut config = Self::from_toml(&text, base_dir)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse, expand, resolve against `base_dir` and validate TOML text.
    pub fn from_toml(text: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut file: ConfigFile = toml::from_str(text)?;
        expand::expand_opt(&mut file.server.host, "server.host")?;
        expand::expand_opt(&mut file.build.base_path, "build.base_path")?;

        let config = Self::resolve(file, base_dir);
        config.validate()?;
        Ok(config)
    }

    fn resolve(file: ConfigFile, base_dir: &Path) -> Self {
        let ConfigFile {
            server,
            build,
            entries,
        } = file;
        let under_base = |path: Option<PathBuf>, default: &str| {
            base_dir.join(path.unwrap_or_else(|| PathBuf::from(default)))
        };

        Self {
            server: ServerConfig {
                host: server.host.unwrap_or_else(|| "127.0.0.1".to_owned()),
                port: server.port.unwrap_or(7979),
            },
            build: BuildConfig {
                source_dir: under_base(build.source_dir, "site"),
                out_dir: under_base(build.out_dir, "dist/public"),
                public_dir: build.public_dir.map(|dir| base_dir.join(dir)),
                base_path: build.base_path.unwrap_or_else(|| "/".to_owned()),
                ssr: build.ssr.unwrap_or(false),
            },
            entries: entries
                .into_iter()
                .map(|e| EntryConfig {
                    path: e.path,
                    page: e.page,
                    shell: e.shell,
                })
                .collect(),
            config_path: None,
        }
    }

    /// Check every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.check_server()?;
        self.check_build()?;
        self.check_entries()
    }

    fn check_server(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(invalid("server.host must not be empty"));
        }
        if self.server.port == 0 {
            return Err(invalid("server.port must not be 0"));
        }
        Ok(())
    }

    fn check_build(&self) -> Result<(), ConfigError> {
        let base_path = &self.build.base_path;
        if !base_path.starts_with('/') {
            return Err(invalid(format!(
                "build.base_path must start with \"/\", got \"{base_path}\""
            )));
        }
        Ok(())
    }

    fn check_entries(&self) -> Result<(), ConfigError> {
        if self.entries.is_empty() {
            return Err(invalid("at least one [[entries]] table is required"));
        }
        if let Some(index) = self.entries.iter().position(|e| e.path.is_empty()) {
            return Err(invalid(format!("entries[{index}].path must not be empty")));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation(message.into())
}

/// Nearest `shelf.toml` in `start` or one of its ancestors.
fn find_config_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}
