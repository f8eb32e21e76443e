use std::path::PathBuf;

/// Error loading `shelf.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An explicitly given config file does not exist.
    #[error("Config file {} does not exist", .0.display())]
    NotFound(PathBuf),

    /// Reading the config file failed.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML or has unknown value types.
    #[error("Invalid shelf.toml: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range or missing.
    #[error("Invalid configuration: {0}")]
    Validation(String),

    /// `${VAR}` referenced an unset variable.
    #[error("Cannot expand {field}: ${{{var}}} is not set")]
    EnvVar {
        /// Dotted config key, e.g. `server.host`.
        field: String,
        /// Variable name.
        var: String,
    },
}
