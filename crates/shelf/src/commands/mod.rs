//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod preview;
pub(crate) mod serve;

use shelf_build::{Entry, template_entry};
use shelf_config::Config;

use crate::error::CliError;

pub(crate) use build::BuildArgs;
pub(crate) use preview::PreviewArgs;
pub(crate) use serve::ServeArgs;

/// Build template-backed entries from the configured `[[entries]]`.
pub(crate) fn entries_from_config(config: &Config) -> Result<Vec<Entry>, CliError> {
    if config.entries.is_empty() {
        return Err(CliError::Validation(
            "No entries configured (add [[entries]] to shelf.toml)".to_owned(),
        ));
    }
    let source_dir = &config.build.source_dir;
    Ok(config
        .entries
        .iter()
        .map(|entry| template_entry(source_dir, &entry.path, &entry.page, entry.shell.as_deref()))
        .collect())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_entries_from_config() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("shelf.toml");
        std::fs::write(
            &config_path,
            r#"
[[entries]]
path = "index.html"
page = "index.txt"

[[entries]]
path = "about/index.html"
page = "about.txt"
shell = "shell.html"
"#,
        )
        .unwrap();

        let config = Config::load(Some(config_path.as_path()), None).unwrap();
        let entries = entries_from_config(&config).unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["index.html", "about/index.html"]);
    }

    #[test]
    fn test_entries_from_config_requires_entries() {
        let config = Config::default();
        let err = entries_from_config(&config).err().unwrap();
        assert!(err.to_string().contains("[[entries]]"));
    }
}
