//! On-disk shape of `shelf.toml`.
//!
//! Every key is optional here; defaults are filled in when the file is
//! resolved into a [`Config`](crate::Config).

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ConfigFile {
    pub server: ServerSection,
    pub build: BuildSection,
    pub entries: Vec<EntrySection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct BuildSection {
    pub source_dir: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub public_dir: Option<PathBuf>,
    pub base_path: Option<String>,
    pub ssr: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct EntrySection {
    pub path: String,
    pub page: PathBuf,
    pub shell: Option<PathBuf>,
}
