//! Config document discovery and loading.

use std::path::{Path, PathBuf};

use super::ConfigError;

/// File extension of config documents.
const DOCUMENT_EXTENSION: &str = "toml";

/// Loads and parses a TOML config file.
pub(crate) fn load_config_file(path: &Path) -> Result<toml::Table, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ConfigError::FileNotFound(path.to_path_buf()))
        }
        Err(e) => Err(ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Lists the config documents directly inside `dir`, sorted by file name.
///
/// Only regular files with a `.toml` extension are returned; subdirectories
/// are not searched.
pub fn document_paths(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, ConfigError> {
    let dir = dir.as_ref();
    let dir_error = |e| ConfigError::DirectoryError {
        path: dir.to_path_buf(),
        source: e,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(dir_error)? {
        let entry = entry.map_err(dir_error)?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        if path.extension().is_some_and(|ext| ext == DOCUMENT_EXTENSION) {
            paths.push(path);
        }
    }

    if paths.is_empty() {
        return Err(ConfigError::NoDocuments(dir.to_path_buf()));
    }

    paths.sort();
    Ok(paths)
}
