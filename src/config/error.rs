use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to deserialize config: {0}")]
    DeserializeError(#[from] toml::de::Error),

    #[error("invalid [template] section: {0}")]
    TemplateSection(#[source] toml::de::Error),

    #[error("{0} not specified for template")]
    MissingField(&'static str),

    #[error("invalid type for '{field}', expected {expected}")]
    InvalidType {
        field: String,
        expected: &'static str,
    },

    #[error("failed to read config directory '{path}': {source}")]
    DirectoryError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no config files found in {0}")]
    NoDocuments(PathBuf),
}
