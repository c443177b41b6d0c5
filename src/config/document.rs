//! Typed descriptors decoded from a config document.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use toml::{Table, Value};

use super::expand::{expand, expand_options};
use super::file::load_config_file;
use super::ConfigError;

/// Name of the reserved sub-table holding backend options.
const OPTIONS_KEY: &str = "options";

/// Logical key → physical key.
pub type KeyMap = BTreeMap<String, String>;

/// Where and how a template is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSpec {
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub owner_uid: Option<u32>,
    pub owner_gid: Option<u32>,
    pub permissions: Option<String>,
}

/// One `[source.<name>]` block.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDeclaration {
    /// Backend type identifier.
    pub name: String,
    pub keys: KeyMap,
    pub options: Table,
}

/// A fully decoded config document.
///
/// `sources` is in declaration order, top of the document first.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub template: TemplateSpec,
    pub sources: Vec<SourceDeclaration>,
}

#[derive(Debug, Deserialize)]
struct RawTemplate {
    #[serde(default)]
    src: String,
    #[serde(default)]
    dest: String,
    uid: Option<u32>,
    gid: Option<u32>,
    permissions: Option<String>,
}

impl Document {
    /// Loads and decodes the document at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let table = load_config_file(path.as_ref())?;
        Self::from_table(table)
    }

    /// Decodes a document from TOML source text.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let table: Table = toml::from_str(contents)?;
        Self::from_table(table)
    }

    /// Decodes a document from an already-parsed TOML table.
    ///
    /// Macro expansion is applied to template paths, physical keys, and
    /// string-valued options.
    pub fn from_table(mut table: Table) -> Result<Self, ConfigError> {
        let template = match table.remove("template") {
            Some(value) => parse_template(value)?,
            None => return Err(ConfigError::MissingField("src")),
        };

        let sources = match table.remove("source") {
            Some(Value::Table(sources)) => sources
                .into_iter()
                .map(|(name, body)| parse_source(name, body))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(ConfigError::InvalidType {
                    field: "source".to_string(),
                    expected: "table",
                })
            }
            None => Vec::new(),
        };

        Ok(Self { template, sources })
    }
}

fn parse_template(value: Value) -> Result<TemplateSpec, ConfigError> {
    let raw: RawTemplate = value.try_into().map_err(ConfigError::TemplateSection)?;

    if raw.src.is_empty() {
        return Err(ConfigError::MissingField("src"));
    }
    if raw.dest.is_empty() {
        return Err(ConfigError::MissingField("dest"));
    }

    Ok(TemplateSpec {
        source_path: PathBuf::from(expand(&raw.src)),
        dest_path: PathBuf::from(expand(&raw.dest)),
        owner_uid: raw.uid,
        owner_gid: raw.gid,
        permissions: raw.permissions,
    })
}

fn parse_source(name: String, body: Value) -> Result<SourceDeclaration, ConfigError> {
    let Value::Table(body) = body else {
        return Err(ConfigError::InvalidType {
            field: format!("source.{name}"),
            expected: "table",
        });
    };

    let mut keys = KeyMap::new();
    let mut options = Table::new();

    for (field, value) in body {
        match (field.as_str(), value) {
            (OPTIONS_KEY, Value::Table(table)) => options = expand_options(table),
            (OPTIONS_KEY, _) => {
                return Err(ConfigError::InvalidType {
                    field: format!("source.{name}.{OPTIONS_KEY}"),
                    expected: "table",
                })
            }
            (_, Value::String(physical)) => {
                keys.insert(field, expand(&physical));
            }
            (_, _) => {
                return Err(ConfigError::InvalidType {
                    field: format!("source.{name}.{field}"),
                    expected: "string",
                })
            }
        }
    }

    Ok(SourceDeclaration {
        name,
        keys,
        options,
    })
}
