//! Config document loading and macro expansion.

mod document;
mod error;
mod expand;
mod file;

pub use document::{Document, KeyMap, SourceDeclaration, TemplateSpec};
pub use error::ConfigError;
pub use expand::{expand, expand_with};
pub use file::document_paths;
