//! Template rendering against resolved values.
//!
//! Templates are handlebars documents. Besides plain `{{KEY}}` references to
//! resolved values, templates can call these helpers:
//!
//! | Helper | Result |
//! |---|---|
//! | `lookup key [default]` (alias `getV`) | resolved value, else `default`, else an error |
//! | `exists key` (alias `hasV`) | `true` if the key was resolved |
//! | `getEnv name [default]` | environment value, else `default`, else an error |
//! | `hasEnv name` | `true` if the variable is set and non-empty |
//! | `hasPrefix s prefix`, `hasSuffix s suffix`, `contains s needle` | string tests |
//! | `toUpper s`, `toLower s` | case conversion |
//! | `split s sep` | list of pieces, for use with `{{#each}}` |
//!
//! Output is not HTML-escaped.

mod helpers;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use handlebars::Handlebars;
use thiserror::Error;

use crate::backend::Values;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RenderError {
    #[error("could not read template '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse template '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: Box<handlebars::TemplateError>,
    },

    #[error("could not render template '{path}': {source}")]
    Render {
        path: PathBuf,
        source: Box<handlebars::RenderError>,
    },
}

/// Renders the template at `template_path` into `sink`.
pub fn render(
    template_path: &Path,
    values: &Values,
    sink: &mut dyn Write,
) -> Result<(), RenderError> {
    let source = std::fs::read_to_string(template_path).map_err(|e| RenderError::Read {
        path: template_path.to_path_buf(),
        source: e,
    })?;

    render_str(template_path, &source, values, sink)
}

/// Renders template text, naming it `template_path` in errors.
pub fn render_str(
    template_path: &Path,
    template: &str,
    values: &Values,
    sink: &mut dyn Write,
) -> Result<(), RenderError> {
    let name = template_path.to_string_lossy();
    let registry = registry(name.as_ref(), template, values).map_err(|e| RenderError::Parse {
        path: template_path.to_path_buf(),
        source: Box::new(e),
    })?;

    registry
        .render_to_write(name.as_ref(), values, sink)
        .map_err(|e| RenderError::Render {
            path: template_path.to_path_buf(),
            source: Box::new(e),
        })
}

fn registry(
    name: &str,
    template: &str,
    values: &Values,
) -> Result<Handlebars<'static>, handlebars::TemplateError> {
    let mut registry = Handlebars::new();
    registry.register_escape_fn(handlebars::no_escape);
    registry.set_strict_mode(true);
    helpers::register(&mut registry, Arc::new(values.clone()));
    registry.register_template_string(name, template)?;
    Ok(registry)
}
