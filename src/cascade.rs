//! Precedence-ordered resolution of values across sources.
//!
//! Sources declared later in a document override sources declared earlier,
//! so resolution walks the declarations bottom-up and the first source to
//! supply a logical key wins it. A source whose keys are all already
//! resolved is skipped without constructing its backend.

use thiserror::Error;
use tracing::debug;

use crate::backend::{BackendError, Registry, Values};
use crate::config::{KeyMap, SourceDeclaration};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResolveError {
    #[error("unknown source type '{name}', known types are {known}")]
    UnknownSource { name: String, known: String },

    #[error("{source_name}: {source}")]
    Backend {
        source_name: String,
        #[source]
        source: BackendError,
    },
}

/// Resolves the final logical key → value mapping for `sources`.
///
/// `sources` must be in declaration order. The first failure aborts the
/// whole resolution.
pub fn resolve(sources: &[SourceDeclaration], registry: &Registry) -> Result<Values, ResolveError> {
    let mut values = Values::new();

    for source in sources.iter().rev() {
        let pending: KeyMap = source
            .keys
            .iter()
            .filter(|(logical, _)| !values.contains_key(*logical))
            .map(|(logical, physical)| (logical.clone(), physical.clone()))
            .collect();

        if pending.is_empty() {
            debug!(source = %source.name, "all keys already resolved, skipping source");
            continue;
        }

        let constructor = registry
            .get(&source.name)
            .ok_or_else(|| ResolveError::UnknownSource {
                name: source.name.clone(),
                known: registry.names().collect::<Vec<_>>().join(", "),
            })?;

        let backend_error = |source_error| ResolveError::Backend {
            source_name: source.name.clone(),
            source: source_error,
        };

        let backend = constructor(&source.options).map_err(backend_error)?;
        let resolved = backend.resolve(&pending).map_err(backend_error)?;

        debug!(
            source = %source.name,
            requested = pending.len(),
            resolved = resolved.len(),
            "resolved values from source"
        );

        for (logical, value) in resolved {
            if pending.contains_key(&logical) {
                values.entry(logical).or_insert(value);
            }
        }
    }

    Ok(values)
}
