use std::path::PathBuf;

use thiserror::Error;

use crate::cascade::ResolveError;
use crate::config::ConfigError;
use crate::publish::PublishError;
use crate::render::RenderError;

/// Top-level error type for confx.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("{}: {source}", .path.display())]
    Document {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("runner requires a {0}")]
    MissingDirectory(&'static str),

    #[error("could not find {kind}: {}", .path.display())]
    DirectoryNotFound { kind: &'static str, path: PathBuf },
}

impl Error {
    pub(crate) fn in_document(self, path: impl Into<PathBuf>) -> Self {
        Self::Document {
            path: path.into(),
            source: Box::new(self),
        }
    }
}
