//! Processing of config documents: resolve, render, publish.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::backend::Registry;
use crate::cascade;
use crate::config::{document_paths, Document};
use crate::publish::{Policy, Publisher};
use crate::render;
use crate::Error;

/// Runs every config document in a directory.
///
/// ## Example
///
/// ```no_run
/// use confx::Runner;
///
/// let report = Runner::builder()
///     .with_config_dir("/etc/confx/conf.d")
///     .with_template_dir("/etc/confx/templates")
///     .build()?
///     .run()?;
///
/// println!("rendered {} file(s)", report.rendered.len());
/// # Ok::<(), confx::Error>(())
/// ```
#[derive(Debug)]
pub struct Runner {
    config_dir: PathBuf,
    template_dir: PathBuf,
    registry: Registry,
    publisher: Publisher,
    keep_going: bool,
}

/// Outcome of a run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Documents that were rendered and published.
    pub rendered: Vec<PathBuf>,
    /// Documents that failed, with their errors. Only populated in
    /// keep-going mode.
    pub failed: Vec<(PathBuf, Error)>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl Runner {
    /// Creates a new builder for constructing a `Runner`.
    pub fn builder() -> RunnerBuilder {
        RunnerBuilder::default()
    }

    /// Processes every document in the config directory in file-name order.
    ///
    /// By default the first failing document ends the run. In keep-going
    /// mode every document is attempted and failures are collected in the
    /// report instead.
    pub fn run(&self) -> Result<RunReport, Error> {
        let mut report = RunReport::default();

        for path in document_paths(&self.config_dir)? {
            match self.process(&path) {
                Ok(()) => report.rendered.push(path),
                Err(err) if self.keep_going => {
                    let err = err.in_document(&path);
                    warn!("{err}");
                    report.failed.push((path, err));
                }
                Err(err) => return Err(err.in_document(path)),
            }
        }

        Ok(report)
    }

    /// Resolves, renders, and publishes a single document.
    pub fn process(&self, path: &Path) -> Result<(), Error> {
        let document = Document::load(path)?;
        process_document(&document, &self.template_dir, &self.registry, &self.publisher)
    }
}

/// Resolves, renders, and publishes a decoded document.
///
/// The template's `src` is taken relative to `template_dir`.
pub fn process_document(
    document: &Document,
    template_dir: &Path,
    registry: &Registry,
    publisher: &Publisher,
) -> Result<(), Error> {
    let template = &document.template;
    let source = template_dir.join(&template.source_path);
    let policy = Policy::from_template(template)?;

    info!("{} -> {}", source.display(), template.dest_path.display());

    let values = cascade::resolve(&document.sources, registry)?;

    publisher.publish(&template.dest_path, &policy, |sink| {
        render::render(&source, &values, sink).map_err(Error::from)
    })
}

/// Builder for constructing a [`Runner`].
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct RunnerBuilder {
    config_dir: Option<PathBuf>,
    template_dir: Option<PathBuf>,
    registry: Option<Registry>,
    publisher: Option<Publisher>,
    keep_going: bool,
}

impl RunnerBuilder {
    /// Directory whose `.toml` files are processed.
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Directory template `src` paths are resolved against.
    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = Some(dir.into());
        self
    }

    /// Replaces the default backend registry.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replaces the default publisher, e.g. to stage output elsewhere.
    pub fn with_publisher(mut self, publisher: Publisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Continue with remaining documents after a failure.
    pub fn keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }

    /// Builds the `Runner`.
    ///
    /// Returns an error if either directory is unset or does not exist.
    pub fn build(self) -> Result<Runner, Error> {
        let config_dir = existing_dir(self.config_dir, "config dir")?;
        let template_dir = existing_dir(self.template_dir, "templates dir")?;

        Ok(Runner {
            config_dir,
            template_dir,
            registry: self.registry.unwrap_or_default(),
            publisher: self.publisher.unwrap_or_default(),
            keep_going: self.keep_going,
        })
    }
}

fn existing_dir(dir: Option<PathBuf>, kind: &'static str) -> Result<PathBuf, Error> {
    let path = dir.ok_or(Error::MissingDirectory(kind))?;
    if !path.is_dir() {
        return Err(Error::DirectoryNotFound { kind, path });
    }
    Ok(path)
}
