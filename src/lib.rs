//! Render config files from templates, with values cascaded from
//! environment variables and KV stores.

pub mod backend;
pub mod cascade;
pub mod config;
mod error;
pub mod publish;
pub mod render;
mod runner;

pub use backend::{Backend, BackendError, Registry, Values};
pub use cascade::ResolveError;
pub use config::{ConfigError, Document};
pub use error::Error;
pub use publish::{Policy, PublishError, Publisher};
pub use render::RenderError;
pub use runner::{process_document, RunReport, Runner, RunnerBuilder};
