//! Maps source type names to backend constructors.

use std::collections::BTreeMap;
use std::fmt;

use super::{Backend, BackendError, ConsulBackend, EnvBackend, Options};

/// Builds a backend from its options, validating them.
pub type Constructor =
    Box<dyn Fn(&Options) -> Result<Box<dyn Backend>, BackendError> + Send + Sync>;

/// Table of known source types.
///
/// [`Registry::default`] knows `env`, `consul`, and `kv` (an alias for
/// `consul`).
pub struct Registry {
    constructors: BTreeMap<String, Constructor>,
}

impl Registry {
    /// Creates a registry with no source types.
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Registers `constructor` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&Options) -> Result<Box<dyn Backend>, BackendError> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Box::new(constructor));
        self
    }

    /// Returns the constructor registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Constructor> {
        self.constructors.get(name)
    }

    /// Names of all registered source types, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register("env", |options| {
                Ok(Box::new(EnvBackend::from_options(options)?) as Box<dyn Backend>)
            })
            .register("consul", |options| {
                Ok(Box::new(ConsulBackend::from_options(options)?) as Box<dyn Backend>)
            })
            .register("kv", |options| {
                Ok(Box::new(ConsulBackend::from_options(options)?) as Box<dyn Backend>)
            });
        registry
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.names().collect::<Vec<_>>())
            .finish()
    }
}
