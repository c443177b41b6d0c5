use std::env;

use super::{option_bool, Backend, BackendError, Options, Values};
use crate::config::KeyMap;

const VALID_OPTIONS: &[&str] = &["ignore_uninitialised"];

/// Resolves physical keys as process environment variable names.
///
/// Unset, empty, and non-UTF-8 variables all count as missing.
#[derive(Debug, Clone, Default)]
pub struct EnvBackend {
    ignore_uninitialised: bool,
}

impl EnvBackend {
    pub fn new(ignore_uninitialised: bool) -> Self {
        Self {
            ignore_uninitialised,
        }
    }

    pub fn from_options(options: &Options) -> Result<Self, BackendError> {
        let mut backend = Self::default();

        for (name, value) in options {
            match name.as_str() {
                "ignore_uninitialised" => {
                    backend.ignore_uninitialised = option_bool(name, value)?;
                }
                other => return Err(BackendError::unknown_option(other, VALID_OPTIONS)),
            }
        }

        Ok(backend)
    }
}

impl Backend for EnvBackend {
    fn resolve(&self, requested: &KeyMap) -> Result<Values, BackendError> {
        let mut values = Values::new();

        for (logical, variable) in requested {
            match env::var(variable) {
                Ok(value) if !value.is_empty() => {
                    values.insert(logical.clone(), value);
                }
                _ if self.ignore_uninitialised => continue,
                _ => return Err(BackendError::missing(variable)),
            }
        }

        Ok(values)
    }
}
