//! Key-value backends that resolve physical keys into values.
//!
//! A backend is built from the `options` table of a `[source.<name>]`
//! block and asked to resolve a batch of logical → physical key pairs.
//! Backends hold only their options; any connection state lives for the
//! duration of a single [`Backend::resolve`] call.

mod consul;
mod env;
mod error;
mod registry;

use std::collections::BTreeMap;

use toml::Value;

use crate::config::KeyMap;

pub use consul::ConsulBackend;
pub use env::EnvBackend;
pub use error::BackendError;
pub use registry::{Constructor, Registry};

/// Backend options as written in the config document.
pub type Options = toml::Table;

/// Logical key → resolved value.
pub type Values = BTreeMap<String, String>;

/// A source of values.
pub trait Backend: std::fmt::Debug {
    /// Resolves every requested logical key through its physical key.
    ///
    /// A key that cannot be found is an error unless the backend is
    /// configured to tolerate missing values, in which case it is left
    /// out of the result.
    fn resolve(&self, requested: &KeyMap) -> Result<Values, BackendError>;
}

pub(crate) fn option_bool(name: &str, value: &Value) -> Result<bool, BackendError> {
    value
        .as_bool()
        .ok_or_else(|| BackendError::invalid_type(name, "bool"))
}

pub(crate) fn option_string(name: &str, value: &Value) -> Result<String, BackendError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| BackendError::invalid_type(name, "string"))
}
