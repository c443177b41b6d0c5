//! Environment macro expansion for config-derived strings.
//!
//! Replaces every `${NAME}` whose name matches `[a-zA-Z0-9_]+` with the value
//! of the environment variable `NAME`. Unset variables expand to the empty
//! string. Anything else, including `${}` or `${not-valid}`, is copied
//! through untouched.

use std::env;

/// Expands `${NAME}` references against the process environment.
pub fn expand(raw: &str) -> String {
    expand_with(raw, |name| env::var(name).ok())
}

/// Expands `${NAME}` references using `lookup` to supply values.
///
/// A `None` from `lookup` expands to the empty string.
pub fn expand_with<F>(raw: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        match macro_name(after) {
            Some(name) => {
                if let Some(value) = lookup(name) {
                    result.push_str(&value);
                }
                // name + closing brace
                rest = &after[name.len() + 1..];
            }
            None => {
                result.push_str("${");
                rest = after;
            }
        }
    }

    result.push_str(rest);
    result
}

/// Returns the identifier at the start of `s` if it is followed by `}`.
fn macro_name(s: &str) -> Option<&str> {
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(s.len());

    if end == 0 || !s[end..].starts_with('}') {
        return None;
    }

    Some(&s[..end])
}

/// Expands every top-level string value in an options table.
///
/// Non-string values are returned as-is.
pub fn expand_options(options: toml::Table) -> toml::Table {
    options
        .into_iter()
        .map(|(name, value)| match value {
            toml::Value::String(s) => (name, toml::Value::String(expand(&s))),
            other => (name, other),
        })
        .collect()
}
