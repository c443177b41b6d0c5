//! Helper functions exposed to templates.

use std::env;
use std::sync::Arc;

use handlebars::{
    handlebars_helper, Context, Handlebars, Helper, HelperDef, JsonRender, RenderContext,
    RenderError, RenderErrorReason, ScopedJson,
};
use serde_json::Value as Json;

use crate::backend::Values;

/// Registers every helper on `registry`, bound to `values`.
pub(crate) fn register(registry: &mut Handlebars<'_>, values: Arc<Values>) {
    for name in ["lookup", "getV"] {
        registry.register_helper(
            name,
            Box::new(Lookup {
                name,
                values: Arc::clone(&values),
            }),
        );
    }
    for name in ["exists", "hasV"] {
        registry.register_helper(
            name,
            Box::new(Exists {
                name,
                values: Arc::clone(&values),
            }),
        );
    }

    registry.register_helper("getEnv", Box::new(GetEnv));
    registry.register_helper("hasEnv", Box::new(HasEnv));
    registry.register_helper("hasPrefix", Box::new(has_prefix));
    registry.register_helper("hasSuffix", Box::new(has_suffix));
    registry.register_helper("contains", Box::new(contains));
    registry.register_helper("toUpper", Box::new(to_upper));
    registry.register_helper("toLower", Box::new(to_lower));
    registry.register_helper("split", Box::new(split));
}

handlebars_helper!(has_prefix: |s: str, prefix: str| s.starts_with(prefix));
handlebars_helper!(has_suffix: |s: str, suffix: str| s.ends_with(suffix));
handlebars_helper!(contains: |s: str, needle: str| s.contains(needle));
handlebars_helper!(to_upper: |s: str| s.to_uppercase());
handlebars_helper!(to_lower: |s: str| s.to_lowercase());
handlebars_helper!(split: |s: str, sep: str| {
    s.split(sep).map(str::to_string).collect::<Vec<_>>()
});

/// Returns the string parameter at `index`.
fn str_param<'a>(
    helper_name: &'static str,
    h: &'a Helper<'_>,
    index: usize,
) -> Result<&'a str, RenderError> {
    let param = h
        .param(index)
        .ok_or(RenderErrorReason::ParamNotFoundForIndex(helper_name, index))?;

    param
        .value()
        .as_str()
        .ok_or_else(|| RenderErrorReason::InvalidParamType("string").into())
}

/// Optional default at parameter index 1, rendered to a string.
fn default_param(h: &Helper<'_>) -> Option<String> {
    h.param(1).map(|p| p.value().render())
}

/// `lookup key [default]`: resolved value, else the default.
struct Lookup {
    name: &'static str,
    values: Arc<Values>,
}

impl HelperDef for Lookup {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let key = str_param(self.name, h, 0)?;

        let value = match self.values.get(key) {
            Some(value) => value.clone(),
            None => default_param(h).ok_or_else(|| {
                RenderErrorReason::Other(format!("no value specified for \"{key}\""))
            })?,
        };

        Ok(ScopedJson::Derived(Json::String(value)))
    }
}

/// `exists key`: whether the key was resolved, whatever its value.
struct Exists {
    name: &'static str,
    values: Arc<Values>,
}

impl HelperDef for Exists {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let key = str_param(self.name, h, 0)?;
        Ok(ScopedJson::Derived(Json::Bool(self.values.contains_key(key))))
    }
}

/// Non-empty value of an environment variable.
fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// `getEnv name [default]`: environment value, else the default.
struct GetEnv;

impl HelperDef for GetEnv {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let name = str_param("getEnv", h, 0)?;

        let value = env_value(name).or_else(|| default_param(h)).ok_or_else(|| {
            RenderErrorReason::Other(format!("no value specified for env variable \"{name}\""))
        })?;

        Ok(ScopedJson::Derived(Json::String(value)))
    }
}

/// `hasEnv name`: whether the environment variable is set and non-empty.
struct HasEnv;

impl HelperDef for HasEnv {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let name = str_param("hasEnv", h, 0)?;
        Ok(ScopedJson::Derived(Json::Bool(env_value(name).is_some())))
    }
}
