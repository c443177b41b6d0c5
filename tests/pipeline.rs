use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use confx::backend::Options;
use confx::config::KeyMap;
use confx::{
    Backend, BackendError, Error, Publisher, Registry, RenderError, Runner, Values,
};
use tempfile::TempDir;

/// Serves the string values of its option table, keyed by physical key.
#[derive(Debug)]
struct MapBackend(BTreeMap<String, String>);

impl Backend for MapBackend {
    fn resolve(&self, requested: &KeyMap) -> Result<Values, BackendError> {
        let mut values = Values::new();
        for (logical, physical) in requested {
            let value = self.0.get(physical).ok_or_else(|| BackendError::MissingValue {
                key: physical.clone(),
                hint: None,
            })?;
            values.insert(logical.clone(), value.clone());
        }
        Ok(values)
    }
}

fn registry() -> Registry {
    let mut registry = Registry::default();
    registry.register("map", |options: &Options| -> Result<Box<dyn Backend>, BackendError> {
        let values = options
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
            .collect();
        Ok(Box::new(MapBackend(values)))
    });
    registry
}

struct Fixture {
    root: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("conf.d")).unwrap();
        fs::create_dir(root.path().join("templates")).unwrap();
        fs::create_dir(root.path().join("out")).unwrap();
        Self { root }
    }

    fn config(&self, name: &str, contents: &str) {
        fs::write(self.root.path().join("conf.d").join(name), contents).unwrap();
    }

    fn template(&self, name: &str, contents: &str) {
        fs::write(self.root.path().join("templates").join(name), contents).unwrap();
    }

    fn out(&self, name: &str) -> PathBuf {
        self.root.path().join("out").join(name)
    }

    fn runner(&self, keep_going: bool) -> Runner {
        Runner::builder()
            .with_config_dir(self.root.path().join("conf.d"))
            .with_template_dir(self.root.path().join("templates"))
            .with_registry(registry())
            .keep_going(keep_going)
            .build()
            .unwrap()
    }
}

fn mode_of(path: &Path) -> u32 {
    fs::metadata(path).unwrap().permissions().mode() & 0o7777
}

#[test]
fn test_greeting_round_trip() {
    std::env::set_var("CONFX_IT_USERNAME", "alice");
    let fx = Fixture::new();
    let dest = fx.out("greeting.txt");

    fx.template("greeting.tmpl", "Hello, {{lookup \"NAME\"}}!");
    fx.config(
        "greeting.toml",
        &format!(
            r#"
            [template]
            src = "greeting.tmpl"
            dest = "{}"

            [source.env]
            NAME = "CONFX_IT_USERNAME"
            "#,
            dest.display()
        ),
    );

    let report = fx.runner(false).run().unwrap();

    assert_eq!(report.rendered.len(), 1);
    assert_eq!(fs::read_to_string(&dest).unwrap(), "Hello, alice!");
    assert_eq!(mode_of(&dest), 0o644);
}

#[test]
fn test_bottom_declared_source_overrides() {
    std::env::set_var("CONFX_IT_USER_A", "alice");
    let fx = Fixture::new();
    let dest = fx.out("name.txt");

    fx.template("name.tmpl", "{{lookup \"NAME\"}} {{lookup \"ONLY_ENV\"}}");
    fx.config(
        "name.toml",
        &format!(
            r#"
            [template]
            src = "name.tmpl"
            dest = "{}"
            permissions = "0600"

            [source.env]
            NAME = "CONFX_IT_USER_A"
            ONLY_ENV = "CONFX_IT_USER_A"

            [source.map]
            NAME = "user/a"

            [source.map.options]
            "user/a" = "bob"
            "#,
            dest.display()
        ),
    );

    fx.runner(false).run().unwrap();

    assert_eq!(fs::read_to_string(&dest).unwrap(), "bob alice");
    assert_eq!(mode_of(&dest), 0o600);
}

#[test]
fn test_satisfied_unreachable_source_does_not_abort() {
    std::env::set_var("CONFX_IT_DB_HOST", "db.local");
    let fx = Fixture::new();
    let dest = fx.out("db.conf");

    fx.template("db.tmpl", "host={{lookup \"HOST\"}}");
    // the consul source is never contacted: its only key is overridden below
    fx.config(
        "db.toml",
        &format!(
            r#"
            [template]
            src = "db.tmpl"
            dest = "{}"

            [source.consul]
            HOST = "app/db/host"

            [source.consul.options]
            address = "127.0.0.1:1"

            [source.env]
            HOST = "CONFX_IT_DB_HOST"
            "#,
            dest.display()
        ),
    );

    fx.runner(false).run().unwrap();
    assert_eq!(fs::read_to_string(&dest).unwrap(), "host=db.local");
}

#[test]
fn test_tolerated_missing_value_uses_template_default() {
    let fx = Fixture::new();
    let dest = fx.out("tolerant.txt");

    fx.template(
        "tolerant.tmpl",
        "{{#if (exists \"k\")}}present{{else}}absent{{/if}} {{lookup \"k\" \"fallback\"}}",
    );
    fx.config(
        "tolerant.toml",
        &format!(
            r#"
            [template]
            src = "tolerant.tmpl"
            dest = "{}"

            [source.env]
            k = "CONFX_IT_NEVER_SET"
            options = {{ ignore_uninitialised = true }}
            "#,
            dest.display()
        ),
    );

    fx.runner(false).run().unwrap();
    assert_eq!(fs::read_to_string(&dest).unwrap(), "absent fallback");
}

#[test]
fn test_missing_key_without_default_leaves_destination() {
    let fx = Fixture::new();
    let dest = fx.out("q.txt");
    fs::write(&dest, "previous").unwrap();

    fx.template("q.tmpl", "value: {{lookup \"q\"}}");
    fx.config(
        "q.toml",
        &format!(
            r#"
            [template]
            src = "q.tmpl"
            dest = "{}"
            "#,
            dest.display()
        ),
    );

    let err = fx.runner(false).run().unwrap_err();
    match &err {
        Error::Document { path, source } => {
            assert!(path.ends_with("q.toml"));
            assert!(matches!(
                **source,
                Error::Render(RenderError::Render { .. })
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fs::read_to_string(&dest).unwrap(), "previous");

    let leftovers: Vec<_> = fs::read_dir(fx.root.path().join("out"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(leftovers, ["q.txt"]);
}

#[test]
fn test_missing_key_without_default_creates_nothing() {
    let fx = Fixture::new();
    let dest = fx.out("absent.txt");

    fx.template("absent.tmpl", "{{lookup \"q\"}}");
    fx.config(
        "absent.toml",
        &format!(
            "[template]\nsrc = \"absent.tmpl\"\ndest = \"{}\"\n",
            dest.display()
        ),
    );

    assert!(fx.runner(false).run().is_err());
    assert!(!dest.exists());
}

#[test]
fn test_unknown_source_names_document() {
    let fx = Fixture::new();
    fx.template("t.tmpl", "x");
    fx.config(
        "vault.toml",
        &format!(
            r#"
            [template]
            src = "t.tmpl"
            dest = "{}"

            [source.vault]
            K = "secret/k"
            "#,
            fx.out("t.txt").display()
        ),
    );

    let err = fx.runner(false).run().unwrap_err();
    let message = err.to_string();
    assert!(message.contains("vault.toml"), "{message}");
    assert!(message.contains("unknown source type 'vault'"), "{message}");
}

#[test]
fn test_fail_fast_stops_at_first_document() {
    let fx = Fixture::new();
    fx.template("ok.tmpl", "ok");
    fx.config("a.toml", "[template]\ndest = \"x\"\n");
    fx.config(
        "b.toml",
        &format!(
            "[template]\nsrc = \"ok.tmpl\"\ndest = \"{}\"\n",
            fx.out("b.txt").display()
        ),
    );

    let err = fx.runner(false).run().unwrap_err();
    assert!(matches!(err, Error::Document { ref path, .. } if path.ends_with("a.toml")));
    assert!(!fx.out("b.txt").exists());
}

#[test]
fn test_keep_going_reports_failures() {
    let fx = Fixture::new();
    fx.template("ok.tmpl", "ok");
    fx.config("a.toml", "[template]\ndest = \"x\"\n");
    fx.config(
        "b.toml",
        &format!(
            "[template]\nsrc = \"ok.tmpl\"\ndest = \"{}\"\n",
            fx.out("b.txt").display()
        ),
    );

    let report = fx.runner(true).run().unwrap();

    assert!(!report.is_success());
    assert_eq!(report.rendered.len(), 1);
    assert!(report.rendered[0].ends_with("b.toml"));
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].0.ends_with("a.toml"));
    assert_eq!(fs::read_to_string(fx.out("b.txt")).unwrap(), "ok");
}

#[test]
fn test_macro_expanded_destination() {
    let fx = Fixture::new();
    std::env::set_var("CONFX_IT_OUT_DIR", fx.root.path().join("out"));

    fx.template("m.tmpl", "macro");
    fx.config(
        "m.toml",
        "[template]\nsrc = \"m.tmpl\"\ndest = \"${CONFX_IT_OUT_DIR}/m.txt\"\n",
    );

    fx.runner(false).run().unwrap();
    assert_eq!(fs::read_to_string(fx.out("m.txt")).unwrap(), "macro");
}

#[test]
fn test_custom_publisher_stages_in_scratch_dir() {
    let fx = Fixture::new();
    let scratch = fx.root.path().join("scratch");
    fs::create_dir(&scratch).unwrap();
    let dest = fx.out("staged.txt");

    fx.template("staged.tmpl", "staged");
    fx.config(
        "staged.toml",
        &format!(
            "[template]\nsrc = \"staged.tmpl\"\ndest = \"{}\"\n",
            dest.display()
        ),
    );

    let runner = Runner::builder()
        .with_config_dir(fx.root.path().join("conf.d"))
        .with_template_dir(fx.root.path().join("templates"))
        .with_publisher(Publisher::new().with_scratch_dir(&scratch))
        .build()
        .unwrap();

    let report = runner.run().unwrap();

    assert_eq!(report.rendered.len(), 1);
    assert_eq!(fs::read_to_string(&dest).unwrap(), "staged");
    assert_eq!(fs::read_dir(&scratch).unwrap().count(), 0);
    assert_eq!(fs::read_dir(fx.root.path().join("out")).unwrap().count(), 1);
}
