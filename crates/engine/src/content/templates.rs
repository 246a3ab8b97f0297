use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info};

use super::blueprint::{ActorBlueprint, ResolvedActor, ResolvedComponent};
use super::{read_json, ContentError};

pub const TEMPLATE_EXTENSION: &str = "template";

/// Named actor templates, read from disk or registered in memory, cached once resolved.
#[derive(Debug, Default)]
pub struct TemplateDb {
    dir: Option<PathBuf>,
    registered: HashMap<String, ActorBlueprint>,
    cache: HashMap<String, Rc<ResolvedActor>>,
}

impl TemplateDb {
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Self::default()
        }
    }

    pub fn register(&mut self, name: impl Into<String>, blueprint: ActorBlueprint) {
        self.registered.insert(name.into(), blueprint);
        // A parent change invalidates every child resolved through it.
        self.cache.clear();
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.registered.contains_key(name)
            || self
                .template_path(name)
                .is_some_and(|path| path.is_file())
    }

    pub fn load(&mut self, name: &str) -> Result<Rc<ResolvedActor>, ContentError> {
        let mut chain = Vec::new();
        self.load_chained(name, &mut chain)
    }

    /// Flattens an actor entry against its template, if it names one.
    pub fn resolve(&mut self, blueprint: &ActorBlueprint) -> Result<ResolvedActor, ContentError> {
        let mut chain = Vec::new();
        self.resolve_chained(blueprint, &mut chain)
    }

    fn load_chained(
        &mut self,
        name: &str,
        chain: &mut Vec<String>,
    ) -> Result<Rc<ResolvedActor>, ContentError> {
        if let Some(cached) = self.cache.get(name) {
            return Ok(Rc::clone(cached));
        }
        if chain.iter().any(|visited| visited == name) {
            return Err(ContentError::TemplateCycle {
                name: name.to_string(),
            });
        }

        let blueprint = self.read_blueprint(name)?;
        chain.push(name.to_string());
        let mut resolved = self.resolve_chained(&blueprint, chain)?;
        chain.pop();
        resolved.template = name.to_string();

        info!(
            template = name,
            component_count = resolved.components.len(),
            "template_loaded"
        );
        let resolved = Rc::new(resolved);
        self.cache.insert(name.to_string(), Rc::clone(&resolved));
        Ok(resolved)
    }

    fn resolve_chained(
        &mut self,
        blueprint: &ActorBlueprint,
        chain: &mut Vec<String>,
    ) -> Result<ResolvedActor, ContentError> {
        let mut resolved = match &blueprint.template {
            Some(parent) => (*self.load_chained(parent, chain)?).clone(),
            None => ResolvedActor::default(),
        };
        if let Some(name) = &blueprint.name {
            resolved.name = name.clone();
        }

        for (key, entry) in &blueprint.components {
            match resolved.components.get_mut(key) {
                Some(inherited) => {
                    for (field, value) in &entry.overrides {
                        inherited.overrides.insert(field.clone(), value.clone());
                    }
                }
                None => {
                    let type_name = entry.type_name.clone().ok_or_else(|| {
                        ContentError::MissingComponentType {
                            owner: resolved.name.clone(),
                            key: key.clone(),
                        }
                    })?;
                    resolved.components.insert(
                        key.clone(),
                        ResolvedComponent {
                            type_name,
                            overrides: entry.overrides.clone(),
                        },
                    );
                }
            }
        }
        Ok(resolved)
    }

    fn read_blueprint(&self, name: &str) -> Result<ActorBlueprint, ContentError> {
        if let Some(blueprint) = self.registered.get(name) {
            return Ok(blueprint.clone());
        }
        let path = self
            .template_path(name)
            .filter(|path| path.is_file())
            .ok_or_else(|| ContentError::TemplateMissing {
                name: name.to_string(),
            })?;
        debug!(template = name, path = %path.display(), "template_read");
        read_json(&path)
    }

    fn template_path(&self, name: &str) -> Option<PathBuf> {
        self.dir
            .as_deref()
            .map(|dir| template_file(dir, name))
    }
}

fn template_file(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{TEMPLATE_EXTENSION}"))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::content::ComponentBlueprint;

    fn write_template(dir: &Path, name: &str, body: serde_json::Value) {
        fs::write(template_file(dir, name), body.to_string()).expect("write template");
    }

    #[test]
    fn loads_template_from_directory_and_caches_it() {
        let temp = TempDir::new().expect("tempdir");
        write_template(
            temp.path(),
            "enemy",
            json!({
                "name": "goblin",
                "components": { "r0": { "type": "Mover", "speed": 2 } }
            }),
        );
        let mut db = TemplateDb::from_dir(temp.path());

        let first = db.load("enemy").expect("load");
        assert_eq!(first.name, "goblin");
        assert_eq!(first.template, "enemy");
        assert_eq!(first.components["r0"].type_name, "Mover");
        assert!(db.is_cached("enemy"));

        fs::remove_file(template_file(temp.path(), "enemy")).expect("remove template");
        let second = db.load("enemy").expect("cached load");
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn missing_template_is_reported_by_name() {
        let temp = TempDir::new().expect("tempdir");
        let mut db = TemplateDb::from_dir(temp.path());

        let error = db.load("ghost").expect_err("should be missing");
        assert!(matches!(error, ContentError::TemplateMissing { ref name } if name == "ghost"));
    }

    #[test]
    fn malformed_template_reports_json_path() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(
            template_file(temp.path(), "broken"),
            r#"{ "components": { "r0": { "type": 7 } } }"#,
        )
        .expect("write template");
        let mut db = TemplateDb::from_dir(temp.path());

        let error = db.load("broken").expect_err("should fail to parse");
        match error {
            ContentError::Parse { json_path, .. } => assert!(json_path.contains("r0")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn entry_overrides_layer_over_template_and_inherit_type() {
        let mut db = TemplateDb::default();
        db.register(
            "enemy",
            ActorBlueprint::named("goblin").with_component(
                "r0",
                ComponentBlueprint::typed("Mover").with("speed", 2).with("label", "base"),
            ),
        );
        let entry = ActorBlueprint::from_template("enemy")
            .with_component("r0", ComponentBlueprint::default().with("speed", 5))
            .with_component("extra", ComponentBlueprint::typed("Spinner"));

        let resolved = db.resolve(&entry).expect("resolve");

        let mover = &resolved.components["r0"];
        assert_eq!(mover.type_name, "Mover");
        assert_eq!(mover.overrides.get("speed"), Some(&json!(5)));
        assert_eq!(mover.overrides.get("label"), Some(&json!("base")));
        assert_eq!(resolved.components["extra"].type_name, "Spinner");
        assert_eq!(resolved.name, "goblin");
        assert_eq!(resolved.template, "enemy");
    }

    #[test]
    fn untyped_component_without_template_is_an_error() {
        let mut db = TemplateDb::default();
        let entry = ActorBlueprint::named("loose").with_component("r0", ComponentBlueprint::default());

        let error = db.resolve(&entry).expect_err("should require a type");
        assert!(matches!(
            error,
            ContentError::MissingComponentType { ref owner, ref key } if owner == "loose" && key == "r0"
        ));
    }

    #[test]
    fn inheritance_cycles_are_rejected() {
        let mut db = TemplateDb::default();
        db.register("a", ActorBlueprint::from_template("b"));
        db.register("b", ActorBlueprint::from_template("a"));

        let error = db.load("a").expect_err("cycle");
        assert!(matches!(error, ContentError::TemplateCycle { .. }));
    }
}
