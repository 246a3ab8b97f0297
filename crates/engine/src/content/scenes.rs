use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use super::blueprint::ActorBlueprint;
use super::{read_json, ContentError};

pub const SCENE_EXTENSION: &str = "scene";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub actors: Vec<ActorBlueprint>,
}

impl SceneDescription {
    pub fn with_actor(mut self, actor: ActorBlueprint) -> Self {
        self.actors.push(actor);
        self
    }
}

/// Scene files under `scenes/`. Unlike templates, scenes are re-read on every load.
#[derive(Debug, Default)]
pub struct SceneDb {
    dir: Option<PathBuf>,
    registered: HashMap<String, SceneDescription>,
}

impl SceneDb {
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            registered: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, scene: SceneDescription) {
        self.registered.insert(name.into(), scene);
    }

    pub fn exists(&self, name: &str) -> bool {
        self.registered.contains_key(name)
            || self.scene_path(name).is_some_and(|path| path.is_file())
    }

    pub fn load(&self, name: &str) -> Result<SceneDescription, ContentError> {
        if let Some(scene) = self.registered.get(name) {
            return Ok(scene.clone());
        }
        let path = self
            .scene_path(name)
            .filter(|path| path.is_file())
            .ok_or_else(|| ContentError::SceneMissing {
                name: name.to_string(),
            })?;
        debug!(scene = name, path = %path.display(), "scene_read");
        read_json(&path)
    }

    fn scene_path(&self, name: &str) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("{name}.{SCENE_EXTENSION}")))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn loads_scene_actors_in_file_order() {
        let temp = TempDir::new().expect("tempdir");
        let body = json!({
            "actors": [
                { "name": "first" },
                { "name": "second", "template": "enemy" }
            ]
        });
        fs::write(temp.path().join("level1.scene"), body.to_string()).expect("write scene");
        let db = SceneDb::from_dir(temp.path());

        assert!(db.exists("level1"));
        let scene = db.load("level1").expect("load scene");
        let names: Vec<Option<&str>> = scene
            .actors
            .iter()
            .map(|actor| actor.name.as_deref())
            .collect();
        assert_eq!(names, vec![Some("first"), Some("second")]);
        assert_eq!(scene.actors[1].template.as_deref(), Some("enemy"));
    }

    #[test]
    fn missing_scene_is_an_error() {
        let temp = TempDir::new().expect("tempdir");
        let db = SceneDb::from_dir(temp.path());

        assert!(!db.exists("nowhere"));
        let error = db.load("nowhere").expect_err("missing scene");
        assert!(matches!(error, ContentError::SceneMissing { ref name } if name == "nowhere"));
    }

    #[test]
    fn registered_scene_needs_no_directory() {
        let mut db = SceneDb::default();
        db.register(
            "menu",
            SceneDescription::default().with_actor(ActorBlueprint::named("title")),
        );

        assert_eq!(db.load("menu").expect("load").actors.len(), 1);
    }
}
