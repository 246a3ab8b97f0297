mod blueprint;
mod config;
mod error;
mod scenes;
mod templates;

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

pub use blueprint::{ActorBlueprint, ComponentBlueprint, ResolvedActor, ResolvedComponent};
pub use config::{GameConfig, GAME_CONFIG_FILE};
pub use error::ContentError;
pub use scenes::{SceneDb, SceneDescription, SCENE_EXTENSION};
pub use templates::{TemplateDb, TEMPLATE_EXTENSION};

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ContentError> {
    let raw = fs::read_to_string(path).map_err(|source| ContentError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    serde_path_to_error::deserialize::<_, T>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        ContentError::Parse {
            path: path.to_path_buf(),
            json_path,
            source: error.into_inner(),
        }
    })
}
