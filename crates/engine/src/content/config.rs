use std::path::Path;

use serde::Deserialize;

use super::{read_json, ContentError};

pub const GAME_CONFIG_FILE: &str = "game.config";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameConfig {
    pub initial_scene: String,
    #[serde(default)]
    pub game_title: String,
    #[serde(default)]
    pub game_start_message: String,
    #[serde(default)]
    pub game_over_bad_message: String,
    #[serde(default)]
    pub game_over_good_message: String,
}

impl GameConfig {
    pub fn load(path: &Path) -> Result<Self, ContentError> {
        read_json(path)
    }
}
