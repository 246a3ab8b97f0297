use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {} at {json_path}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("template {name} is missing")]
    TemplateMissing { name: String },
    #[error("scene {name} is missing")]
    SceneMissing { name: String },
    #[error("template {name} inherits from itself")]
    TemplateCycle { name: String },
    #[error("component '{key}' on actor '{owner}' has no type")]
    MissingComponentType { owner: String, key: String },
}
