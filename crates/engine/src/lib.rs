use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod components;
pub mod content;
pub mod world;

pub use app::{
    run_app, run_app_with_metrics, AppError, LoopConfig, LoopMetricsSnapshot, MetricsHandle,
    RunSummary, StopReason,
};
pub use components::{
    Animation, ComponentDb, Rigidbody, ScriptClass, ScriptInstance, ScriptSelf, ANIMATION_TYPE,
    RIGIDBODY_TYPE,
};
pub use content::{
    ActorBlueprint, ComponentBlueprint, ContentError, GameConfig, SceneDb, SceneDescription,
    TemplateDb,
};
pub use world::{
    Actor, ActorId, Collision, ComponentInstance, ComponentRef, FrameDriver, FrameReport, Hook,
    HookArgs, HookContext, HookError, HookResult, Vec2, World, WorldError,
};

pub const RESOURCES_ENV_VAR: &str = "STAGE_RESOURCES";
pub const DEFAULT_RESOURCES_DIR: &str = "resources";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub resources: PathBuf,
    pub scenes_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub game_config: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
    #[error("resources directory is missing: {}", .path.display())]
    ResourcesMissing { path: PathBuf },
    #[error("game config is missing: {}", .path.display())]
    GameConfigMissing { path: PathBuf },
}

/// Resolves the resources root: `explicit` if given, then `STAGE_RESOURCES`, then
/// `./resources`.
pub fn resolve_app_paths(explicit: Option<&Path>) -> Result<AppPaths, StartupError> {
    if let Some(root) = explicit {
        return app_paths_at(root);
    }
    match env::var(RESOURCES_ENV_VAR) {
        Ok(value) => app_paths_at(Path::new(&value)),
        Err(env::VarError::NotPresent) => {
            let cwd = env::current_dir().map_err(StartupError::CurrentDir)?;
            app_paths_at(&cwd.join(DEFAULT_RESOURCES_DIR))
        }
        Err(source) => Err(StartupError::EnvVar {
            var: RESOURCES_ENV_VAR,
            source,
        }),
    }
}

pub fn app_paths_at(root: &Path) -> Result<AppPaths, StartupError> {
    let resources = normalize_path(root);
    if !resources.is_dir() {
        return Err(StartupError::ResourcesMissing { path: resources });
    }
    let game_config = resources.join(content::GAME_CONFIG_FILE);
    if !game_config.is_file() {
        return Err(StartupError::GameConfigMissing { path: game_config });
    }

    Ok(AppPaths {
        scenes_dir: resources.join("scenes"),
        templates_dir: resources.join("actor_templates"),
        game_config,
        resources,
    })
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_resources_directory_is_reported() {
        let temp = TempDir::new().expect("tempdir");
        let error = app_paths_at(&temp.path().join("absent")).expect_err("missing root");
        assert!(matches!(error, StartupError::ResourcesMissing { .. }));
    }

    #[test]
    fn resources_without_game_config_are_rejected() {
        let temp = TempDir::new().expect("tempdir");
        let error = app_paths_at(temp.path()).expect_err("missing config");
        assert!(matches!(error, StartupError::GameConfigMissing { .. }));
    }

    #[test]
    fn paths_hang_off_the_resources_root() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(temp.path().join("game.config"), r#"{"initial_scene":"basic"}"#)
            .expect("write config");

        let paths = resolve_app_paths(Some(temp.path())).expect("paths");
        assert!(paths.scenes_dir.ends_with("scenes"));
        assert!(paths.templates_dir.ends_with("actor_templates"));
        assert!(paths.game_config.is_file());
    }
}
