use stage_engine::{ComponentDb, LoopConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::behaviours;

const MAX_FRAMES_ENV_VAR: &str = "STAGE_MAX_FRAMES";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) components: ComponentDb,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== Stage Startup ===");

    let config = LoopConfig {
        max_frames: max_frames_from_env(),
        ..LoopConfig::default()
    };

    AppWiring {
        config,
        components: behaviours::component_db(),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn max_frames_from_env() -> Option<u64> {
    let raw = std::env::var(MAX_FRAMES_ENV_VAR).ok()?;
    let parsed = parse_max_frames(&raw);
    if parsed.is_none() {
        warn!(
            env_var = MAX_FRAMES_ENV_VAR,
            value = raw.as_str(),
            "invalid frame limit; running until quit"
        );
    }
    parsed
}

fn parse_max_frames(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_limit_parses_trimmed_integers() {
        assert_eq!(parse_max_frames(" 300 "), Some(300));
        assert_eq!(parse_max_frames("0"), Some(0));
    }

    #[test]
    fn frame_limit_rejects_garbage() {
        assert_eq!(parse_max_frames("forever"), None);
        assert_eq!(parse_max_frames("-5"), None);
    }
}
