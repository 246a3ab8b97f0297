use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::components::ComponentDb;
use crate::content::{ContentError, GameConfig, SceneDb, TemplateDb};
use crate::world::{FrameDriver, NullRenderer, World, WorldError};
use crate::{resolve_app_paths, AppPaths, StartupError};

use super::metrics::MetricsAccumulator;
use super::MetricsHandle;

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    /// Stops the loop after this many world frames. `None` runs until a quit request.
    pub max_frames: Option<u64>,
    /// Overrides `STAGE_RESOURCES` and the working-directory fallback.
    pub resources_dir: Option<PathBuf>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            max_frames: None,
            resources_dir: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to load game content: {0}")]
    Content(#[from] ContentError),
    #[error("world failed: {0}")]
    World(#[from] WorldError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    QuitRequested,
    FrameLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub script_failures: usize,
    pub stop_reason: StopReason,
}

pub fn run_app(config: LoopConfig, components: ComponentDb) -> Result<RunSummary, AppError> {
    let metrics_handle = MetricsHandle::default();
    run_app_with_metrics(config, components, metrics_handle)
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    components: ComponentDb,
    metrics_handle: MetricsHandle,
) -> Result<RunSummary, AppError> {
    let app_paths = resolve_app_paths(config.resources_dir.as_deref())?;
    info!(
        resources = %app_paths.resources.display(),
        scenes_dir = %app_paths.scenes_dir.display(),
        templates_dir = %app_paths.templates_dir.display(),
        "startup"
    );
    let game_config = GameConfig::load(&app_paths.game_config)?;
    if !game_config.game_title.is_empty() {
        info!(title = %game_config.game_title, "game_title");
    }
    if !game_config.game_start_message.is_empty() {
        info!(message = %game_config.game_start_message, "game_start");
    }

    let mut world = build_world(&app_paths, components);
    world.load_scene(&game_config.initial_scene)?;

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        max_frames = %format_frame_limit(config.max_frames),
        "loop_config"
    );

    let mut driver = FrameDriver::new(Box::<NullRenderer>::default(), fixed_dt.as_secs_f32());
    let mut frames = 0u64;
    let mut script_failures = 0usize;
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval, last_frame_instant);

    let stop_reason = 'outer: loop {
        if frame_limit_reached(frames, config.max_frames) {
            break StopReason::FrameLimit;
        }

        let now = Instant::now();
        let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
        last_frame_instant = now;
        accumulator = accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));

        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        accumulator = step_plan.remaining_accumulator;
        if step_plan.dropped_backlog > Duration::ZERO {
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
        }

        for _ in 0..step_plan.ticks_to_run {
            let tick_start = Instant::now();
            let report = driver.run_frame(&mut world)?;
            frames = frames.saturating_add(1);
            script_failures = script_failures.saturating_add(report.script_failures.len());
            metrics_accumulator.record_tick(
                tick_start.elapsed(),
                report.actor_count,
                report.script_failures.len(),
            );

            if report.quit_requested {
                info!(reason = "quit_requested", frame = report.frame, "shutdown_requested");
                break 'outer StopReason::QuitRequested;
            }
            if frame_limit_reached(frames, config.max_frames) {
                break 'outer StopReason::FrameLimit;
            }
        }

        if let Some(snapshot) = metrics_accumulator.maybe_snapshot(Instant::now()) {
            metrics_handle.publish(snapshot);
            info!(
                tps = snapshot.tps,
                frame_time_ms = snapshot.frame_time_ms,
                actor_count = snapshot.actor_count,
                script_failures = snapshot.script_failures,
                scene = ?world.current_scene(),
                "loop_metrics"
            );
        }

        let idle = compute_idle_sleep(accumulator, fixed_dt);
        if idle > Duration::ZERO {
            thread::sleep(idle);
        }
    };

    info!(frames, script_failures, reason = ?stop_reason, "shutdown");
    Ok(RunSummary {
        frames,
        script_failures,
        stop_reason,
    })
}

fn build_world(app_paths: &AppPaths, components: ComponentDb) -> World {
    World::new(components)
        .with_templates(TemplateDb::from_dir(&app_paths.templates_dir))
        .with_scenes(SceneDb::from_dir(&app_paths.scenes_dir))
}

struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

/// Time left until the accumulator holds a full tick.
fn compute_idle_sleep(accumulator: Duration, fixed_dt: Duration) -> Duration {
    fixed_dt.saturating_sub(accumulator)
}

fn frame_limit_reached(frames: u64, max_frames: Option<u64>) -> bool {
    max_frames.is_some_and(|limit| frames >= limit)
}

fn format_frame_limit(max_frames: Option<u64>) -> String {
    match max_frames {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}
