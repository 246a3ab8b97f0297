use tracing::debug;

use super::error::WorldError;
use super::registry::{ScriptFailure, World};
use super::render::{NullRenderer, Renderer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    pub actor_count: usize,
    pub script_failures: Vec<ScriptFailure>,
    pub quit_requested: bool,
}

/// Runs the fixed per-frame order over a [`World`]:
/// start, update, late update (with teardown and per-actor commit), subscription
/// commit, registry commit, physics, render, then any requested scene load.
pub struct FrameDriver {
    renderer: Box<dyn Renderer>,
    fixed_dt_seconds: f32,
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new(Box::<NullRenderer>::default(), 1.0 / 60.0)
    }
}

impl FrameDriver {
    pub fn new(renderer: Box<dyn Renderer>, fixed_dt_seconds: f32) -> Self {
        Self {
            renderer,
            fixed_dt_seconds,
        }
    }

    pub fn fixed_dt_seconds(&self) -> f32 {
        self.fixed_dt_seconds
    }

    pub fn run_frame(&mut self, world: &mut World) -> Result<FrameReport, WorldError> {
        let frame = world.frame();

        world.run_on_start()?;
        world.run_update()?;
        world.run_late_update()?;
        world.commit_event_subscriptions();
        world.frame_end();

        world.step_physics(self.fixed_dt_seconds)?;

        let draw_list = world.renderables().draw_order();
        self.renderer.present(frame, &draw_list);

        if let Some(scene) = world.take_requested_scene() {
            debug!(scene = %scene, frame, "scene_load_requested");
            world.load_scene(&scene)?;
        }

        world.advance_frame();
        Ok(FrameReport {
            frame,
            actor_count: world.actor_count(),
            script_failures: world.take_script_failures(),
            quit_requested: world.quit_requested(),
        })
    }
}
