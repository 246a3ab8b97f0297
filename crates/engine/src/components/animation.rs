use std::any::Any;

use serde_json::Value;

use crate::world::{
    ActorId, ComponentMeta, FieldError, Hook, HookArgs, HookContext, HookResult, HookSet,
    NativeComponent, Renderable, RenderableKind, Vec2,
};

use super::{expect_f32, expect_i32, expect_str, unknown};

pub const ANIMATION_TYPE: &str = "Animation";

/// Time one `OnUpdate` advances a playing clip by.
pub const FRAME_DELTA_MS: f32 = 1000.0 / 60.0;

/// Sprite animation player. Registers a renderable while a clip is playing.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub file: String,
    pub position: Vec2,
    pub scale: Vec2,
    pub rotation: f32,
    pub layer: i32,
    pub sorting_order: i32,
    /// Clip length; 0 plays without wrapping.
    pub clip_length_ms: f32,
    clip: Option<String>,
    elapsed_ms: Option<f32>,
}

impl Default for Animation {
    fn default() -> Self {
        Self {
            file: String::new(),
            position: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            layer: 0,
            sorting_order: 0,
            clip_length_ms: 0.0,
            clip: None,
            elapsed_ms: None,
        }
    }
}

impl Animation {
    pub fn is_playing(&self) -> bool {
        self.elapsed_ms.is_some()
    }

    pub fn clip(&self) -> Option<&str> {
        self.clip.as_deref()
    }

    pub fn elapsed_ms(&self) -> Option<f32> {
        self.elapsed_ms
    }

    pub fn play(&mut self, clip: impl Into<String>) {
        self.clip = Some(clip.into());
        self.elapsed_ms = Some(0.0);
    }

    pub fn stop(&mut self) {
        self.elapsed_ms = None;
    }

    pub fn advance(&mut self, delta_ms: f32) {
        let Some(elapsed) = self.elapsed_ms.as_mut() else {
            return;
        };
        *elapsed += delta_ms;
        if self.clip_length_ms > 0.0 && *elapsed >= self.clip_length_ms {
            *elapsed = 0.0;
        }
    }

    pub fn renderable(&self, owner: ActorId) -> Renderable {
        Renderable {
            owner,
            kind: RenderableKind::Animation {
                file: self.file.clone(),
                clip: self.clip.clone(),
                elapsed_ms: self.elapsed_ms.unwrap_or(0.0),
            },
            position: self.position,
            scale: self.scale,
            rotation_degrees: self.rotation,
            layer: self.layer,
            sorting_order: self.sorting_order,
        }
    }
}

impl NativeComponent for Animation {
    fn hooks(&self) -> HookSet {
        HookSet::UPDATE | HookSet::DESTROY
    }

    fn invoke(
        &mut self,
        meta: &ComponentMeta,
        hook: Hook,
        _args: HookArgs<'_>,
        ctx: &mut HookContext<'_>,
    ) -> HookResult {
        let (Some(handle), Some(owner)) = (meta.handle(), meta.actor) else {
            return Ok(());
        };
        match hook {
            Hook::Update if self.is_playing() => {
                self.advance(FRAME_DELTA_MS);
                ctx.renderables_mut().insert(handle, self.renderable(owner));
            }
            Hook::Destroy => {
                ctx.renderables_mut().remove(&handle);
            }
            _ => {}
        }
        Ok(())
    }

    fn set_field(&mut self, name: &str, value: &Value) -> Result<(), FieldError> {
        match name {
            "file" => self.file = expect_str(name, value)?.to_string(),
            "x" => self.position.x = expect_f32(name, value)?,
            "y" => self.position.y = expect_f32(name, value)?,
            "scale_x" => self.scale.x = expect_f32(name, value)?,
            "scale_y" => self.scale.y = expect_f32(name, value)?,
            "rotation" => self.rotation = expect_f32(name, value)?,
            "layer" => self.layer = expect_i32(name, value)?,
            "sorting_order" => self.sorting_order = expect_i32(name, value)?,
            "clip_length_ms" => self.clip_length_ms = expect_f32(name, value)?,
            _ => return Err(unknown(name)),
        }
        Ok(())
    }

    fn field(&self, name: &str) -> Option<Value> {
        let value = match name {
            "file" => Value::from(self.file.clone()),
            "x" => Value::from(self.position.x),
            "y" => Value::from(self.position.y),
            "scale_x" => Value::from(self.scale.x),
            "scale_y" => Value::from(self.scale.y),
            "rotation" => Value::from(self.rotation),
            "layer" => Value::from(self.layer),
            "sorting_order" => Value::from(self.sorting_order),
            "clip_length_ms" => Value::from(self.clip_length_ms),
            "clip" => self.clip.clone().map_or(Value::Null, Value::from),
            "playing" => Value::from(self.is_playing()),
            _ => return None,
        };
        Some(value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn stopped_animation_does_not_advance() {
        let mut animation = Animation::default();
        animation.advance(FRAME_DELTA_MS);
        assert_eq!(animation.elapsed_ms(), None);
    }

    #[test]
    fn play_resets_time_and_advance_adds_one_frame() {
        let mut animation = Animation::default();
        animation.play("walk");
        animation.advance(FRAME_DELTA_MS);
        animation.advance(FRAME_DELTA_MS);

        let elapsed = animation.elapsed_ms().expect("playing");
        assert!((elapsed - 2.0 * FRAME_DELTA_MS).abs() < 0.001);
        assert_eq!(animation.clip(), Some("walk"));

        animation.stop();
        assert!(!animation.is_playing());
    }

    #[test]
    fn finished_clip_wraps_to_start() {
        let mut animation = Animation::default();
        animation.set_field("clip_length_ms", &json!(30.0)).expect("clip length");
        animation.play("idle");
        animation.advance(FRAME_DELTA_MS);
        animation.advance(FRAME_DELTA_MS);

        assert_eq!(animation.elapsed_ms(), Some(0.0));
    }

    #[test]
    fn renderable_carries_transform_and_layering() {
        let mut animation = Animation::default();
        animation.set_field("file", &json!("hero.scon")).expect("file");
        animation.set_field("layer", &json!(2)).expect("layer");
        animation.set_field("x", &json!(4.0)).expect("x");

        let renderable = animation.renderable(ActorId(9));
        assert_eq!(renderable.owner, ActorId(9));
        assert_eq!(renderable.layer, 2);
        assert_eq!(renderable.position, Vec2::new(4.0, 0.0));
        assert!(matches!(
            renderable.kind,
            RenderableKind::Animation { ref file, .. } if file == "hero.scon"
        ));
    }
}
