use std::any::Any;

use serde_json::Value;
use tracing::debug;

use crate::world::{
    ActorId, BodyDesc, BodyHandle, BodyType, ComponentMeta, FieldError, FixtureDesc, Hook,
    HookArgs, HookContext, HookError, HookResult, HookSet, NativeComponent, ShapeKind, Vec2,
};

use super::{expect_bool, expect_f32, expect_str, invalid, unknown};

pub const RIGIDBODY_TYPE: &str = "Rigidbody";

/// Physics body component. The body exists between `OnStart` and `OnDestroy`.
#[derive(Debug, Clone, PartialEq)]
pub struct Rigidbody {
    pub x: f32,
    pub y: f32,
    pub body_type: BodyType,
    pub precise: bool,
    pub gravity_scale: f32,
    pub density: f32,
    pub angular_friction: f32,
    pub rotation: f32,
    pub has_collider: bool,
    pub collider_type: ShapeKind,
    pub width: f32,
    pub height: f32,
    pub radius: f32,
    pub friction: f32,
    pub bounciness: f32,
    pub has_trigger: bool,
    pub trigger_type: ShapeKind,
    pub trigger_width: f32,
    pub trigger_height: f32,
    pub trigger_radius: f32,
    body: Option<BodyHandle>,
}

impl Default for Rigidbody {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            body_type: BodyType::Dynamic,
            precise: true,
            gravity_scale: 1.0,
            density: 1.0,
            angular_friction: 0.3,
            rotation: 0.0,
            has_collider: true,
            collider_type: ShapeKind::Box,
            width: 1.0,
            height: 1.0,
            radius: 0.5,
            friction: 0.3,
            bounciness: 0.3,
            has_trigger: true,
            trigger_type: ShapeKind::Box,
            trigger_width: 1.0,
            trigger_height: 1.0,
            trigger_radius: 0.5,
            body: None,
        }
    }
}

impl Rigidbody {
    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    pub fn body_desc(&self, owner: ActorId) -> BodyDesc {
        let mut fixtures = Vec::with_capacity(2);
        if !self.has_collider && !self.has_trigger {
            fixtures.push(FixtureDesc {
                shape: ShapeKind::Box,
                width: self.width,
                height: self.height,
                radius: self.radius,
                is_sensor: true,
                density: self.density,
                friction: 0.0,
                restitution: 0.0,
                collides: false,
                owner: None,
            });
        }
        if self.has_collider {
            fixtures.push(FixtureDesc {
                shape: self.collider_type,
                width: self.width,
                height: self.height,
                radius: self.radius,
                is_sensor: false,
                density: self.density,
                friction: self.friction,
                restitution: self.bounciness,
                collides: true,
                owner: Some(owner),
            });
        }
        if self.has_trigger {
            fixtures.push(FixtureDesc {
                shape: self.trigger_type,
                width: self.trigger_width,
                height: self.trigger_height,
                radius: self.trigger_radius,
                is_sensor: true,
                density: self.density,
                friction: 0.0,
                restitution: 0.0,
                collides: true,
                owner: Some(owner),
            });
        }

        BodyDesc {
            owner,
            body_type: self.body_type,
            position: Vec2::new(self.x, self.y),
            rotation_degrees: self.rotation,
            bullet: self.precise,
            gravity_scale: self.gravity_scale,
            angular_damping: self.angular_friction,
            fixtures,
        }
    }

    fn create_body(&mut self, meta: &ComponentMeta, ctx: &mut HookContext<'_>) -> HookResult {
        let owner = meta
            .actor
            .ok_or_else(|| HookError::script(format!("{} has no owning actor", meta.key)))?;
        let body = ctx.physics_mut().create_body(self.body_desc(owner));
        debug!(actor = %owner, key = %meta.key, body = body.0, "rigidbody_created");
        self.body = Some(body);
        Ok(())
    }
}

impl NativeComponent for Rigidbody {
    fn hooks(&self) -> HookSet {
        HookSet::START | HookSet::DESTROY
    }

    fn invoke(
        &mut self,
        meta: &ComponentMeta,
        hook: Hook,
        _args: HookArgs<'_>,
        ctx: &mut HookContext<'_>,
    ) -> HookResult {
        match hook {
            Hook::Start => self.create_body(meta, ctx),
            Hook::Destroy => {
                if let Some(body) = self.body.take() {
                    ctx.physics_mut().destroy_body(body);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn set_field(&mut self, name: &str, value: &Value) -> Result<(), FieldError> {
        match name {
            "x" => self.x = expect_f32(name, value)?,
            "y" => self.y = expect_f32(name, value)?,
            "body_type" => {
                self.body_type = BodyType::parse(expect_str(name, value)?)
                    .ok_or_else(|| invalid(name, "dynamic, static or kinematic"))?;
            }
            "precise" => self.precise = expect_bool(name, value)?,
            "gravity_scale" => self.gravity_scale = expect_f32(name, value)?,
            "density" => self.density = expect_f32(name, value)?,
            "angular_friction" => self.angular_friction = expect_f32(name, value)?,
            "rotation" => self.rotation = expect_f32(name, value)?,
            "has_collider" => self.has_collider = expect_bool(name, value)?,
            "collider_type" => self.collider_type = parse_shape(name, value)?,
            "width" => self.width = expect_f32(name, value)?,
            "height" => self.height = expect_f32(name, value)?,
            "radius" => self.radius = expect_f32(name, value)?,
            "friction" => self.friction = expect_f32(name, value)?,
            "bounciness" => self.bounciness = expect_f32(name, value)?,
            "has_trigger" => self.has_trigger = expect_bool(name, value)?,
            "trigger_type" => self.trigger_type = parse_shape(name, value)?,
            "trigger_width" => self.trigger_width = expect_f32(name, value)?,
            "trigger_height" => self.trigger_height = expect_f32(name, value)?,
            "trigger_radius" => self.trigger_radius = expect_f32(name, value)?,
            _ => return Err(unknown(name)),
        }
        Ok(())
    }

    fn field(&self, name: &str) -> Option<Value> {
        let value = match name {
            "x" => Value::from(self.x),
            "y" => Value::from(self.y),
            "body_type" => Value::from(self.body_type.as_str()),
            "precise" => Value::from(self.precise),
            "gravity_scale" => Value::from(self.gravity_scale),
            "density" => Value::from(self.density),
            "angular_friction" => Value::from(self.angular_friction),
            "rotation" => Value::from(self.rotation),
            "has_collider" => Value::from(self.has_collider),
            "collider_type" => Value::from(self.collider_type.as_str()),
            "width" => Value::from(self.width),
            "height" => Value::from(self.height),
            "radius" => Value::from(self.radius),
            "friction" => Value::from(self.friction),
            "bounciness" => Value::from(self.bounciness),
            "has_trigger" => Value::from(self.has_trigger),
            "trigger_type" => Value::from(self.trigger_type.as_str()),
            "trigger_width" => Value::from(self.trigger_width),
            "trigger_height" => Value::from(self.trigger_height),
            "trigger_radius" => Value::from(self.trigger_radius),
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

fn parse_shape(name: &str, value: &Value) -> Result<ShapeKind, FieldError> {
    ShapeKind::parse(expect_str(name, value)?).ok_or_else(|| invalid(name, "box or circle"))
}
