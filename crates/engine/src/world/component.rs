use std::any::Any;
use std::fmt;

use bitflags::bitflags;
use serde_json::Value;

use crate::components::ScriptInstance;

use super::collision::Collision;
use super::context::HookContext;
use super::error::{FieldError, HookResult};
use super::ActorId;

bitflags! {
    /// Lifecycle hooks a component implements, resolved once when the instance is created.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HookSet: u16 {
        const START = 1 << 0;
        const UPDATE = 1 << 1;
        const LATE_UPDATE = 1 << 2;
        const DESTROY = 1 << 3;
        const COLLISION_ENTER = 1 << 4;
        const COLLISION_EXIT = 1 << 5;
        const TRIGGER_ENTER = 1 << 6;
        const TRIGGER_EXIT = 1 << 7;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    Start,
    Update,
    LateUpdate,
    Destroy,
    CollisionEnter,
    CollisionExit,
    TriggerEnter,
    TriggerExit,
}

impl Hook {
    pub const ALL: [Hook; 8] = [
        Hook::Start,
        Hook::Update,
        Hook::LateUpdate,
        Hook::Destroy,
        Hook::CollisionEnter,
        Hook::CollisionExit,
        Hook::TriggerEnter,
        Hook::TriggerExit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Hook::Start => "OnStart",
            Hook::Update => "OnUpdate",
            Hook::LateUpdate => "OnLateUpdate",
            Hook::Destroy => "OnDestroy",
            Hook::CollisionEnter => "OnCollisionEnter",
            Hook::CollisionExit => "OnCollisionExit",
            Hook::TriggerEnter => "OnTriggerEnter",
            Hook::TriggerExit => "OnTriggerExit",
        }
    }

    pub fn from_name(name: &str) -> Option<Hook> {
        Hook::ALL.into_iter().find(|hook| hook.name() == name)
    }

    pub fn flag(self) -> HookSet {
        match self {
            Hook::Start => HookSet::START,
            Hook::Update => HookSet::UPDATE,
            Hook::LateUpdate => HookSet::LATE_UPDATE,
            Hook::Destroy => HookSet::DESTROY,
            Hook::CollisionEnter => HookSet::COLLISION_ENTER,
            Hook::CollisionExit => HookSet::COLLISION_EXIT,
            Hook::TriggerEnter => HookSet::TRIGGER_ENTER,
            Hook::TriggerExit => HookSet::TRIGGER_EXIT,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum HookArgs<'a> {
    None,
    Collision(&'a Collision),
    Event(&'a Value),
}

impl<'a> HookArgs<'a> {
    pub fn collision(&self) -> Option<&'a Collision> {
        match self {
            HookArgs::Collision(collision) => Some(collision),
            _ => None,
        }
    }

    pub fn event(&self) -> Option<&'a Value> {
        match self {
            HookArgs::Event(payload) => Some(payload),
            _ => None,
        }
    }
}

/// Handle to a component: owning actor plus the component key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentRef {
    pub actor: ActorId,
    pub key: String,
}

impl ComponentRef {
    pub fn new(actor: ActorId, key: impl Into<String>) -> Self {
        Self {
            actor,
            key: key.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentMeta {
    pub key: String,
    pub type_name: String,
    pub actor: Option<ActorId>,
}

impl ComponentMeta {
    pub fn handle(&self) -> Option<ComponentRef> {
        self.actor
            .map(|actor| ComponentRef::new(actor, self.key.clone()))
    }
}

/// Behaviour implemented in Rust and exposed to scripts like any other component.
pub trait NativeComponent: fmt::Debug {
    fn hooks(&self) -> HookSet;

    fn invoke(
        &mut self,
        meta: &ComponentMeta,
        hook: Hook,
        args: HookArgs<'_>,
        ctx: &mut HookContext<'_>,
    ) -> HookResult;

    fn set_field(&mut self, name: &str, value: &Value) -> Result<(), FieldError>;

    fn field(&self, name: &str) -> Option<Value>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[derive(Debug)]
pub enum Behavior {
    Native(Box<dyn NativeComponent>),
    Scripted(ScriptInstance),
}

/// The behaviour state a component record owns.
#[derive(Debug)]
pub struct ComponentInstance {
    meta: ComponentMeta,
    enabled: bool,
    hooks: HookSet,
    behavior: Behavior,
}

impl ComponentInstance {
    pub fn native(
        key: impl Into<String>,
        type_name: impl Into<String>,
        native: Box<dyn NativeComponent>,
    ) -> Self {
        Self {
            meta: ComponentMeta {
                key: key.into(),
                type_name: type_name.into(),
                actor: None,
            },
            enabled: true,
            hooks: native.hooks(),
            behavior: Behavior::Native(native),
        }
    }

    pub fn scripted(key: impl Into<String>, script: ScriptInstance) -> Self {
        Self {
            meta: ComponentMeta {
                key: key.into(),
                type_name: script.class_name().to_string(),
                actor: None,
            },
            enabled: true,
            hooks: script.hooks(),
            behavior: Behavior::Scripted(script),
        }
    }

    pub fn key(&self) -> &str {
        &self.meta.key
    }

    pub fn type_name(&self) -> &str {
        &self.meta.type_name
    }

    pub fn actor(&self) -> Option<ActorId> {
        self.meta.actor
    }

    pub fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn hooks(&self) -> HookSet {
        self.hooks
    }

    pub fn implements(&self, hook: Hook) -> bool {
        self.hooks.contains(hook.flag())
    }

    pub fn responds_to(&self, handler: &str) -> bool {
        match &self.behavior {
            Behavior::Native(_) => Hook::from_name(handler).is_some_and(|hook| self.implements(hook)),
            Behavior::Scripted(script) => script.responds_to(handler),
        }
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    pub fn script(&self) -> Option<&ScriptInstance> {
        match &self.behavior {
            Behavior::Scripted(script) => Some(script),
            Behavior::Native(_) => None,
        }
    }

    pub fn script_mut(&mut self) -> Option<&mut ScriptInstance> {
        match &mut self.behavior {
            Behavior::Scripted(script) => Some(script),
            Behavior::Native(_) => None,
        }
    }

    pub fn downcast_ref<T: NativeComponent + 'static>(&self) -> Option<&T> {
        match &self.behavior {
            Behavior::Native(native) => native.as_any().downcast_ref::<T>(),
            Behavior::Scripted(_) => None,
        }
    }

    pub fn downcast_mut<T: NativeComponent + 'static>(&mut self) -> Option<&mut T> {
        match &mut self.behavior {
            Behavior::Native(native) => native.as_any_mut().downcast_mut::<T>(),
            Behavior::Scripted(_) => None,
        }
    }

    /// Applies a blueprint override. `key` and `type` are identity, not state, and are skipped.
    pub fn set_field(&mut self, name: &str, value: &Value) -> Result<(), FieldError> {
        match name {
            "key" | "type" => Ok(()),
            "enabled" => {
                self.enabled = value.as_bool().ok_or_else(|| FieldError::InvalidValue {
                    field: name.to_string(),
                    expected: "a boolean",
                })?;
                Ok(())
            }
            _ => match &mut self.behavior {
                Behavior::Native(native) => native.set_field(name, value),
                Behavior::Scripted(script) => {
                    script.override_field(name, value);
                    Ok(())
                }
            },
        }
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "key" => Some(Value::from(self.meta.key.clone())),
            "type" => Some(Value::from(self.meta.type_name.clone())),
            "enabled" => Some(Value::from(self.enabled)),
            _ => match &self.behavior {
                Behavior::Native(native) => native.field(name),
                Behavior::Scripted(script) => script.get(name).cloned(),
            },
        }
    }

    pub(crate) fn attach_to(&mut self, actor: ActorId) {
        self.meta.actor = Some(actor);
    }

    pub(crate) fn invoke(
        &mut self,
        hook: Hook,
        args: HookArgs<'_>,
        ctx: &mut HookContext<'_>,
    ) -> HookResult {
        match &mut self.behavior {
            Behavior::Native(native) => native.invoke(&self.meta, hook, args, ctx),
            Behavior::Scripted(script) => {
                script.call(&self.meta, &mut self.enabled, hook.name(), args, ctx)
            }
        }
    }

    pub(crate) fn invoke_handler(
        &mut self,
        handler: &str,
        payload: &Value,
        ctx: &mut HookContext<'_>,
    ) -> HookResult {
        match &mut self.behavior {
            Behavior::Native(native) => match Hook::from_name(handler) {
                Some(hook) if self.hooks.contains(hook.flag()) => {
                    native.invoke(&self.meta, hook, HookArgs::Event(payload), ctx)
                }
                _ => Ok(()),
            },
            Behavior::Scripted(script) => script.call(
                &self.meta,
                &mut self.enabled,
                handler,
                HookArgs::Event(payload),
                ctx,
            ),
        }
    }
}

/// Record in an actor's component collection. `instance` is vacant while its own hook runs.
#[derive(Debug)]
pub(crate) struct Component {
    pub(crate) type_name: String,
    pub(crate) enabled: bool,
    pub(crate) instance: Option<ComponentInstance>,
}

impl Component {
    pub(crate) fn new(instance: ComponentInstance) -> Self {
        Self {
            type_name: instance.type_name().to_string(),
            enabled: instance.enabled(),
            instance: Some(instance),
        }
    }

    /// Re-reads the cached flag from the live instance.
    pub(crate) fn refresh_enabled(&mut self) -> bool {
        if let Some(instance) = &self.instance {
            self.enabled = instance.enabled();
        }
        self.enabled
    }
}
