use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::world::{
    ActorId, ComponentMeta, ComponentRef, Hook, HookArgs, HookContext, HookResult, HookSet,
};

pub type ScriptFn = dyn Fn(&mut ScriptSelf<'_>, HookArgs<'_>, &mut HookContext<'_>) -> HookResult;

/// A named behaviour class: default field values plus handlers looked up by name.
pub struct ScriptClass {
    name: String,
    defaults: Map<String, Value>,
    handlers: HashMap<String, Rc<ScriptFn>>,
}

impl ScriptClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            defaults: Map::new(),
            handlers: HashMap::new(),
        }
    }

    pub fn with_default(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(field.into(), value.into());
        self
    }

    /// Registers a handler under an arbitrary name. Lifecycle hooks use their `On*` names;
    /// any other name is reachable as an event handler.
    pub fn on<F>(mut self, handler: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut ScriptSelf<'_>, HookArgs<'_>, &mut HookContext<'_>) -> HookResult + 'static,
    {
        self.handlers.insert(handler.into(), Rc::new(f));
        self
    }

    pub fn on_hook<F>(self, hook: Hook, f: F) -> Self
    where
        F: Fn(&mut ScriptSelf<'_>, HookArgs<'_>, &mut HookContext<'_>) -> HookResult + 'static,
    {
        self.on(hook.name(), f)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn defaults(&self) -> &Map<String, Value> {
        &self.defaults
    }

    pub fn hooks(&self) -> HookSet {
        Hook::ALL
            .into_iter()
            .filter(|hook| self.handlers.contains_key(hook.name()))
            .fold(HookSet::empty(), |set, hook| set | hook.flag())
    }

    fn handler(&self, name: &str) -> Option<Rc<ScriptFn>> {
        self.handlers.get(name).cloned()
    }
}

impl fmt::Debug for ScriptClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut handlers: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        handlers.sort_unstable();
        f.debug_struct("ScriptClass")
            .field("name", &self.name)
            .field("defaults", &self.defaults)
            .field("handlers", &handlers)
            .finish()
    }
}

/// Per-component state of a scripted behaviour.
#[derive(Debug)]
pub struct ScriptInstance {
    class: Rc<ScriptClass>,
    fields: Map<String, Value>,
}

impl ScriptInstance {
    pub fn new(class: Rc<ScriptClass>) -> Self {
        let fields = class.defaults.clone();
        Self { class, fields }
    }

    pub fn class_name(&self) -> &str {
        &self.class.name
    }

    pub fn hooks(&self) -> HookSet {
        self.class.hooks()
    }

    pub fn responds_to(&self, handler: &str) -> bool {
        self.class.handlers.contains_key(handler)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Blueprint overrides carry scalars only; arrays, objects and nulls are dropped.
    pub(crate) fn override_field(&mut self, field: &str, value: &Value) {
        match value {
            Value::Number(_) | Value::String(_) | Value::Bool(_) => {
                self.fields.insert(field.to_string(), value.clone());
            }
            _ => {
                debug!(
                    class = %self.class.name,
                    field,
                    "script_override_ignored"
                );
            }
        }
    }

    pub(crate) fn call(
        &mut self,
        meta: &ComponentMeta,
        enabled: &mut bool,
        handler: &str,
        args: HookArgs<'_>,
        ctx: &mut HookContext<'_>,
    ) -> HookResult {
        let Some(handler) = self.class.handler(handler) else {
            return Ok(());
        };
        let mut this = ScriptSelf {
            meta,
            enabled,
            fields: &mut self.fields,
        };
        handler(&mut this, args, ctx)
    }
}

/// The `self` a scripted handler sees.
pub struct ScriptSelf<'a> {
    meta: &'a ComponentMeta,
    enabled: &'a mut bool,
    fields: &'a mut Map<String, Value>,
}

impl ScriptSelf<'_> {
    pub fn key(&self) -> &str {
        &self.meta.key
    }

    pub fn type_name(&self) -> &str {
        &self.meta.type_name
    }

    pub fn actor(&self) -> Option<ActorId> {
        self.meta.actor
    }

    pub fn handle(&self) -> Option<ComponentRef> {
        self.meta.handle()
    }

    pub fn enabled(&self) -> bool {
        *self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        *self.enabled = enabled;
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(Value::as_f64)
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.fields.get(field).and_then(Value::as_i64)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.fields.get(field).and_then(Value::as_bool)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn noop(_: &mut ScriptSelf<'_>, _: HookArgs<'_>, _: &mut HookContext<'_>) -> HookResult {
        Ok(())
    }

    #[test]
    fn hooks_are_derived_from_registered_handlers() {
        let class = ScriptClass::new("Mover")
            .on_hook(Hook::Update, noop)
            .on_hook(Hook::TriggerEnter, noop)
            .on("OnScored", noop);

        assert_eq!(class.hooks(), HookSet::UPDATE | HookSet::TRIGGER_ENTER);
    }

    #[test]
    fn instances_copy_class_defaults() {
        let class = Rc::new(ScriptClass::new("Mover").with_default("speed", 2.5));
        let mut first = ScriptInstance::new(Rc::clone(&class));
        let second = ScriptInstance::new(class);

        first.set("speed", 9.0);

        assert_eq!(first.get("speed"), Some(&json!(9.0)));
        assert_eq!(second.get("speed"), Some(&json!(2.5)));
    }

    #[test]
    fn overrides_accept_scalars_only() {
        let class = Rc::new(ScriptClass::new("Mover").with_default("speed", 1));
        let mut instance = ScriptInstance::new(class);

        instance.override_field("speed", &json!(4));
        instance.override_field("label", &json!("fast"));
        instance.override_field("path", &json!([1, 2, 3]));
        instance.override_field("nothing", &Value::Null);

        assert_eq!(instance.get("speed"), Some(&json!(4)));
        assert_eq!(instance.get("label"), Some(&json!("fast")));
        assert_eq!(instance.get("path"), None);
        assert_eq!(instance.get("nothing"), None);
    }

    #[test]
    fn responds_to_covers_event_handlers() {
        let instance = ScriptInstance::new(Rc::new(ScriptClass::new("Listener").on("OnScored", noop)));

        assert!(instance.responds_to("OnScored"));
        assert!(!instance.responds_to("OnUpdate"));
        assert_eq!(instance.class_name(), "Listener");
    }
}
