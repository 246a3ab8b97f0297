mod animation;
mod rigidbody;
mod script;

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use crate::world::{ComponentInstance, FieldError, NativeComponent, WorldError};

pub use animation::{Animation, ANIMATION_TYPE, FRAME_DELTA_MS};
pub use rigidbody::{Rigidbody, RIGIDBODY_TYPE};
pub use script::{ScriptClass, ScriptFn, ScriptInstance, ScriptSelf};

pub type NativeFactory = fn() -> Box<dyn NativeComponent>;

/// Component factory: native constructors, script classes and per-type key counters.
#[derive(Debug)]
pub struct ComponentDb {
    natives: BTreeMap<String, NativeFactory>,
    scripts: HashMap<String, Rc<ScriptClass>>,
    counters: HashMap<String, u64>,
}

impl Default for ComponentDb {
    fn default() -> Self {
        let mut db = Self {
            natives: BTreeMap::new(),
            scripts: HashMap::new(),
            counters: HashMap::new(),
        };
        db.register_native(RIGIDBODY_TYPE, new_rigidbody);
        db.register_native(ANIMATION_TYPE, new_animation);
        db
    }
}

fn new_rigidbody() -> Box<dyn NativeComponent> {
    Box::<Rigidbody>::default()
}

fn new_animation() -> Box<dyn NativeComponent> {
    Box::<Animation>::default()
}

impl ComponentDb {
    pub fn register_native(&mut self, type_name: impl Into<String>, factory: NativeFactory) {
        self.natives.insert(type_name.into(), factory);
    }

    pub fn register_script_class(&mut self, class: ScriptClass) {
        let name = class.name().to_string();
        if self.scripts.insert(name.clone(), Rc::new(class)).is_some() {
            debug!(class = %name, "script_class_replaced");
        }
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.natives.contains_key(type_name) || self.scripts.contains_key(type_name)
    }

    pub fn script_class(&self, type_name: &str) -> Option<&Rc<ScriptClass>> {
        self.scripts.get(type_name)
    }

    /// Builds a default-configured instance. Native types take precedence over script classes.
    pub fn create(&self, type_name: &str, key: &str) -> Result<ComponentInstance, WorldError> {
        if let Some(factory) = self.natives.get(type_name) {
            return Ok(ComponentInstance::native(key, type_name, factory()));
        }
        match self.scripts.get(type_name) {
            Some(class) => Ok(ComponentInstance::scripted(
                key,
                ScriptInstance::new(Rc::clone(class)),
            )),
            None => Err(WorldError::UnknownComponentType {
                type_name: type_name.to_string(),
            }),
        }
    }

    /// Next `r<n>` key from the type's counter, skipping keys the caller reports as taken.
    pub fn next_key(&mut self, type_name: &str, is_taken: impl Fn(&str) -> bool) -> String {
        let counter = self.counters.entry(type_name.to_string()).or_insert(0);
        loop {
            let key = format!("r{counter}");
            *counter = counter.saturating_add(1);
            if !is_taken(&key) {
                return key;
            }
        }
    }
}

pub(crate) fn expect_f32(field: &str, value: &Value) -> Result<f32, FieldError> {
    value
        .as_f64()
        .map(|number| number as f32)
        .ok_or_else(|| invalid(field, "a number"))
}

pub(crate) fn expect_i32(field: &str, value: &Value) -> Result<i32, FieldError> {
    value
        .as_i64()
        .and_then(|number| i32::try_from(number).ok())
        .ok_or_else(|| invalid(field, "a 32-bit integer"))
}

pub(crate) fn expect_bool(field: &str, value: &Value) -> Result<bool, FieldError> {
    value.as_bool().ok_or_else(|| invalid(field, "a boolean"))
}

pub(crate) fn expect_str<'v>(field: &str, value: &'v Value) -> Result<&'v str, FieldError> {
    value.as_str().ok_or_else(|| invalid(field, "a string"))
}

pub(crate) fn invalid(field: &str, expected: &'static str) -> FieldError {
    FieldError::InvalidValue {
        field: field.to_string(),
        expected,
    }
}

pub(crate) fn unknown(field: &str) -> FieldError {
    FieldError::UnknownField {
        field: field.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn builtins_are_registered_as_native() {
        let db = ComponentDb::default();
        let body = db.create(RIGIDBODY_TYPE, "r0").expect("rigidbody");
        let animation = db.create(ANIMATION_TYPE, "r1").expect("animation");

        assert!(body.downcast_ref::<Rigidbody>().is_some());
        assert!(animation.downcast_ref::<Animation>().is_some());
        assert_eq!(body.type_name(), RIGIDBODY_TYPE);
    }

    #[test]
    fn unknown_type_is_a_world_error() {
        let db = ComponentDb::default();
        let error = db.create("Nope", "r0").expect_err("unknown type");
        assert!(matches!(error, WorldError::UnknownComponentType { ref type_name } if type_name == "Nope"));
    }

    #[test]
    fn script_class_instances_start_from_defaults() {
        let mut db = ComponentDb::default();
        db.register_script_class(ScriptClass::new("Mover").with_default("speed", 4));

        let instance = db.create("Mover", "r0").expect("mover");
        assert_eq!(instance.field("speed"), Some(json!(4)));
        assert!(instance.script().is_some());
    }

    #[test]
    fn keys_count_per_type_and_skip_taken_keys() {
        let mut db = ComponentDb::default();
        assert_eq!(db.next_key("Mover", |_| false), "r0");
        assert_eq!(db.next_key("Mover", |_| false), "r1");
        assert_eq!(db.next_key("Spinner", |_| false), "r0");
        assert_eq!(db.next_key("Spinner", |key| key == "r1" || key == "r2"), "r3");
    }

    #[test]
    fn field_helpers_reject_wrong_kinds() {
        assert_eq!(expect_f32("x", &json!(1.5)), Ok(1.5));
        assert_eq!(expect_i32("layer", &json!(3)), Ok(3));
        assert_eq!(
            expect_bool("precise", &json!("yes")),
            Err(invalid("precise", "a boolean"))
        );
        assert_eq!(expect_str("file", &json!("hero.scon")), Ok("hero.scon"));
    }
}
