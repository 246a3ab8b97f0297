use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

/// An actor entry as written in a `.template` or `.scene` file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActorBlueprint {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentBlueprint>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ComponentBlueprint {
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,
    #[serde(flatten)]
    pub overrides: Map<String, Value>,
}

impl ComponentBlueprint {
    pub fn typed(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            overrides: Map::new(),
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.insert(field.into(), value.into());
        self
    }
}

impl ActorBlueprint {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn from_template(template: impl Into<String>) -> Self {
        Self {
            template: Some(template.into()),
            ..Self::default()
        }
    }

    pub fn with_component(mut self, key: impl Into<String>, component: ComponentBlueprint) -> Self {
        self.components.insert(key.into(), component);
        self
    }
}

/// A blueprint with its template chain flattened: every component has a type and the
/// full stack of overrides, parent first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedActor {
    pub name: String,
    pub template: String,
    pub components: BTreeMap<String, ResolvedComponent>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedComponent {
    pub type_name: String,
    pub overrides: Map<String, Value>,
}
