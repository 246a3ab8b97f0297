use std::collections::BTreeMap;

use tracing::debug;

use super::component::ComponentRef;
use super::geometry::Vec2;
use super::ActorId;

#[derive(Debug, Clone, PartialEq)]
pub enum RenderableKind {
    Animation {
        file: String,
        clip: Option<String>,
        elapsed_ms: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Renderable {
    pub owner: ActorId,
    pub kind: RenderableKind,
    pub position: Vec2,
    pub scale: Vec2,
    pub rotation_degrees: f32,
    pub layer: i32,
    pub sorting_order: i32,
}

/// Side channel through which components publish what should be drawn.
#[derive(Debug, Default)]
pub struct RenderRegistry {
    entries: BTreeMap<ComponentRef, Renderable>,
}

impl RenderRegistry {
    pub fn insert(&mut self, component: ComponentRef, renderable: Renderable) {
        self.entries.insert(component, renderable);
    }

    pub fn remove(&mut self, component: &ComponentRef) -> Option<Renderable> {
        self.entries.remove(component)
    }

    pub fn get(&self, component: &ComponentRef) -> Option<&Renderable> {
        self.entries.get(component)
    }

    pub fn get_mut(&mut self, component: &ComponentRef) -> Option<&mut Renderable> {
        self.entries.get_mut(component)
    }

    pub fn contains(&self, component: &ComponentRef) -> bool {
        self.entries.contains_key(component)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ComponentRef, &Renderable)> {
        self.entries.iter()
    }

    pub(crate) fn remove_actor(&mut self, actor: ActorId) {
        let before = self.entries.len();
        self.entries.retain(|component, _| component.actor != actor);
        let purged = before - self.entries.len();
        if purged > 0 {
            debug!(actor = %actor, purged, "renderables_purged");
        }
    }

    /// Entries stably sorted by (layer, sorting order); ties keep component order.
    pub fn draw_order(&self) -> Vec<&Renderable> {
        let mut draw_list: Vec<&Renderable> = self.entries.values().collect();
        draw_list.sort_by_key(|renderable| (renderable.layer, renderable.sorting_order));
        draw_list
    }
}

pub trait Renderer {
    fn present(&mut self, frame: u64, draw_list: &[&Renderable]);
}

#[derive(Debug, Default)]
pub struct NullRenderer {
    frames_presented: u64,
    last_draw_count: usize,
}

impl NullRenderer {
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn last_draw_count(&self) -> usize {
        self.last_draw_count
    }
}

impl Renderer for NullRenderer {
    fn present(&mut self, _frame: u64, draw_list: &[&Renderable]) {
        self.frames_presented = self.frames_presented.saturating_add(1);
        self.last_draw_count = draw_list.len();
    }
}
