use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::mem;

use serde::{Deserialize, Serialize};

use super::component::{Component, ComponentInstance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct ActorIdAllocator {
    next: u64,
}

impl ActorIdAllocator {
    pub fn allocate(&mut self) -> ActorId {
        let id = ActorId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// An entity owning its component records and the per-frame lifecycle queues.
///
/// Structural changes to `components` happen only in [`Actor::commit`]. Everything
/// between two commits is expressed through `pending_add`, the graveyard and the
/// cached `enabled` flags, so the phase loops never see the map change under them.
#[derive(Debug)]
pub struct Actor {
    id: ActorId,
    name: String,
    template: String,
    dont_destroy: bool,
    destroyed: bool,
    components: BTreeMap<String, Component>,
    on_start_queue: Vec<String>,
    update_queue: Vec<String>,
    late_update_queue: Vec<String>,
    on_destroy_queue: Vec<String>,
    pending_add: Vec<ComponentInstance>,
    graveyard: BTreeSet<String>,
    retired: BTreeSet<String>,
}

impl Actor {
    pub(crate) fn new(id: ActorId, name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            template: template.into(),
            dont_destroy: false,
            destroyed: false,
            components: BTreeMap::new(),
            on_start_queue: Vec::new(),
            update_queue: Vec::new(),
            late_update_queue: Vec::new(),
            on_destroy_queue: Vec::new(),
            pending_add: Vec::new(),
            graveyard: BTreeSet::new(),
            retired: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn dont_destroy(&self) -> bool {
        self.dont_destroy
    }

    pub(crate) fn set_dont_destroy(&mut self) {
        self.dont_destroy = true;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Inserts a blueprint component straight into the committed set. Used while the
    /// actor is being built, before any phase can observe it.
    pub(crate) fn insert_initial(&mut self, instance: ComponentInstance) {
        let key = instance.key().to_string();
        self.push_to_phase_queues(&key);
        self.components.insert(key, Component::new(instance));
    }

    pub(crate) fn sort_queues(&mut self) {
        self.on_start_queue.sort_unstable();
        self.update_queue.sort_unstable();
        self.late_update_queue.sort_unstable();
    }

    fn push_to_phase_queues(&mut self, key: &str) {
        self.on_start_queue.push(key.to_string());
        self.update_queue.push(key.to_string());
        self.late_update_queue.push(key.to_string());
    }

    /// True if `key` was ever handed to a component of this actor. Erased and cancelled
    /// keys stay reserved, so an old `ComponentRef` never reaches a newer component.
    pub fn has_key(&self, key: &str) -> bool {
        self.components.contains_key(key)
            || self.graveyard.contains(key)
            || self.retired.contains(key)
            || self.pending_add.iter().any(|instance| instance.key() == key)
    }

    pub fn component_keys(&self) -> impl Iterator<Item = &str> {
        self.components
            .keys()
            .filter(|key| !self.graveyard.contains(*key))
            .map(String::as_str)
    }

    pub fn has_component(&self, key: &str) -> bool {
        self.components.contains_key(key) && !self.graveyard.contains(key)
    }

    pub fn component_by_type(&self, type_name: &str) -> Option<&str> {
        self.components
            .iter()
            .find(|(key, component)| {
                component.type_name == type_name && !self.graveyard.contains(*key)
            })
            .map(|(key, _)| key.as_str())
    }

    pub fn components_by_type(&self, type_name: &str) -> Vec<String> {
        self.components
            .iter()
            .filter(|(key, component)| {
                component.type_name == type_name && !self.graveyard.contains(*key)
            })
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Committed (non-graveyard) instance first, then the pending-add list.
    pub fn instance(&self, key: &str) -> Option<&ComponentInstance> {
        if self.graveyard.contains(key) {
            return None;
        }
        match self.components.get(key) {
            Some(component) => component.instance.as_ref(),
            None => self
                .pending_add
                .iter()
                .find(|instance| instance.key() == key),
        }
    }

    pub fn instance_mut(&mut self, key: &str) -> Option<&mut ComponentInstance> {
        if self.graveyard.contains(key) {
            return None;
        }
        match self.components.get_mut(key) {
            Some(component) => component.instance.as_mut(),
            None => self
                .pending_add
                .iter_mut()
                .find(|instance| instance.key() == key),
        }
    }

    pub(crate) fn enqueue_component(&mut self, instance: ComponentInstance) {
        self.pending_add.push(instance);
    }

    /// Returns true when the call changed anything.
    pub(crate) fn remove_component(&mut self, key: &str) -> bool {
        if let Some(index) = self
            .pending_add
            .iter()
            .position(|instance| instance.key() == key)
        {
            self.pending_add.remove(index);
            self.retired.insert(key.to_string());
            return true;
        }
        if self.graveyard.contains(key) {
            return false;
        }
        let Some(component) = self.components.get_mut(key) else {
            return false;
        };
        component.enabled = false;
        if let Some(instance) = component.instance.as_mut() {
            instance.set_enabled(false);
        }
        self.graveyard.insert(key.to_string());
        // A destroyed actor already queued every live key for teardown.
        if !self.destroyed {
            self.on_destroy_queue.push(key.to_string());
        }
        true
    }

    /// Disables every component and queues each for `OnDestroy`. Returns false if the
    /// actor was already marked.
    pub(crate) fn mark_destroyed(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        self.destroyed = true;
        self.pending_add.clear();
        for (key, component) in &mut self.components {
            component.enabled = false;
            if let Some(instance) = component.instance.as_mut() {
                instance.set_enabled(false);
            }
            if !self.graveyard.contains(key) {
                self.on_destroy_queue.push(key.clone());
            }
        }
        true
    }

    /// Per-actor commit, run once per frame after `OnDestroy`. Returns the erased keys.
    pub(crate) fn commit(&mut self) -> Vec<String> {
        for instance in mem::take(&mut self.pending_add) {
            let key = instance.key().to_string();
            self.push_to_phase_queues(&key);
            self.components.insert(key, Component::new(instance));
        }
        self.sort_queues();

        let erased = mem::take(&mut self.graveyard);
        for key in &erased {
            self.components.remove(key);
            for queue in [
                &mut self.on_start_queue,
                &mut self.update_queue,
                &mut self.late_update_queue,
            ] {
                if let Ok(index) = queue.binary_search(key) {
                    queue.remove(index);
                }
            }
        }
        self.retired.extend(erased.iter().cloned());
        erased.into_iter().collect()
    }

    pub(crate) fn take_on_start_queue(&mut self) -> Vec<String> {
        mem::take(&mut self.on_start_queue)
    }

    pub(crate) fn take_on_destroy_queue(&mut self) -> Vec<String> {
        mem::take(&mut self.on_destroy_queue)
    }

    pub(crate) fn clear_on_destroy_queue(&mut self) {
        self.on_destroy_queue.clear();
    }

    pub fn on_start_queue(&self) -> &[String] {
        &self.on_start_queue
    }

    pub fn update_queue(&self) -> &[String] {
        &self.update_queue
    }

    pub fn late_update_queue(&self) -> &[String] {
        &self.late_update_queue
    }

    pub fn on_destroy_queue(&self) -> &[String] {
        &self.on_destroy_queue
    }

    pub fn pending_add_count(&self) -> usize {
        self.pending_add.len()
    }

    pub fn is_in_graveyard(&self, key: &str) -> bool {
        self.graveyard.contains(key)
    }

    /// Reads and refreshes the cached `enabled` flag of a committed component.
    pub(crate) fn refresh_enabled(&mut self, key: &str) -> Option<bool> {
        self.components
            .get_mut(key)
            .map(Component::refresh_enabled)
    }

    pub(crate) fn cached_enabled(&self, key: &str) -> bool {
        self.components
            .get(key)
            .is_some_and(|component| component.enabled)
    }

    /// Takes a committed instance out of its record while its hook runs.
    pub(crate) fn take_instance(&mut self, key: &str) -> Option<ComponentInstance> {
        self.components.get_mut(key)?.instance.take()
    }

    pub(crate) fn restore_instance(&mut self, key: &str, mut instance: ComponentInstance) {
        if self.destroyed || self.graveyard.contains(key) {
            instance.set_enabled(false);
        }
        if let Some(component) = self.components.get_mut(key) {
            component.enabled = instance.enabled();
            component.instance = Some(instance);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::components::{ScriptClass, ScriptInstance};

    fn instance(key: &str) -> ComponentInstance {
        let class = Rc::new(ScriptClass::new("Gadget"));
        ComponentInstance::scripted(key, ScriptInstance::new(class))
    }

    fn actor_with(keys: &[&str]) -> Actor {
        let mut actor = Actor::new(ActorId(1), "gadget", "");
        for key in keys {
            actor.insert_initial(instance(key));
        }
        actor.sort_queues();
        actor
    }

    #[test]
    fn allocator_is_monotonic_from_zero() {
        let mut allocator = ActorIdAllocator::default();
        assert_eq!(allocator.allocate(), ActorId(0));
        assert_eq!(allocator.allocate(), ActorId(1));
        assert_eq!(allocator.allocate(), ActorId(2));
    }

    #[test]
    fn commit_sorts_queues_after_out_of_order_adds() {
        let mut actor = actor_with(&["r5"]);
        actor.enqueue_component(instance("r9"));
        actor.enqueue_component(instance("r1"));
        actor.enqueue_component(instance("r3"));

        assert!(!actor.has_component("r1"));
        actor.commit();

        let expected = ["r1", "r3", "r5", "r9"];
        assert_eq!(actor.on_start_queue(), expected);
        assert_eq!(actor.update_queue(), expected);
        assert_eq!(actor.late_update_queue(), expected);
        assert!(actor.has_component("r1"));
        assert_eq!(actor.pending_add_count(), 0);
    }

    #[test]
    fn removed_component_is_hidden_before_commit_and_erased_after() {
        let mut actor = actor_with(&["r0", "r1", "r2"]);

        assert!(actor.remove_component("r1"));
        assert!(!actor.has_component("r1"));
        assert!(actor.instance("r1").is_none());
        assert!(!actor.cached_enabled("r1"));
        assert_eq!(actor.on_destroy_queue(), ["r1"]);
        assert_eq!(actor.update_queue(), ["r0", "r1", "r2"]);

        actor.take_on_destroy_queue();
        assert_eq!(actor.commit(), ["r1"]);

        assert_eq!(actor.update_queue(), ["r0", "r2"]);
        assert_eq!(actor.late_update_queue(), ["r0", "r2"]);
        assert!(!actor.has_component("r1"));
        assert!(actor.has_key("r1"));
    }

    #[test]
    fn removing_twice_queues_teardown_once() {
        let mut actor = actor_with(&["r0"]);
        assert!(actor.remove_component("r0"));
        assert!(!actor.remove_component("r0"));
        assert_eq!(actor.on_destroy_queue(), ["r0"]);
    }

    #[test]
    fn removing_pending_component_cancels_it() {
        let mut actor = actor_with(&[]);
        actor.enqueue_component(instance("r4"));
        assert!(actor.has_key("r4"));

        assert!(actor.remove_component("r4"));
        assert!(actor.commit().is_empty());

        assert!(actor.instance("r4").is_none());
        assert!(actor.has_key("r4"));
        assert!(actor.on_destroy_queue().is_empty());
        assert!(actor.update_queue().is_empty());
    }

    #[test]
    fn mark_destroyed_disables_and_queues_every_component_once() {
        let mut actor = actor_with(&["r0", "r1"]);
        actor.remove_component("r1");

        assert!(actor.mark_destroyed());
        assert!(!actor.mark_destroyed());

        assert_eq!(actor.on_destroy_queue(), ["r1", "r0"]);
        assert!(!actor.cached_enabled("r0"));
        assert!(actor
            .instance("r0")
            .is_some_and(|instance| !instance.enabled()));
    }

    #[test]
    fn restore_keeps_removed_component_disabled() {
        let mut actor = actor_with(&["r0"]);
        let taken = actor.take_instance("r0").expect("instance should be present");
        assert!(actor.instance("r0").is_none());

        actor.remove_component("r0");
        actor.restore_instance("r0", taken);

        assert!(!actor.cached_enabled("r0"));
        assert_eq!(actor.refresh_enabled("r0"), Some(false));
    }

    #[test]
    fn type_lookup_skips_graveyard_and_walks_keys_in_order() {
        let mut actor = Actor::new(ActorId(2), "typed", "");
        for key in ["b", "a", "c"] {
            actor.insert_initial(instance(key));
        }

        assert_eq!(actor.component_by_type("Gadget"), Some("a"));
        actor.remove_component("a");
        assert_eq!(actor.component_by_type("Gadget"), Some("b"));
        assert_eq!(actor.components_by_type("Gadget"), ["b", "c"]);
        assert_eq!(actor.component_by_type("Missing"), None);
    }
}
