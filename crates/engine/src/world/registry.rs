use std::collections::HashSet;
use std::fmt;
use std::mem;

use serde_json::Value;
use tracing::{debug, error, info};

use crate::components::{Animation, ComponentDb};
use crate::content::{ActorBlueprint, ResolvedActor, SceneDb, TemplateDb};

use super::actor::{Actor, ActorId, ActorIdAllocator};
use super::component::{ComponentInstance, ComponentRef};
use super::error::{HookError, WorldError};
use super::events::{EventBus, Subscription};
use super::lifecycle::{Call, Gate, Slot};
use super::physics::{BodyStore, PhysicsBackend};
use super::render::RenderRegistry;

/// A scripted failure recovered at a phase boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFailure {
    pub actor: ActorId,
    pub actor_name: String,
    pub hook: String,
    pub message: String,
    pub frame: u64,
}

impl fmt::Display for ScriptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.actor_name, self.message)
    }
}

/// The actor registry: live actors, deferred creations and destructions, and the
/// collaborators every lifecycle callback can reach.
pub struct World {
    ids: ActorIdAllocator,
    pub(crate) actors: Vec<Actor>,
    pub(crate) pending_instantiate: Vec<Actor>,
    pending_destroy: HashSet<ActorId>,
    components: ComponentDb,
    templates: TemplateDb,
    scenes: SceneDb,
    physics: Box<dyn PhysicsBackend>,
    renderables: RenderRegistry,
    events: EventBus,
    frame: u64,
    current_scene: Option<String>,
    requested_scene: Option<String>,
    quit_requested: bool,
    script_failures: Vec<ScriptFailure>,
}

impl Default for World {
    fn default() -> Self {
        Self::new(ComponentDb::default())
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("frame", &self.frame)
            .field("live_actors", &self.actors.len())
            .field("pending_instantiate", &self.pending_instantiate.len())
            .field("pending_destroy", &self.pending_destroy.len())
            .field("current_scene", &self.current_scene)
            .field("bodies", &self.physics.body_count())
            .field("renderables", &self.renderables.len())
            .finish()
    }
}

impl World {
    pub fn new(components: ComponentDb) -> Self {
        Self {
            ids: ActorIdAllocator::default(),
            actors: Vec::new(),
            pending_instantiate: Vec::new(),
            pending_destroy: HashSet::new(),
            components,
            templates: TemplateDb::default(),
            scenes: SceneDb::default(),
            physics: Box::<BodyStore>::default(),
            renderables: RenderRegistry::default(),
            events: EventBus::default(),
            frame: 0,
            current_scene: None,
            requested_scene: None,
            quit_requested: false,
            script_failures: Vec::new(),
        }
    }

    pub fn with_templates(mut self, templates: TemplateDb) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_scenes(mut self, scenes: SceneDb) -> Self {
        self.scenes = scenes;
        self
    }

    pub fn with_physics(mut self, physics: Box<dyn PhysicsBackend>) -> Self {
        self.physics = physics;
        self
    }

    pub fn templates_mut(&mut self) -> &mut TemplateDb {
        &mut self.templates
    }

    pub fn scenes_mut(&mut self) -> &mut SceneDb {
        &mut self.scenes
    }

    pub fn component_db_mut(&mut self) -> &mut ComponentDb {
        &mut self.components
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub(crate) fn advance_frame(&mut self) {
        self.frame = self.frame.saturating_add(1);
    }

    /// Live actors in iteration order. Pending creations are not included.
    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn pending_instantiate_count(&self) -> usize {
        self.pending_instantiate.len()
    }

    pub fn is_pending_destroy(&self, actor: ActorId) -> bool {
        self.pending_destroy.contains(&actor)
    }

    pub fn is_live(&self, actor: ActorId) -> bool {
        self.actors.iter().any(|candidate| candidate.id() == actor)
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.slot_of(id).and_then(|slot| self.slot_ref(slot))
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        let slot = self.slot_of(id)?;
        self.slot_mut(slot)
    }

    pub(crate) fn slot_of(&self, id: ActorId) -> Option<Slot> {
        if let Some(index) = self.actors.iter().position(|actor| actor.id() == id) {
            return Some(Slot::Live(index));
        }
        self.pending_instantiate
            .iter()
            .position(|actor| actor.id() == id)
            .map(Slot::Pending)
    }

    pub(crate) fn slot_ref(&self, slot: Slot) -> Option<&Actor> {
        match slot {
            Slot::Live(index) => self.actors.get(index),
            Slot::Pending(index) => self.pending_instantiate.get(index),
        }
    }

    pub(crate) fn slot_mut(&mut self, slot: Slot) -> Option<&mut Actor> {
        match slot {
            Slot::Live(index) => self.actors.get_mut(index),
            Slot::Pending(index) => self.pending_instantiate.get_mut(index),
        }
    }

    fn visible(&self) -> impl Iterator<Item = &Actor> {
        self.actors
            .iter()
            .chain(self.pending_instantiate.iter())
            .filter(|actor| !self.pending_destroy.contains(&actor.id()))
    }

    /// First actor with `name`, live before pending, never one awaiting destruction.
    pub fn find(&self, name: &str) -> Option<ActorId> {
        self.visible()
            .find(|actor| actor.name() == name)
            .map(Actor::id)
    }

    pub fn find_all(&self, name: &str) -> Vec<ActorId> {
        self.visible()
            .filter(|actor| actor.name() == name)
            .map(Actor::id)
            .collect()
    }

    /// Creates an actor from a named template. It is queryable at once but joins the
    /// live collection at the next `frame_end`.
    pub fn instantiate(&mut self, template: &str) -> Result<ActorId, WorldError> {
        let resolved = self.templates.load(template)?;
        let actor = self.build_actor(&resolved)?;
        let id = actor.id();
        debug!(actor = %id, template, "actor_instantiated");
        self.pending_instantiate.push(actor);
        Ok(id)
    }

    /// Like [`World::instantiate`] for an inline blueprint, which may name a template.
    pub fn spawn(&mut self, blueprint: &ActorBlueprint) -> Result<ActorId, WorldError> {
        let resolved = self.templates.resolve(blueprint)?;
        let actor = self.build_actor(&resolved)?;
        let id = actor.id();
        debug!(actor = %id, name = %actor.name(), "actor_spawned");
        self.pending_instantiate.push(actor);
        Ok(id)
    }

    fn build_actor(&mut self, resolved: &ResolvedActor) -> Result<Actor, WorldError> {
        let id = self.ids.allocate();
        let mut actor = Actor::new(id, resolved.name.clone(), resolved.template.clone());
        for (key, component) in &resolved.components {
            let mut instance = self.components.create(&component.type_name, key)?;
            for (field, value) in &component.overrides {
                instance
                    .set_field(field, value)
                    .map_err(|source| WorldError::Field {
                        key: key.clone(),
                        type_name: component.type_name.clone(),
                        source,
                    })?;
            }
            instance.attach_to(id);
            actor.insert_initial(instance);
        }
        actor.sort_queues();
        Ok(actor)
    }

    /// Marks an actor for destruction. A second call, or an unknown id, changes nothing.
    pub fn destroy(&mut self, id: ActorId) -> bool {
        if self.pending_destroy.contains(&id) {
            return false;
        }
        let Some(actor) = self.actor_mut(id) else {
            return false;
        };
        actor.mark_destroyed();
        self.pending_destroy.insert(id);
        debug!(actor = %id, "actor_destroy_requested");
        true
    }

    pub fn dont_destroy(&mut self, id: ActorId) -> bool {
        match self.actor_mut(id) {
            Some(actor) => {
                actor.set_dont_destroy();
                true
            }
            None => false,
        }
    }

    /// Creates a component and parks it in the actor's pending-add list. The handle is
    /// usable immediately; type lookups see the component after the actor's commit.
    pub fn add_component(
        &mut self,
        actor: ActorId,
        type_name: &str,
    ) -> Result<Option<ComponentRef>, WorldError> {
        if !self.components.has_type(type_name) {
            return Err(WorldError::UnknownComponentType {
                type_name: type_name.to_string(),
            });
        }
        let Some(slot) = self.slot_of(actor) else {
            return Ok(None);
        };
        let target = match slot {
            Slot::Live(index) => &mut self.actors[index],
            Slot::Pending(index) => &mut self.pending_instantiate[index],
        };
        if target.is_destroyed() {
            return Ok(None);
        }
        let key = self
            .components
            .next_key(type_name, |candidate| target.has_key(candidate));
        let mut instance = self.components.create(type_name, &key)?;
        instance.attach_to(actor);
        target.enqueue_component(instance);
        Ok(Some(ComponentRef::new(actor, key)))
    }

    pub fn remove_component(&mut self, component: &ComponentRef) -> bool {
        self.actor_mut(component.actor)
            .is_some_and(|actor| actor.remove_component(&component.key))
    }

    pub fn get_component_by_key(&self, actor: ActorId, key: &str) -> Option<ComponentRef> {
        self.actor(actor)
            .filter(|candidate| candidate.has_component(key))
            .map(|_| ComponentRef::new(actor, key))
    }

    pub fn get_component(&self, actor: ActorId, type_name: &str) -> Option<ComponentRef> {
        self.actor(actor)?
            .component_by_type(type_name)
            .map(|key| ComponentRef::new(actor, key))
    }

    pub fn get_components(&self, actor: ActorId, type_name: &str) -> Vec<ComponentRef> {
        self.actor(actor)
            .map(|candidate| {
                candidate
                    .components_by_type(type_name)
                    .into_iter()
                    .map(|key| ComponentRef::new(actor, key))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The instance behind a handle, unless its own hook is running or it was removed.
    pub fn component(&self, component: &ComponentRef) -> Option<&ComponentInstance> {
        self.actor(component.actor)?.instance(&component.key)
    }

    pub fn component_mut(&mut self, component: &ComponentRef) -> Option<&mut ComponentInstance> {
        self.actor_mut(component.actor)?.instance_mut(&component.key)
    }

    pub fn play_animation(&mut self, component: &ComponentRef, clip: &str) -> bool {
        let renderable = match self
            .component_mut(component)
            .and_then(|instance| instance.downcast_mut::<Animation>())
        {
            Some(animation) => {
                animation.play(clip);
                animation.renderable(component.actor)
            }
            None => return false,
        };
        self.renderables.insert(component.clone(), renderable);
        true
    }

    pub fn stop_animation(&mut self, component: &ComponentRef) -> bool {
        match self
            .component_mut(component)
            .and_then(|instance| instance.downcast_mut::<Animation>())
        {
            Some(animation) => animation.stop(),
            None => return false,
        }
        self.renderables.remove(component);
        true
    }

    pub fn physics(&self) -> &dyn PhysicsBackend {
        self.physics.as_ref()
    }

    pub fn physics_mut(&mut self) -> &mut dyn PhysicsBackend {
        self.physics.as_mut()
    }

    pub fn renderables(&self) -> &RenderRegistry {
        &self.renderables
    }

    pub fn renderables_mut(&mut self) -> &mut RenderRegistry {
        &mut self.renderables
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&mut self, event: &str, component: ComponentRef, handler: &str) {
        self.events.subscribe(
            event,
            Subscription {
                component,
                handler: handler.to_string(),
            },
        );
    }

    pub fn unsubscribe(&mut self, event: &str, component: ComponentRef, handler: &str) {
        self.events.unsubscribe(
            event,
            Subscription {
                component,
                handler: handler.to_string(),
            },
        );
    }

    pub fn commit_event_subscriptions(&mut self) {
        self.events.commit();
    }

    /// Synchronously invokes every committed subscriber. A scripted failure is reported
    /// against the subscriber and does not stop delivery to the others.
    pub fn publish(&mut self, event: &str, payload: &Value) -> Result<(), WorldError> {
        for subscription in self.events.subscribers(event) {
            let Some(slot) = self.slot_of(subscription.component.actor) else {
                continue;
            };
            let result = self.invoke(
                slot,
                &subscription.component.key,
                Call::Handler(&subscription.handler, payload),
                Gate::Live,
            );
            self.settle(slot, &subscription.handler, result)?;
        }
        Ok(())
    }

    /// Structural commit of one live actor. Subscriptions of erased components go with them.
    pub(crate) fn commit_actor(&mut self, index: usize) {
        let actor = self.actors[index].id();
        for key in self.actors[index].commit() {
            self.events.forget_component(&ComponentRef::new(actor, key));
        }
    }

    /// Registry-level commit: pending actors go live, destroyed actors are released.
    pub fn frame_end(&mut self) {
        self.actors.append(&mut self.pending_instantiate);
        if self.pending_destroy.is_empty() {
            return;
        }
        let pending = mem::take(&mut self.pending_destroy);
        let mut released = Vec::with_capacity(pending.len());
        self.actors.retain(|actor| {
            if pending.contains(&actor.id()) {
                released.push(actor.id());
                false
            } else {
                true
            }
        });
        for id in released {
            self.renderables.remove_actor(id);
            self.events.forget_actor(id);
            debug!(actor = %id, "actor_released");
        }
    }

    pub fn request_scene_load(&mut self, scene: &str) {
        self.requested_scene = Some(scene.to_string());
    }

    pub fn take_requested_scene(&mut self) -> Option<String> {
        self.requested_scene.take()
    }

    pub fn current_scene(&self) -> Option<&str> {
        self.current_scene.as_deref()
    }

    /// Tears down every actor not flagged `dont_destroy`, then builds the scene's actors
    /// straight into the live collection.
    pub fn load_scene(&mut self, scene: &str) -> Result<(), WorldError> {
        let description = self.scenes.load(scene)?;

        for id in self.unkept_actors() {
            self.destroy(id);
        }
        for index in 0..self.actors.len() {
            if self.actors[index].is_destroyed() {
                self.run_on_destroy(Slot::Live(index))?;
            }
        }
        // Actors instantiated by the teardown callbacks belong to the old scene too.
        for id in self.unkept_actors() {
            self.destroy(id);
        }
        self.frame_end();

        for blueprint in &description.actors {
            let resolved = self.templates.resolve(blueprint)?;
            let actor = self.build_actor(&resolved)?;
            self.actors.push(actor);
        }
        info!(
            scene,
            actor_count = self.actors.len(),
            "scene_loaded"
        );
        self.current_scene = Some(scene.to_string());
        Ok(())
    }

    fn unkept_actors(&self) -> Vec<ActorId> {
        self.actors
            .iter()
            .chain(self.pending_instantiate.iter())
            .filter(|actor| !actor.dont_destroy() && !actor.is_destroyed())
            .map(Actor::id)
            .collect()
    }

    pub fn request_quit(&mut self) {
        self.quit_requested = true;
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn script_failures(&self) -> &[ScriptFailure] {
        &self.script_failures
    }

    pub fn take_script_failures(&mut self) -> Vec<ScriptFailure> {
        mem::take(&mut self.script_failures)
    }

    /// Sorts a hook result: scripted failures are reported and yield `Ok(false)`,
    /// fatal errors propagate.
    pub(crate) fn settle(
        &mut self,
        slot: Slot,
        hook: &str,
        result: Result<(), HookError>,
    ) -> Result<bool, WorldError> {
        match result {
            Ok(()) => Ok(true),
            Err(HookError::Script(message)) => {
                self.report_script_error(slot, hook, &message);
                Ok(false)
            }
            Err(HookError::Fatal(error)) => Err(error),
        }
    }

    fn report_script_error(&mut self, slot: Slot, hook: &str, message: &str) {
        let (actor, actor_name) = match self.slot_ref(slot) {
            Some(actor) => (actor.id(), actor.name().to_string()),
            None => return,
        };
        let message = message.replace('\\', "/");
        error!(
            actor = %actor_name,
            actor_id = %actor,
            hook,
            message = %message,
            "script_error"
        );
        self.script_failures.push(ScriptFailure {
            actor,
            actor_name,
            hook: hook.to_string(),
            message,
            frame: self.frame,
        });
    }
}
