use serde_json::Value;
use tracing::{error, info};

use crate::components::Rigidbody;

use super::actor::{Actor, ActorId};
use super::component::{ComponentInstance, ComponentRef};
use super::error::{HookResult, WorldError};
use super::physics::{BodyHandle, PhysicsBackend};
use super::registry::World;
use super::render::RenderRegistry;

/// What a running callback can reach: the world, plus the identity of the component
/// that is running. Lookups of that component's own instance yield `None`; it is
/// reachable only through the handler's `self`.
pub struct HookContext<'w> {
    world: &'w mut World,
    current: ComponentRef,
}

impl<'w> HookContext<'w> {
    pub(crate) fn new(world: &'w mut World, current: ComponentRef) -> Self {
        Self { world, current }
    }

    pub fn current(&self) -> &ComponentRef {
        &self.current
    }

    pub fn actor_id(&self) -> ActorId {
        self.current.actor
    }

    pub fn frame(&self) -> u64 {
        self.world.frame()
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.world.actor(id)
    }

    pub fn actor_name(&self, id: ActorId) -> Option<&str> {
        self.world.actor(id).map(Actor::name)
    }

    pub fn own_name(&self) -> &str {
        self.actor_name(self.current.actor).unwrap_or_default()
    }

    pub fn find(&self, name: &str) -> Option<ActorId> {
        self.world.find(name)
    }

    pub fn find_all(&self, name: &str) -> Vec<ActorId> {
        self.world.find_all(name)
    }

    pub fn instantiate(&mut self, template: &str) -> Result<ActorId, WorldError> {
        self.world.instantiate(template)
    }

    pub fn destroy(&mut self, actor: ActorId) -> bool {
        self.world.destroy(actor)
    }

    pub fn is_alive(&self, actor: ActorId) -> bool {
        self.world.actor(actor).is_some() && !self.world.is_pending_destroy(actor)
    }

    pub fn get_component_by_key(&self, actor: ActorId, key: &str) -> Option<ComponentRef> {
        self.world.get_component_by_key(actor, key)
    }

    pub fn get_component(&self, actor: ActorId, type_name: &str) -> Option<ComponentRef> {
        self.world.get_component(actor, type_name)
    }

    pub fn get_components(&self, actor: ActorId, type_name: &str) -> Vec<ComponentRef> {
        self.world.get_components(actor, type_name)
    }

    pub fn add_component(
        &mut self,
        actor: ActorId,
        type_name: &str,
    ) -> Result<Option<ComponentRef>, WorldError> {
        self.world.add_component(actor, type_name)
    }

    pub fn remove_component(&mut self, component: &ComponentRef) -> bool {
        self.world.remove_component(component)
    }

    pub fn component(&self, component: &ComponentRef) -> Option<&ComponentInstance> {
        self.world.component(component)
    }

    pub fn component_mut(&mut self, component: &ComponentRef) -> Option<&mut ComponentInstance> {
        self.world.component_mut(component)
    }

    pub fn field(&self, component: &ComponentRef, name: &str) -> Option<Value> {
        self.world.component(component)?.field(name)
    }

    pub fn publish(&mut self, event: &str, payload: &Value) -> HookResult {
        self.world.publish(event, payload)?;
        Ok(())
    }

    /// Subscribes the running component. Takes effect at the end of the frame.
    pub fn subscribe(&mut self, event: &str, handler: &str) {
        let component = self.current.clone();
        self.world.subscribe(event, component, handler);
    }

    pub fn unsubscribe(&mut self, event: &str, handler: &str) {
        let component = self.current.clone();
        self.world.unsubscribe(event, component, handler);
    }

    pub fn load_scene(&mut self, scene: &str) {
        self.world.request_scene_load(scene);
    }

    pub fn current_scene(&self) -> Option<&str> {
        self.world.current_scene()
    }

    pub fn dont_destroy(&mut self, actor: ActorId) -> bool {
        self.world.dont_destroy(actor)
    }

    pub fn physics(&self) -> &dyn PhysicsBackend {
        self.world.physics()
    }

    pub fn physics_mut(&mut self) -> &mut dyn PhysicsBackend {
        self.world.physics_mut()
    }

    pub fn body_of(&self, component: &ComponentRef) -> Option<BodyHandle> {
        self.world
            .component(component)?
            .downcast_ref::<Rigidbody>()?
            .body()
    }

    pub fn renderables_mut(&mut self) -> &mut RenderRegistry {
        self.world.renderables_mut()
    }

    pub fn play_animation(&mut self, component: &ComponentRef, clip: &str) -> bool {
        self.world.play_animation(component, clip)
    }

    pub fn stop_animation(&mut self, component: &ComponentRef) -> bool {
        self.world.stop_animation(component)
    }

    pub fn log(&self, message: &str) {
        info!(target: "script", actor = %self.own_name(), message, "script_log");
    }

    pub fn log_error(&self, message: &str) {
        error!(target: "script", actor = %self.own_name(), message, "script_log_error");
    }

    pub fn request_quit(&mut self) {
        self.world.request_quit();
    }
}
