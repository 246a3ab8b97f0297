use super::actor::ActorId;
use super::component::{Hook, HookArgs};
use super::error::WorldError;
use super::geometry::Vec2;
use super::lifecycle::{Call, Gate};
use super::physics::{Contact, ContactPhase};
use super::registry::World;

/// Point and normal reported where the backend has no meaningful value.
pub const CONTACT_SENTINEL: Vec2 = Vec2::new(-999.0, -999.0);

/// Delivered to both participants of a contact; `other` is the opposite actor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    pub other: ActorId,
    pub point: Vec2,
    pub relative_velocity: Vec2,
    pub normal: Vec2,
}

impl World {
    /// Steps the physics backend and dispatches the contacts it reports.
    pub fn step_physics(&mut self, dt_seconds: f32) -> Result<(), WorldError> {
        let contacts = self.physics_mut().step(dt_seconds);
        self.dispatch_contacts(&contacts)
    }

    pub fn dispatch_contacts(&mut self, contacts: &[Contact]) -> Result<(), WorldError> {
        for contact in contacts {
            self.dispatch_contact(contact)?;
        }
        Ok(())
    }

    /// Sensor/sensor pairs are triggers, solid/solid pairs are collisions, mixed pairs
    /// are dropped.
    pub fn dispatch_contact(&mut self, contact: &Contact) -> Result<(), WorldError> {
        let trigger = match (contact.a_is_sensor, contact.b_is_sensor) {
            (true, true) => true,
            (false, false) => false,
            _ => return Ok(()),
        };
        let hook = match (contact.phase, trigger) {
            (ContactPhase::Begin, true) => Hook::TriggerEnter,
            (ContactPhase::Begin, false) => Hook::CollisionEnter,
            (ContactPhase::End, true) => Hook::TriggerExit,
            (ContactPhase::End, false) => Hook::CollisionExit,
        };
        let (point, normal) = if contact.phase == ContactPhase::Begin && !trigger {
            (contact.point, contact.normal)
        } else {
            (CONTACT_SENTINEL, CONTACT_SENTINEL)
        };

        let seen_by_a = Collision {
            other: contact.actor_b,
            point,
            relative_velocity: contact.velocity_a - contact.velocity_b,
            normal,
        };
        let seen_by_b = Collision {
            other: contact.actor_a,
            ..seen_by_a
        };
        self.dispatch_collision(contact.actor_a, hook, &seen_by_a)?;
        self.dispatch_collision(contact.actor_b, hook, &seen_by_b)
    }

    fn dispatch_collision(
        &mut self,
        actor: ActorId,
        hook: Hook,
        collision: &Collision,
    ) -> Result<(), WorldError> {
        let Some(slot) = self.slot_of(actor) else {
            return Ok(());
        };
        let keys: Vec<String> = match self.slot_ref(slot) {
            Some(target) => target.component_keys().map(str::to_string).collect(),
            None => return Ok(()),
        };
        for key in &keys {
            let result = self.invoke(
                slot,
                key,
                Call::Hook(hook, HookArgs::Collision(collision)),
                Gate::Cached,
            );
            if !self.settle(slot, hook.name(), result)? {
                break;
            }
        }
        Ok(())
    }
}
