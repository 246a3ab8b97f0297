use serde_json::Value;

use super::component::{ComponentRef, Hook, HookArgs};
use super::context::HookContext;
use super::error::{HookResult, WorldError};
use super::registry::World;

/// Where an actor sits during a frame. Indices stay valid until `frame_end` or a scene
/// load, neither of which can run inside a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Live(usize),
    Pending(usize),
}

/// Which components a dispatch may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Gate {
    /// Lifecycle phases: re-read `enabled` from the instance first.
    Refreshed,
    /// Contacts: trust the flag cached at the last refresh.
    Cached,
    /// Events: anything not in the graveyard.
    Live,
    /// Teardown.
    Always,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Call<'a> {
    Hook(Hook, HookArgs<'a>),
    Handler(&'a str, &'a Value),
}

impl World {
    pub fn run_on_start(&mut self) -> Result<(), WorldError> {
        for index in 0..self.actors.len() {
            if self.is_pending_destroy(self.actors[index].id()) {
                continue;
            }
            let keys = self.actors[index].take_on_start_queue();
            self.run_phase(Slot::Live(index), &keys, Hook::Start)?;
        }
        Ok(())
    }

    pub fn run_update(&mut self) -> Result<(), WorldError> {
        for index in 0..self.actors.len() {
            if self.is_pending_destroy(self.actors[index].id()) {
                continue;
            }
            let keys = self.actors[index].update_queue().to_vec();
            self.run_phase(Slot::Live(index), &keys, Hook::Update)?;
        }
        Ok(())
    }

    /// Late update, then teardown of anything destroyed this frame, then the actor's
    /// structural commit. Destroyed actors skip only the first step.
    pub fn run_late_update(&mut self) -> Result<(), WorldError> {
        for index in 0..self.actors.len() {
            let slot = Slot::Live(index);
            if !self.is_pending_destroy(self.actors[index].id()) {
                let keys = self.actors[index].late_update_queue().to_vec();
                self.run_phase(slot, &keys, Hook::LateUpdate)?;
            }
            self.run_on_destroy(slot)?;
            self.commit_actor(index);
        }
        Ok(())
    }

    fn run_phase(&mut self, slot: Slot, keys: &[String], hook: Hook) -> Result<(), WorldError> {
        for key in keys {
            let result = self.invoke(slot, key, Call::Hook(hook, HookArgs::None), Gate::Refreshed);
            if !self.settle(slot, hook.name(), result)? {
                break;
            }
        }
        Ok(())
    }

    /// Drains the on-destroy queue, including entries queued by the callbacks themselves.
    pub(crate) fn run_on_destroy(&mut self, slot: Slot) -> Result<(), WorldError> {
        loop {
            let keys = match self.slot_mut(slot) {
                Some(actor) => actor.take_on_destroy_queue(),
                None => return Ok(()),
            };
            if keys.is_empty() {
                return Ok(());
            }
            for key in &keys {
                let result = self.invoke(
                    slot,
                    key,
                    Call::Hook(Hook::Destroy, HookArgs::None),
                    Gate::Always,
                );
                if !self.settle(slot, Hook::Destroy.name(), result)? {
                    if let Some(actor) = self.slot_mut(slot) {
                        actor.clear_on_destroy_queue();
                    }
                    return Ok(());
                }
            }
        }
    }

    /// Runs one hook or handler on one component. The instance leaves its record for the
    /// duration, so the callback gets the whole world mutably.
    pub(crate) fn invoke(&mut self, slot: Slot, key: &str, call: Call<'_>, gate: Gate) -> HookResult {
        let Some(actor) = self.slot_mut(slot) else {
            return Ok(());
        };
        let open = match gate {
            Gate::Refreshed => {
                actor.refresh_enabled(key).unwrap_or(false) && !actor.is_in_graveyard(key)
            }
            Gate::Cached => actor.cached_enabled(key) && !actor.is_in_graveyard(key),
            Gate::Live => !actor.is_in_graveyard(key),
            Gate::Always => true,
        };
        if !open {
            return Ok(());
        }
        let actor_id = actor.id();
        // Vacant while the component is already running further up the stack.
        let Some(mut instance) = actor.take_instance(key) else {
            return Ok(());
        };

        let responds = match call {
            Call::Hook(hook, _) => instance.implements(hook),
            Call::Handler(handler, _) => instance.responds_to(handler),
        };
        let result = if responds {
            let mut ctx = HookContext::new(self, ComponentRef::new(actor_id, key));
            match call {
                Call::Hook(hook, args) => instance.invoke(hook, args, &mut ctx),
                Call::Handler(handler, payload) => {
                    instance.invoke_handler(handler, payload, &mut ctx)
                }
            }
        } else {
            Ok(())
        };

        if let Some(actor) = self.slot_mut(slot) {
            actor.restore_instance(key, instance);
        }
        result
    }
}
