use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::geometry::Vec2;
use super::ActorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyType {
    #[default]
    Dynamic,
    Static,
    Kinematic,
}

impl BodyType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "dynamic" => Some(Self::Dynamic),
            "static" => Some(Self::Static),
            "kinematic" => Some(Self::Kinematic),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dynamic => "dynamic",
            Self::Static => "static",
            Self::Kinematic => "kinematic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    #[default]
    Box,
    Circle,
}

impl ShapeKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "box" => Some(Self::Box),
            "circle" => Some(Self::Circle),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Box => "box",
            Self::Circle => "circle",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixtureDesc {
    pub shape: ShapeKind,
    pub width: f32,
    pub height: f32,
    pub radius: f32,
    pub is_sensor: bool,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    /// False for the phantom fixture of a body with neither collider nor trigger.
    pub collides: bool,
    /// Actor reported in contacts; `None` fixtures never produce contacts.
    pub owner: Option<ActorId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    pub owner: ActorId,
    pub body_type: BodyType,
    pub position: Vec2,
    pub rotation_degrees: f32,
    pub bullet: bool,
    pub gravity_scale: f32,
    pub angular_damping: f32,
    pub fixtures: Vec<FixtureDesc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPhase {
    Begin,
    End,
}

/// A fixture pair reported by the backend after a step.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub phase: ContactPhase,
    pub actor_a: ActorId,
    pub actor_b: ActorId,
    pub a_is_sensor: bool,
    pub b_is_sensor: bool,
    pub point: Vec2,
    pub normal: Vec2,
    pub velocity_a: Vec2,
    pub velocity_b: Vec2,
}

/// Physics engine seam. The world owns one backend and steps it once per frame.
pub trait PhysicsBackend {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle;

    fn destroy_body(&mut self, body: BodyHandle);

    fn step(&mut self, dt_seconds: f32) -> Vec<Contact>;

    fn position(&self, body: BodyHandle) -> Option<Vec2>;

    fn set_position(&mut self, body: BodyHandle, position: Vec2);

    fn velocity(&self, body: BodyHandle) -> Option<Vec2>;

    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec2);

    fn rotation_degrees(&self, body: BodyHandle) -> Option<f32>;

    fn set_rotation_degrees(&mut self, body: BodyHandle, degrees: f32);

    fn body_count(&self) -> usize;

    /// Injects a contact to be reported by the next `step`. Simulating backends may ignore it.
    fn queue_contact(&mut self, _contact: Contact) {}
}

#[derive(Debug, Clone)]
struct StoredBody {
    desc: BodyDesc,
    velocity: Vec2,
}

/// Backend that keeps body state without simulating. Contacts come from the host.
#[derive(Debug, Default)]
pub struct BodyStore {
    next_handle: u64,
    bodies: HashMap<BodyHandle, StoredBody>,
    queued_contacts: Vec<Contact>,
    steps: u64,
}

impl BodyStore {
    pub fn desc(&self, body: BodyHandle) -> Option<&BodyDesc> {
        self.bodies.get(&body).map(|stored| &stored.desc)
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }
}

impl PhysicsBackend for BodyStore {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle = self.next_handle.saturating_add(1);
        self.bodies.insert(
            handle,
            StoredBody {
                desc,
                velocity: Vec2::ZERO,
            },
        );
        handle
    }

    fn destroy_body(&mut self, body: BodyHandle) {
        self.bodies.remove(&body);
    }

    fn step(&mut self, _dt_seconds: f32) -> Vec<Contact> {
        self.steps = self.steps.saturating_add(1);
        std::mem::take(&mut self.queued_contacts)
    }

    fn position(&self, body: BodyHandle) -> Option<Vec2> {
        self.bodies.get(&body).map(|stored| stored.desc.position)
    }

    fn set_position(&mut self, body: BodyHandle, position: Vec2) {
        if let Some(stored) = self.bodies.get_mut(&body) {
            stored.desc.position = position;
        }
    }

    fn velocity(&self, body: BodyHandle) -> Option<Vec2> {
        self.bodies.get(&body).map(|stored| stored.velocity)
    }

    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec2) {
        if let Some(stored) = self.bodies.get_mut(&body) {
            stored.velocity = velocity;
        }
    }

    fn rotation_degrees(&self, body: BodyHandle) -> Option<f32> {
        self.bodies.get(&body).map(|stored| stored.desc.rotation_degrees)
    }

    fn set_rotation_degrees(&mut self, body: BodyHandle, degrees: f32) {
        if let Some(stored) = self.bodies.get_mut(&body) {
            stored.desc.rotation_degrees = degrees;
        }
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn queue_contact(&mut self, contact: Contact) {
        self.queued_contacts.push(contact);
    }
}
