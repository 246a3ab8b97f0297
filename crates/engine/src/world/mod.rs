mod actor;
mod collision;
mod component;
mod context;
mod driver;
mod error;
mod events;
mod geometry;
mod lifecycle;
mod physics;
mod registry;
mod render;

pub use actor::{Actor, ActorId, ActorIdAllocator};
pub use collision::{Collision, CONTACT_SENTINEL};
pub use component::{
    Behavior, ComponentInstance, ComponentMeta, ComponentRef, Hook, HookArgs, HookSet,
    NativeComponent,
};
pub use context::HookContext;
pub use driver::{FrameDriver, FrameReport};
pub use error::{FieldError, HookError, HookResult, WorldError};
pub use events::{EventBus, Subscription};
pub use geometry::{degrees_to_radians, radians_to_degrees, Vec2};
pub use physics::{
    BodyDesc, BodyHandle, BodyStore, BodyType, Contact, ContactPhase, FixtureDesc,
    PhysicsBackend, ShapeKind,
};
pub use registry::{ScriptFailure, World};
pub use render::{NullRenderer, Renderable, RenderableKind, RenderRegistry, Renderer};
