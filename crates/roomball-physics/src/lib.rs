//! Physics world facade for Roomball.
//!
//! The room engine never touches body internals. It talks to a
//! [`PhysicsWorld`]: place a body, push it, advance the world by a fixed
//! step, read positions back.
//!
//! [`ArenaWorld`] is the default implementation: a zero-gravity box with
//! four walls, circular bodies, linear damping and an impulse-based contact
//! solver. It is deliberately small; anything implementing the trait
//! (a full rigid-body engine, a scripted world for tests) can replace it.

mod arena;
mod error;
mod vec2;
mod world;

pub use arena::{ArenaConfig, ArenaWorld};
pub use error::PhysicsError;
pub use vec2::Vec2;
pub use world::{BodyHandle, BodyKind, PhysicsWorld};
