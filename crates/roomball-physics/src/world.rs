//! The `PhysicsWorld` trait: the boundary between the room engine and
//! whatever simulates bodies.

use std::fmt;

use crate::{PhysicsError, Vec2};

/// Opaque handle to a body owned by a [`PhysicsWorld`].
///
/// Handles are never reused by [`ArenaWorld`](crate::ArenaWorld), so a
/// stale handle simply resolves to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(u64);

impl BodyHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body-{}", self.0)
    }
}

/// What a body represents. Worlds may use it for contact rules (the ball
/// gets kicked by players).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Player,
    Ball,
}

/// A rigid-body world driven exclusively by the room's tick loop.
///
/// `Send + 'static` because the world moves into the room actor task.
pub trait PhysicsWorld: Send + 'static {
    /// Creates the ball body at its starting spot with its initial velocity.
    fn spawn_ball(&mut self) -> BodyHandle;

    /// Creates a player body at a random free spot.
    ///
    /// # Errors
    /// Returns [`PhysicsError::PlacementFailed`] if no free spot was found
    /// within the world's attempt budget. No body is left behind.
    fn place_player(&mut self) -> Result<BodyHandle, PhysicsError>;

    /// Destroys a body. Returns `false` if the handle was unknown.
    fn destroy_body(&mut self, handle: BodyHandle) -> bool;

    /// Applies an instantaneous linear impulse at the body's center.
    fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec2);

    /// Advances the simulation by `dt` seconds using fixed solver
    /// iteration counts.
    fn step(&mut self, dt: f32, velocity_iterations: u32, position_iterations: u32);

    /// Current position of a body, `None` for an unknown handle.
    fn position(&self, handle: BodyHandle) -> Option<Vec2>;

    /// Number of live bodies (walls excluded).
    fn body_count(&self) -> usize;
}
