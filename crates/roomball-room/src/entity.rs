//! Entities and their "changed since last publish" tracking.
//!
//! Positions are compared against the last published value with an
//! epsilon, so sub-threshold jitter from the solver never turns into an
//! update. Text fields carry a plain boolean flag.

use roomball_physics::{BodyHandle, Vec2};

use crate::Impulse;

/// Minimum positional change that makes a coordinate dirty.
pub const POSITION_EPSILON: f32 = 0.1;

/// Chat messages are cut to this many characters.
pub const MAX_MESSAGE_CHARS: usize = 30;

// ---------------------------------------------------------------------------
// Coordinate
// ---------------------------------------------------------------------------

/// One position coordinate plus the value last published for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Coordinate {
    current: f32,
    published: Option<f32>,
}

impl Coordinate {
    pub fn new(value: f32) -> Self {
        Self {
            current: value,
            published: None,
        }
    }

    pub fn value(&self) -> f32 {
        self.current
    }

    pub fn set(&mut self, value: f32) {
        self.current = value;
    }

    /// Never published, or moved by at least [`POSITION_EPSILON`].
    pub fn is_changed(&self) -> bool {
        match self.published {
            None => true,
            Some(last) => (last - self.current).abs() >= POSITION_EPSILON,
        }
    }

    pub fn mark_changed(&mut self) {
        self.published = None;
    }

    pub fn mark_published(&mut self) {
        self.published = Some(self.current);
    }
}

// ---------------------------------------------------------------------------
// Shared entity part
// ---------------------------------------------------------------------------

/// Name, body and tracked position shared by players and the ball.
#[derive(Debug, Clone)]
pub struct EntityBase {
    name: String,
    body: BodyHandle,
    x: Coordinate,
    y: Coordinate,
}

impl EntityBase {
    pub fn new(name: impl Into<String>, body: BodyHandle) -> Self {
        Self {
            name: name.into(),
            body,
            x: Coordinate::default(),
            y: Coordinate::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    pub fn x(&self) -> &Coordinate {
        &self.x
    }

    pub fn y(&self) -> &Coordinate {
        &self.y
    }

    /// Copies the body position read from the physics world.
    pub fn sync(&mut self, position: Vec2) {
        self.x.set(position.x);
        self.y.set(position.y);
    }

    fn is_changed(&self) -> bool {
        self.x.is_changed() || self.y.is_changed()
    }

    fn mark_changed(&mut self) {
        self.x.mark_changed();
        self.y.mark_changed();
    }

    fn mark_published(&mut self) {
        self.x.mark_published();
        self.y.mark_published();
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Player {
    base: EntityBase,
    message: String,
    message_changed: bool,
    user_agent: String,
    user_agent_changed: bool,
    pending: Impulse,
}

impl Player {
    /// A new player with every field marked changed.
    pub fn new(name: impl Into<String>, body: BodyHandle, user_agent: impl Into<String>) -> Self {
        Self {
            base: EntityBase::new(name, body),
            message: String::new(),
            message_changed: true,
            user_agent: user_agent.into(),
            user_agent_changed: true,
            pending: Impulse::ZERO,
        }
    }

    pub fn base(&self) -> &EntityBase {
        &self.base
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn message_changed(&self) -> bool {
        self.message_changed
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn user_agent_changed(&self) -> bool {
        self.user_agent_changed
    }

    /// Stores a chat message, cut to [`MAX_MESSAGE_CHARS`] characters.
    /// Always marks the message changed, even when the text repeats.
    pub fn set_message(&mut self, text: &str) {
        self.message = text.chars().take(MAX_MESSAGE_CHARS).collect();
        self.message_changed = true;
    }

    pub fn pending_impulse(&self) -> Impulse {
        self.pending
    }

    pub fn add_impulse(&mut self, impulse: Impulse) {
        self.pending = self.pending.merge(impulse);
    }

    /// Returns the pending impulse and resets it to zero.
    pub fn take_impulse(&mut self) -> Impulse {
        std::mem::take(&mut self.pending)
    }

    pub fn sync(&mut self, position: Vec2) {
        self.base.sync(position);
    }

    pub fn is_changed(&self) -> bool {
        self.base.is_changed() || self.message_changed || self.user_agent_changed
    }

    pub fn mark_changed(&mut self) {
        self.base.mark_changed();
        self.message_changed = true;
        self.user_agent_changed = true;
    }

    pub fn mark_published(&mut self) {
        self.base.mark_published();
        self.message_changed = false;
        self.user_agent_changed = false;
    }
}

// ---------------------------------------------------------------------------
// Ball
// ---------------------------------------------------------------------------

/// The single physics-driven ball.
#[derive(Debug, Clone)]
pub struct Ball {
    base: EntityBase,
}

impl Ball {
    pub fn new(name: impl Into<String>, body: BodyHandle) -> Self {
        Self {
            base: EntityBase::new(name, body),
        }
    }

    pub fn base(&self) -> &EntityBase {
        &self.base
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn sync(&mut self, position: Vec2) {
        self.base.sync(position);
    }

    pub fn is_changed(&self) -> bool {
        self.base.is_changed()
    }

    pub fn mark_changed(&mut self) {
        self.base.mark_changed();
    }

    pub fn mark_published(&mut self) {
        self.base.mark_published();
    }
}

// ---------------------------------------------------------------------------
// EntityRef
// ---------------------------------------------------------------------------

/// Borrowed view over either kind of entity.
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'a> {
    Player(&'a Player),
    Ball(&'a Ball),
}

impl<'a> EntityRef<'a> {
    pub fn base(&self) -> &'a EntityBase {
        match self {
            Self::Player(player) => player.base(),
            Self::Ball(ball) => ball.base(),
        }
    }

    pub fn name(&self) -> &'a str {
        self.base().name()
    }

    pub fn is_changed(&self) -> bool {
        match self {
            Self::Player(player) => player.is_changed(),
            Self::Ball(ball) => ball.is_changed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> Player {
        Player::new("Bob", BodyHandle::new(1), "Firefox")
    }

    #[test]
    fn test_coordinate_epsilon() {
        let mut c = Coordinate::new(10.02);
        assert!(c.is_changed(), "never published");
        c.mark_published();
        c.set(10.05);
        assert!(!c.is_changed());
        c.set(10.20);
        assert!(c.is_changed());
        c.set(9.92);
        assert!(c.is_changed(), "movement in either direction counts");
    }

    #[test]
    fn test_new_player_is_fully_changed() {
        let p = player();
        assert!(p.is_changed());
        assert!(p.message_changed());
        assert!(p.user_agent_changed());
    }

    #[test]
    fn test_mark_published_clears_everything() {
        let mut p = player();
        p.mark_published();
        assert!(!p.is_changed());
        p.mark_changed();
        assert!(p.base().x().is_changed());
        assert!(p.user_agent_changed());
    }

    #[test]
    fn test_message_is_truncated_to_30_chars() {
        let mut p = player();
        p.set_message(&"x".repeat(45));
        assert_eq!(p.message().chars().count(), MAX_MESSAGE_CHARS);

        p.set_message("héllo wörld ünïcödé ñame çhars and more");
        assert_eq!(p.message().chars().count(), MAX_MESSAGE_CHARS);
    }

    #[test]
    fn test_repeated_message_is_republished() {
        let mut p = player();
        p.set_message("hi");
        p.mark_published();
        assert!(!p.message_changed());
        p.set_message("hi");
        assert!(p.message_changed());
    }

    #[test]
    fn test_take_impulse_resets() {
        let mut p = player();
        p.add_impulse(Impulse::new(5, 0));
        assert_eq!(p.take_impulse(), Impulse::new(5, 0));
        assert!(p.pending_impulse().is_zero());
    }
}
