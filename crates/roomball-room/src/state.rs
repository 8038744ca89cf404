//! Authoritative room state.
//!
//! `RoomState` owns the entity map, the ball and the physics world. Every
//! method runs to completion inside one turn of the room actor, and every
//! event it produces is enqueued before the method returns, so publish
//! order always equals mutation order.

use std::collections::HashMap;

use roomball_physics::PhysicsWorld;
use roomball_protocol::{Command, InputCode};
use roomball_tick::Cadence;
use tracing::{debug, info, warn};

use crate::compose::{compose, compose_snapshot};
use crate::entity::{Ball, EntityRef, Player};
use crate::names::{self, BALL_NAME};
use crate::{Impulse, Publisher, RoomConfig, RoomError};

pub struct RoomState<W: PhysicsWorld> {
    config: RoomConfig,
    world: W,
    players: HashMap<String, Player>,
    ball: Ball,
    publisher: Publisher,
    flush: Cadence,
}

impl<W: PhysicsWorld> RoomState<W> {
    /// Creates the state and spawns the ball. Nothing is published until
    /// the first flush or snapshot.
    pub fn new(config: RoomConfig, mut world: W, publisher: Publisher) -> Self {
        let config = config.validated();
        let ball_body = world.spawn_ball();
        let mut ball = Ball::new(BALL_NAME, ball_body);
        if let Some(position) = world.position(ball_body) {
            ball.sync(position);
        }
        let flush = Cadence::every(u64::from(config.steps_per_frame));

        Self {
            config,
            world,
            players: HashMap::new(),
            ball,
            publisher,
            flush,
        }
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Adds a player and publishes its ADD. Returns the assigned name.
    ///
    /// Fails without touching any state when the room is full or the
    /// world has no room for another body.
    pub fn add_player(&mut self, proposed: &str, user_agent: &str) -> Result<String, RoomError> {
        if self.players.len() >= self.config.max_players {
            warn!(room = %self.config.name, proposed, max = self.config.max_players, "room full");
            return Err(RoomError::Capacity {
                max: self.config.max_players,
            });
        }

        let name = names::resolve(proposed, self.players.keys().map(String::as_str));
        let body = self.world.place_player()?;

        let mut player = Player::new(name.clone(), body, user_agent);
        if let Some(position) = self.world.position(body) {
            player.sync(position);
        }

        self.publish(EntityRef::Player(&player), Command::Add);
        player.mark_published();
        self.players.insert(name.clone(), player);

        info!(
            room = %self.config.name,
            player = %name,
            players = self.players.len(),
            "player added"
        );
        Ok(name)
    }

    /// Removes a player and publishes its DELETE. Unknown names are a
    /// logged no-op. Returns whether a player was removed.
    pub fn remove_player(&mut self, name: &str) -> bool {
        let Some(mut player) = self.players.remove(name) else {
            warn!(room = %self.config.name, player = name, "remove for unknown player");
            return false;
        };

        self.world.destroy_body(player.base().body());
        player.mark_changed();
        self.publish(EntityRef::Player(&player), Command::Delete);

        info!(
            room = %self.config.name,
            player = name,
            players = self.players.len(),
            "player removed"
        );
        true
    }

    /// Merges the impulse for a directional code into the player's
    /// pending impulse. Unknown players and codes are logged and ignored.
    pub fn dispatch_command(&mut self, name: &str, code: u32) {
        let Some(input) = InputCode::from_code(code) else {
            warn!(room = %self.config.name, player = name, code, "unknown command code");
            return;
        };
        let strength = self.config.impulse_strength;
        let Some(player) = self.players.get_mut(name) else {
            warn!(room = %self.config.name, player = name, "command for unknown player");
            return;
        };

        let (dx, dy) = input.direction();
        player.add_impulse(Impulse::new(dx * strength, dy * strength));
        debug!(player = name, ?input, pending = ?player.pending_impulse(), "command dispatched");
    }

    /// Stores a chat message and publishes the UPDATE.
    pub fn update_message(&mut self, name: &str, text: &str) {
        let Some(player) = self.players.get_mut(name) else {
            warn!(room = %self.config.name, player = name, "message for unknown player");
            return;
        };

        player.set_message(text);
        if player.is_changed() {
            let event = compose(EntityRef::Player(player), Command::Update, false);
            self.publisher.event(event);
            player.mark_published();
        }
    }

    /// Publishes every live entity as a snapshot ADD, the ball last, then
    /// one end-of-snapshot marker.
    pub fn touch_all(&mut self) {
        for player in self.players.values_mut() {
            player.mark_changed();
            self.publisher.event(compose_snapshot(EntityRef::Player(player)));
            player.mark_published();
        }

        self.ball.mark_changed();
        self.publisher.event(compose_snapshot(EntityRef::Ball(&self.ball)));
        self.ball.mark_published();

        self.publisher.end_of_snapshot();
        debug!(room = %self.config.name, players = self.players.len(), "snapshot published");
    }

    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    /// One tick: advance the world, then flush every `steps_per_frame` ticks.
    pub fn tick(&mut self) {
        self.step();
        if self.flush.fire() {
            self.flush_updates();
        }
    }

    /// Applies and clears pending impulses, advances the world by the
    /// fixed time step and copies positions back into the entities.
    pub fn step(&mut self) {
        for player in self.players.values_mut() {
            let impulse = player.take_impulse();
            if !impulse.is_zero() {
                self.world.apply_impulse(player.base().body(), impulse.to_vec2());
            }
        }

        self.world.step(
            self.config.time_step(),
            self.config.velocity_iterations,
            self.config.position_iterations,
        );

        for player in self.players.values_mut() {
            if let Some(position) = self.world.position(player.base().body()) {
                player.sync(position);
            }
        }
        if let Some(position) = self.world.position(self.ball.base().body()) {
            self.ball.sync(position);
        }
    }

    /// Publishes an UPDATE for every changed player and then the ball.
    pub fn flush_updates(&mut self) {
        for player in self.players.values_mut() {
            if player.is_changed() {
                self.publisher
                    .event(compose(EntityRef::Player(player), Command::Update, false));
                player.mark_published();
            }
        }

        if self.ball.is_changed() {
            self.publisher
                .event(compose(EntityRef::Ball(&self.ball), Command::Update, false));
            self.ball.mark_published();
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn player(&self, name: &str) -> Option<&Player> {
        self.players.get(name)
    }

    pub fn ball(&self) -> &Ball {
        &self.ball
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Live player names, sorted.
    pub fn player_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.players.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    fn publish(&self, entity: EntityRef<'_>, command: Command) {
        if entity.is_changed() {
            self.publisher.event(compose(entity, command, true));
        }
    }
}
