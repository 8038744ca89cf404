//! `ArenaWorld`: a zero-gravity box with circular bodies.
//!
//! Each step runs in the usual rigid-body order:
//!
//! ```text
//! damp velocities → collect contacts → solve contact velocities (N iters)
//!     → integrate positions → push overlapping bodies apart (M iters)
//! ```
//!
//! Contacts are solved with accumulated, non-negative normal impulses, so
//! repeated iterations converge instead of bouncing bodies apart harder.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::{BodyHandle, BodyKind, PhysicsError, PhysicsWorld, Vec2};

/// Fraction of the remaining overlap removed per position iteration.
const POSITION_CORRECTION: f32 = 0.8;

/// Overlap tolerated without correction, avoids jitter on resting contacts.
const LINEAR_SLOP: f32 = 0.05;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Shape and material settings for an [`ArenaWorld`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// World width; walls sit at `x = 0` and `x = width`.
    pub width: f32,
    /// World height; walls sit at `y = 0` and `y = height`.
    pub height: f32,
    pub player_radius: f32,
    pub player_mass: f32,
    /// Linear damping of players, per second. High, so players stop quickly.
    pub player_damping: f32,
    pub ball_radius: f32,
    pub ball_mass: f32,
    pub ball_damping: f32,
    /// Initial downward speed of the ball.
    pub ball_speed: f32,
    pub ball_restitution: f32,
    /// Restitution used while the ball touches a player (> 1 kicks it).
    pub kick_restitution: f32,
    pub wall_restitution: f32,
    /// Random spots tried before `place_player` gives up.
    pub placement_attempts: u32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 800.0,
            player_radius: 23.0,
            player_mass: 1.0,
            player_damping: 5.5,
            ball_radius: 15.0,
            ball_mass: 0.5,
            ball_damping: 0.3,
            ball_speed: 300.0,
            ball_restitution: 1.0,
            kick_restitution: 2.0,
            wall_restitution: 0.1,
            placement_attempts: 100,
        }
    }
}

impl ArenaConfig {
    /// Smallest accepted world side.
    pub const MIN_SIDE: f32 = 100.0;

    /// Clamps out-of-range values so the config is safe to use.
    pub fn validated(mut self) -> Self {
        if !(self.width >= Self::MIN_SIDE) || !(self.height >= Self::MIN_SIDE) {
            warn!(
                width = self.width,
                height = self.height,
                min = Self::MIN_SIDE,
                "world bounds too small, clamping"
            );
            self.width = self.width.max(Self::MIN_SIDE);
            self.height = self.height.max(Self::MIN_SIDE);
        }
        self.player_mass = self.player_mass.max(f32::EPSILON);
        self.ball_mass = self.ball_mass.max(f32::EPSILON);
        self.player_damping = self.player_damping.max(0.0);
        self.ball_damping = self.ball_damping.max(0.0);
        self.placement_attempts = self.placement_attempts.max(1);
        self
    }
}

// ---------------------------------------------------------------------------
// Bodies and contacts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Body {
    kind: BodyKind,
    position: Vec2,
    velocity: Vec2,
    radius: f32,
    inv_mass: f32,
    damping: f32,
    restitution: f32,
}

/// What the second side of a contact is.
#[derive(Debug, Clone, Copy)]
enum Other {
    Body(BodyHandle),
    Wall,
}

#[derive(Debug, Clone)]
struct Contact {
    a: BodyHandle,
    b: Other,
    /// Points from `a` toward `b` (for walls: from the wall into `a`, negated).
    normal: Vec2,
    /// Separation speed the solver aims for along the normal.
    target_speed: f32,
    accumulated: f32,
}

// ---------------------------------------------------------------------------
// ArenaWorld
// ---------------------------------------------------------------------------

/// The default [`PhysicsWorld`].
pub struct ArenaWorld {
    config: ArenaConfig,
    bodies: BTreeMap<BodyHandle, Body>,
    next_id: u64,
    rng: StdRng,
}

impl ArenaWorld {
    /// Creates an empty world seeded from the OS.
    pub fn new(config: ArenaConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Creates an empty world with a fixed placement seed.
    pub fn with_seed(config: ArenaConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: ArenaConfig, rng: StdRng) -> Self {
        let config = config.validated();
        debug!(width = config.width, height = config.height, "arena world created");
        Self {
            config,
            bodies: BTreeMap::new(),
            next_id: 1,
            rng,
        }
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Current velocity of a body.
    pub fn velocity(&self, handle: BodyHandle) -> Option<Vec2> {
        self.bodies.get(&handle).map(|b| b.velocity)
    }

    /// Moves a body without any physical interaction.
    pub fn set_position(&mut self, handle: BodyHandle, position: Vec2) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.position = position;
        }
    }

    /// Overwrites a body's velocity.
    pub fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.velocity = velocity;
        }
    }

    fn insert(&mut self, body: Body) -> BodyHandle {
        let handle = BodyHandle::new(self.next_id);
        self.next_id += 1;
        self.bodies.insert(handle, body);
        handle
    }

    fn player_body(&self, position: Vec2) -> Body {
        Body {
            kind: BodyKind::Player,
            position,
            velocity: Vec2::ZERO,
            radius: self.config.player_radius,
            inv_mass: 1.0 / self.config.player_mass,
            damping: self.config.player_damping,
            restitution: 0.0,
        }
    }

    fn is_free(&self, position: Vec2, radius: f32) -> bool {
        self.bodies
            .values()
            .all(|other| position.distance(other.position) >= radius + other.radius)
    }

    fn random_spot(&mut self, radius: f32) -> Vec2 {
        let span_x = (self.config.width - 2.0 * radius).max(0.0);
        let span_y = (self.config.height - 2.0 * radius).max(0.0);
        Vec2::new(
            radius + self.rng.random::<f32>() * span_x,
            radius + self.rng.random::<f32>() * span_y,
        )
    }

    fn restitution_between(&self, a: &Body, b: &Body) -> f32 {
        let kick = matches!(
            (a.kind, b.kind),
            (BodyKind::Ball, BodyKind::Player) | (BodyKind::Player, BodyKind::Ball)
        );
        if kick {
            self.config.kick_restitution
        } else {
            a.restitution.max(b.restitution)
        }
    }

    fn collect_contacts(&self) -> Vec<Contact> {
        let mut contacts = Vec::new();
        let handles: Vec<BodyHandle> = self.bodies.keys().copied().collect();

        for (i, &ha) in handles.iter().enumerate() {
            let a = &self.bodies[&ha];

            for &hb in &handles[i + 1..] {
                let b = &self.bodies[&hb];
                let delta = b.position - a.position;
                if delta.length() >= a.radius + b.radius {
                    continue;
                }
                let normal = delta.normalize_or(Vec2::new(1.0, 0.0));
                let approach = (b.velocity - a.velocity).dot(normal);
                let e = self.restitution_between(a, b);
                trace!(%ha, %hb, approach, "body contact");
                contacts.push(Contact {
                    a: ha,
                    b: Other::Body(hb),
                    normal,
                    target_speed: if approach < 0.0 { -e * approach } else { 0.0 },
                    accumulated: 0.0,
                });
            }

            // Walls. The normal points from the body into the wall.
            let e = a.restitution.max(self.config.wall_restitution);
            let walls = [
                (a.position.x - a.radius <= 0.0, Vec2::new(-1.0, 0.0)),
                (a.position.x + a.radius >= self.config.width, Vec2::new(1.0, 0.0)),
                (a.position.y - a.radius <= 0.0, Vec2::new(0.0, -1.0)),
                (a.position.y + a.radius >= self.config.height, Vec2::new(0.0, 1.0)),
            ];
            for (touching, normal) in walls {
                if !touching {
                    continue;
                }
                // Relative velocity of the wall w.r.t. the body along normal.
                let approach = -a.velocity.dot(normal);
                contacts.push(Contact {
                    a: ha,
                    b: Other::Wall,
                    normal,
                    target_speed: if approach < 0.0 { -e * approach } else { 0.0 },
                    accumulated: 0.0,
                });
            }
        }
        contacts
    }

    fn solve_velocity(&mut self, contact: &mut Contact) {
        let n = contact.normal;
        match contact.b {
            Other::Body(hb) => {
                let (Some(a), Some(b)) = (self.bodies.get(&contact.a), self.bodies.get(&hb)) else {
                    return;
                };
                let inv_sum = a.inv_mass + b.inv_mass;
                if inv_sum <= 0.0 {
                    return;
                }
                let speed = (b.velocity - a.velocity).dot(n);
                let lambda = (contact.target_speed - speed) / inv_sum;
                let delta = apply_accumulated(&mut contact.accumulated, lambda);
                let (inv_a, inv_b) = (a.inv_mass, b.inv_mass);
                if let Some(a) = self.bodies.get_mut(&contact.a) {
                    a.velocity -= n * (delta * inv_a);
                }
                if let Some(b) = self.bodies.get_mut(&hb) {
                    b.velocity += n * (delta * inv_b);
                }
            }
            Other::Wall => {
                let Some(a) = self.bodies.get_mut(&contact.a) else {
                    return;
                };
                let speed = -a.velocity.dot(n);
                let lambda = (contact.target_speed - speed) / a.inv_mass;
                let delta = apply_accumulated(&mut contact.accumulated, lambda);
                a.velocity -= n * (delta * a.inv_mass);
            }
        }
    }

    fn correct_positions(&mut self) {
        let handles: Vec<BodyHandle> = self.bodies.keys().copied().collect();

        for (i, &ha) in handles.iter().enumerate() {
            for &hb in &handles[i + 1..] {
                let (a, b) = (&self.bodies[&ha], &self.bodies[&hb]);
                let delta = b.position - a.position;
                let overlap = a.radius + b.radius - delta.length();
                if overlap <= LINEAR_SLOP {
                    continue;
                }
                let inv_sum = a.inv_mass + b.inv_mass;
                let n = delta.normalize_or(Vec2::new(1.0, 0.0));
                let push = (overlap - LINEAR_SLOP) * POSITION_CORRECTION / inv_sum;
                let (inv_a, inv_b) = (a.inv_mass, b.inv_mass);
                if let Some(a) = self.bodies.get_mut(&ha) {
                    a.position -= n * (push * inv_a);
                }
                if let Some(b) = self.bodies.get_mut(&hb) {
                    b.position += n * (push * inv_b);
                }
            }
        }

        let (width, height) = (self.config.width, self.config.height);
        for body in self.bodies.values_mut() {
            body.position.x = body.position.x.clamp(body.radius, width - body.radius);
            body.position.y = body.position.y.clamp(body.radius, height - body.radius);
        }
    }
}

/// Adds `lambda` to the accumulated impulse, keeping the total
/// non-negative (contacts push, never pull). Returns the applied delta.
fn apply_accumulated(accumulated: &mut f32, lambda: f32) -> f32 {
    let previous = *accumulated;
    *accumulated = (previous + lambda).max(0.0);
    *accumulated - previous
}

impl PhysicsWorld for ArenaWorld {
    fn spawn_ball(&mut self) -> BodyHandle {
        let radius = self.config.ball_radius;
        let ball = Body {
            kind: BodyKind::Ball,
            position: Vec2::new(self.config.width / 2.0, radius),
            velocity: Vec2::new(0.0, self.config.ball_speed),
            radius,
            inv_mass: 1.0 / self.config.ball_mass,
            damping: self.config.ball_damping,
            restitution: self.config.ball_restitution,
        };
        let handle = self.insert(ball);
        debug!(%handle, "ball spawned");
        handle
    }

    fn place_player(&mut self) -> Result<BodyHandle, PhysicsError> {
        let radius = self.config.player_radius;
        let attempts = self.config.placement_attempts;

        for attempt in 1..=attempts {
            let spot = self.random_spot(radius);
            if self.is_free(spot, radius) {
                let body = self.player_body(spot);
                let handle = self.insert(body);
                debug!(%handle, attempt, x = spot.x, y = spot.y, "player body placed");
                return Ok(handle);
            }
        }

        warn!(attempts, bodies = self.bodies.len(), "no free spot for player body");
        Err(PhysicsError::PlacementFailed { attempts })
    }

    fn destroy_body(&mut self, handle: BodyHandle) -> bool {
        self.bodies.remove(&handle).is_some()
    }

    fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec2) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.velocity += impulse * body.inv_mass;
        }
    }

    fn step(&mut self, dt: f32, velocity_iterations: u32, position_iterations: u32) {
        if dt <= 0.0 {
            return;
        }

        for body in self.bodies.values_mut() {
            body.velocity = body.velocity * (1.0 / (1.0 + dt * body.damping));
        }

        let mut contacts = self.collect_contacts();
        for _ in 0..velocity_iterations {
            for contact in contacts.iter_mut() {
                self.solve_velocity(contact);
            }
        }

        for body in self.bodies.values_mut() {
            body.position += body.velocity * dt;
        }

        for _ in 0..position_iterations {
            self.correct_positions();
        }
    }

    fn position(&self, handle: BodyHandle) -> Option<Vec2> {
        self.bodies.get(&handle).map(|b| b.position)
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> ArenaWorld {
        ArenaWorld::with_seed(ArenaConfig::default(), 7)
    }

    #[test]
    fn test_config_validated_clamps_bounds() {
        let cfg = ArenaConfig {
            width: 10.0,
            height: -5.0,
            ..ArenaConfig::default()
        }
        .validated();
        assert_eq!(cfg.width, ArenaConfig::MIN_SIDE);
        assert_eq!(cfg.height, ArenaConfig::MIN_SIDE);
    }

    #[test]
    fn test_ball_starts_at_top_center_moving_down() {
        let mut w = world();
        let ball = w.spawn_ball();
        let pos = w.position(ball).unwrap();
        assert_eq!(pos.x, 500.0);
        assert_eq!(pos.y, 15.0);
        assert!(w.velocity(ball).unwrap().y > 0.0);
    }

    #[test]
    fn test_placed_players_do_not_overlap() {
        let mut w = world();
        let handles: Vec<_> = (0..20).map(|_| w.place_player().unwrap()).collect();
        for (i, a) in handles.iter().enumerate() {
            for b in &handles[i + 1..] {
                let d = w.position(*a).unwrap().distance(w.position(*b).unwrap());
                assert!(d >= 46.0, "bodies {a} and {b} overlap ({d})");
            }
        }
    }

    #[test]
    fn test_placement_fails_in_a_full_world() {
        let cfg = ArenaConfig {
            width: 100.0,
            height: 100.0,
            player_radius: 40.0,
            placement_attempts: 10,
            ..Default::default()
        };
        let mut w = ArenaWorld::with_seed(cfg, 1);
        w.place_player().unwrap();
        let err = w.place_player().unwrap_err();
        assert!(matches!(err, PhysicsError::PlacementFailed { attempts: 10 }));
        assert_eq!(w.body_count(), 1, "failed placement must not leave a body");
    }

    #[test]
    fn test_impulse_moves_player_and_damping_slows_it() {
        let mut w = world();
        let p = w.place_player().unwrap();
        w.set_position(p, Vec2::new(500.0, 400.0));
        w.apply_impulse(p, Vec2::new(100.0, 0.0));
        assert_eq!(w.velocity(p).unwrap(), Vec2::new(100.0, 0.0));

        w.step(0.01, 6, 2);
        let v1 = w.velocity(p).unwrap().x;
        assert!(v1 < 100.0 && v1 > 90.0);
        assert!(w.position(p).unwrap().x > 500.0);
    }

    #[test]
    fn test_zero_step_is_a_no_op() {
        let mut w = world();
        let ball = w.spawn_ball();
        let before = w.position(ball).unwrap();
        w.step(0.0, 6, 2);
        assert_eq!(w.position(ball).unwrap(), before);
    }

    #[test]
    fn test_ball_bounces_off_bottom_wall() {
        let mut w = world();
        let ball = w.spawn_ball();
        w.set_position(ball, Vec2::new(500.0, 785.0));
        w.set_velocity(ball, Vec2::new(0.0, 300.0));
        w.step(0.01, 6, 2);
        assert!(w.velocity(ball).unwrap().y < 0.0, "ball should head back up");
        assert!(w.position(ball).unwrap().y <= 785.0);
    }

    #[test]
    fn test_player_kicks_ball_harder_than_it_arrived() {
        let mut w = world();
        let ball = w.spawn_ball();
        let p = w.place_player().unwrap();
        w.set_position(p, Vec2::new(500.0, 400.0));
        w.set_velocity(p, Vec2::ZERO);
        w.set_position(ball, Vec2::new(500.0, 400.0 - 37.0));
        w.set_velocity(ball, Vec2::new(0.0, 100.0));

        w.step(0.01, 6, 2);
        let v = w.velocity(ball).unwrap();
        assert!(v.y < 0.0, "ball should bounce back");
        assert!(v.y.abs() > 50.0);
    }

    #[test]
    fn test_destroy_body() {
        let mut w = world();
        let p = w.place_player().unwrap();
        assert!(w.destroy_body(p));
        assert!(!w.destroy_body(p));
        assert_eq!(w.position(p), None);
        assert_eq!(w.body_count(), 0);
    }

    #[test]
    fn test_bodies_stay_inside_bounds() {
        let mut w = world();
        let ball = w.spawn_ball();
        let players: Vec<_> = (0..10).map(|_| w.place_player().unwrap()).collect();
        for p in &players {
            w.apply_impulse(*p, Vec2::new(5000.0, -5000.0));
        }
        for _ in 0..500 {
            w.step(0.01, 6, 2);
        }
        for h in players.iter().chain(std::iter::once(&ball)) {
            let pos = w.position(*h).unwrap();
            assert!(pos.x >= 0.0 && pos.x <= 1000.0, "{h} escaped: {pos:?}");
            assert!(pos.y >= 0.0 && pos.y <= 800.0, "{h} escaped: {pos:?}");
        }
    }
}
