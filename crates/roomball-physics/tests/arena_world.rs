//! Behavior of `ArenaWorld` through the `PhysicsWorld` trait.

use roomball_physics::{ArenaConfig, ArenaWorld, BodyHandle, PhysicsError, PhysicsWorld, Vec2};

const DT: f32 = 0.01;

fn run<W: PhysicsWorld + ?Sized>(world: &mut W, steps: usize) {
    for _ in 0..steps {
        world.step(DT, 6, 2);
    }
}

fn boxed_world(seed: u64) -> Box<dyn PhysicsWorld> {
    Box::new(ArenaWorld::with_seed(ArenaConfig::default(), seed))
}

#[test]
fn handles_are_unique_and_never_reused() {
    let mut world = boxed_world(3);
    let a = world.place_player().unwrap();
    assert!(world.destroy_body(a));
    let b = world.place_player().unwrap();
    let ball = world.spawn_ball();
    assert_ne!(a, b);
    assert_ne!(b, ball);
    assert!(b.into_inner() > a.into_inner());
}

#[test]
fn unknown_handle_is_ignored() {
    let mut world = boxed_world(3);
    let ghost = BodyHandle::new(999);
    world.apply_impulse(ghost, Vec2::new(1.0, 1.0));
    assert_eq!(world.position(ghost), None);
    assert!(!world.destroy_body(ghost));
}

#[test]
fn ball_falls_and_comes_back_up() {
    let mut world = boxed_world(5);
    let ball = world.spawn_ball();
    let start = world.position(ball).unwrap();

    run(world.as_mut(), 100);
    let mid = world.position(ball).unwrap();
    assert!(mid.y > start.y, "ball should move down first");

    // Long enough to reach the bottom wall and bounce.
    let mut lowest = mid.y;
    let mut rose = false;
    for _ in 0..1000 {
        world.step(DT, 6, 2);
        let y = world.position(ball).unwrap().y;
        if y < lowest - 1.0 {
            rose = true;
            break;
        }
        lowest = lowest.max(y);
    }
    assert!(rose, "ball never bounced (lowest point {lowest})");
}

#[test]
fn player_impulse_changes_position() {
    let mut world = boxed_world(9);
    let p = world.place_player().unwrap();
    let before = world.position(p).unwrap();

    world.apply_impulse(p, Vec2::new(0.0, -50.0));
    run(world.as_mut(), 5);

    let after = world.position(p).unwrap();
    assert!(after.y < before.y || before.y <= 23.5, "{before:?} -> {after:?}");
}

#[test]
fn placement_budget_is_configurable() {
    let config = ArenaConfig {
        width: 100.0,
        height: 100.0,
        player_radius: 45.0,
        placement_attempts: 3,
        ..Default::default()
    };
    let mut world = ArenaWorld::with_seed(config, 11);
    world.place_player().unwrap();
    match world.place_player() {
        Err(PhysicsError::PlacementFailed { attempts }) => assert_eq!(attempts, 3),
        other => panic!("expected placement failure, got {other:?}"),
    }
}

#[test]
fn many_players_fit_in_default_world() {
    let mut world = boxed_world(21);
    for _ in 0..60 {
        world.place_player().unwrap();
    }
    assert_eq!(world.body_count(), 60);
}
