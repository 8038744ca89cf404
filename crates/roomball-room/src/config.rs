//! Room configuration and engine state.

use std::time::Duration;

use roomball_physics::ArenaConfig;
use roomball_tick::TickConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::StatsConfig;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration for a room instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Used in logs and errors.
    pub name: String,

    /// Milliseconds between ticks. Also fixes the simulation step
    /// (`tick_interval_ms / 1000` seconds per tick).
    pub tick_interval_ms: u64,

    /// Ticks between two update flushes.
    pub steps_per_frame: u32,

    /// Live players allowed at once. The ball does not count.
    pub max_players: usize,

    /// Magnitude of the impulse produced by one directional command.
    pub impulse_strength: i32,

    pub velocity_iterations: u32,
    pub position_iterations: u32,

    /// World bounds and body materials.
    pub arena: ArenaConfig,

    pub stats: StatsConfig,

    /// Capacity of the room's command channel.
    pub channel_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            name: "roomball".to_string(),
            tick_interval_ms: 10,
            steps_per_frame: 1,
            max_players: 200,
            impulse_strength: 150,
            velocity_iterations: 6,
            position_iterations: 2,
            arena: ArenaConfig::default(),
            stats: StatsConfig::default(),
            channel_size: 1024,
        }
    }
}

impl RoomConfig {
    /// Clamps out-of-range values so the config is safe to use.
    pub fn validated(mut self) -> Self {
        if self.tick_interval_ms == 0 {
            warn!(room = %self.name, "tick_interval_ms is 0, using 1");
            self.tick_interval_ms = 1;
        }
        if self.steps_per_frame == 0 {
            warn!(room = %self.name, "steps_per_frame is 0, using 1");
            self.steps_per_frame = 1;
        }
        if self.channel_size == 0 {
            self.channel_size = 1;
        }
        self.impulse_strength = self.impulse_strength.abs();
        self.arena = self.arena.validated();
        self
    }

    /// Scheduler settings matching this room.
    pub fn tick_config(&self) -> TickConfig {
        TickConfig {
            interval: Duration::from_millis(self.tick_interval_ms),
            ..TickConfig::default()
        }
    }

    /// Fixed simulation step, in seconds.
    pub fn time_step(&self) -> f32 {
        self.tick_interval_ms as f32 / 1000.0
    }
}

// ---------------------------------------------------------------------------
// EngineState
// ---------------------------------------------------------------------------

/// Whether the game loop is ticking.
///
/// ```text
/// Stopped ⇄ Running
/// ```
///
/// Both transitions are idempotent. Commands are served in either state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EngineState {
    #[default]
    Stopped,
    Running,
}

impl EngineState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "Stopped"),
            Self::Running => write!(f, "Running"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.tick_interval_ms, 10);
        assert_eq!(config.steps_per_frame, 1);
        assert_eq!(config.max_players, 200);
        assert_eq!(config.velocity_iterations, 6);
        assert_eq!(config.position_iterations, 2);
        assert_eq!(config.arena.width, 1000.0);
        assert_eq!(config.arena.height, 800.0);
    }

    #[test]
    fn test_time_step_follows_interval() {
        let config = RoomConfig {
            tick_interval_ms: 20,
            ..Default::default()
        };
        assert_eq!(config.time_step(), 0.02);
        assert_eq!(config.tick_config().interval, Duration::from_millis(20));
    }

    #[test]
    fn test_validated_fixes_zeroes() {
        let config = RoomConfig {
            tick_interval_ms: 0,
            steps_per_frame: 0,
            impulse_strength: -5,
            ..Default::default()
        }
        .validated();
        assert_eq!(config.tick_interval_ms, 1);
        assert_eq!(config.steps_per_frame, 1);
        assert_eq!(config.impulse_strength, 5);
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: RoomConfig =
            serde_json::from_str(r#"{"max_players": 4, "arena": {"width": 640}}"#).unwrap();
        assert_eq!(config.max_players, 4);
        assert_eq!(config.arena.width, 640.0);
        assert_eq!(config.arena.height, 800.0);
        assert_eq!(config.tick_interval_ms, 10);
    }

    #[test]
    fn test_engine_state() {
        assert_eq!(EngineState::default(), EngineState::Stopped);
        assert!(EngineState::Running.is_running());
        assert_eq!(EngineState::Running.to_string(), "Running");
    }
}
